//! Operator console shared between firmware and emulator targets.
//!
//! [`grammar`] turns one input line into a [`ConsoleCommand`]; [`status`]
//! renders the alert session and telemetry ring the same way on every
//! front-end.

pub mod grammar;
pub mod status;

pub use grammar::{ConsoleCommand, ConsoleError, parse};
pub use status::StatusFormatter;

/// Command keywords and the one-line summary printed by `help`.
pub const HELP_TOPICS: &[(&str, &str)] = &[
    ("tone", "tone <hz>              request a tone; 0 stops the indicator"),
    ("bell", "bell [on|off|<value>]  ring the bell; any non-zero value rings at 1000 Hz"),
    ("raw", "raw <type> <code> <value>  inject a raw input event (hex with 0x)"),
    ("init", "init                   bind the indicator and timer"),
    ("suspend", "suspend                force the indicator off"),
    ("shutdown", "shutdown               force the indicator off"),
    ("remove", "remove                 force the indicator off and unbind"),
    ("status", "status                 show the alert session and recent telemetry"),
    ("help", "help [command]         list commands or describe one"),
];

/// Looks up the help line for `topic`, ignoring ASCII case.
#[must_use]
pub fn help_for(topic: &str) -> Option<&'static str> {
    HELP_TOPICS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(topic))
        .map(|(_, line)| *line)
}
