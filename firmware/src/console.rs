//! Operator console: line assembly and command dispatch.
//!
//! Bytes arrive from the console UART, are assembled into bounded lines and
//! handed to [`ConsoleSession`], which drives the shared alert device and
//! renders a textual reply.

use core::fmt::{self, Write};
use core::mem;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use heapless::{String, Vec};
use visbell_core::alert::{AlertConfig, AlertDevice, DeadlineTimer, Indicator, Transition};
use visbell_core::console::{self, ConsoleCommand, HELP_TOPICS, StatusFormatter};
use visbell_core::event::{ENODEV, STATUS_OK};

use crate::clock::FirmwareInstant;

/// Maximum number of bytes accepted on a single console line (excluding terminator).
pub const MAX_LINE_LEN: usize = 96;

/// Telemetry records shown by `status`.
const STATUS_HISTORY: usize = 4;

/// Alert device shared by the console and deadline tasks.
pub type FirmwareDevice<D, T> = AlertDevice<CriticalSectionRawMutex, D, T, FirmwareInstant>;

/// Errors raised while assembling a console line.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LineError {
    #[error("line exceeds {} bytes", MAX_LINE_LEN)]
    Overflow,
    #[error("line is not valid UTF-8")]
    InvalidUtf8,
}

/// Accumulates console bytes until a line terminator arrives.
#[derive(Default)]
pub struct LineBuffer {
    bytes: Vec<u8, MAX_LINE_LEN>,
    overflowed: bool,
}

impl LineBuffer {
    pub const fn new() -> Self {
        Self {
            bytes: Vec::new(),
            overflowed: false,
        }
    }

    /// Feeds one byte; returns a completed line on `\r` or `\n`.
    ///
    /// Blank lines (including the second half of `\r\n`) are skipped.
    pub fn push(&mut self, byte: u8) -> Option<Result<String<MAX_LINE_LEN>, LineError>> {
        if byte != b'\r' && byte != b'\n' {
            if self.bytes.push(byte).is_err() {
                self.overflowed = true;
            }
            return None;
        }

        if mem::take(&mut self.overflowed) {
            self.bytes.clear();
            return Some(Err(LineError::Overflow));
        }
        if self.bytes.is_empty() {
            return None;
        }

        let bytes = mem::take(&mut self.bytes);
        Some(String::from_utf8(bytes).map_err(|_| LineError::InvalidUtf8))
    }
}

/// Dispatches console commands to the alert device.
pub struct ConsoleSession<'d, D, T>
where
    D: Indicator + Clone,
    T: DeadlineTimer<Instant = FirmwareInstant> + Clone,
{
    device: &'d FirmwareDevice<D, T>,
    indicator: D,
    timer: T,
    config: AlertConfig,
}

impl<'d, D, T> ConsoleSession<'d, D, T>
where
    D: Indicator + Clone,
    T: DeadlineTimer<Instant = FirmwareInstant> + Clone,
{
    /// `indicator` and `timer` are cloned into the device on every `init`.
    pub fn new(device: &'d FirmwareDevice<D, T>, indicator: D, timer: T, config: AlertConfig) -> Self {
        Self {
            device,
            indicator,
            timer,
            config,
        }
    }

    /// Binds the indicator and timer to the device.
    pub fn bind(&self, now: FirmwareInstant) {
        self.device
            .on_init(self.indicator.clone(), self.timer.clone(), self.config, now);
    }

    /// Parses and executes one line, writing the reply to `out`.
    pub fn handle_line<W: Write>(&self, line: &str, now: FirmwareInstant, out: &mut W) -> fmt::Result {
        let command = match console::parse(line) {
            Ok(command) => command,
            Err(err) => {
                log_syntax_error(line);
                return writeln!(out, "ERR syntax {err}");
            }
        };

        match command {
            ConsoleCommand::Tone(_) | ConsoleCommand::Bell(_) | ConsoleCommand::Raw { .. } => {
                let Some((event_type, code, value)) = command.raw_event() else {
                    return Ok(());
                };
                match self.device.event(event_type, code, value, now) {
                    STATUS_OK => writeln!(out, "OK"),
                    ENODEV => writeln!(out, "ERR status={ENODEV} (no indicator bound; run `init`)"),
                    status => writeln!(out, "ERR status={status} (invalid event)"),
                }
            }
            ConsoleCommand::Init => {
                self.bind(now);
                writeln!(out, "OK bound window={}ms", self.config.blink_window.as_millis())
            }
            ConsoleCommand::Suspend => write_transition(out, "suspend", self.device.on_suspend(now)),
            ConsoleCommand::Shutdown => {
                write_transition(out, "shutdown", self.device.on_shutdown(now))
            }
            ConsoleCommand::Remove => write_transition(out, "remove", self.device.on_remove(now)),
            ConsoleCommand::Status => self.write_status(out, now),
            ConsoleCommand::Help(topic) => write_help(out, topic),
        }
    }

    fn write_status<W: Write>(&self, out: &mut W, now: FirmwareInstant) -> fmt::Result {
        let snapshot = self.device.snapshot();
        let formatter = StatusFormatter::new(snapshot.as_ref(), now);
        formatter.write_session_line(out)?;
        out.write_char('\n')?;

        self.device
            .inspect(|controller| {
                let telemetry = controller.telemetry();
                let skip = telemetry.len().saturating_sub(STATUS_HISTORY);
                let mut shown = 0;
                for record in telemetry.oldest_first().skip(skip) {
                    out.write_str("  ")?;
                    formatter.write_record_line(out, record)?;
                    out.write_char('\n')?;
                    shown += 1;
                }
                formatter.write_history_line(out, shown, telemetry.total_recorded())?;
                out.write_char('\n')
            })
            .unwrap_or(Ok(()))
    }
}

fn write_transition<W: Write>(out: &mut W, hook: &str, transition: Transition) -> fmt::Result {
    match transition {
        Transition::Stopped => writeln!(out, "OK {hook}: blink stopped"),
        _ => writeln!(out, "OK {hook}: already idle"),
    }
}

fn write_help<W: Write>(out: &mut W, topic: Option<&str>) -> fmt::Result {
    match topic {
        Some(target) => match console::help_for(target) {
            Some(detail) => writeln!(out, "{detail}"),
            None => writeln!(out, "No help available for `{target}`."),
        },
        None => {
            for (_, detail) in HELP_TOPICS {
                writeln!(out, "  {detail}")?;
            }
            Ok(())
        }
    }
}

#[cfg(target_os = "none")]
fn log_syntax_error(line: &str) {
    defmt::info!("console: rejected `{}`", line);
}

#[cfg(not(target_os = "none"))]
fn log_syntax_error(line: &str) {
    println!("console: rejected `{line}`");
}
