//! Line grammar for the operator console.
//!
//! Commands are a case-insensitive keyword followed by whitespace-separated
//! arguments. Parsing works directly on `&str` so it runs unchanged on the
//! MCU and the host.

use winnow::ModalResult;
use winnow::ascii::{Caseless, dec_int, dec_uint, hex_uint, space1};
use winnow::combinator::{alt, opt, preceded};
use winnow::prelude::*;
use winnow::token::{literal, take_while};

use crate::event::{EV_SND, SND_BELL, SND_TONE};

/// Parsed console command.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConsoleCommand<'a> {
    Tone(i32),
    Bell(i32),
    Raw { event_type: u16, code: u16, value: i32 },
    Init,
    Suspend,
    Shutdown,
    Remove,
    Status,
    Help(Option<&'a str>),
}

impl ConsoleCommand<'_> {
    /// The raw input event this command injects, if it is an event command.
    #[must_use]
    pub const fn raw_event(&self) -> Option<(u16, u16, i32)> {
        match *self {
            ConsoleCommand::Tone(value) => Some((EV_SND, SND_TONE, value)),
            ConsoleCommand::Bell(value) => Some((EV_SND, SND_BELL, value)),
            ConsoleCommand::Raw {
                event_type,
                code,
                value,
            } => Some((event_type, code, value)),
            _ => None,
        }
    }
}

/// Reasons a console line could not be parsed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConsoleError<'a> {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}` (try `help`)")]
    UnknownCommand(&'a str),
    #[error("`{command}` expects {expected}")]
    BadArgument {
        command: &'static str,
        expected: &'static str,
    },
    #[error("unexpected input `{0}`")]
    TrailingInput(&'a str),
}

#[derive(Copy, Clone)]
enum Keyword {
    Tone,
    Bell,
    Raw,
    Init,
    Suspend,
    Shutdown,
    Remove,
    Status,
    Help,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("tone", Keyword::Tone),
    ("bell", Keyword::Bell),
    ("raw", Keyword::Raw),
    ("init", Keyword::Init),
    ("suspend", Keyword::Suspend),
    ("shutdown", Keyword::Shutdown),
    ("remove", Keyword::Remove),
    ("status", Keyword::Status),
    ("help", Keyword::Help),
];

impl Keyword {
    fn lookup(word: &str) -> Option<Self> {
        KEYWORDS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(word))
            .map(|(_, keyword)| *keyword)
    }
}

/// Parses a single console line.
pub fn parse(line: &str) -> Result<ConsoleCommand<'_>, ConsoleError<'_>> {
    let mut input = line.trim();
    let Ok(name) = word.parse_next(&mut input) else {
        return Err(ConsoleError::Empty);
    };
    let keyword = Keyword::lookup(name).ok_or(ConsoleError::UnknownCommand(name))?;

    let command = match keyword {
        Keyword::Tone => {
            let value = argument(&mut input, signed, "tone", "a frequency in Hz")?;
            ConsoleCommand::Tone(value)
        }
        Keyword::Bell => {
            let value = argument(&mut input, bell_value, "bell", "on, off or a value")?;
            ConsoleCommand::Bell(value)
        }
        Keyword::Raw => {
            const EXPECTED: &str = "<type> <code> <value>";
            let event_type = argument(&mut input, unsigned, "raw", EXPECTED)?;
            let code = argument(&mut input, unsigned, "raw", EXPECTED)?;
            let value = argument(&mut input, signed, "raw", EXPECTED)?;
            ConsoleCommand::Raw {
                event_type,
                code,
                value,
            }
        }
        Keyword::Init => ConsoleCommand::Init,
        Keyword::Suspend => ConsoleCommand::Suspend,
        Keyword::Shutdown => ConsoleCommand::Shutdown,
        Keyword::Remove => ConsoleCommand::Remove,
        Keyword::Status => ConsoleCommand::Status,
        Keyword::Help => {
            let topic = argument(&mut input, help_topic, "help", "an optional command")?;
            ConsoleCommand::Help(topic)
        }
    };

    let rest = input.trim_start();
    if rest.is_empty() {
        Ok(command)
    } else {
        Err(ConsoleError::TrailingInput(rest))
    }
}

fn argument<'a, O>(
    input: &mut &'a str,
    mut parser: impl FnMut(&mut &'a str) -> ModalResult<O>,
    command: &'static str,
    expected: &'static str,
) -> Result<O, ConsoleError<'a>> {
    parser(input).map_err(|_| ConsoleError::BadArgument { command, expected })
}

fn word<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| !c.is_ascii_whitespace()).parse_next(input)
}

fn signed(input: &mut &str) -> ModalResult<i32> {
    preceded(space1, dec_int).parse_next(input)
}

fn unsigned(input: &mut &str) -> ModalResult<u16> {
    preceded(
        space1,
        alt((preceded(alt(("0x", "0X")), hex_uint), dec_uint)),
    )
    .parse_next(input)
}

fn bell_value(input: &mut &str) -> ModalResult<i32> {
    opt(preceded(
        space1,
        alt((
            literal(Caseless("off")).value(0),
            literal(Caseless("on")).value(1),
            dec_int,
        )),
    ))
    .map(|value| value.unwrap_or(1))
    .parse_next(input)
}

fn help_topic<'a>(input: &mut &'a str) -> ModalResult<Option<&'a str>> {
    opt(preceded(space1, word)).parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_event_commands() {
        assert_eq!(parse("tone 500"), Ok(ConsoleCommand::Tone(500)));
        assert_eq!(parse("  TONE   0  "), Ok(ConsoleCommand::Tone(0)));
        assert_eq!(parse("tone -5"), Ok(ConsoleCommand::Tone(-5)));
        assert_eq!(parse("bell"), Ok(ConsoleCommand::Bell(1)));
        assert_eq!(parse("bell On"), Ok(ConsoleCommand::Bell(1)));
        assert_eq!(parse("bell off"), Ok(ConsoleCommand::Bell(0)));
        assert_eq!(parse("bell 7"), Ok(ConsoleCommand::Bell(7)));
    }

    #[test]
    fn parses_raw_with_hex_or_decimal() {
        assert_eq!(
            parse("raw 0x12 2 440"),
            Ok(ConsoleCommand::Raw {
                event_type: 0x12,
                code: 2,
                value: 440
            })
        );
        assert_eq!(
            parse("raw 18 0X01 1")
                .expect("valid raw")
                .raw_event(),
            Some((EV_SND, SND_BELL, 1))
        );
    }

    #[test]
    fn parses_lifecycle_and_help() {
        assert_eq!(parse("init"), Ok(ConsoleCommand::Init));
        assert_eq!(parse("Suspend"), Ok(ConsoleCommand::Suspend));
        assert_eq!(parse("shutdown"), Ok(ConsoleCommand::Shutdown));
        assert_eq!(parse("remove"), Ok(ConsoleCommand::Remove));
        assert_eq!(parse("status"), Ok(ConsoleCommand::Status));
        assert_eq!(parse("help"), Ok(ConsoleCommand::Help(None)));
        assert_eq!(parse("help tone"), Ok(ConsoleCommand::Help(Some("tone"))));
        assert_eq!(ConsoleCommand::Status.raw_event(), None);
    }

    #[test]
    fn reports_errors() {
        assert_eq!(parse("   "), Err(ConsoleError::Empty));
        assert_eq!(parse("beep 5"), Err(ConsoleError::UnknownCommand("beep")));
        assert_eq!(
            parse("tone"),
            Err(ConsoleError::BadArgument {
                command: "tone",
                expected: "a frequency in Hz"
            })
        );
        assert!(matches!(
            parse("raw 0x12 2"),
            Err(ConsoleError::BadArgument { command: "raw", .. })
        ));
        assert_eq!(parse("tone 500hz"), Err(ConsoleError::TrailingInput("hz")));
        assert_eq!(parse("status now"), Err(ConsoleError::TrailingInput("now")));
        assert_eq!(parse("bell loud"), Err(ConsoleError::TrailingInput("loud")));
    }

    #[test]
    fn tone_keeps_out_of_range_values_for_the_device() {
        assert_eq!(
            parse("tone 40000").map(|cmd| cmd.raw_event()),
            Ok(Some((EV_SND, SND_TONE, 40_000)))
        );
    }
}
