//! Parser for the host console driving the repeater emulator.
//!
//! Lines are parsed into structured [`Command`] values with `winnow`
//! combinators over the raw line. Keywords are case-insensitive; arguments
//! keep their original spelling so errors can point back at the offending
//! text.

use core::fmt;

use winnow::ascii::dec_uint;
use winnow::combinator::{alt, opt};
use winnow::prelude::*;
use winnow::token::take_while;

use crate::lifecycle::{Tick, ticks_from_millis};

/// Structured console commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command<'a> {
    /// Print the controller state, flag, and schedule.
    Status,
    /// Toggle the persisted permanent-standby flag.
    Standby(bool),
    /// Request an explicit wake.
    Wake,
    /// Inject a tap command with the given tap count.
    Tap(u8),
    /// Advance the simulated clock by the given number of ticks.
    Run(Tick),
    /// Toggle the live transmit/receive session.
    Session(bool),
    /// Print usage, optionally for one topic.
    Help(Option<&'a str>),
}

/// Errors produced while parsing a console line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseError<'a> {
    /// The line contained no command word.
    Empty,
    /// The command word is not part of the grammar.
    UnknownCommand(&'a str),
    /// A required argument was missing.
    MissingArgument(&'static str),
    /// An argument was present but malformed.
    InvalidArgument {
        expected: &'static str,
        found: &'a str,
    },
    /// Input remained after a complete command.
    TrailingInput(&'a str),
}

impl<'a> fmt::Display for ParseError<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Empty => f.write_str("empty command line"),
            ParseError::UnknownCommand(word) => write!(f, "unknown command `{word}`"),
            ParseError::MissingArgument(expected) => {
                write!(f, "missing argument, expected {expected}")
            }
            ParseError::InvalidArgument { expected, found } => {
                write!(f, "expected {expected}, found `{found}`")
            }
            ParseError::TrailingInput(rest) => write!(f, "unexpected trailing input `{rest}`"),
        }
    }
}

/// Parses one console line into a [`Command`].
pub fn parse(line: &str) -> Result<Command<'_>, ParseError<'_>> {
    let mut input = line;
    let Some(keyword) = next_word(&mut input) else {
        return Err(ParseError::Empty);
    };

    let command = if keyword.eq_ignore_ascii_case("status") {
        Command::Status
    } else if keyword.eq_ignore_ascii_case("standby") {
        Command::Standby(switch_argument(&mut input)?)
    } else if keyword.eq_ignore_ascii_case("wake") {
        Command::Wake
    } else if keyword.eq_ignore_ascii_case("tap") {
        Command::Tap(tap_argument(&mut input)?)
    } else if keyword.eq_ignore_ascii_case("run") {
        Command::Run(span_argument(&mut input)?)
    } else if keyword.eq_ignore_ascii_case("session") {
        Command::Session(switch_argument(&mut input)?)
    } else if keyword.eq_ignore_ascii_case("help") {
        Command::Help(next_word(&mut input))
    } else {
        return Err(ParseError::UnknownCommand(keyword));
    };

    let rest = input.trim_matches([' ', '\t']);
    if rest.is_empty() {
        Ok(command)
    } else {
        Err(ParseError::TrailingInput(rest))
    }
}

/// One whitespace-delimited word of a console line.
fn word<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    let _ = take_while(0.., [' ', '\t']).parse_next(input)?;
    take_while(1.., |c: char| c.is_ascii_alphanumeric()).parse_next(input)
}

fn next_word<'i>(input: &mut &'i str) -> Option<&'i str> {
    word.parse_next(input).ok()
}

fn switch_argument<'a>(input: &mut &'a str) -> Result<bool, ParseError<'a>> {
    let Some(argument) = next_word(input) else {
        return Err(ParseError::MissingArgument("`on` or `off`"));
    };
    if argument.eq_ignore_ascii_case("on") {
        Ok(true)
    } else if argument.eq_ignore_ascii_case("off") {
        Ok(false)
    } else {
        Err(ParseError::InvalidArgument {
            expected: "`on` or `off`",
            found: argument,
        })
    }
}

fn tap_argument<'a>(input: &mut &'a str) -> Result<u8, ParseError<'a>> {
    let Some(argument) = next_word(input) else {
        return Err(ParseError::MissingArgument("a tap count"));
    };
    dec_uint::<_, u8, winnow::error::ContextError>
        .parse(argument)
        .map_err(|_| ParseError::InvalidArgument {
            expected: "a tap count",
            found: argument,
        })
}

/// Time span in ticks. A bare integer counts ticks; `s` and `ms` suffixes
/// convert from wall-clock time at the 10 ms tick period.
fn span_argument<'a>(input: &mut &'a str) -> Result<Tick, ParseError<'a>> {
    let Some(argument) = next_word(input) else {
        return Err(ParseError::MissingArgument("a duration"));
    };
    span_ticks
        .parse(argument)
        .map_err(|_| ParseError::InvalidArgument {
            expected: "a duration such as `500`, `5s`, or `250ms`",
            found: argument,
        })
}

fn span_ticks(input: &mut &str) -> ModalResult<Tick> {
    let value: u64 = dec_uint.parse_next(input)?;
    let unit = opt(alt(("ms", "s"))).parse_next(input)?;
    let ticks = match unit {
        None => value,
        Some("ms") => ticks_from_millis(value),
        Some(_) => ticks_from_millis(value.saturating_mul(1_000)),
    };
    Ok(ticks)
}
