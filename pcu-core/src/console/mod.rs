//! Line grammar for the sequencer debug console.
//!
//! Each line holds one command keyword and at most one argument. Keywords and
//! the `on`/`off` rail argument are case-insensitive; surrounding whitespace is
//! ignored.

use core::fmt;

use winnow::ascii::{dec_uint, space0, space1};
use winnow::combinator::{opt, preceded};
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::token::take_while;

/// Largest tick count accepted by `tick` and `hold`.
pub const MAX_TICKS_PER_COMMAND: u32 = 1_000_000;

/// Command keywords understood by the console.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CommandKeyword {
    Tick,
    Press,
    Release,
    Hold,
    Rail,
    Status,
    History,
    PowerCycle,
    Help,
}

impl CommandKeyword {
    /// Every keyword, in the order help lists them.
    pub const ALL: [CommandKeyword; 9] = [
        CommandKeyword::Tick,
        CommandKeyword::Press,
        CommandKeyword::Release,
        CommandKeyword::Hold,
        CommandKeyword::Rail,
        CommandKeyword::Status,
        CommandKeyword::History,
        CommandKeyword::PowerCycle,
        CommandKeyword::Help,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            CommandKeyword::Tick => "tick",
            CommandKeyword::Press => "press",
            CommandKeyword::Release => "release",
            CommandKeyword::Hold => "hold",
            CommandKeyword::Rail => "rail",
            CommandKeyword::Status => "status",
            CommandKeyword::History => "history",
            CommandKeyword::PowerCycle => "power-cycle",
            CommandKeyword::Help => "help",
        }
    }

    /// Argument synopsis shown by `help`.
    #[must_use]
    pub const fn usage(self) -> &'static str {
        match self {
            CommandKeyword::Tick => "tick [n]",
            CommandKeyword::Press => "press",
            CommandKeyword::Release => "release",
            CommandKeyword::Hold => "hold <n>",
            CommandKeyword::Rail => "rail on|off",
            CommandKeyword::Status => "status",
            CommandKeyword::History => "history",
            CommandKeyword::PowerCycle => "power-cycle",
            CommandKeyword::Help => "help [topic]",
        }
    }

    /// One-line description shown by `help`.
    #[must_use]
    pub const fn summary(self) -> &'static str {
        match self {
            CommandKeyword::Tick => "advance the sequencer by n ticks (default 1)",
            CommandKeyword::Press => "hold the pushbutton down",
            CommandKeyword::Release => "release the pushbutton",
            CommandKeyword::Hold => "press, advance n ticks, then release",
            CommandKeyword::Rail => "set whether the downstream rail is present",
            CommandKeyword::Status => "report mode, inputs and outputs",
            CommandKeyword::History => "dump the telemetry ring, oldest first",
            CommandKeyword::PowerCycle => "drop supply and reboot from the stored intent",
            CommandKeyword::Help => "list commands or describe one",
        }
    }

    /// Matches a keyword case-insensitively.
    #[must_use]
    pub fn from_word(word: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|keyword| keyword.as_str().eq_ignore_ascii_case(word))
    }
}

impl fmt::Display for CommandKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed console command.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConsoleCommand {
    Tick(u32),
    Press,
    Release,
    Hold(u32),
    /// `true` when the rail is present.
    Rail(bool),
    Status,
    History,
    PowerCycle,
    Help(Option<CommandKeyword>),
}

/// Reasons a console line was rejected.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ParseError {
    Empty,
    UnknownCommand,
    MissingArgument(CommandKeyword),
    InvalidArgument(CommandKeyword),
    UnexpectedArgument(CommandKeyword),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Empty => f.write_str("empty line"),
            ParseError::UnknownCommand => f.write_str("unknown command, try `help`"),
            ParseError::MissingArgument(keyword) => {
                write!(f, "missing argument, usage: {}", keyword.usage())
            }
            ParseError::InvalidArgument(keyword) => {
                write!(f, "invalid argument, usage: {}", keyword.usage())
            }
            ParseError::UnexpectedArgument(keyword) => {
                write!(f, "unexpected argument, usage: {}", keyword.usage())
            }
        }
    }
}

/// Parses one console line.
///
/// # Errors
///
/// Returns a [`ParseError`] describing why the line was rejected.
pub fn parse(line: &str) -> Result<ConsoleCommand, ParseError> {
    let (word, argument, rest) = split_line
        .parse(line)
        .map_err(|_| ParseError::UnknownCommand)?;

    let Some(word) = word else {
        return Err(ParseError::Empty);
    };
    let keyword = CommandKeyword::from_word(word).ok_or(ParseError::UnknownCommand)?;

    if !rest.is_empty() {
        return Err(ParseError::UnexpectedArgument(keyword));
    }

    match keyword {
        CommandKeyword::Tick => match argument {
            Some(argument) => tick_count(argument)
                .map(ConsoleCommand::Tick)
                .ok_or(ParseError::InvalidArgument(keyword)),
            None => Ok(ConsoleCommand::Tick(1)),
        },
        CommandKeyword::Hold => {
            let argument = argument.ok_or(ParseError::MissingArgument(keyword))?;
            tick_count(argument)
                .map(ConsoleCommand::Hold)
                .ok_or(ParseError::InvalidArgument(keyword))
        }
        CommandKeyword::Rail => {
            let argument = argument.ok_or(ParseError::MissingArgument(keyword))?;
            if argument.eq_ignore_ascii_case("on") {
                Ok(ConsoleCommand::Rail(true))
            } else if argument.eq_ignore_ascii_case("off") {
                Ok(ConsoleCommand::Rail(false))
            } else {
                Err(ParseError::InvalidArgument(keyword))
            }
        }
        CommandKeyword::Help => match argument {
            Some(topic) => CommandKeyword::from_word(topic)
                .map(|topic| ConsoleCommand::Help(Some(topic)))
                .ok_or(ParseError::InvalidArgument(keyword)),
            None => Ok(ConsoleCommand::Help(None)),
        },
        CommandKeyword::Press => bare(keyword, argument, ConsoleCommand::Press),
        CommandKeyword::Release => bare(keyword, argument, ConsoleCommand::Release),
        CommandKeyword::Status => bare(keyword, argument, ConsoleCommand::Status),
        CommandKeyword::History => bare(keyword, argument, ConsoleCommand::History),
        CommandKeyword::PowerCycle => bare(keyword, argument, ConsoleCommand::PowerCycle),
    }
}

fn bare(
    keyword: CommandKeyword,
    argument: Option<&str>,
    command: ConsoleCommand,
) -> Result<ConsoleCommand, ParseError> {
    match argument {
        Some(_) => Err(ParseError::UnexpectedArgument(keyword)),
        None => Ok(command),
    }
}

type SplitLine<'a> = (Option<&'a str>, Option<&'a str>, &'a str);

/// Splits a line into keyword, first argument and whatever follows.
fn split_line<'a>(input: &mut &'a str) -> Result<SplitLine<'a>, ContextError> {
    space0.parse_next(input)?;
    let word = opt(token).parse_next(input)?;
    let argument = opt(preceded(space1, token)).parse_next(input)?;
    space0.parse_next(input)?;
    let rest = core::mem::take(input);
    Ok((word, argument, rest.trim_end()))
}

fn token<'a>(input: &mut &'a str) -> Result<&'a str, ContextError> {
    take_while(1.., |c: char| !c.is_whitespace()).parse_next(input)
}

fn tick_count(argument: &str) -> Option<u32> {
    dec_uint::<_, u32, ContextError>
        .parse(argument)
        .ok()
        .filter(|count| (1..=MAX_TICKS_PER_COMMAND).contains(count))
}
