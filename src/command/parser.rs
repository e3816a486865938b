//! Operator command parser.
//!
//! Commands are single lines such as `checkfeed count=5 header=true`. A
//! leading `/` is accepted so the slash-command spelling works too.

use thiserror::Error;

/// Default number of items shown by `checkfeed`.
pub const DEFAULT_CHECK_COUNT: u32 = 3;
/// Smallest accepted `checkfeed` count.
pub const MIN_CHECK_COUNT: u32 = 1;
/// Largest accepted `checkfeed` count.
pub const MAX_CHECK_COUNT: u32 = 15;

/// Command parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Empty input line.
    #[error("empty command")]
    Empty,

    /// Unknown command name.
    #[error("unknown command: {0}")]
    Unknown(String),

    /// Option not understood by the command.
    #[error("invalid option '{option}' for {command}")]
    InvalidOption {
        /// Command name.
        command: &'static str,
        /// The offending option.
        option: String,
    },

    /// `checkfeed` count outside the accepted range.
    #[error("count must be between {min} and {max}, got {0}", min = MIN_CHECK_COUNT, max = MAX_CHECK_COUNT)]
    CountOutOfRange(i64),
}

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Liveness check.
    Ping,
    /// Gate and schedule status.
    Status,
    /// Show the first items of the feed with their status.
    CheckFeed {
        /// Number of items to show.
        count: u32,
        /// Whether to include the response headers.
        header: bool,
    },
    /// Show the effective configuration.
    CheckConfig,
    /// Post the newest feed item.
    PostLatest,
    /// Post every new feed item.
    PostNew,
    /// List the commands.
    Help,
}

impl Command {
    /// Command name as typed by the operator.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping => "ping",
            Command::Status => "status",
            Command::CheckFeed { .. } => "checkfeed",
            Command::CheckConfig => "checkconfig",
            Command::PostLatest => "postlatest",
            Command::PostNew => "postnew",
            Command::Help => "help",
        }
    }

    /// Parse one input line.
    pub fn parse(input: &str) -> Result<Self, CommandError> {
        let trimmed = input.trim();
        let trimmed = trimmed.strip_prefix('/').unwrap_or(trimmed);

        let mut words = trimmed.split_whitespace();
        let Some(name) = words.next() else {
            return Err(CommandError::Empty);
        };
        let args: Vec<&str> = words.collect();

        let command = match name.to_lowercase().as_str() {
            "ping" => Command::Ping,
            "status" => Command::Status,
            "checkfeed" => return parse_checkfeed(&args),
            "checkconfig" => Command::CheckConfig,
            "postlatest" => Command::PostLatest,
            "postnew" => Command::PostNew,
            "help" | "?" => Command::Help,
            other => return Err(CommandError::Unknown(other.to_string())),
        };

        if let Some(extra) = args.first() {
            return Err(CommandError::InvalidOption {
                command: command.name(),
                option: extra.to_string(),
            });
        }
        Ok(command)
    }
}

fn parse_checkfeed(args: &[&str]) -> Result<Command, CommandError> {
    let mut count = DEFAULT_CHECK_COUNT;
    let mut header = false;

    for arg in args {
        let invalid = || CommandError::InvalidOption {
            command: "checkfeed",
            option: arg.to_string(),
        };
        let (key, value) = arg.split_once('=').ok_or_else(invalid)?;

        match key.to_lowercase().as_str() {
            "count" => {
                let n: i64 = value.parse().map_err(|_| invalid())?;
                if n < i64::from(MIN_CHECK_COUNT) || n > i64::from(MAX_CHECK_COUNT) {
                    return Err(CommandError::CountOutOfRange(n));
                }
                count = n as u32;
            }
            "header" => {
                header = match value.to_lowercase().as_str() {
                    "true" | "yes" | "1" => true,
                    "false" | "no" | "0" => false,
                    _ => return Err(invalid()),
                };
            }
            _ => return Err(invalid()),
        }
    }

    Ok(Command::CheckFeed { count, header })
}

/// Help text listing every command.
pub fn format_help() -> String {
    [
        "ping - check that the bot is alive",
        "status - publish gate and schedule status",
        "checkfeed [count=1..15] [header=true|false] - show the latest feed items",
        "checkconfig - show the configuration",
        "postlatest - post the latest feed item",
        "postnew - post all new feed items",
    ]
    .join("\n")
}
