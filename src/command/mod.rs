//! Operator commands.
//!
//! Each command is one text line, e.g. `checkfeed count=5`. [`Command::parse`]
//! turns it into a [`Command`] and [`CommandHandler`] runs it against the
//! engine and returns the reply text.

pub mod handler;
pub mod parser;

pub use handler::{format_cycle, format_status, status_marker, CommandHandler, NOTHING_TO_POST};
pub use parser::{
    format_help, Command, CommandError, DEFAULT_CHECK_COUNT, MAX_CHECK_COUNT, MIN_CHECK_COUNT,
};
