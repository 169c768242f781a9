use crate::consts::{CMD_CLOSE, CMD_OPEN};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Commands accepted over the serial line.
#[derive(Eq, PartialEq, Clone, Copy, Debug)]
pub enum Command {
    /// `ABRIR`
    Open,
    /// `FECHAR`
    Close,
}

/// Line did not match any known command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid command: {0:?}")]
pub struct InvalidCommand(pub String);

impl Command {
    /// Exact, case-sensitive match. Caller trims.
    pub fn parse(line: &str) -> Result<Self, InvalidCommand> {
        match line {
            CMD_OPEN => Ok(Command::Open),
            CMD_CLOSE => Ok(Command::Close),
            other => Err(InvalidCommand(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Open => CMD_OPEN,
            Command::Close => CMD_CLOSE,
        }
    }
}

impl FromStr for Command {
    type Err = InvalidCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
