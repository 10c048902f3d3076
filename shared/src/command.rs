//! Line-protocol commands: `COMMAND arg1 arg2 ...\r\n`.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddPlayer { id: String, name: Option<String> },
    GetPlayersFace { id: String },
    GetAllPlayers,
    SetLocation { id: String, x: i64, y: i64 },
    GetLocation { id: String },
    GetGameState,
    ResetGame,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,
    #[error("Unknown command")]
    Unknown(String),
    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
}

impl Command {
    /// Parses one whitespace-delimited command line. Surrounding whitespace,
    /// including the CRLF terminator, is ignored.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut parts = line.split_whitespace();
        let name = parts.next().ok_or(CommandError::Empty)?;

        let command = match name {
            "add_player" => {
                let id = required(&mut parts, "id")?;
                let rest: Vec<&str> = parts.collect();
                let name = if rest.is_empty() {
                    None
                } else {
                    Some(rest.join(" "))
                };
                Command::AddPlayer { id, name }
            }
            "get_players_face" => Command::GetPlayersFace {
                id: required(&mut parts, "id")?,
            },
            "get_all_players" => Command::GetAllPlayers,
            "set_location" => {
                let id = required(&mut parts, "id")?;
                let x = number(&required(&mut parts, "x")?)?;
                let y = number(&required(&mut parts, "y")?)?;
                Command::SetLocation { id, x, y }
            }
            "get_location" => Command::GetLocation {
                id: required(&mut parts, "id")?,
            },
            "get_game_state" => Command::GetGameState,
            "reset_game" => Command::ResetGame,
            other => return Err(CommandError::Unknown(other.to_string())),
        };

        Ok(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::AddPlayer { .. } => "add_player",
            Command::GetPlayersFace { .. } => "get_players_face",
            Command::GetAllPlayers => "get_all_players",
            Command::SetLocation { .. } => "set_location",
            Command::GetLocation { .. } => "get_location",
            Command::GetGameState => "get_game_state",
            Command::ResetGame => "reset_game",
        }
    }
}

fn required<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
    field: &'static str,
) -> Result<String, CommandError> {
    parts
        .next()
        .map(str::to_string)
        .ok_or(CommandError::MissingArgument(field))
}

fn number(raw: &str) -> Result<i64, CommandError> {
    raw.parse::<i64>()
        .map_err(|_| CommandError::InvalidNumber(raw.to_string()))
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::parse(s)
    }
}

/// Formats the command as it is sent on the wire, without the CRLF.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::AddPlayer { id, name: Some(name) } => {
                write!(f, "{} {} {}", self.name(), id, name)
            }
            Command::AddPlayer { id, name: None }
            | Command::GetPlayersFace { id }
            | Command::GetLocation { id } => write!(f, "{} {}", self.name(), id),
            Command::SetLocation { id, x, y } => write!(f, "{} {} {} {}", self.name(), id, x, y),
            Command::GetAllPlayers | Command::GetGameState | Command::ResetGame => {
                f.write_str(self.name())
            }
        }
    }
}
