//! Error taxonomy for request handling.
//!
//! Every failure the router can hit is one of these variants. The `Display`
//! text is what the client sees in `{"status": "ERROR", "message": ...}`.

use shared::CommandError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Malformed request line, headers or body framing
    #[error("{0}")]
    Protocol(String),
    #[error("Unknown command")]
    UnknownCommand(String),
    #[error("Not Found")]
    UnknownRoute(String),
    /// Missing field, bad number, rejected move
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl ServerError {
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::Protocol(_) | ServerError::Validation(_) => 400,
            ServerError::UnknownCommand(_)
            | ServerError::UnknownRoute(_)
            | ServerError::NotFound(_) => 404,
            ServerError::Internal(_) => 500,
        }
    }

    pub fn player_not_found() -> Self {
        ServerError::NotFound("Player not found".to_string())
    }
}

impl From<CommandError> for ServerError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Unknown(name) => ServerError::UnknownCommand(name),
            CommandError::Empty => ServerError::Protocol(err.to_string()),
            CommandError::MissingArgument(_) | CommandError::InvalidNumber(_) => {
                ServerError::Validation(err.to_string())
            }
        }
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::Internal(format!("Serialization failed: {}", err))
    }
}
