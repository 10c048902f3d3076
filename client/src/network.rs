//! Request/response client for both wire formats.
//!
//! Each call opens a fresh TCP connection, sends one request, reads until
//! the server closes and decodes the JSON reply.

use log::debug;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use shared::{Command, GameSnapshot, Position, LINE_TERMINATOR, RESPONSE_TERMINATOR, STATUS_ERROR};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON reply: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no reply within {0:?}")]
    Timeout(Duration),
    /// The server answered with `"status": "ERROR"`
    #[error("server error: {0}")]
    Server(String),
    #[error("protocol error: {0}")]
    Protocol(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Line,
    Http,
}

pub struct MazeClient {
    server: String,
    transport: Transport,
    timeout: Duration,
}

impl MazeClient {
    pub fn new(server: &str, transport: Transport, timeout: Duration) -> Self {
        Self {
            server: server.to_string(),
            transport,
            timeout,
        }
    }

    /// Sends a command and returns the full reply object
    pub async fn execute(&self, command: &Command) -> Result<Value, ClientError> {
        let reply = match self.transport {
            Transport::Line => {
                let mut request = command.to_string().into_bytes();
                request.extend_from_slice(LINE_TERMINATOR);
                let raw = self.round_trip(&request).await?;
                parse_line_reply(&raw)?
            }
            Transport::Http => {
                let (method, path, body) = http_route(command);
                let raw = self.round_trip(&http_request(method, &path, body.as_ref())).await?;
                parse_http_reply(&raw)?.1
            }
        };

        if reply["status"] == STATUS_ERROR {
            let message = reply["message"].as_str().unwrap_or("unknown error");
            return Err(ClientError::Server(message.to_string()));
        }
        Ok(reply)
    }

    pub async fn add_player(&self, id: &str, name: Option<&str>) -> Result<(), ClientError> {
        self.execute(&Command::AddPlayer {
            id: id.to_string(),
            name: name.map(str::to_string),
        })
        .await?;
        Ok(())
    }

    /// Base64 PNG avatar
    pub async fn get_players_face(&self, id: &str) -> Result<String, ClientError> {
        let reply = self
            .execute(&Command::GetPlayersFace { id: id.to_string() })
            .await?;
        field(&reply, "face")
    }

    pub async fn get_all_players(&self) -> Result<Vec<String>, ClientError> {
        let reply = self.execute(&Command::GetAllPlayers).await?;
        field(&reply, "players")
    }

    pub async fn set_location(&self, id: &str, x: i64, y: i64) -> Result<(), ClientError> {
        self.execute(&Command::SetLocation {
            id: id.to_string(),
            x,
            y,
        })
        .await?;
        Ok(())
    }

    pub async fn get_location(&self, id: &str) -> Result<Position, ClientError> {
        let reply = self
            .execute(&Command::GetLocation { id: id.to_string() })
            .await?;
        let raw: String = field(&reply, "location")?;
        parse_location(&raw)
    }

    pub async fn get_game_state(&self) -> Result<GameSnapshot, ClientError> {
        let reply = self.execute(&Command::GetGameState).await?;
        field(&reply, "game_state")
    }

    pub async fn reset_game(&self) -> Result<(), ClientError> {
        self.execute(&Command::ResetGame).await?;
        Ok(())
    }

    /// Round-trip time of the cheapest request the transport offers
    pub async fn ping(&self) -> Result<Duration, ClientError> {
        let started = Instant::now();
        match self.transport {
            Transport::Line => {
                self.execute(&Command::GetAllPlayers).await?;
            }
            Transport::Http => {
                let raw = self.round_trip(&http_request("GET", "/api/status", None)).await?;
                parse_http_reply(&raw)?;
            }
        }
        Ok(started.elapsed())
    }

    async fn round_trip(&self, request: &[u8]) -> Result<Vec<u8>, ClientError> {
        let exchange = async {
            let mut stream = TcpStream::connect(&self.server).await?;
            stream.write_all(request).await?;
            stream.flush().await?;

            let mut response = Vec::new();
            stream.read_to_end(&mut response).await?;
            Ok::<_, std::io::Error>(response)
        };

        let response = timeout(self.timeout, exchange)
            .await
            .map_err(|_| ClientError::Timeout(self.timeout))??;
        debug!("Received {} bytes from {}", response.len(), self.server);
        Ok(response)
    }
}

fn field<T: DeserializeOwned>(reply: &Value, name: &str) -> Result<T, ClientError> {
    let value = reply
        .get(name)
        .cloned()
        .ok_or_else(|| ClientError::Protocol(format!("reply has no `{}` field", name)))?;
    Ok(serde_json::from_value(value)?)
}

/// Parses `"x,y"` as sent by `get_location`
pub fn parse_location(raw: &str) -> Result<Position, ClientError> {
    let invalid = || ClientError::Protocol(format!("bad location `{}`", raw));
    let (x, y) = raw.split_once(',').ok_or_else(invalid)?;
    let x = x.trim().parse().map_err(|_| invalid())?;
    let y = y.trim().parse().map_err(|_| invalid())?;
    Ok(Position::new(x, y))
}

fn parse_line_reply(raw: &[u8]) -> Result<Value, ClientError> {
    let body = raw.strip_suffix(RESPONSE_TERMINATOR).unwrap_or(raw);
    if body.is_empty() {
        return Err(ClientError::Protocol("empty reply".to_string()));
    }
    Ok(serde_json::from_slice(body)?)
}

/// Splits an HTTP response into status code and JSON body
fn parse_http_reply(raw: &[u8]) -> Result<(u16, Value), ClientError> {
    let head_end = raw
        .windows(RESPONSE_TERMINATOR.len())
        .position(|w| w == RESPONSE_TERMINATOR)
        .ok_or_else(|| ClientError::Protocol("missing header terminator".to_string()))?;

    let head = String::from_utf8_lossy(&raw[..head_end]);
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split(' ').nth(1))
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| ClientError::Protocol("bad status line".to_string()))?;

    let body = &raw[head_end + RESPONSE_TERMINATOR.len()..];
    Ok((status, serde_json::from_slice(body)?))
}

fn http_route(command: &Command) -> (&'static str, String, Option<Value>) {
    match command {
        Command::AddPlayer { id, name } => (
            "POST",
            "/api/player/add".to_string(),
            Some(json!({ "player_id": id, "player_name": name })),
        ),
        Command::GetPlayersFace { id } => ("GET", format!("/api/player/face?id={}", encode(id)), None),
        Command::GetAllPlayers => ("GET", "/api/players".to_string(), None),
        Command::SetLocation { id, x, y } => (
            "POST",
            "/api/player/move".to_string(),
            Some(json!({ "player_id": id, "x": x, "y": y })),
        ),
        Command::GetLocation { id } => (
            "GET",
            format!("/api/player/location?id={}", encode(id)),
            None,
        ),
        Command::GetGameState => ("GET", "/api/gamestate".to_string(), None),
        Command::ResetGame => ("POST", "/api/game/reset".to_string(), None),
    }
}

/// Percent-encodes everything outside the unreserved set
fn encode(raw: &str) -> String {
    raw.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            other => format!("%{:02X}", other),
        })
        .collect()
}

fn http_request(method: &str, path: &str, body: Option<&Value>) -> Vec<u8> {
    let body = body.map(Value::to_string).unwrap_or_default();
    let mut request = format!("{} {} HTTP/1.0\r\n", method, path);
    if !body.is_empty() {
        request.push_str("Content-Type: application/json\r\n");
    }
    request.push_str(&format!("Content-Length: {}\r\n\r\n", body.len()));
    request.push_str(&body);
    request.into_bytes()
}
