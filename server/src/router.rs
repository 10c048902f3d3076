//! Maps requests from either protocol onto exactly one game operation.
//!
//! Both front ends funnel into [`CommandRouter::execute`], which takes the
//! lock once, performs the operation and builds the `{"status": "OK", ...}`
//! reply. Failures come back as [`ServerError`] and are turned into
//! `{"status": "ERROR", "message": ...}` here, so nothing escapes to the
//! connection task.

use crate::error::ServerError;
use crate::game::{MoveRejection, SharedGameState};
use crate::http::{serve_static, HttpRequest, HttpResponse};
use log::{debug, error, warn};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use shared::{
    AddPlayerRequest, Command, MovePlayerRequest, DEFAULT_PLAYER_NAME, STATUS_ERROR, STATUS_OK,
};
use std::path::PathBuf;

#[derive(Clone)]
pub struct CommandRouter {
    game: SharedGameState,
    static_dir: PathBuf,
}

fn ok_reply(fields: Value) -> Value {
    let mut reply = match fields {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    reply.insert("status".to_string(), Value::from(STATUS_OK));
    Value::Object(reply)
}

fn ok_message(message: &str) -> Value {
    ok_reply(json!({ "message": message }))
}

/// `{"status": "ERROR", "message": ...}` for any error
pub fn error_reply(err: &ServerError) -> Value {
    json!({ "status": STATUS_ERROR, "message": err.to_string() })
}

fn log_failure(context: &str, err: &ServerError) {
    match err {
        ServerError::Internal(_) => {
            error!("{} failed: {}", context, err)
        }
        ServerError::Protocol(_) | ServerError::UnknownCommand(_) => {
            warn!("{} rejected: {}", context, err)
        }
        _ => debug!("{} rejected: {}", context, err),
    }
}

impl CommandRouter {
    pub fn new(game: SharedGameState, static_dir: PathBuf) -> Self {
        Self { game, static_dir }
    }

    pub fn game(&self) -> &SharedGameState {
        &self.game
    }

    /// Runs one command under the game lock and returns the success reply
    pub async fn execute(&self, command: Command) -> Result<Value, ServerError> {
        debug!("Executing {}", command.name());

        match command {
            Command::AddPlayer { id, name } => {
                let name = name.unwrap_or_else(|| DEFAULT_PLAYER_NAME.to_string());
                self.game.write().await.add_player(&id, &name);
                Ok(ok_message("Player added"))
            }
            Command::GetPlayersFace { id } => {
                let game = self.game.read().await;
                let face = game.face(&id).ok_or_else(ServerError::player_not_found)?;
                Ok(ok_reply(json!({ "face": face })))
            }
            Command::GetAllPlayers => {
                let players = self.game.read().await.player_ids();
                Ok(ok_reply(json!({ "players": players })))
            }
            Command::SetLocation { id, x, y } => {
                let outcome = self.game.write().await.try_move(&id, x, y);
                match outcome {
                    Ok(_) => Ok(ok_message("Position updated")),
                    Err(MoveRejection::InvalidPosition) => {
                        Err(ServerError::Validation("Invalid position".to_string()))
                    }
                    Err(MoveRejection::UnknownPlayer) => {
                        Err(ServerError::Validation("Player not found".to_string()))
                    }
                }
            }
            Command::GetLocation { id } => {
                let position = self
                    .game
                    .read()
                    .await
                    .get_location(&id)
                    .ok_or_else(ServerError::player_not_found)?;
                Ok(ok_reply(
                    json!({ "location": format!("{},{}", position.x, position.y) }),
                ))
            }
            Command::GetGameState => {
                // The snapshot is an owned copy, so serialize after unlocking.
                let snapshot = self.game.read().await.snapshot();
                let game_state = serde_json::to_value(&snapshot)?;
                Ok(ok_reply(json!({ "game_state": game_state })))
            }
            Command::ResetGame => {
                self.game.write().await.reset_game();
                Ok(ok_message("Game reset"))
            }
        }
    }

    /// Handles one line-protocol request. Always produces a reply.
    pub async fn handle_line(&self, line: &str) -> Value {
        let result = match Command::parse(line) {
            Ok(command) => self.execute(command).await,
            Err(e) => Err(ServerError::from(e)),
        };

        match result {
            Ok(reply) => reply,
            Err(e) => {
                log_failure("Command", &e);
                error_reply(&e)
            }
        }
    }

    /// Handles one HTTP request. Always produces a response.
    pub async fn handle_http(&self, request: &HttpRequest) -> HttpResponse {
        debug!("{} {}", request.method, request.path);

        match (request.method.as_str(), request.path.as_str()) {
            ("OPTIONS", _) => return HttpResponse::text(200, ""),
            ("GET", "/") => return HttpResponse::text(200, "Maze Game HTTP Server"),
            ("GET", "/status") => return HttpResponse::text(200, "Server is running"),
            ("GET", path) if !path.starts_with("/api/") => {
                return serve_static(&self.static_dir, path).await;
            }
            ("GET", _) | ("POST", _) => {}
            (method, _) => {
                warn!("Unsupported method {}", method);
                return HttpResponse::text(400, "Bad Request");
            }
        }

        match self.route_api(request).await {
            Ok(reply) => HttpResponse::json(200, &reply),
            Err(e) => {
                log_failure(&format!("{} {}", request.method, request.path), &e);
                HttpResponse::from_error(&e)
            }
        }
    }

    async fn route_api(&self, request: &HttpRequest) -> Result<Value, ServerError> {
        let command = match (request.method.as_str(), request.path.as_str()) {
            ("GET", "/api/status") => return Ok(ok_reply(json!({}))),
            ("GET", "/api/players") => Command::GetAllPlayers,
            ("GET", "/api/player/face") => Command::GetPlayersFace {
                id: query_id(request)?,
            },
            ("GET", "/api/player/location") => Command::GetLocation {
                id: query_id(request)?,
            },
            ("GET", "/api/gamestate") => Command::GetGameState,
            ("POST", "/api/player/add") => {
                let body: AddPlayerRequest = json_body(request)?;
                Command::AddPlayer {
                    id: body.player_id,
                    name: body.player_name,
                }
            }
            ("POST", "/api/player/move") => {
                let body: MovePlayerRequest = json_body(request)?;
                Command::SetLocation {
                    id: body.player_id,
                    x: body.x,
                    y: body.y,
                }
            }
            ("POST", "/api/game/reset") => Command::ResetGame,
            (_, path) => return Err(ServerError::UnknownRoute(path.to_string())),
        };

        self.execute(command).await
    }
}

fn query_id(request: &HttpRequest) -> Result<String, ServerError> {
    request
        .query_param("id")
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ServerError::Validation("Missing player id".to_string()))
}

fn json_body<T: DeserializeOwned>(request: &HttpRequest) -> Result<T, ServerError> {
    serde_json::from_slice(&request.body)
        .map_err(|e| ServerError::Validation(format!("Invalid request body: {}", e)))
}
