//! # Maze Game Server Library
//!
//! Authoritative server for a small multiplayer maze race. Players join,
//! submit pixel positions, collect items and race to the exit cell; the
//! server validates every move against the maze and keeps score.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative State
//! A single [`game::GameState`] owns the maze, players, stats, collectibles
//! and round bookkeeping. Clients only propose positions; the server decides
//! whether a move is legal and what it earns.
//!
//! ### Request Handling
//! Every TCP connection carries one request and one response. Two wire
//! formats share the port:
//! - a line protocol (`set_location 1 60 30\r\n`, JSON reply ending in
//!   `\r\n\r\n`)
//! - HTTP/1.0 with JSON bodies under `/api/...`
//!
//! ## Architecture Design
//!
//! ### Task Per Connection
//! The listener spawns one tokio task per accepted connection. A failing
//! or stalled connection ends only its own task.
//!
//! ### Coarse Locking
//! The game state sits behind one `tokio::sync::RwLock`. Each operation
//! takes the lock exactly once: writes for joins, moves and resets, reads
//! for snapshots and lookups. Snapshots therefore never observe a
//! half-applied move.
//!
//! ## Module Organization
//!
//! - `maze`: grid type and the depth-first generator
//! - `avatar`: PNG badge rendered from each player's colour and initial
//! - `game`: game state, move validation, scoring and rounds
//! - `router`: maps commands and HTTP routes onto game operations
//! - `http`: HTTP/1.0 parsing, responses and static files
//! - `connection`: framing, protocol detection and timeouts
//! - `network`: the TCP accept loop
//! - `config`, `error`, `utils`: runtime settings, error types, helpers
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::{GameConfig, ServerConfig};
//! use server::game::GameState;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let game = GameState::shared(GameConfig::default());
//!     let server = Server::bind(ServerConfig::default(), game).await?;
//!     server.run().await
//! }
//! ```

pub mod avatar;
pub mod config;
pub mod connection;
pub mod error;
pub mod game;
pub mod http;
pub mod maze;
pub mod network;
pub mod router;
pub mod utils;
