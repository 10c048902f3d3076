//! # Maze Game Client Library
//!
//! Headless client for the maze server. It speaks both wire formats the
//! server accepts and carries a small path planner for automated play.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! One request per connection, as the server expects:
//! - line protocol: `command args\r\n` out, JSON plus `\r\n\r\n` back
//! - HTTP/1.0: JSON bodies under `/api/...`
//! - `"status": "ERROR"` replies surface as [`network::ClientError::Server`]
//!
//! ### Game Module (`game`)
//! Works on a fetched [`shared::GameSnapshot`]:
//! - breadth-first route from the player's cell to the exit
//! - cell/pixel conversions matching the server's hitbox rules
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::{MazeClient, Transport};
//! use std::time::Duration;
//!
//! # async fn demo() -> Result<(), client::network::ClientError> {
//! let client = MazeClient::new("127.0.0.1:55556", Transport::Line, Duration::from_secs(5));
//! client.add_player("1", Some("Ada")).await?;
//!
//! let snapshot = client.get_game_state().await?;
//! if let Some(step) = client::game::next_step(&snapshot, "1") {
//!     client.set_location("1", step.x, step.y).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod game;
pub mod network;
