//! Runtime configuration for the listener and the game rules.

use clap::ValueEnum;
use shared::{CELL_SIZE, DEFAULT_PORT, MAZE_HEIGHT, MAZE_WIDTH, PLAYER_RADIUS};
use std::path::PathBuf;
use std::time::Duration;

/// Smallest maze the generator accepts on either axis.
pub const MIN_MAZE_DIMENSION: usize = 5;
pub const MAX_REQUEST_BYTES: usize = 64 * 1024;
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Which framing a connection is expected to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProtocolMode {
    /// Decide per connection from the first request line
    Auto,
    /// `COMMAND args\r\n` in, JSON plus `\r\n\r\n` out
    Line,
    /// HTTP/1.0 request/response with JSON bodies
    Http,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    pub maze_width: usize,
    pub maze_height: usize,
    pub cell_size: i64,
    /// Fixed seed for reproducible mazes and collectibles
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            maze_width: MAZE_WIDTH,
            maze_height: MAZE_HEIGHT,
            cell_size: CELL_SIZE,
            seed: None,
        }
    }
}

impl GameConfig {
    /// Clamps dimensions to odd values of at least 5 and the cell size to
    /// something a player hitbox can fit inside.
    pub fn normalized(self) -> Self {
        Self {
            maze_width: odd_dimension(self.maze_width),
            maze_height: odd_dimension(self.maze_height),
            cell_size: self.cell_size.max(2 * PLAYER_RADIUS + 1),
            seed: self.seed,
        }
    }
}

/// Rounds up to the nearest odd value no smaller than [`MIN_MAZE_DIMENSION`].
pub fn odd_dimension(value: usize) -> usize {
    let value = value.max(MIN_MAZE_DIMENSION);
    if value % 2 == 0 {
        value + 1
    } else {
        value
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub protocol: ProtocolMode,
    pub read_timeout: Duration,
    pub max_request_bytes: usize,
    /// Directory the HTTP variant serves plain files from
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{}", DEFAULT_PORT),
            protocol: ProtocolMode::Auto,
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_request_bytes: MAX_REQUEST_BYTES,
            static_dir: PathBuf::from("."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_odd_dimension() {
        assert_eq!(odd_dimension(0), 5);
        assert_eq!(odd_dimension(4), 5);
        assert_eq!(odd_dimension(5), 5);
        assert_eq!(odd_dimension(20), 21);
        assert_eq!(odd_dimension(21), 21);
    }

    #[test]
    fn test_normalized_game_config() {
        let config = GameConfig {
            maze_width: 10,
            maze_height: 3,
            cell_size: 8,
            seed: Some(9),
        }
        .normalized();

        assert_eq!(config.maze_width, 11);
        assert_eq!(config.maze_height, 5);
        assert_eq!(config.cell_size, 29);
        assert_eq!(config.seed, Some(9));
    }

    #[test]
    fn test_defaults_match_wire_constants() {
        let config = GameConfig::default();
        assert_eq!(config.clone().normalized(), config);
        assert_eq!(ServerConfig::default().bind_addr, "0.0.0.0:55556");
        assert_eq!(ServerConfig::default().protocol, ProtocolMode::Auto);
    }
}
