//! Wire vocabulary shared by the maze server and its clients.
//!
//! Everything that crosses the socket lives here: protocol constants, the
//! line-protocol [`Command`] set, the JSON snapshot records returned by
//! `get_game_state`, and the request bodies of the HTTP variant.

pub mod command;

pub use command::{Command, CommandError};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_PORT: u16 = 55556;
pub const MAZE_WIDTH: usize = 21;
pub const MAZE_HEIGHT: usize = 15;
pub const CELL_SIZE: i64 = 30;
/// Hitbox radius in pixels; the avatar is `2 * PLAYER_RADIUS` wide.
pub const PLAYER_RADIUS: i64 = 14;
pub const WIN_BONUS: u32 = 100;
pub const MIN_COLLECTIBLES: usize = 5;
pub const MAX_COLLECTIBLES: usize = 8;
pub const DEFAULT_PLAYER_NAME: &str = "Unknown";

/// Red, green, blue, yellow, magenta, cyan. Assigned in join order.
pub const PLAYER_COLORS: [[u8; 3]; 6] = [
    [255, 100, 100],
    [100, 255, 100],
    [100, 100, 255],
    [255, 255, 100],
    [255, 100, 255],
    [100, 255, 255],
];

pub const LINE_TERMINATOR: &[u8] = b"\r\n";
pub const RESPONSE_TERMINATOR: &[u8] = b"\r\n\r\n";

pub const STATUS_OK: &str = "OK";
pub const STATUS_ERROR: &str = "ERROR";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CollectibleKind {
    Coin,
    Gem,
    Star,
}

impl CollectibleKind {
    pub const ALL: [CollectibleKind; 3] = [
        CollectibleKind::Coin,
        CollectibleKind::Gem,
        CollectibleKind::Star,
    ];

    pub fn value(self) -> u32 {
        match self {
            CollectibleKind::Coin => 10,
            CollectibleKind::Gem => 25,
            CollectibleKind::Star => 50,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Collectible {
    pub x: usize,
    pub y: usize,
    #[serde(rename = "type")]
    pub kind: CollectibleKind,
    pub collected: bool,
    pub value: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected_by: Option<String>,
}

impl Collectible {
    pub fn new(x: usize, y: usize, kind: CollectibleKind) -> Self {
        Self {
            x,
            y,
            kind,
            collected: false,
            value: kind.value(),
            collected_by: None,
        }
    }
}

/// Pixel position of a player's top-left hitbox corner.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

impl Position {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Grid cell containing this pixel, using floor division.
    pub fn cell(&self, cell_size: i64) -> (i64, i64) {
        (self.x.div_euclid(cell_size), self.y.div_euclid(cell_size))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerInfo {
    pub name: String,
    pub color: [u8; 3],
    /// Base64-encoded PNG.
    pub avatar: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct PlayerStats {
    pub score: u32,
    pub wins: u32,
    pub games_played: u32,
    pub collectibles_collected: u32,
    pub total_moves: u64,
    /// Seconds since the Unix epoch.
    pub join_time: f64,
}

/// Full game state as returned by `get_game_state` and `GET /api/gamestate`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GameSnapshot {
    /// Row-major grid, `1` for wall and `0` for path.
    pub maze: Vec<Vec<u8>>,
    pub maze_width: usize,
    pub maze_height: usize,
    pub cell_size: i64,
    pub players: BTreeMap<String, Position>,
    pub player_info: BTreeMap<String, PlayerInfo>,
    pub player_stats: BTreeMap<String, PlayerStats>,
    pub collectibles: Vec<Collectible>,
    pub start_pos: (usize, usize),
    pub end_pos: (usize, usize),
    pub winner: Option<String>,
    pub round_number: u32,
    /// Whole seconds elapsed since the round started.
    pub game_time: u64,
}

impl GameSnapshot {
    pub fn is_path(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 {
            return false;
        }
        self.maze
            .get(y as usize)
            .and_then(|row| row.get(x as usize))
            .map(|cell| *cell == 0)
            .unwrap_or(false)
    }
}

/// Body of `POST /api/player/add`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AddPlayerRequest {
    pub player_id: String,
    #[serde(default)]
    pub player_name: Option<String>,
}

/// Body of `POST /api/player/move`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MovePlayerRequest {
    pub player_id: String,
    pub x: i64,
    pub y: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn sample_snapshot() -> GameSnapshot {
        let mut players = BTreeMap::new();
        players.insert("1".to_string(), Position::new(30, 30));
        let mut player_info = BTreeMap::new();
        player_info.insert(
            "1".to_string(),
            PlayerInfo {
                name: "Alice".to_string(),
                color: PLAYER_COLORS[0],
                avatar: "AAAA".to_string(),
            },
        );
        let mut player_stats = BTreeMap::new();
        player_stats.insert("1".to_string(), PlayerStats::default());

        GameSnapshot {
            maze: vec![vec![1, 1, 1], vec![1, 0, 1], vec![1, 1, 1]],
            maze_width: 3,
            maze_height: 3,
            cell_size: CELL_SIZE,
            players,
            player_info,
            player_stats,
            collectibles: vec![Collectible::new(1, 1, CollectibleKind::Gem)],
            start_pos: (1, 1),
            end_pos: (1, 1),
            winner: None,
            round_number: 1,
            game_time: 0,
        }
    }

    #[test]
    fn test_collectible_values() {
        assert_eq!(CollectibleKind::Coin.value(), 10);
        assert_eq!(CollectibleKind::Gem.value(), 25);
        assert_eq!(CollectibleKind::Star.value(), 50);
    }

    #[test]
    fn test_collectible_serializes_type_field() {
        let value = serde_json::to_value(Collectible::new(3, 4, CollectibleKind::Star)).unwrap();
        assert_eq!(
            value,
            json!({"x": 3, "y": 4, "type": "star", "collected": false, "value": 50})
        );
    }

    #[test]
    fn test_collected_by_is_emitted_once_claimed() {
        let mut item = Collectible::new(3, 4, CollectibleKind::Coin);
        item.collected = true;
        item.collected_by = Some("p1".to_string());
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["collected_by"], "p1");
    }

    #[test]
    fn test_snapshot_json_shape() {
        let value = serde_json::to_value(sample_snapshot()).unwrap();

        assert_eq!(value["maze"][1][1], 0);
        assert_eq!(value["start_pos"], json!([1, 1]));
        assert_eq!(value["end_pos"], json!([1, 1]));
        assert_eq!(value["winner"], Value::Null);
        assert_eq!(value["players"]["1"], json!({"x": 30, "y": 30}));
        assert_eq!(value["player_info"]["1"]["color"], json!([255, 100, 100]));
        assert_eq!(value["player_stats"]["1"]["score"], 0);
        assert_eq!(value["collectibles"][0]["type"], "gem");
    }

    #[test]
    fn test_snapshot_deserializes_from_wire() {
        let text = serde_json::to_string(&sample_snapshot()).unwrap();
        let parsed: GameSnapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.players["1"], Position::new(30, 30));
        assert_eq!(parsed.player_info["1"].name, "Alice");
    }

    #[test]
    fn test_snapshot_is_path() {
        let snapshot = sample_snapshot();
        assert!(snapshot.is_path(1, 1));
        assert!(!snapshot.is_path(0, 1));
        assert!(!snapshot.is_path(-1, 1));
        assert!(!snapshot.is_path(5, 1));
    }

    #[test]
    fn test_position_cell_floors_negative_pixels() {
        assert_eq!(Position::new(59, 30).cell(30), (1, 1));
        assert_eq!(Position::new(-1, 0).cell(30), (-1, 0));
    }

    #[test]
    fn test_add_player_request_name_is_optional() {
        let body: AddPlayerRequest = serde_json::from_str(r#"{"player_id": "7"}"#).unwrap();
        assert_eq!(body.player_id, "7");
        assert!(body.player_name.is_none());
    }
}
