//! Authoritative game state.
//!
//! One `GameState` owns the maze, the player registry, per-player stats,
//! the round's collectibles and the round bookkeeping. Every public method
//! is a complete logical operation; callers serialize access by holding the
//! shared lock for the duration of one call, so no method can observe a
//! half-applied move or reset.

use crate::avatar;
use crate::config::GameConfig;
use crate::maze::Maze;
use crate::utils::unix_time_secs;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use shared::{
    Collectible, CollectibleKind, GameSnapshot, PlayerInfo, PlayerStats, Position,
    MAX_COLLECTIBLES, MIN_COLLECTIBLES, PLAYER_COLORS, PLAYER_RADIUS, WIN_BONUS,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Handle shared by every connection handler
pub type SharedGameState = Arc<RwLock<GameState>>;

#[derive(Debug, Clone)]
struct PlayerRecord {
    name: String,
    color: [u8; 3],
    /// Base64 PNG, rendered once at join time
    avatar: String,
    position: Position,
    stats: PlayerStats,
    join_order: u64,
}

/// Round bookkeeping
#[derive(Debug, Clone)]
struct GameRound {
    round_number: u32,
    winner: Option<String>,
    started_at: Instant,
}

impl GameRound {
    fn first() -> Self {
        Self {
            round_number: 1,
            winner: None,
            started_at: Instant::now(),
        }
    }
}

/// What an accepted move changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveReport {
    /// False when the destination equals the current position
    pub moved: bool,
    pub collected: Option<CollectibleKind>,
    pub won: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveRejection {
    UnknownPlayer,
    InvalidPosition,
}

pub struct GameState {
    config: GameConfig,
    rng: StdRng,
    maze: Maze,
    players: HashMap<String, PlayerRecord>,
    collectibles: Vec<Collectible>,
    round: GameRound,
    next_color: usize,
    next_join_order: u64,
}

impl GameState {
    pub fn new(config: GameConfig) -> Self {
        let config = config.normalized();
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let maze = Maze::generate(config.maze_width, config.maze_height, &mut rng);

        let mut state = Self {
            config,
            rng,
            maze,
            players: HashMap::new(),
            collectibles: Vec::new(),
            round: GameRound::first(),
            next_color: 0,
            next_join_order: 0,
        };
        state.collectibles = state.generate_collectibles();
        state
    }

    /// Wraps a fresh state in the shared lock handed to the listener
    pub fn shared(config: GameConfig) -> SharedGameState {
        Arc::new(RwLock::new(Self::new(config)))
    }

    /// Places 5-8 collectibles on distinct path cells, never on the start
    /// or the end cell.
    fn generate_collectibles(&mut self) -> Vec<Collectible> {
        let start = self.maze.start();
        let end = self.maze.end();
        let free: Vec<(usize, usize)> = self
            .maze
            .path_cells()
            .filter(|cell| *cell != start && *cell != end)
            .collect();

        let count = self
            .rng
            .gen_range(MIN_COLLECTIBLES..=MAX_COLLECTIBLES)
            .min(free.len());

        let cells: Vec<(usize, usize)> = free
            .choose_multiple(&mut self.rng, count)
            .copied()
            .collect();

        cells
            .into_iter()
            .map(|(x, y)| {
                let index = self.rng.gen_range(0..CollectibleKind::ALL.len());
                Collectible::new(x, y, CollectibleKind::ALL[index])
            })
            .collect()
    }

    fn start_position(&self) -> Position {
        let (x, y) = self.maze.start();
        Position::new(
            x as i64 * self.config.cell_size,
            y as i64 * self.config.cell_size,
        )
    }

    /// Registers a player. Returns false, changing nothing, if the id is
    /// already known.
    pub fn add_player(&mut self, id: &str, name: &str) -> bool {
        if self.players.contains_key(id) {
            return false;
        }

        let color = PLAYER_COLORS[self.next_color % PLAYER_COLORS.len()];
        self.next_color += 1;

        let avatar = avatar::render_avatar_base64(color, name).unwrap_or_else(|e| {
            warn!("Failed to render avatar for player {}: {}", id, e);
            String::new()
        });

        let record = PlayerRecord {
            name: name.to_string(),
            color,
            avatar,
            position: self.start_position(),
            stats: PlayerStats {
                join_time: unix_time_secs(),
                ..PlayerStats::default()
            },
            join_order: self.next_join_order,
        };
        self.next_join_order += 1;

        info!("Player {} ({}) added to game", id, name);
        self.players.insert(id.to_string(), record);
        true
    }

    /// Checks the player's square hitbox against the maze: the centre, the
    /// four edge midpoints and the four corners must all sit on in-bounds
    /// path cells. Coordinates whose hitbox overflows `i64` are invalid.
    pub fn is_valid_position(&self, x: i64, y: i64) -> bool {
        let r = PLAYER_RADIUS;
        let offsets = [
            (r, r),
            (0, r),
            (2 * r, r),
            (r, 0),
            (r, 2 * r),
            (0, 0),
            (2 * r, 0),
            (0, 2 * r),
            (2 * r, 2 * r),
        ];

        offsets.iter().all(|&(dx, dy)| {
            let (Some(px), Some(py)) = (x.checked_add(dx), y.checked_add(dy)) else {
                return false;
            };
            let (cx, cy) = self.maze.cell_at_pixel(px, py, self.config.cell_size);
            self.maze.is_path(cx, cy)
        })
    }

    /// Validates and commits a move. A collectible on the destination cell
    /// is claimed before the win check, so one step can do both.
    pub fn try_move(&mut self, id: &str, x: i64, y: i64) -> Result<MoveReport, MoveRejection> {
        if !self.players.contains_key(id) {
            return Err(MoveRejection::UnknownPlayer);
        }
        if !self.is_valid_position(x, y) {
            return Err(MoveRejection::InvalidPosition);
        }

        let destination = Position::new(x, y);
        let (cell_x, cell_y) = destination.cell(self.config.cell_size);
        let (end_x, end_y) = self.maze.end();
        let reached_end = cell_x == end_x as i64 && cell_y == end_y as i64;

        let collected = self
            .collectibles
            .iter_mut()
            .find(|c| !c.collected && c.x as i64 == cell_x && c.y as i64 == cell_y)
            .map(|item| {
                item.collected = true;
                item.collected_by = Some(id.to_string());
                (item.kind, item.value)
            });

        let won = reached_end && self.round.winner.is_none();
        if won {
            self.round.winner = Some(id.to_string());
        }

        let Some(player) = self.players.get_mut(id) else {
            return Err(MoveRejection::UnknownPlayer);
        };

        let moved = player.position != destination;
        player.position = destination;
        if moved {
            player.stats.total_moves += 1;
        }

        if let Some((kind, value)) = collected {
            player.stats.score += value;
            player.stats.collectibles_collected += 1;
            debug!("Player {} collected a {:?} worth {}", id, kind, value);
        }

        if won {
            player.stats.wins += 1;
            player.stats.score += WIN_BONUS;
            info!("Player {} won round {}!", id, self.round.round_number);
        }

        Ok(MoveReport {
            moved,
            collected: collected.map(|(kind, _)| kind),
            won,
        })
    }

    /// Boolean form of [`GameState::try_move`]
    pub fn move_player(&mut self, id: &str, x: i64, y: i64) -> bool {
        self.try_move(id, x, y).is_ok()
    }

    pub fn get_location(&self, id: &str) -> Option<Position> {
        self.players.get(id).map(|p| p.position)
    }

    /// Base64 PNG avatar of a player
    pub fn face(&self, id: &str) -> Option<&str> {
        self.players.get(id).map(|p| p.avatar.as_str())
    }

    pub fn stats(&self, id: &str) -> Option<&PlayerStats> {
        self.players.get(id).map(|p| &p.stats)
    }

    /// Player ids in join order
    pub fn player_ids(&self) -> Vec<String> {
        let mut entries: Vec<(&String, u64)> = self
            .players
            .iter()
            .map(|(id, record)| (id, record.join_order))
            .collect();
        entries.sort_by_key(|(_, order)| *order);
        entries.into_iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn maze(&self) -> &Maze {
        &self.maze
    }

    pub fn collectibles(&self) -> &[Collectible] {
        &self.collectibles
    }

    pub fn winner(&self) -> Option<&str> {
        self.round.winner.as_deref()
    }

    pub fn cell_size(&self) -> i64 {
        self.config.cell_size
    }

    /// Pixel origin of the start cell, where players spawn
    pub fn spawn_point(&self) -> Position {
        self.start_position()
    }

    /// Pixel origin of the end cell
    pub fn exit_point(&self) -> Position {
        let (x, y) = self.maze.end();
        Position::new(
            x as i64 * self.config.cell_size,
            y as i64 * self.config.cell_size,
        )
    }

    /// Copies out the complete state in its wire form
    pub fn snapshot(&self) -> GameSnapshot {
        let mut players = BTreeMap::new();
        let mut player_info = BTreeMap::new();
        let mut player_stats = BTreeMap::new();

        for (id, record) in &self.players {
            players.insert(id.clone(), record.position);
            player_info.insert(
                id.clone(),
                PlayerInfo {
                    name: record.name.clone(),
                    color: record.color,
                    avatar: record.avatar.clone(),
                },
            );
            player_stats.insert(id.clone(), record.stats.clone());
        }

        GameSnapshot {
            maze: self.maze.rows(),
            maze_width: self.maze.width(),
            maze_height: self.maze.height(),
            cell_size: self.config.cell_size,
            players,
            player_info,
            player_stats,
            collectibles: self.collectibles.clone(),
            start_pos: self.maze.start(),
            end_pos: self.maze.end(),
            winner: self.round.winner.clone(),
            round_number: self.round.round_number,
            game_time: self.round.started_at.elapsed().as_secs(),
        }
    }

    /// Starts a new round: fresh maze and collectibles, winner cleared,
    /// everyone back at the start. Identity and cumulative stats survive.
    pub fn reset_game(&mut self) {
        self.maze = Maze::generate(
            self.config.maze_width,
            self.config.maze_height,
            &mut self.rng,
        );
        self.collectibles = self.generate_collectibles();
        self.round = GameRound {
            round_number: self.round.round_number + 1,
            winner: None,
            started_at: Instant::now(),
        };

        let spawn = self.start_position();
        for player in self.players.values_mut() {
            player.position = spawn;
            player.stats.games_played += 1;
        }

        info!(
            "Game reset, round {} with {} players",
            self.round.round_number,
            self.players.len()
        );
    }

    /// Test hook: replaces the maze and the collectibles of the current round
    #[cfg(test)]
    pub(crate) fn set_layout(&mut self, maze: Maze, collectibles: Vec<Collectible>) {
        self.maze = maze;
        self.collectibles = collectibles;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maze::Cell;
    use std::collections::HashSet;

    const CELL: i64 = 30;

    fn seeded(seed: u64) -> GameState {
        GameState::new(GameConfig {
            seed: Some(seed),
            ..GameConfig::default()
        })
    }

    /// 7x5 maze with a single corridor along row 1 and a drop to the end:
    ///
    /// ```text
    /// #######
    /// #.....#
    /// #####.#
    /// #####.#
    /// #######
    /// ```
    fn corridor_state() -> GameState {
        let mut state = GameState::new(GameConfig {
            maze_width: 7,
            maze_height: 5,
            cell_size: CELL,
            seed: Some(1),
        });
        let mut maze = Maze::filled(7, 5);
        for x in 1..=5 {
            maze.set(x, 1, Cell::Path);
        }
        maze.set(5, 2, Cell::Path);
        maze.set(5, 3, Cell::Path);
        state.set_layout(maze, Vec::new());
        state
    }

    fn pixel(cell: i64) -> i64 {
        cell * CELL
    }

    #[test]
    fn test_add_player_is_idempotent() {
        let mut state = seeded(1);
        assert!(state.add_player("p1", "Alice"));
        let face = state.face("p1").unwrap().to_string();

        assert!(!state.add_player("p1", "Mallory"));
        assert_eq!(state.player_count(), 1);
        assert_eq!(state.face("p1").unwrap(), face);
        assert_eq!(state.snapshot().player_info["p1"].name, "Alice");
        assert_eq!(state.snapshot().player_info["p1"].color, PLAYER_COLORS[0]);
    }

    #[test]
    fn test_colors_rotate_after_six_players() {
        let mut state = seeded(1);
        for i in 0..7 {
            state.add_player(&i.to_string(), "P");
        }
        let snapshot = state.snapshot();
        for i in 0..6 {
            assert_eq!(snapshot.player_info[&i.to_string()].color, PLAYER_COLORS[i]);
        }
        assert_eq!(snapshot.player_info["6"].color, PLAYER_COLORS[0]);
    }

    #[test]
    fn test_faces_differ_within_a_colour_slot() {
        let mut state = seeded(1);
        state.add_player("0", "Ann");
        for i in 1..6 {
            state.add_player(&i.to_string(), "P");
        }
        state.add_player("6", "Zoe");
        state.add_player("7", "Pat");

        assert_ne!(state.face("0"), state.face("6"));
        // Same colour slot as "1" and the same initial
        assert_eq!(state.face("1"), state.face("7"));
    }

    #[test]
    fn test_new_player_spawns_at_start_with_zeroed_stats() {
        let mut state = seeded(1);
        state.add_player("p1", "Alice");

        assert_eq!(state.get_location("p1"), Some(Position::new(30, 30)));
        let stats = state.stats("p1").unwrap();
        assert_eq!(stats.score, 0);
        assert_eq!(stats.wins, 0);
        assert_eq!(stats.games_played, 0);
        assert_eq!(stats.total_moves, 0);
        assert!(stats.join_time > 0.0);
        assert!(!state.face("p1").unwrap().is_empty());
    }

    #[test]
    fn test_player_ids_in_join_order() {
        let mut state = seeded(1);
        for id in ["zed", "amy", "mo"] {
            state.add_player(id, id);
        }
        assert_eq!(state.player_ids(), vec!["zed", "amy", "mo"]);
    }

    #[test]
    fn test_get_location_unknown_player() {
        let state = seeded(1);
        assert_eq!(state.get_location("ghost"), None);
        assert!(state.face("ghost").is_none());
    }

    #[test]
    fn test_move_unknown_player_fails() {
        let mut state = corridor_state();
        assert_eq!(
            state.try_move("ghost", pixel(2), pixel(1)),
            Err(MoveRejection::UnknownPlayer)
        );
        assert!(!state.move_player("ghost", pixel(2), pixel(1)));
    }

    #[test]
    fn test_move_along_corridor() {
        let mut state = corridor_state();
        state.add_player("p1", "Alice");

        assert!(state.move_player("p1", pixel(2), pixel(1)));
        assert_eq!(state.get_location("p1"), Some(Position::new(60, 30)));
        assert_eq!(state.stats("p1").unwrap().total_moves, 1);
    }

    #[test]
    fn test_hitbox_crossing_wall_is_rejected() {
        let mut state = corridor_state();
        state.add_player("p1", "Alice");

        // Top-left corner is on path but the bottom edge dips into row 2.
        let y = pixel(1) + 5;
        assert!(!state.is_valid_position(pixel(2), y));
        assert_eq!(
            state.try_move("p1", pixel(2), y),
            Err(MoveRejection::InvalidPosition)
        );
        assert_eq!(state.get_location("p1"), Some(Position::new(30, 30)));
        assert_eq!(state.stats("p1").unwrap().total_moves, 0);
    }

    #[test]
    fn test_hitbox_may_straddle_two_path_cells() {
        let state = corridor_state();
        assert!(state.is_valid_position(pixel(2) + 15, pixel(1)));
        assert!(state.is_valid_position(pixel(1) + 1, pixel(1) + 1));
        assert!(!state.is_valid_position(pixel(1) + 2, pixel(1) + 2));
    }

    #[test]
    fn test_out_of_bounds_positions_are_rejected() {
        let state = corridor_state();
        assert!(!state.is_valid_position(-5, pixel(1)));
        assert!(!state.is_valid_position(pixel(1), -1));
        assert!(!state.is_valid_position(pixel(7), pixel(1)));
        assert!(!state.is_valid_position(pixel(0), pixel(0)));
    }

    #[test]
    fn test_extreme_coordinates_are_rejected() {
        let mut state = corridor_state();
        state.add_player("p1", "Alice");

        for (x, y) in [
            (i64::MAX, pixel(1)),
            (pixel(1), i64::MAX),
            (i64::MAX - 10, i64::MAX - 10),
            (i64::MIN, pixel(1)),
            (pixel(1), i64::MIN),
            (i64::MIN, i64::MIN),
        ] {
            assert!(!state.is_valid_position(x, y), "({}, {})", x, y);
            assert_eq!(state.try_move("p1", x, y), Err(MoveRejection::InvalidPosition));
        }
        assert_eq!(state.get_location("p1"), Some(Position::new(30, 30)));
    }

    #[test]
    fn test_same_position_is_not_counted_as_a_move() {
        let mut state = corridor_state();
        state.add_player("p1", "Alice");
        assert!(state.move_player("p1", pixel(1), pixel(1)));
        assert_eq!(state.stats("p1").unwrap().total_moves, 0);
    }

    #[test]
    fn test_collectible_claimed_once() {
        let mut state = corridor_state();
        let maze = state.maze().clone();
        state.set_layout(maze, vec![Collectible::new(3, 1, CollectibleKind::Gem)]);
        state.add_player("p1", "Alice");
        state.add_player("p2", "Bob");

        let report = state.try_move("p1", pixel(3), pixel(1)).unwrap();
        assert_eq!(report.collected, Some(CollectibleKind::Gem));
        assert_eq!(state.stats("p1").unwrap().score, 25);
        assert_eq!(state.stats("p1").unwrap().collectibles_collected, 1);

        let report = state.try_move("p2", pixel(3), pixel(1)).unwrap();
        assert_eq!(report.collected, None);
        assert_eq!(state.stats("p2").unwrap().score, 0);

        // Leaving and re-entering does not pay out again.
        state.move_player("p1", pixel(2), pixel(1));
        state.move_player("p1", pixel(3), pixel(1));
        assert_eq!(state.stats("p1").unwrap().score, 25);

        let item = &state.collectibles()[0];
        assert!(item.collected);
        assert_eq!(item.collected_by.as_deref(), Some("p1"));
    }

    #[test]
    fn test_only_first_uncollected_match_is_claimed() {
        let mut state = corridor_state();
        let maze = state.maze().clone();
        state.set_layout(
            maze,
            vec![
                Collectible::new(3, 1, CollectibleKind::Coin),
                Collectible::new(3, 1, CollectibleKind::Star),
            ],
        );
        state.add_player("p1", "Alice");

        state.move_player("p1", pixel(3), pixel(1));
        assert_eq!(state.stats("p1").unwrap().score, 10);
        assert!(state.collectibles()[0].collected);
        assert!(!state.collectibles()[1].collected);
    }

    #[test]
    fn test_reaching_end_wins_once() {
        let mut state = corridor_state();
        state.add_player("p1", "Alice");
        state.add_player("p2", "Bob");

        let report = state.try_move("p1", pixel(5), pixel(3)).unwrap();
        assert!(report.won);
        assert_eq!(state.winner(), Some("p1"));
        assert_eq!(state.stats("p1").unwrap().wins, 1);
        assert_eq!(state.stats("p1").unwrap().score, WIN_BONUS);

        let report = state.try_move("p2", pixel(5), pixel(3)).unwrap();
        assert!(!report.won);
        assert_eq!(state.winner(), Some("p1"));
        assert_eq!(state.stats("p2").unwrap().wins, 0);
        assert_eq!(state.stats("p2").unwrap().score, 0);

        // The winner stepping off and back on earns nothing further.
        state.move_player("p1", pixel(5), pixel(2));
        state.move_player("p1", pixel(5), pixel(3));
        assert_eq!(state.stats("p1").unwrap().wins, 1);
        assert_eq!(state.stats("p1").unwrap().score, WIN_BONUS);
    }

    #[test]
    fn test_pickup_and_win_on_same_step() {
        let mut state = corridor_state();
        let maze = state.maze().clone();
        state.set_layout(maze, vec![Collectible::new(5, 3, CollectibleKind::Star)]);
        state.add_player("p1", "Alice");

        let report = state.try_move("p1", pixel(5), pixel(3)).unwrap();
        assert_eq!(report.collected, Some(CollectibleKind::Star));
        assert!(report.won);
        assert_eq!(state.stats("p1").unwrap().score, 50 + WIN_BONUS);
    }

    #[test]
    fn test_full_size_example_win() {
        let mut state = seeded(5);
        state.add_player("1", "A");
        assert_eq!(state.exit_point(), Position::new(570, 390));
        assert!(state.move_player("1", 570, 390));
        assert_eq!(state.winner(), Some("1"));
    }

    #[test]
    fn test_collectibles_generation_rules() {
        for seed in 0..50 {
            let state = seeded(seed);
            let items = state.collectibles();
            assert!(items.len() >= MIN_COLLECTIBLES && items.len() <= MAX_COLLECTIBLES);

            let cells: HashSet<(usize, usize)> = items.iter().map(|c| (c.x, c.y)).collect();
            assert_eq!(cells.len(), items.len(), "collectibles share a cell");

            for item in items {
                assert!(state.maze().is_path(item.x as i64, item.y as i64));
                assert_ne!((item.x, item.y), state.maze().start());
                assert_ne!((item.x, item.y), state.maze().end());
                assert!(!item.collected);
                assert_eq!(item.value, item.kind.value());
            }
        }
    }

    #[test]
    fn test_reset_game() {
        let mut state = seeded(9);
        state.add_player("p1", "Alice");
        state.add_player("p2", "Bob");
        let exit = state.exit_point();
        assert!(state.move_player("p1", exit.x, exit.y));

        let before = state.snapshot();
        state.reset_game();
        let after = state.snapshot();

        assert_eq!(after.winner, None);
        assert_eq!(after.round_number, before.round_number + 1);
        assert_ne!(after.maze, before.maze);
        assert!(after.collectibles.iter().all(|c| !c.collected));

        for id in ["p1", "p2"] {
            assert_eq!(after.players[id], Position::new(30, 30));
            assert_eq!(
                after.player_stats[id].games_played,
                before.player_stats[id].games_played + 1
            );
            assert_eq!(after.player_stats[id].score, before.player_stats[id].score);
            assert_eq!(after.player_stats[id].wins, before.player_stats[id].wins);
            assert_eq!(after.player_info[id], before.player_info[id]);
        }
    }

    #[test]
    fn test_new_round_allows_a_new_winner() {
        let mut state = corridor_state();
        state.add_player("p1", "Alice");
        state.add_player("p2", "Bob");
        state.move_player("p1", pixel(5), pixel(3));

        state.reset_game();
        let exit = state.exit_point();
        assert!(state.move_player("p2", exit.x, exit.y));
        assert_eq!(state.winner(), Some("p2"));
    }

    #[test]
    fn test_snapshot_consistency() {
        let mut state = seeded(2);
        state.add_player("a", "A");
        state.add_player("b", "B");
        let snapshot = state.snapshot();

        assert_eq!(snapshot.players.len(), 2);
        assert_eq!(snapshot.player_info.len(), 2);
        assert_eq!(snapshot.player_stats.len(), 2);
        assert_eq!(snapshot.maze_width, 21);
        assert_eq!(snapshot.maze_height, 15);
        assert_eq!(snapshot.cell_size, 30);
        assert_eq!(snapshot.start_pos, (1, 1));
        assert_eq!(snapshot.end_pos, (19, 13));
        assert_eq!(snapshot.round_number, 1);
        assert_eq!(snapshot.game_time, 0);
    }

    #[test]
    fn test_seeded_states_match() {
        assert_eq!(seeded(77).snapshot().maze, seeded(77).snapshot().maze);
        assert_eq!(
            seeded(77).snapshot().collectibles,
            seeded(77).snapshot().collectibles
        );
    }
}
