//! Client-side view of a snapshot and the path planner used by the solve bot.

use shared::{GameSnapshot, Position};
use std::collections::{HashMap, VecDeque};

pub type GridCell = (usize, usize);

/// Shortest 4-connected route between two path cells, both ends included.
/// `None` when either end is a wall or the cells are disconnected.
pub fn shortest_path(snapshot: &GameSnapshot, from: GridCell, to: GridCell) -> Option<Vec<GridCell>> {
    let open = |(x, y): GridCell| snapshot.is_path(x as i64, y as i64);
    if !open(from) || !open(to) {
        return None;
    }

    let mut came_from: HashMap<GridCell, GridCell> = HashMap::new();
    let mut queue = VecDeque::from([from]);
    came_from.insert(from, from);

    while let Some(cell) = queue.pop_front() {
        if cell == to {
            let mut path = vec![cell];
            let mut current = cell;
            while current != from {
                current = came_from[&current];
                path.push(current);
            }
            path.reverse();
            return Some(path);
        }

        let (x, y) = cell;
        let mut neighbours = vec![(x + 1, y), (x, y + 1)];
        if x > 0 {
            neighbours.push((x - 1, y));
        }
        if y > 0 {
            neighbours.push((x, y - 1));
        }

        for next in neighbours {
            if open(next) && !came_from.contains_key(&next) {
                came_from.insert(next, cell);
                queue.push_back(next);
            }
        }
    }

    None
}

/// Grid cell holding a player's top-left pixel
pub fn cell_of(snapshot: &GameSnapshot, position: Position) -> Option<GridCell> {
    let (x, y) = position.cell(snapshot.cell_size);
    if x < 0 || y < 0 {
        return None;
    }
    Some((x as usize, y as usize))
}

/// Pixel origin of a cell; a hitbox placed here fits inside the cell
pub fn pixel_origin(snapshot: &GameSnapshot, (x, y): GridCell) -> Position {
    Position::new(x as i64 * snapshot.cell_size, y as i64 * snapshot.cell_size)
}

/// Where the player should step next on the way to the exit, or `None`
/// if it is already there or has no route.
pub fn next_step(snapshot: &GameSnapshot, player_id: &str) -> Option<Position> {
    let position = *snapshot.players.get(player_id)?;
    let here = cell_of(snapshot, position)?;
    let path = shortest_path(snapshot, here, snapshot.end_pos)?;
    path.get(1).map(|cell| pixel_origin(snapshot, *cell))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    /// 0 is path, 1 is wall
    fn snapshot(rows: &[&str]) -> GameSnapshot {
        let maze: Vec<Vec<u8>> = rows
            .iter()
            .map(|row| row.bytes().map(|b| if b == b'#' { 1 } else { 0 }).collect())
            .collect();
        let mut players = BTreeMap::new();
        players.insert("1".to_string(), Position::new(30, 30));

        GameSnapshot {
            maze_width: maze[0].len(),
            maze_height: maze.len(),
            end_pos: (maze[0].len() - 2, maze.len() - 2),
            maze,
            cell_size: 30,
            players,
            player_info: BTreeMap::new(),
            player_stats: BTreeMap::new(),
            collectibles: Vec::new(),
            start_pos: (1, 1),
            winner: None,
            round_number: 1,
            game_time: 0,
        }
    }

    #[test]
    fn test_shortest_path_follows_corridor() {
        let maze = snapshot(&["#####", "#..##", "##.##", "##..#", "#####"]);
        let path = shortest_path(&maze, (1, 1), (3, 3)).unwrap();
        assert_eq!(path, vec![(1, 1), (2, 1), (2, 2), (2, 3), (3, 3)]);
    }

    #[test]
    fn test_shortest_path_prefers_short_route() {
        let maze = snapshot(&["#####", "#...#", "#.#.#", "#...#", "#####"]);
        let path = shortest_path(&maze, (1, 1), (3, 3)).unwrap();
        assert_eq!(path.len(), 5);
    }

    #[test]
    fn test_no_path_through_walls() {
        let maze = snapshot(&["#####", "#.#.#", "#####", "#...#", "#####"]);
        assert!(shortest_path(&maze, (1, 1), (3, 1)).is_none());
        assert!(shortest_path(&maze, (0, 0), (1, 1)).is_none());
    }

    #[test]
    fn test_next_step() {
        let maze = snapshot(&["#####", "#..##", "##.##", "##..#", "#####"]);
        assert_eq!(next_step(&maze, "1"), Some(Position::new(60, 30)));
        assert_eq!(next_step(&maze, "ghost"), None);
    }

    #[test]
    fn test_next_step_at_exit() {
        let mut maze = snapshot(&["#####", "#..##", "##.##", "##..#", "#####"]);
        maze.players.insert("1".to_string(), Position::new(90, 90));
        assert_eq!(next_step(&maze, "1"), None);
    }

    #[test]
    fn test_cell_of_rejects_negative_pixels() {
        let maze = snapshot(&["###", "#.#", "###"]);
        assert_eq!(cell_of(&maze, Position::new(-1, 30)), None);
        assert_eq!(cell_of(&maze, Position::new(59, 30)), Some((1, 1)));
    }
}
