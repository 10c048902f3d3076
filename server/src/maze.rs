//! Maze grid and its generator.
//!
//! Mazes are carved with randomized depth-first backtracking from cell
//! (1, 1), stepping two cells at a time so that odd-coordinate cells become
//! rooms and the even cells between them become corridors. The carve visits
//! every room exactly once, which makes the result a spanning tree: every
//! path cell is reachable from the start and there are no loops.

use crate::config::odd_dimension;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Wall,
    Path,
}

impl Cell {
    /// Wire encoding used in the `maze` array of the snapshot
    pub fn as_u8(self) -> u8 {
        match self {
            Cell::Wall => 1,
            Cell::Path => 0,
        }
    }
}

const STEPS: [(i64, i64); 4] = [(0, 2), (2, 0), (0, -2), (-2, 0)];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Maze {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Maze {
    /// A grid with every cell set to wall
    pub fn filled(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::Wall; width * height],
        }
    }

    /// Generates a perfect maze. Dimensions are clamped to odd values of at
    /// least 5 rather than rejected.
    pub fn generate<R: Rng + ?Sized>(width: usize, height: usize, rng: &mut R) -> Self {
        let width = odd_dimension(width);
        let height = odd_dimension(height);
        let mut maze = Self::filled(width, height);

        maze.carve_from((1, 1), rng);

        let (end_x, end_y) = maze.end();
        maze.set(1, 1, Cell::Path);
        maze.set(end_x, end_y, Cell::Path);
        maze
    }

    /// Iterative form of the recursive backtracker. Each stack frame keeps its
    /// own shuffled direction list and the index of the next one to try, so
    /// the visiting order is identical to the recursive version.
    fn carve_from<R: Rng + ?Sized>(&mut self, origin: (usize, usize), rng: &mut R) {
        let mut stack: Vec<((usize, usize), [(i64, i64); 4], usize)> = Vec::new();

        self.set(origin.0, origin.1, Cell::Path);
        stack.push((origin, shuffled_steps(rng), 0));

        while let Some(frame) = stack.last_mut() {
            let ((x, y), steps, next) = *frame;
            if next == steps.len() {
                stack.pop();
                continue;
            }
            frame.2 += 1;

            let (dx, dy) = steps[next];
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if !self.is_interior(nx, ny) || self.get(nx, ny) != Some(Cell::Wall) {
                continue;
            }

            let (nx, ny) = (nx as usize, ny as usize);
            let wall_x = (x as i64 + dx / 2) as usize;
            let wall_y = (y as i64 + dy / 2) as usize;
            self.set(wall_x, wall_y, Cell::Path);
            self.set(nx, ny, Cell::Path);
            stack.push(((nx, ny), shuffled_steps(rng), 0));
        }
    }

    fn is_interior(&self, x: i64, y: i64) -> bool {
        x > 0 && y > 0 && x < self.width as i64 - 1 && y < self.height as i64 - 1
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn start(&self) -> (usize, usize) {
        (1, 1)
    }

    pub fn end(&self) -> (usize, usize) {
        (self.width - 2, self.height - 2)
    }

    /// Cell at grid coordinates, or `None` when out of bounds
    pub fn get(&self, x: i64, y: i64) -> Option<Cell> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(self.cells[y as usize * self.width + x as usize])
    }

    pub fn is_path(&self, x: i64, y: i64) -> bool {
        self.get(x, y) == Some(Cell::Path)
    }

    pub fn set(&mut self, x: usize, y: usize, cell: Cell) {
        let index = y * self.width + x;
        self.cells[index] = cell;
    }

    /// Grid cell containing the pixel, using floor division
    pub fn cell_at_pixel(&self, px: i64, py: i64, cell_size: i64) -> (i64, i64) {
        (px.div_euclid(cell_size), py.div_euclid(cell_size))
    }

    /// Row-major `0`/`1` form used on the wire
    pub fn rows(&self) -> Vec<Vec<u8>> {
        self.cells
            .chunks(self.width)
            .map(|row| row.iter().map(|cell| cell.as_u8()).collect())
            .collect()
    }

    pub fn path_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| **cell == Cell::Path)
            .map(move |(index, _)| (index % self.width, index / self.width))
    }

    /// Flood fill over path cells with 4-neighbour connectivity
    pub fn reachable_from(&self, start: (usize, usize)) -> HashSet<(usize, usize)> {
        let mut out = HashSet::new();
        if !self.is_path(start.0 as i64, start.1 as i64) {
            return out;
        }

        let mut queue = VecDeque::new();
        out.insert(start);
        queue.push_back(start);

        while let Some((x, y)) = queue.pop_front() {
            let (x, y) = (x as i64, y as i64);
            for (nx, ny) in [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)] {
                if !self.is_path(nx, ny) {
                    continue;
                }
                if out.insert((nx as usize, ny as usize)) {
                    queue.push_back((nx as usize, ny as usize));
                }
            }
        }

        out
    }
}

fn shuffled_steps<R: Rng + ?Sized>(rng: &mut R) -> [(i64, i64); 4] {
    let mut steps = STEPS;
    steps.shuffle(rng);
    steps
}
