use bitvector::BitVector;
use serde::{Deserialize, Serialize};
use std::f64::consts::SQRT_2;
use std::fmt;

use crate::error::MapFormatError;

pub const STRAIGHT_COST: f64 = 1.0;
pub const DIAGONAL_COST: f64 = SQRT_2;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridTile {
    pub x: u32,
    pub y: u32,
}

impl GridTile {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for GridTile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Inclusive tile rectangle used to bound local searches.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Rect {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl Rect {
    pub fn contains(&self, tile: GridTile) -> bool {
        tile.x >= self.min_x && tile.x <= self.max_x && tile.y >= self.min_y && tile.y <= self.max_y
    }

    /// Smallest rectangle covering both tiles.
    pub fn spanning(a: GridTile, b: GridTile) -> Self {
        Self {
            min_x: a.x.min(b.x),
            min_y: a.y.min(b.y),
            max_x: a.x.max(b.x),
            max_y: a.y.max(b.y),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Connectivity {
    Four,
    #[default]
    Eight,
}

impl Connectivity {
    /// Manhattan distance for 4-connected grids, octile distance for 8-connected ones.
    pub fn heuristic(self, a: GridTile, b: GridTile) -> f64 {
        let dx = a.x.abs_diff(b.x) as f64;
        let dy = a.y.abs_diff(b.y) as f64;
        match self {
            Connectivity::Four => (dx + dy) * STRAIGHT_COST,
            Connectivity::Eight => {
                let min = dx.min(dy);
                let max = dx.max(dy);
                DIAGONAL_COST * min + STRAIGHT_COST * (max - min)
            }
        }
    }

    fn deltas(self) -> &'static [(i64, i64)] {
        const DELTAS: [(i64, i64); 8] = [
            (-1, 0),
            (1, 0),
            (0, -1),
            (0, 1),
            (-1, -1),
            (1, -1),
            (-1, 1),
            (1, 1),
        ];
        match self {
            Connectivity::Four => &DELTAS[..4],
            Connectivity::Eight => &DELTAS,
        }
    }
}

/// Cost of a single move between two neighbouring tiles.
pub fn step_cost(a: GridTile, b: GridTile) -> f64 {
    if a.x != b.x && a.y != b.y {
        DIAGONAL_COST
    } else {
        STRAIGHT_COST
    }
}

/// Cost of walking `tiles` in order. Straight and diagonal steps are counted
/// first, so a route and its reverse always cost exactly the same.
pub fn path_cost(tiles: &[GridTile]) -> f64 {
    let diagonal = tiles.windows(2).filter(|w| w[0].x != w[1].x && w[0].y != w[1].y).count();
    let straight = tiles.len().saturating_sub(1) - diagonal;
    straight as f64 * STRAIGHT_COST + diagonal as f64 * DIAGONAL_COST
}

/// Immutable obstacle grid. Open tiles are stored as set bits.
#[derive(Clone, Debug)]
pub struct GridMap {
    bitvec: BitVector,
    width: u32,
    height: u32,
    open_tiles: usize,
}

impl GridMap {
    /// Builds a map from a row-major obstacle mask (`true` = blocked).
    pub fn from_obstacles(width: u32, height: u32, obstacles: Vec<bool>) -> Result<Self, MapFormatError> {
        let expected = width as usize * height as usize;
        if width == 0 || height == 0 || obstacles.len() != expected {
            return Err(MapFormatError::DimensionMismatch {
                width,
                height,
                cells: obstacles.len(),
            });
        }
        let mut bitvec = BitVector::new(expected);
        let mut open_tiles = 0;
        for (idx, blocked) in obstacles.into_iter().enumerate() {
            if !blocked {
                bitvec.insert(idx);
                open_tiles += 1;
            }
        }
        Ok(Self {
            bitvec,
            width,
            height,
            open_tiles,
        })
    }

    /// Builds a map from rows of obstacle flags (`true` = blocked).
    pub fn from_rows(rows: Vec<Vec<bool>>) -> Result<Self, MapFormatError> {
        let height = rows.len() as u32;
        let width = rows.first().map_or(0, |row| row.len()) as u32;
        let mut obstacles = Vec::with_capacity(width as usize * height as usize);
        for (row_idx, row) in rows.into_iter().enumerate() {
            if row.len() != width as usize {
                return Err(MapFormatError::RaggedRow {
                    row: row_idx,
                    expected: width as usize,
                    found: row.len(),
                });
            }
            obstacles.extend(row);
        }
        Self::from_obstacles(width, height, obstacles)
    }

    /// Obstacle-free map. Zero dimensions are raised to one so the map always
    /// has at least one tile.
    pub fn open(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let cells = width as usize * height as usize;
        let mut bitvec = BitVector::new(cells);
        for idx in 0..cells {
            bitvec.insert(idx);
        }
        Self {
            bitvec,
            width,
            height,
            open_tiles: cells,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn open_tile_count(&self) -> usize {
        self.open_tiles
    }

    pub fn bounds(&self) -> Rect {
        Rect {
            min_x: 0,
            min_y: 0,
            max_x: self.width - 1,
            max_y: self.height - 1,
        }
    }

    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }

    /// Out-of-bounds tiles count as blocked.
    pub fn is_blocked(&self, x: i64, y: i64) -> bool {
        !self.in_bounds(x, y) || !self.bitvec.contains(y as usize * self.width as usize + x as usize)
    }

    pub fn is_open(&self, tile: GridTile) -> bool {
        !self.is_blocked(tile.x as i64, tile.y as i64)
    }

    /// Open neighbours of `pos` inside `bounds`, with the cost of stepping to them.
    /// Diagonal moves are only allowed when both adjacent orthogonal tiles are open.
    pub fn neighbors<'a>(
        &'a self,
        pos: GridTile,
        bounds: Rect,
        connectivity: Connectivity,
    ) -> impl Iterator<Item = (GridTile, f64)> + 'a {
        let (x, y) = (pos.x as i64, pos.y as i64);
        let passable = move |nx: i64, ny: i64| {
            nx >= bounds.min_x as i64
                && nx <= bounds.max_x as i64
                && ny >= bounds.min_y as i64
                && ny <= bounds.max_y as i64
                && !self.is_blocked(nx, ny)
        };

        connectivity.deltas().iter().filter_map(move |&(dx, dy)| {
            let nx = x + dx;
            let ny = y + dy;
            if !passable(nx, ny) {
                return None;
            }
            if dx != 0 && dy != 0 && (!passable(x + dx, y) || !passable(x, y + dy)) {
                return None;
            }
            let next = GridTile::new(nx as u32, ny as u32);
            Some((next, step_cost(pos, next)))
        })
    }
}
