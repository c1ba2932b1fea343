use serde::{Deserialize, Serialize};

use crate::grid_map::{GridTile, path_cost};

/// Ordered tiles from start to goal, both inclusive. Empty means no path was found.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Path {
    tiles: Vec<GridTile>,
}

impl Path {
    pub fn new(tiles: Vec<GridTile>) -> Self {
        Self { tiles }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tiles(&self) -> &[GridTile] {
        &self.tiles
    }

    pub fn start(&self) -> Option<GridTile> {
        self.tiles.first().copied()
    }

    pub fn goal(&self) -> Option<GridTile> {
        self.tiles.last().copied()
    }

    /// Sum of per-step costs, or `None` when the path is empty.
    pub fn length(&self) -> Option<f64> {
        if self.tiles.is_empty() {
            return None;
        }
        Some(path_cost(&self.tiles))
    }

    /// Appends a sub-path, dropping its first tile when it repeats our last one.
    pub(crate) fn extend_joined(&mut self, segment: &[GridTile]) {
        let skip = match (self.tiles.last(), segment.first()) {
            (Some(last), Some(first)) if last == first => 1,
            _ => 0,
        };
        self.tiles.extend_from_slice(&segment[skip..]);
    }
}
