use crate::astar::find_path_flat;
use crate::graph::Graph;
use crate::grid_map::{Connectivity, GridMap, GridTile};
use crate::path::Path;

/// Something that answers single start/goal queries on a fixed map.
pub trait PathSearch {
    fn name(&self) -> &'static str;
    fn find_path(&self, start: GridTile, goal: GridTile) -> Path;
}

/// Plain grid A* over the whole map.
pub struct FlatSearch<'m> {
    map: &'m GridMap,
    connectivity: Connectivity,
}

impl<'m> FlatSearch<'m> {
    pub fn new(map: &'m GridMap, connectivity: Connectivity) -> Self {
        Self { map, connectivity }
    }
}

impl PathSearch for FlatSearch<'_> {
    fn name(&self) -> &'static str {
        "A*"
    }

    fn find_path(&self, start: GridTile, goal: GridTile) -> Path {
        find_path_flat(start, goal, self.map, self.connectivity)
    }
}

/// HPA* over a prebuilt abstraction.
pub struct HierarchicalSearch<'g, 'm> {
    graph: &'g Graph<'m>,
}

impl<'g, 'm> HierarchicalSearch<'g, 'm> {
    pub fn new(graph: &'g Graph<'m>) -> Self {
        Self { graph }
    }
}

impl PathSearch for HierarchicalSearch<'_, '_> {
    fn name(&self) -> &'static str {
        "HPA*"
    }

    fn find_path(&self, start: GridTile, goal: GridTile) -> Path {
        self.graph.find_path(start, goal)
    }
}
