use log::{debug, warn};
use std::collections::HashMap;

use crate::astar::astar;
use crate::graph::{AbstractGraph, Edge, EdgeKind, Graph, NodeId, abstract_astar};
use crate::grid_map::{GridTile, Rect};
use crate::path::Path;

/// Start and goal nodes of one query, layered on top of a borrowed graph.
/// Dropping the overlay removes them again; the graph itself is never touched.
pub struct QueryOverlay<'g, 'm> {
    graph: &'g Graph<'m>,
    tiles: Vec<GridTile>,
    edges: Vec<HashMap<NodeId, Vec<Edge>>>,
}

impl<'g, 'm> QueryOverlay<'g, 'm> {
    pub fn new(graph: &'g Graph<'m>) -> Self {
        Self {
            graph,
            tiles: vec![],
            edges: vec![HashMap::new(); graph.layer_count()],
        }
    }

    pub fn node_count(&self) -> usize {
        self.tiles.len()
    }

    /// Directed edges owned by the overlay, over all layers.
    pub fn edge_count(&self) -> usize {
        self.edges.iter().flat_map(|layer| layer.values()).map(Vec::len).sum()
    }

    fn push_node(&mut self, tile: GridTile) -> NodeId {
        self.tiles.push(tile);
        self.graph.node_count() + self.tiles.len() - 1
    }

    /// Adds `start` and `goal` to every layer, bottom-up, connected to the nodes of
    /// the cluster they fall in, and to each other wherever they share a cluster.
    pub fn insert_endpoints(&mut self, start: GridTile, goal: GridTile) -> (NodeId, NodeId) {
        let graph = self.graph;
        let start_id = self.push_node(start);
        let goal_id = self.push_node(goal);
        for level in 0..graph.layer_count() {
            self.connect_to_cluster(level, start_id);
            self.connect_to_cluster(level, goal_id);
            let partition = &graph.layer(level).partition;
            if partition.cluster_of(start) == partition.cluster_of(goal) {
                self.link(level, start_id, goal_id);
            }
        }
        (start_id, goal_id)
    }

    fn connect_to_cluster(&mut self, level: usize, id: NodeId) {
        let graph = self.graph;
        let layer = graph.layer(level);
        let cluster_idx = layer.partition.cluster_of(self.tile(id));
        for &target in &layer.clusters[cluster_idx].nodes {
            self.link(level, id, target);
        }
    }

    /// Connects two nodes of the same cluster with the same local search used for
    /// the graph's own intra edges. Nothing is added when the cluster separates them.
    fn link(&mut self, level: usize, a: NodeId, b: NodeId) {
        let graph = self.graph;
        let layer = graph.layer(level);
        let bounds = layer.partition.rect(layer.partition.cluster_of(self.tile(a)));
        let connectivity = graph.config().connectivity;

        let edge = if level == 0 {
            astar(self.tile(a), self.tile(b), graph.map(), bounds, connectivity).map(|(_, cost)| Edge {
                destination: b,
                cost,
                kind: EdgeKind::Intra { underlying: vec![] },
            })
        } else {
            abstract_astar(&*self, level - 1, a, b, Some(bounds), connectivity).map(|(underlying, cost)| Edge {
                destination: b,
                cost,
                kind: EdgeKind::Intra { underlying },
            })
        };

        if let Some(edge) = edge {
            let back = edge.reversed(a);
            self.edges[level].entry(a).or_default().push(edge);
            self.edges[level].entry(b).or_default().push(back);
        }
    }

    /// Expands the edge `a -> b` of `level` into tiles appended to `out`.
    fn refine(&self, level: usize, a: NodeId, b: NodeId, out: &mut Path) -> bool {
        if level == 0 {
            let partition = &self.graph.layer(0).partition;
            let (from, to) = (self.tile(a), self.tile(b));
            let from_cluster = partition.cluster_of(from);
            let bounds = if from_cluster == partition.cluster_of(to) {
                partition.rect(from_cluster)
            } else {
                Rect::spanning(from, to)
            };
            return match astar(from, to, self.graph.map(), bounds, self.graph.config().connectivity) {
                Some((tiles, _)) => {
                    out.extend_joined(&tiles);
                    true
                }
                None => false,
            };
        }

        let edge = self
            .edges(level, a)
            .filter(|e| e.destination == b)
            .min_by(|x, y| x.cost.total_cmp(&y.cost));
        match edge.map(|e| &e.kind) {
            Some(EdgeKind::Inter) => self.refine(0, a, b, out),
            Some(EdgeKind::Intra { underlying }) => underlying
                .windows(2)
                .all(|w| self.refine(level - 1, w[0], w[1], out)),
            None => false,
        }
    }
}

impl AbstractGraph for QueryOverlay<'_, '_> {
    fn tile(&self, id: NodeId) -> GridTile {
        let base = self.graph.node_count();
        if id < base {
            self.graph.node(id).tile
        } else {
            self.tiles[id - base]
        }
    }

    fn edges(&self, layer: usize, id: NodeId) -> impl Iterator<Item = &Edge> {
        self.graph
            .layer(layer)
            .edges_from(id)
            .iter()
            .chain(self.edges[layer].get(&id).into_iter().flatten())
    }
}

impl<'m> Graph<'m> {
    /// Hierarchical search: insert the endpoints, search the top layer, then
    /// refine every abstract edge down to grid tiles. Empty when no path exists.
    pub fn find_path(&self, start: GridTile, goal: GridTile) -> Path {
        let map = self.map();
        if !map.is_open(start) || !map.is_open(goal) {
            return Path::empty();
        }
        if start == goal {
            return Path::new(vec![start]);
        }

        let mut overlay = QueryOverlay::new(self);
        let (start_id, goal_id) = overlay.insert_endpoints(start, goal);

        let top = self.top_layer();
        let Some((abstract_path, cost)) =
            abstract_astar(&overlay, top, start_id, goal_id, None, self.config().connectivity)
        else {
            debug!("no abstract path from {} to {}", start, goal);
            return Path::empty();
        };
        debug!(
            "abstract path from {} to {}: {} nodes, cost {:.3}",
            start,
            goal,
            abstract_path.len(),
            cost
        );

        // join together all subpaths
        let mut path = Path::empty();
        for pair in abstract_path.windows(2) {
            if !overlay.refine(top, pair[0], pair[1], &mut path) {
                warn!("failed to refine abstract edge {} -> {}", pair[0], pair[1]);
                return Path::empty();
            }
        }
        path
    }
}

/// Runs a hierarchical query against a prebuilt graph.
pub fn find_path_hierarchical(start: GridTile, goal: GridTile, graph: &Graph<'_>) -> Path {
    graph.find_path(start, goal)
}
