use log::{debug, info};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
};

use crate::astar::astar;
use crate::cluster::{Partition, find_entrances};
use crate::error::LayerDepthExceededError;
use crate::grid_map::{Connectivity, GridMap, GridTile, Rect, STRAIGHT_COST};

pub type NodeId = usize;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    pub cluster_size: u32,
    pub layer_depth: usize,
    /// Entrances at least this wide get a node at each end instead of one in the middle.
    pub entrance_split_width: u32,
    pub connectivity: Connectivity,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            cluster_size: 10,
            layer_depth: 1,
            entrance_split_width: 6,
            connectivity: Connectivity::Eight,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AbstractNode {
    pub tile: GridTile,
    /// Highest layer this node was promoted to.
    pub top_layer: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum EdgeKind {
    /// Single step across a cluster border.
    Inter,
    /// Route inside one cluster. Above layer 0 it keeps the node sequence of
    /// the layer below it was computed from, endpoints included.
    Intra { underlying: Vec<NodeId> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub destination: NodeId,
    pub cost: f64,
    pub kind: EdgeKind,
}

impl Edge {
    /// The same edge walked in the opposite direction, ending at `origin`.
    pub(crate) fn reversed(&self, origin: NodeId) -> Edge {
        let kind = match &self.kind {
            EdgeKind::Inter => EdgeKind::Inter,
            EdgeKind::Intra { underlying } => EdgeKind::Intra {
                underlying: underlying.iter().rev().copied().collect(),
            },
        };
        Edge {
            destination: origin,
            cost: self.cost,
            kind,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Cluster {
    pub nodes: Vec<NodeId>,
}

pub struct Layer {
    pub partition: Partition,
    pub clusters: Vec<Cluster>, // row-major order
    edges: HashMap<NodeId, Vec<Edge>>,
}

impl Layer {
    fn new(partition: Partition) -> Self {
        let clusters = vec![Cluster::default(); partition.len()];
        Self {
            partition,
            clusters,
            edges: HashMap::new(),
        }
    }

    pub fn edges_from(&self, id: NodeId) -> &[Edge] {
        self.edges.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn node_count(&self) -> usize {
        self.clusters.iter().map(|c| c.nodes.len()).sum()
    }

    /// Directed edge count; every undirected edge is stored once per direction.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    fn add_node(&mut self, id: NodeId, tile: GridTile) {
        let cluster_idx = self.partition.cluster_of(tile);
        self.clusters[cluster_idx].nodes.push(id);
        self.edges.entry(id).or_default();
    }

    fn add_edge_pair(&mut self, from: NodeId, edge: Edge) {
        let back = edge.reversed(from);
        let destination = edge.destination;
        self.edges.entry(from).or_default().push(edge);
        self.edges.entry(destination).or_default().push(back);
    }
}

/// Read access to a layered abstract graph, shared by the prebuilt graph and
/// the per-query overlay.
pub(crate) trait AbstractGraph {
    fn tile(&self, id: NodeId) -> GridTile;
    fn edges(&self, layer: usize, id: NodeId) -> impl Iterator<Item = &Edge>;
}

/// Multi-layer abstraction of a grid map. Immutable once built.
pub struct Graph<'m> {
    map: &'m GridMap,
    config: GraphConfig,
    nodes: Vec<AbstractNode>,
    layers: Vec<Layer>,
}

/// Number of layers a grid supports: layer 0 plus every doubling of the
/// cluster size that still leaves more than one cluster in the layer below.
pub fn max_layer_depth(width: u32, height: u32, cluster_size: u32) -> usize {
    let extent = width.max(height) as u64;
    let mut side = cluster_size.max(1) as u64;
    let mut depth = 1;
    while side < extent {
        depth += 1;
        side *= 2;
    }
    depth
}

impl<'m> Graph<'m> {
    pub fn build(map: &'m GridMap, config: GraphConfig) -> Result<Self, LayerDepthExceededError> {
        let mut config = config;
        config.cluster_size = config.cluster_size.max(1);
        config.layer_depth = config.layer_depth.max(1);
        let max = max_layer_depth(map.width(), map.height(), config.cluster_size);
        if config.layer_depth > max {
            return Err(LayerDepthExceededError {
                requested: config.layer_depth,
                max,
            });
        }

        let mut graph = Self {
            map,
            config,
            nodes: vec![],
            layers: vec![],
        };
        graph.build_base_layer();
        for layer in 1..config.layer_depth {
            graph.build_upper_layer(layer);
        }
        Ok(graph)
    }

    fn build_base_layer(&mut self) {
        let partition = Partition::new(self.map.width(), self.map.height(), self.config.cluster_size);
        let entrances = find_entrances(self.map, &partition);
        let mut layer = Layer::new(partition);
        let mut node_index = HashMap::<GridTile, NodeId>::new();

        let mut intern = |tile: GridTile, nodes: &mut Vec<AbstractNode>, layer: &mut Layer| {
            *node_index.entry(tile).or_insert_with(|| {
                let id = nodes.len();
                nodes.push(AbstractNode { tile, top_layer: 0 });
                layer.add_node(id, tile);
                id
            })
        };

        for entrance in &entrances {
            for (a_pos, b_pos) in entrance.transitions(self.config.entrance_split_width) {
                let a = intern(a_pos, &mut self.nodes, &mut layer);
                let b = intern(b_pos, &mut self.nodes, &mut layer);
                if layer.edges_from(a).iter().any(|e| e.destination == b) {
                    continue;
                }
                layer.add_edge_pair(
                    a,
                    Edge {
                        destination: b,
                        cost: STRAIGHT_COST,
                        kind: EdgeKind::Inter,
                    },
                );
            }
        }

        // for each cluster add intra-edges for each pair of entrance nodes
        for cluster_idx in 0..layer.clusters.len() {
            let bounds = layer.partition.rect(cluster_idx);
            let members = layer.clusters[cluster_idx].nodes.clone();
            for i in 0..members.len() {
                for j in (i + 1)..members.len() {
                    let start = self.nodes[members[i]].tile;
                    let goal = self.nodes[members[j]].tile;
                    if let Some((_, cost)) = astar(start, goal, self.map, bounds, self.config.connectivity) {
                        layer.add_edge_pair(
                            members[i],
                            Edge {
                                destination: members[j],
                                cost,
                                kind: EdgeKind::Intra { underlying: vec![] },
                            },
                        );
                    }
                }
            }
            debug!(
                "layer 0 cluster {} {:?}: {} nodes",
                cluster_idx,
                bounds,
                members.len()
            );
        }

        info!(
            "layer 0: {} clusters of size {}, {} entrances, {} nodes, {} edges",
            layer.clusters.len(),
            self.config.cluster_size,
            entrances.len(),
            layer.node_count(),
            layer.edge_count() / 2
        );
        self.layers.push(layer);
    }

    fn build_upper_layer(&mut self, level: usize) {
        let cluster_size = self.config.cluster_size << level;
        let mut layer = Layer::new(Partition::new(self.map.width(), self.map.height(), cluster_size));

        // promote the nodes whose border crossings are still borders at this level
        let below = &self.layers[level - 1];
        let base = &self.layers[0];
        for cluster in &below.clusters {
            for &id in &cluster.nodes {
                let tile = self.nodes[id].tile;
                let own_cluster = layer.partition.cluster_of(tile);
                let crossings: Vec<Edge> = base
                    .edges_from(id)
                    .iter()
                    .filter(|e| {
                        e.kind == EdgeKind::Inter
                            && layer.partition.cluster_of(self.nodes[e.destination].tile) != own_cluster
                    })
                    .cloned()
                    .collect();
                if crossings.is_empty() {
                    continue;
                }
                self.nodes[id].top_layer = level;
                layer.add_node(id, tile);
                // each direction is copied when its own endpoint is visited
                layer.edges.entry(id).or_default().extend(crossings);
            }
        }

        for cluster_idx in 0..layer.clusters.len() {
            let bounds = layer.partition.rect(cluster_idx);
            let members = layer.clusters[cluster_idx].nodes.clone();
            for i in 0..members.len() {
                for j in (i + 1)..members.len() {
                    let route = abstract_astar(
                        &*self,
                        level - 1,
                        members[i],
                        members[j],
                        Some(bounds),
                        self.config.connectivity,
                    );
                    if let Some((underlying, cost)) = route {
                        layer.add_edge_pair(
                            members[i],
                            Edge {
                                destination: members[j],
                                cost,
                                kind: EdgeKind::Intra { underlying },
                            },
                        );
                    }
                }
            }
        }

        info!(
            "layer {}: {} clusters of size {}, {} nodes, {} edges",
            level,
            layer.clusters.len(),
            cluster_size,
            layer.node_count(),
            layer.edge_count() / 2
        );
        self.layers.push(layer);
    }

    pub fn map(&self) -> &'m GridMap {
        self.map
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, level: usize) -> &Layer {
        &self.layers[level]
    }

    pub fn top_layer(&self) -> usize {
        self.layers.len() - 1
    }

    pub fn node(&self, id: NodeId) -> &AbstractNode {
        &self.nodes[id]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Directed edges over all layers.
    pub fn edge_count(&self) -> usize {
        self.layers.iter().map(Layer::edge_count).sum()
    }

    /// All edges of one layer as `(origin, edge)` pairs.
    pub fn layer_edges(&self, level: usize) -> impl Iterator<Item = (NodeId, &Edge)> + '_ {
        self.layers[level]
            .edges
            .iter()
            .flat_map(|(&origin, edges)| edges.iter().map(move |e| (origin, e)))
    }
}

impl AbstractGraph for Graph<'_> {
    fn tile(&self, id: NodeId) -> GridTile {
        self.nodes[id].tile
    }

    fn edges(&self, layer: usize, id: NodeId) -> impl Iterator<Item = &Edge> {
        self.layers[layer].edges_from(id).iter()
    }
}

/// A* over one layer of an abstract graph, optionally restricted to nodes inside
/// `region`. Returns the node sequence (endpoints included) and its cost.
pub(crate) fn abstract_astar<G: AbstractGraph>(
    graph: &G,
    layer: usize,
    start: NodeId,
    goal: NodeId,
    region: Option<Rect>,
    connectivity: Connectivity,
) -> Option<(Vec<NodeId>, f64)> {
    let goal_tile = graph.tile(goal);
    let h = |id: NodeId| connectivity.heuristic(graph.tile(id), goal_tile);

    let mut came_from = HashMap::<NodeId, NodeId>::new();
    let mut g_score = HashMap::<NodeId, f64>::new();
    g_score.insert(start, 0.0);

    let mut pushed = 0u64;
    let mut open_set = BinaryHeap::<(Reverse<OrderedFloat<f64>>, u64, NodeId)>::new();
    open_set.push((Reverse(OrderedFloat(h(start))), pushed, start));

    while let Some((Reverse(OrderedFloat(f)), _, current)) = open_set.pop() {
        let current_g = g_score[&current];
        if current == goal {
            let mut total_path = vec![current];
            let mut node = current;
            while let Some(&prev) = came_from.get(&node) {
                node = prev;
                total_path.push(node);
            }
            total_path.reverse();
            return Some((total_path, current_g));
        }
        if f > current_g + h(current) {
            continue;
        }

        for edge in graph.edges(layer, current) {
            if let Some(region) = region {
                if !region.contains(graph.tile(edge.destination)) {
                    continue;
                }
            }
            let tentative_g_score = current_g + edge.cost;
            if tentative_g_score < *g_score.get(&edge.destination).unwrap_or(&f64::INFINITY) {
                came_from.insert(edge.destination, current);
                g_score.insert(edge.destination, tentative_g_score);
                pushed += 1;
                open_set.push((
                    Reverse(OrderedFloat(tentative_g_score + h(edge.destination))),
                    pushed,
                    edge.destination,
                ));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(cluster_size: u32, layer_depth: usize) -> GraphConfig {
        GraphConfig {
            cluster_size,
            layer_depth,
            entrance_split_width: 8,
            connectivity: Connectivity::Eight,
        }
    }

    fn open_rows(width: usize, height: usize) -> Vec<Vec<bool>> {
        vec![vec![false; width]; height]
    }

    #[test]
    fn one_cluster() {
        let map = GridMap::open(16, 16);
        let graph = Graph::build(&map, config(16, 1)).unwrap();
        assert_eq!(graph.layer(0).clusters.len(), 1);
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn two_clusters() {
        let map = GridMap::open(32, 16);
        let graph = Graph::build(&map, config(16, 1)).unwrap();
        assert_eq!(graph.layer(0).clusters.len(), 2);
        assert_eq!(graph.node_count(), 4, "Expected 4 nodes, was: {}", graph.node_count());
        for id in 0..graph.node_count() {
            assert_eq!(graph.layer(0).edges_from(id).len(), 2);
        }
    }

    #[test]
    fn four_clusters() {
        let map = GridMap::open(32, 32);
        let graph = Graph::build(&map, config(16, 1)).unwrap();
        assert_eq!(graph.layer(0).clusters.len(), 4);
        // four entrances split at their ends, the centre tiles are shared between borders
        assert_eq!(graph.node_count(), 12, "Expected 12 nodes, was: {}", graph.node_count());
    }

    #[test]
    fn four_clusters_with_obstacles() {
        let cluster_size = 16;
        let mut rows = open_rows(32, 32);

        // left wall blocked
        for row in rows.iter_mut() {
            row[0] = true;
        }
        // top vertical border closed
        for row in rows.iter_mut().take(cluster_size) {
            row[cluster_size] = true;
        }
        // left horizontal border semi-closed
        for x in 4..cluster_size {
            rows[cluster_size][x] = true;
        }
        // right horizontal border split
        for x in cluster_size + 4..cluster_size * 2 - 4 {
            rows[cluster_size][x] = true;
        }

        let map = GridMap::from_rows(rows).unwrap();
        let graph = Graph::build(&map, config(cluster_size as u32, 1)).unwrap();
        let clusters = &graph.layer(0).clusters;
        // cluster 0: one narrow entrance downwards (x 1..=3)
        assert_eq!(clusters[0].nodes.len(), 1);
        // cluster 1: two narrow entrances downwards
        assert_eq!(clusters[1].nodes.len(), 2);
        // cluster 2: one up, two at the ends of the open vertical border
        assert_eq!(clusters[2].nodes.len(), 3);
        // cluster 3: two up, two on the vertical border
        assert_eq!(clusters[3].nodes.len(), 4);

        for (idx, expected) in [(0, 1), (1, 2), (2, 3), (3, 4)] {
            assert!(
                clusters[idx]
                    .nodes
                    .iter()
                    .all(|&id| graph.layer(0).edges_from(id).len() == expected),
                "Expected all nodes in cluster {} to have {} edges",
                idx,
                expected
            );
        }
    }

    #[test]
    fn intra_edges_match_local_search() {
        let mut rows = open_rows(20, 20);
        for y in 2..9 {
            rows[y][5] = true;
        }
        for x in 11..18 {
            rows[14][x] = true;
        }
        let map = GridMap::from_rows(rows).unwrap();
        let graph = Graph::build(&map, config(10, 1)).unwrap();
        let layer = graph.layer(0);
        for (origin, edge) in graph.layer_edges(0) {
            let from = graph.node(origin).tile;
            let to = graph.node(edge.destination).tile;
            match edge.kind {
                EdgeKind::Inter => {
                    assert_eq!(edge.cost, STRAIGHT_COST);
                    assert_ne!(layer.partition.cluster_of(from), layer.partition.cluster_of(to));
                }
                EdgeKind::Intra { .. } => {
                    let cluster = layer.partition.cluster_of(from);
                    let bounds = layer.partition.rect(cluster);
                    let (_, cost) = astar(from, to, &map, bounds, Connectivity::Eight).unwrap();
                    assert_eq!(edge.cost, cost);
                }
            }
        }
    }

    #[test]
    fn isolated_cluster_has_no_nodes() {
        let mut rows = open_rows(12, 12);
        // block the whole top-left 4x4 cluster
        for row in rows.iter_mut().take(4) {
            for cell in row.iter_mut().take(4) {
                *cell = true;
            }
        }
        let map = GridMap::from_rows(rows).unwrap();
        let graph = Graph::build(&map, config(4, 1)).unwrap();
        assert!(graph.layer(0).clusters[0].nodes.is_empty());
    }

    #[test]
    fn layer_depth_limits() {
        assert_eq!(max_layer_depth(10, 10, 5), 2);
        assert_eq!(max_layer_depth(10, 10, 10), 1);
        assert_eq!(max_layer_depth(10, 10, 64), 1);
        assert_eq!(max_layer_depth(64, 32, 8), 4);

        let map = GridMap::open(10, 10);
        let err = Graph::build(&map, config(5, 3)).err().unwrap();
        assert_eq!(err, LayerDepthExceededError { requested: 3, max: 2 });
        assert!(Graph::build(&map, config(5, 2)).is_ok());
        // depth 0 is read as a single layer
        assert_eq!(Graph::build(&map, config(5, 0)).unwrap().layer_count(), 1);
    }

    #[test]
    fn upper_layers_promote_border_nodes() {
        let map = GridMap::open(32, 32);
        let graph = Graph::build(&map, config(8, 2)).unwrap();
        assert_eq!(graph.layer_count(), 2);
        let upper = graph.layer(1);
        assert_eq!(upper.clusters.len(), 4);
        assert!(upper.node_count() < graph.layer(0).node_count());
        for cluster in &upper.clusters {
            for &id in &cluster.nodes {
                assert_eq!(graph.node(id).top_layer, 1);
                let tile = graph.node(id).tile;
                assert!(tile.x == 15 || tile.x == 16 || tile.y == 15 || tile.y == 16);
            }
        }
        for (origin, edge) in graph.layer_edges(1) {
            assert!(upper.edges_from(edge.destination).iter().any(|e| e.destination == origin));
            if let EdgeKind::Intra { underlying } = &edge.kind {
                assert_eq!(underlying.first(), Some(&origin));
                assert_eq!(underlying.last(), Some(&edge.destination));
                // the underlying route costs exactly what the edge says
                let cost: f64 = underlying
                    .windows(2)
                    .map(|w| {
                        graph
                            .layer(0)
                            .edges_from(w[0])
                            .iter()
                            .filter(|e| e.destination == w[1])
                            .map(|e| e.cost)
                            .fold(f64::INFINITY, f64::min)
                    })
                    .sum();
                assert!((cost - edge.cost).abs() < 1e-9);
            }
        }
    }
}
