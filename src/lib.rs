//! Grid pathfinding with plain A* and layered hierarchical A* (HPA*), plus a
//! harness that benchmarks the two against each other.

pub mod astar;
pub mod benchmark;
pub mod cluster;
pub mod error;
pub mod graph;
pub mod grid_map;
pub mod hpastar;
pub mod logging;
pub mod movingai;
pub mod path;
pub mod search;

#[cfg(test)]
mod plot;

pub use astar::find_path_flat;
pub use benchmark::{BenchmarkReport, TestCase, run_benchmark, write_results};
pub use error::{LayerDepthExceededError, MapFormatError, ScenarioError};
pub use graph::{Graph, GraphConfig};
pub use grid_map::{Connectivity, GridMap, GridTile};
pub use hpastar::find_path_hierarchical;
pub use movingai::{load_map, load_test_cases};
pub use path::Path;
pub use search::{FlatSearch, HierarchicalSearch, PathSearch};

/// Builds the abstraction for `map`; see [`Graph::build`].
pub fn build_graph(map: &GridMap, config: GraphConfig) -> Result<Graph<'_>, LayerDepthExceededError> {
    Graph::build(map, config)
}
