use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path as FsPath;
use std::time::Instant;

use crate::error::LayerDepthExceededError;
use crate::graph::{Graph, GraphConfig};
use crate::grid_map::{GridMap, GridTile};
use crate::path::Path;
use crate::search::{FlatSearch, HierarchicalSearch, PathSearch};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub start: GridTile,
    pub goal: GridTile,
    pub grouping_id: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct AlgorithmResult {
    pub time_seconds: f64,
    /// Sum of step costs; NaN when no path was found.
    pub length: f64,
    #[serde(skip)]
    pub path: Path,
}

impl AlgorithmResult {
    pub fn measure(search: &dyn PathSearch, start: GridTile, goal: GridTile) -> Self {
        let before = Instant::now();
        let path = search.find_path(start, goal);
        let time_seconds = before.elapsed().as_secs_f64();
        Self {
            time_seconds,
            length: path.length().unwrap_or(f64::NAN),
            path,
        }
    }

    pub fn found(&self) -> bool {
        !self.path.is_empty()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CaseResult {
    pub grouping_id: u32,
    pub start: GridTile,
    pub goal: GridTile,
    pub flat: AlgorithmResult,
    pub hierarchical: AlgorithmResult,
}

#[derive(Clone, Debug, Serialize)]
pub struct BenchmarkReport {
    pub map_name: String,
    pub cluster_size: u32,
    pub layer_depth: usize,
    pub build_time_seconds: f64,
    pub results: Vec<CaseResult>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GroupSummary {
    pub cases: usize,
    pub flat_solved: usize,
    pub hierarchical_solved: usize,
    pub mean_flat_time_seconds: f64,
    pub mean_hierarchical_time_seconds: f64,
    /// Mean of hierarchical length / flat length over cases both solved.
    pub mean_length_ratio: f64,
}

impl BenchmarkReport {
    /// `<map>_c<cluster size>_l<layers>.json`
    pub fn default_file_name(&self) -> String {
        format!("{}_c{}_l{}.json", self.map_name, self.cluster_size, self.layer_depth)
    }

    /// Per grouping id aggregates, in ascending id order.
    pub fn summary(&self) -> BTreeMap<u32, GroupSummary> {
        let mut groups = BTreeMap::<u32, (GroupSummary, usize)>::new();
        for result in &self.results {
            let (summary, ratio_count) = groups.entry(result.grouping_id).or_default();
            summary.cases += 1;
            summary.mean_flat_time_seconds += result.flat.time_seconds;
            summary.mean_hierarchical_time_seconds += result.hierarchical.time_seconds;
            if result.flat.found() {
                summary.flat_solved += 1;
            }
            if result.hierarchical.found() {
                summary.hierarchical_solved += 1;
            }
            if result.flat.found() && result.hierarchical.found() && result.flat.length > 0.0 {
                summary.mean_length_ratio += result.hierarchical.length / result.flat.length;
                *ratio_count += 1;
            }
        }

        groups
            .into_iter()
            .map(|(id, (mut summary, ratio_count))| {
                let cases = summary.cases as f64;
                summary.mean_flat_time_seconds /= cases;
                summary.mean_hierarchical_time_seconds /= cases;
                summary.mean_length_ratio = if ratio_count > 0 {
                    summary.mean_length_ratio / ratio_count as f64
                } else {
                    f64::NAN
                };
                (id, summary)
            })
            .collect()
    }
}

/// Builds the graph once, then runs every case through HPA* and A* on the same
/// map and graph. Cases without a path are recorded like any other.
pub fn run_benchmark(
    map_name: &str,
    map: &GridMap,
    config: GraphConfig,
    cases: &[TestCase],
) -> Result<BenchmarkReport, LayerDepthExceededError> {
    let before = Instant::now();
    let graph = Graph::build(map, config)?;
    let build_time_seconds = before.elapsed().as_secs_f64();
    info!(
        "built {} layer(s) for {} in {:.3}s: {} nodes, {} edges",
        graph.layer_count(),
        map_name,
        build_time_seconds,
        graph.node_count(),
        graph.edge_count() / 2
    );

    let hpa_search = HierarchicalSearch::new(&graph);
    let flat_search = FlatSearch::new(map, graph.config().connectivity);

    let mut results = Vec::with_capacity(cases.len());
    for (idx, case) in cases.iter().enumerate() {
        let hierarchical = AlgorithmResult::measure(&hpa_search, case.start, case.goal);
        let flat = AlgorithmResult::measure(&flat_search, case.start, case.goal);
        debug!(
            "case {} {} -> {}: A* {:.3} in {:.6}s, HPA* {:.3} in {:.6}s",
            idx,
            case.start,
            case.goal,
            flat.length,
            flat.time_seconds,
            hierarchical.length,
            hierarchical.time_seconds
        );
        results.push(CaseResult {
            grouping_id: case.grouping_id,
            start: case.start,
            goal: case.goal,
            flat,
            hierarchical,
        });
    }

    let report = BenchmarkReport {
        map_name: map_name.to_string(),
        cluster_size: graph.config().cluster_size,
        layer_depth: graph.layer_count(),
        build_time_seconds,
        results,
    };
    info!("ran {} cases on {}", report.results.len(), map_name);
    Ok(report)
}

/// Writes the report as pretty-printed JSON, creating parent directories.
pub fn write_results<P: AsRef<FsPath>>(report: &BenchmarkReport, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)
        .with_context(|| format!("serializing results to {}", path.display()))?;
    writer.flush()?;
    info!("wrote results to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid_map::Connectivity;

    fn cases() -> Vec<TestCase> {
        vec![
            TestCase {
                start: GridTile::new(0, 0),
                goal: GridTile::new(19, 19),
                grouping_id: 1,
            },
            TestCase {
                start: GridTile::new(3, 17),
                goal: GridTile::new(18, 2),
                grouping_id: 1,
            },
            TestCase {
                start: GridTile::new(0, 0),
                goal: GridTile::new(10, 10),
                grouping_id: 2,
            },
        ]
    }

    fn walled_map() -> GridMap {
        // (10, 10) is enclosed
        let mut obstacles = vec![false; 20 * 20];
        for (x, y) in [(9, 9), (10, 9), (11, 9), (9, 10), (11, 10), (9, 11), (10, 11), (11, 11)] {
            obstacles[y * 20 + x] = true;
        }
        GridMap::from_obstacles(20, 20, obstacles).unwrap()
    }

    fn config() -> GraphConfig {
        GraphConfig {
            cluster_size: 5,
            layer_depth: 2,
            entrance_split_width: 6,
            connectivity: Connectivity::Eight,
        }
    }

    #[test]
    fn records_every_case() {
        let map = walled_map();
        let report = run_benchmark("walled", &map, config(), &cases()).unwrap();
        assert_eq!(report.map_name, "walled");
        assert_eq!(report.cluster_size, 5);
        assert_eq!(report.layer_depth, 2);
        assert!(report.build_time_seconds >= 0.0);
        assert_eq!(report.results.len(), 3);

        for result in &report.results[..2] {
            assert!(result.flat.found() && result.hierarchical.found());
            assert!(result.hierarchical.length >= result.flat.length - 1e-9);
        }
        let unreachable = &report.results[2];
        assert!(!unreachable.flat.found() && !unreachable.hierarchical.found());
        assert!(unreachable.flat.length.is_nan());

        let summary = report.summary();
        assert_eq!(summary[&1].cases, 2);
        assert_eq!(summary[&1].hierarchical_solved, 2);
        assert!(summary[&1].mean_length_ratio >= 1.0 - 1e-9);
        assert_eq!(summary[&2].flat_solved, 0);
        assert!(summary[&2].mean_length_ratio.is_nan());
    }

    #[test]
    fn depth_errors_surface() {
        let map = GridMap::open(8, 8);
        let mut config = config();
        config.layer_depth = 5;
        let err = run_benchmark("open", &map, config, &cases()).unwrap_err();
        assert_eq!(err.requested, 5);
    }

    #[test]
    fn writes_json_reports() {
        let map = walled_map();
        let report = run_benchmark("walled", &map, config(), &cases()).unwrap();
        assert_eq!(report.default_file_name(), "walled_c5_l2.json");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results").join(report.default_file_name());
        write_results(&report, &path).unwrap();

        let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["map_name"], "walled");
        assert_eq!(written["layer_depth"], 2);
        let results = written["results"].as_array().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0]["grouping_id"], 1);
        assert!(results[0]["flat"]["length"].as_f64().unwrap() > 0.0);
        assert!(results[0]["flat"].get("path").is_none());
        assert!(results[2]["hierarchical"]["length"].is_null());
    }
}
