use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use hierarchical_pf::benchmark::{AlgorithmResult, run_benchmark, write_results};
use hierarchical_pf::graph::{Graph, GraphConfig};
use hierarchical_pf::grid_map::{Connectivity, GridTile};
use hierarchical_pf::search::{FlatSearch, HierarchicalSearch};
use hierarchical_pf::{logging, movingai};

#[derive(Parser, Debug)]
#[command(name = "hpa-bench", version, about = "Compare grid A* and hierarchical A* on MovingAI maps")]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct GraphArgs {
    /// Path to an octile .map file
    #[arg(long)]
    map: PathBuf,
    /// Side of the layer 0 clusters, in tiles
    #[arg(long, default_value_t = 10)]
    cluster_size: u32,
    /// Number of abstraction layers
    #[arg(long, default_value_t = 1)]
    layers: usize,
    /// Entrances at least this wide get two nodes
    #[arg(long, default_value_t = 6)]
    entrance_split_width: u32,
    /// Restrict movement to the four cardinal directions
    #[arg(long)]
    four_connected: bool,
}

impl GraphArgs {
    fn config(&self) -> GraphConfig {
        GraphConfig {
            cluster_size: self.cluster_size,
            layer_depth: self.layers,
            entrance_split_width: self.entrance_split_width,
            connectivity: if self.four_connected {
                Connectivity::Four
            } else {
                Connectivity::Eight
            },
        }
    }

    fn map_name(&self) -> String {
        self.map
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.map.display().to_string())
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run every scenario of a map through both algorithms and write a JSON report
    Bench {
        #[command(flatten)]
        graph: GraphArgs,
        /// Scenario file (defaults to <map>.scen)
        #[arg(long)]
        scen: Option<PathBuf>,
        /// Output directory for the report
        #[arg(long, default_value = "results")]
        out: PathBuf,
    },
    /// Find one path with both algorithms
    Path {
        #[command(flatten)]
        graph: GraphArgs,
        /// Start tile as x,y
        #[arg(long, value_parser = parse_tile)]
        start: GridTile,
        /// Goal tile as x,y
        #[arg(long, value_parser = parse_tile)]
        goal: GridTile,
    },
    /// Build the abstraction and print per-layer statistics
    Info {
        #[command(flatten)]
        graph: GraphArgs,
    },
}

fn parse_tile(s: &str) -> Result<GridTile> {
    let (x, y) = s.split_once(',').ok_or_else(|| anyhow!("expected x,y, got {s}"))?;
    Ok(GridTile::new(x.trim().parse()?, y.trim().parse()?))
}

fn scenario_path(map: &Path) -> PathBuf {
    let mut scen = map.as_os_str().to_owned();
    scen.push(".scen");
    PathBuf::from(scen)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_level.as_deref());

    match cli.command {
        Commands::Bench { graph, scen, out } => {
            let map = movingai::load_map(&graph.map).with_context(|| format!("loading {}", graph.map.display()))?;
            let scen = scen.unwrap_or_else(|| scenario_path(&graph.map));
            let cases = movingai::load_test_cases(&scen).with_context(|| format!("loading {}", scen.display()))?;
            let report = run_benchmark(&graph.map_name(), &map, graph.config(), &cases)?;
            for (id, summary) in report.summary() {
                println!(
                    "group {:>3}: {} cases, A* {}/{} in {:.6}s, HPA* {}/{} in {:.6}s, length ratio {:.4}",
                    id,
                    summary.cases,
                    summary.flat_solved,
                    summary.cases,
                    summary.mean_flat_time_seconds,
                    summary.hierarchical_solved,
                    summary.cases,
                    summary.mean_hierarchical_time_seconds,
                    summary.mean_length_ratio
                );
            }
            write_results(&report, out.join(report.default_file_name()))
        }
        Commands::Path { graph: args, start, goal } => {
            let map = movingai::load_map(&args.map).with_context(|| format!("loading {}", args.map.display()))?;
            let graph = Graph::build(&map, args.config())?;
            let hierarchical = AlgorithmResult::measure(&HierarchicalSearch::new(&graph), start, goal);
            let flat = AlgorithmResult::measure(&FlatSearch::new(&map, args.config().connectivity), start, goal);
            for (name, result) in [("HPA*", &hierarchical), ("A*", &flat)] {
                if result.found() {
                    println!(
                        "{:<5} length {:.4}, {} tiles, {:.6}s",
                        name,
                        result.length,
                        result.path.tiles().len(),
                        result.time_seconds
                    );
                } else {
                    println!("{:<5} no path, {:.6}s", name, result.time_seconds);
                }
            }
            Ok(())
        }
        Commands::Info { graph: args } => {
            let map = movingai::load_map(&args.map).with_context(|| format!("loading {}", args.map.display()))?;
            let graph = Graph::build(&map, args.config())?;
            println!(
                "{}: {}x{}, {} open tiles",
                args.map_name(),
                map.width(),
                map.height(),
                map.open_tile_count()
            );
            for level in 0..graph.layer_count() {
                let layer = graph.layer(level);
                println!(
                    "layer {}: cluster size {}, {} clusters, {} nodes, {} edges",
                    level,
                    layer.partition.cluster_size(),
                    layer.clusters.len(),
                    layer.node_count(),
                    layer.edge_count() / 2
                );
            }
            Ok(())
        }
    }
}
