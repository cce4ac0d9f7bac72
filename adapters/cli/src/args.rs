use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use maze_explorer_system_pathfinding::{Algorithm, DistanceMetric};

/// Explores fog-of-war mazes against a simulated game server.
#[derive(Debug, Parser)]
#[command(name = "maze-explorer", version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) mode: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    /// Collect targets and finish the world.
    Run(RunArgs),
    /// Explore until the whole reachable maze is known, then save it.
    Reveal(RunArgs),
}

#[derive(Debug, Args)]
pub(crate) struct RunArgs {
    /// World identifier used to pick the profile and the snapshot file
    #[arg(short, long, default_value = "m01")]
    pub(crate) world: String,

    /// Text maze to explore; a random maze is generated when omitted
    #[arg(short, long)]
    pub(crate) maze: Option<PathBuf>,

    /// Seed for the generated maze
    #[arg(long, default_value_t = 1)]
    pub(crate) seed: u64,

    /// Rooms per row of the generated maze
    #[arg(long, default_value_t = 20)]
    pub(crate) width: u32,

    /// Rooms per column of the generated maze
    #[arg(long, default_value_t = 12)]
    pub(crate) height: u32,

    /// Collectibles placed in the generated maze
    #[arg(long, default_value_t = 25)]
    pub(crate) coins: usize,

    /// Search strategy
    #[arg(long, value_enum, default_value_t = SearchKind::Astar)]
    pub(crate) algorithm: SearchKind,

    /// Heuristic used by A*
    #[arg(long, value_enum, default_value_t = MetricKind::Octile)]
    pub(crate) metric: MetricKind,

    /// Profile file; defaults to config/profiles.toml when present
    #[arg(long)]
    pub(crate) profiles: Option<PathBuf>,

    /// Directory holding saved maps
    #[arg(long)]
    pub(crate) snapshots: Option<PathBuf>,

    /// Seed the episode with the saved map of this world
    #[arg(long, requires = "snapshots")]
    pub(crate) use_saved: bool,

    /// Print the discovered map every N actions (0 disables)
    #[arg(long, default_value_t = 0)]
    pub(crate) render_every: usize,

    /// Cancel the episode after N actions (0 means no limit)
    #[arg(long, default_value_t = 0)]
    pub(crate) max_actions: usize,
}

impl RunArgs {
    /// Path finder selected on the command line.
    pub(crate) const fn algorithm(&self) -> Algorithm {
        match self.algorithm {
            SearchKind::Bfs => Algorithm::Bfs,
            SearchKind::Astar => Algorithm::AStar(match self.metric {
                MetricKind::Octile => DistanceMetric::Octile,
                MetricKind::Legacy => DistanceMetric::LegacyAbsDelta,
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum SearchKind {
    /// Breadth-first search
    Bfs,
    /// A* search
    Astar,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum MetricKind {
    /// Octile distance
    Octile,
    /// Absolute-coordinate difference
    Legacy,
}
