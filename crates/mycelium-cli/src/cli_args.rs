use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "mycelium",
    version,
    about = "Map a repository's structural topology for reasoning agents"
)]
pub(crate) struct Cli {
    /// Repository root to analyse
    pub root: PathBuf,

    /// Destination artifact (default: <repo_name>.mycelium.json)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Restrict parsing to these language tags (comma list: cs,vb,ts,js,py,java,go,rs,c,cpp)
    #[arg(short, long, value_delimiter = ',')]
    pub languages: Option<Vec<String>>,

    /// Initial Louvain resolution
    #[arg(long, default_value_t = 1.0)]
    pub resolution: f64,

    /// Cap on traced processes
    #[arg(long, default_value_t = 75)]
    pub max_processes: usize,

    /// Trace depth bound
    #[arg(long, default_value_t = 10)]
    pub max_depth: usize,

    /// Extra ignore globs (comma list)
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Per-phase progress on stderr
    #[arg(long)]
    pub verbose: bool,

    /// Suppress the summary line
    #[arg(long)]
    pub quiet: bool,
}
