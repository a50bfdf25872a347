//! CLI argument parsing for the tick coordinator

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "tc")]
#[command(author, version, about = "Supervise tickmesh workers and drive them in lock-step", long_about = None)]
pub struct Cli {
    /// Topology file: worker roster, mappings and parameters
    pub config: PathBuf,

    /// Run without the interactive command loop
    #[arg(short, long, visible_alias = "no-repl")]
    pub child: bool,

    /// Run this command file before anything else; exits 1 if any line fails
    #[arg(short = 'C', long, value_name = "FILE")]
    pub commands: Option<PathBuf>,

    /// Keep the runtime directory on exit
    #[arg(short, long, visible_alias = "tmpkeep")]
    pub keep_runtime: bool,

    /// Runtime directory shared with workers
    #[arg(short, long, value_name = "DIR")]
    pub runtime_dir: Option<PathBuf>,

    /// Settings file (YAML)
    #[arg(short, long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,
}
