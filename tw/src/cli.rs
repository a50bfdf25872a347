//! CLI argument parsing for the tickmesh worker

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "tw")]
#[command(author, version, about = "Generic tickmesh worker", long_about = None)]
pub struct Cli {
    /// Run under a coordinator: wait for tick/command signals instead of reading stdin
    #[arg(short, long)]
    pub child: bool,

    /// Run this command file before anything else
    #[arg(short = 'C', long, value_name = "FILE")]
    pub commands: Option<PathBuf>,

    /// Runtime directory shared with the coordinator
    #[arg(short, long, env = tickproto::RUNTIME_DIR_ENV, value_name = "DIR")]
    pub runtime_dir: Option<PathBuf>,

    /// Input port names
    #[arg(long, value_delimiter = ',', default_value = "x,y,z")]
    pub inputs: Vec<String>,

    /// Output port names
    #[arg(long, value_delimiter = ',', default_value = "nx,ny,nz")]
    pub outputs: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,
}
