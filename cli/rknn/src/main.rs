//! rknn: inspect RKNN model containers from the command line.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rknn", version, about = "Inspect RKNN model containers")]
struct Cli {
    /// Verbosity level (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the model report as JSON
    Info {
        /// Model file (.rknn or bare VPMN)
        model: PathBuf,
        /// Decoder configuration (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the compute graph projection and op-type histogram as JSON
    Graph {
        /// Model file (.rknn or bare VPMN)
        model: PathBuf,
        /// Decoder configuration (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Omit tensor shapes from edge labels
        #[arg(long)]
        no_shapes: bool,
        /// Draw constant tensors as their own nodes
        #[arg(long)]
        constants: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Info { model, config } => commands::info::run(&model, config.as_deref()),
        Commands::Graph {
            model,
            config,
            no_shapes,
            constants,
        } => commands::graph::run(&model, config.as_deref(), !no_shapes, constants),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
