use anyhow::Result;
use clap::{Parser, Subcommand};

mod check;
mod utils;
mod wasm;

use wasm::BindgenTarget;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Development utility tasks for lilypad-wrapper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the wasm module and its JS bindings into pkg/
    Build {
        /// Build with the release profile
        #[arg(long)]
        release: bool,
        /// Kind of JS glue to generate
        #[arg(long, value_enum, default_value_t = BindgenTarget::Web)]
        target: BindgenTarget,
    },
    /// Run check, fmt, clippy and tests for native and wasm crates
    Check {
        /// Skip the formatting check
        #[arg(long)]
        skip_fmt: bool,
    },
    /// Build for Node and call the exported bindings from demos/smoke.mjs
    Smoke,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { release, target } => wasm::build(release, target),
        Commands::Check { skip_fmt } => check::run_check(skip_fmt),
        Commands::Smoke => wasm::smoke(),
    }
}
