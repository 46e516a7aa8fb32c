use std::error::Error;
use std::io;

use clap::{Parser, Subcommand};
use commands::{
    grid::{self, GridArgs},
    simulate::{self, SimulateArgs},
};
use tracing_subscriber::EnvFilter;

mod commands;
mod experiment;

#[derive(Parser, Debug)]
#[command(name = "ado-sim", about = "Adaptive design optimization simulator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a simulated session against a respondent with known parameters.
    Simulate(SimulateArgs),
    /// Build the grids and likelihood tables and report their sizes.
    Grid(GridArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Simulate(args) => simulate::run(&args),
        Command::Grid(args) => grid::run(&args),
    }
}
