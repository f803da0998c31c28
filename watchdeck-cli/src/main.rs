//! watchdeck — keep a registry of Go projects and rebuild them on change.
//!
//! # Usage
//!
//! ```text
//! watchdeck add [--name <name>] [--path <dir>] [--no-fmt] [--generate] [--test] [--build]
//!               [--no-bin] [--no-run] [--preview] [--params <arg>...]
//! watchdeck remove --name <name>
//! watchdeck list [--json]
//! watchdeck clean
//! watchdeck run [--legacy] [--interval <ms>]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{add::AddArgs, list::ListArgs, remove::RemoveArgs, run::RunArgs};

#[derive(Parser, Debug)]
#[command(
    name = "watchdeck",
    version,
    about = "Watch registered projects and rerun their pipelines on change",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a project directory.
    Add(AddArgs),

    /// Remove a project by name.
    Remove(RemoveArgs),

    /// Show every registered project and its settings.
    List(ListArgs),

    /// Drop duplicate entries, keeping the most recent one per name.
    Clean,

    /// Watch every registered project until interrupted.
    Run(RunArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Add(args) => args.run(),
        Commands::Remove(args) => args.run(),
        Commands::List(args) => args.run(),
        Commands::Clean => commands::clean::run(),
        Commands::Run(args) => args.run(),
    }
}
