//! prefs CLI
//!
//! Inspects and edits file-backed preference stores through a key schema,
//! using the same page lifecycle an interactive preference dialog would.

mod cli;
mod commands;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Commands};
use commands::Locations;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing if verbose
    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
        tracing::debug!("Verbose mode enabled");
    }

    let locations = Locations {
        schema: cli.schema,
        dir: cli.dir,
        project: cli.project,
    };

    match cli.command {
        Some(cmd) => execute_command(&locations, cmd),
        None => {
            println!("{} Preference store CLI", "prefs".green().bold());
            println!();
            println!("Run {} for available commands.", "prefs --help".cyan());
            Ok(())
        }
    }
}

fn execute_command(locations: &Locations, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Show { json } => commands::run_show(locations, json),
        Commands::Get { key } => commands::run_get(locations, &key),
        Commands::Set { assignments } => commands::run_set(locations, &assignments),
        Commands::Reset { keys } => commands::run_reset(locations, &keys),
        Commands::Check => commands::run_check(locations),
    }
}
