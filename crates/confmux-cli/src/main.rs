//! confmux CLI
//!
//! Resolves configuration keys through the stock providers, in priority
//! order: `--set` flags, environment variables, the YAML file, defaults.

mod cli;
mod commands;
mod error;
mod logging;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let repo = commands::build_repository(&cli)?;
    let result = match &cli.command {
        Commands::Get { key, json } => {
            commands::run_get(&repo, key, *json).map(|out| println!("{out}"))
        }
        Commands::Keys => {
            print!("{}", commands::run_keys(&repo));
            Ok(())
        }
    };

    // Close providers even when the command failed
    let closed = repo.tear_down();
    result?;
    closed?;
    Ok(())
}
