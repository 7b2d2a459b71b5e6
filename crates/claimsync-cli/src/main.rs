//! claimsync CLI: reconcile source metadata into a statement store.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "claimsync=debug" } else { "claimsync=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Sync {
            file,
            config,
            dry_run,
            create,
            offline,
            report,
        } => commands::sync::run(
            file,
            config,
            commands::sync::Overrides {
                dry_run,
                create,
                offline,
                report,
            },
            cli.verbose,
        ),
        Commands::Plan {
            file,
            snapshot,
            config,
            json,
        } => commands::plan::run(file, snapshot, config, json, cli.verbose),
        Commands::ParseDate { text, century } => commands::parse_date::run(text, century, cli.verbose),
        Commands::Fingerprint { file, algorithm } => commands::fingerprint::run(file, algorithm),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
