use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;

mod commands;

use commands::db::DbCommands;
use commands::ids::IdsCommands;
use commands::token::TokenCommands;

/// amc - operator tooling for amc-service
#[derive(Parser)]
#[command(name = "amc")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to the service's search path)
    #[arg(long, global = true, env = "AMC_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Public id encoding and key generation
    Ids {
        #[command(subcommand)]
        command: IdsCommands,
    },
    /// Database schema statements
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Bearer tokens for testing and support
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },
    /// Describe the registered entity types
    Schema {
        /// Entity name (case-insensitive); all when omitted
        entity: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Ids { command } => commands::ids::execute(command, cli.config.as_deref()),
        Commands::Db { command } => commands::db::execute(command, cli.config.as_deref()),
        Commands::Token { command } => commands::token::execute(command, cli.config.as_deref()),
        Commands::Schema { entity } => commands::schema::execute(entity.as_deref()),
    };

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);

            if let Some(source) = e.source() {
                eprintln!("\n{} {}", "Caused by:".yellow(), source);
            }

            std::process::exit(1);
        }
    }
}
