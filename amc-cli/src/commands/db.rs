use std::path::Path;

use amc_service::config::PermutationKind;
use amc_service::ids::{Feistel, FEISTEL_FUNCTION_NAME, GLOBAL_SEQUENCE_NAME};
use amc_service::repository::schema;
use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use super::load_config;

#[derive(Subcommand)]
pub enum DbCommands {
    /// Print the table definitions the server applies when `migrate` is on
    Schema,
    /// Print the PL/pgSQL function computing the Feistel permutation in the database
    FeistelDdl {
        /// Print the DROP statement instead
        #[arg(long)]
        drop: bool,
    },
}

pub fn execute(command: DbCommands, config: Option<&Path>) -> Result<()> {
    match command {
        DbCommands::Schema => {
            for statement in schema() {
                println!("{statement};\n");
            }
            Ok(())
        }
        DbCommands::FeistelDdl { drop: true } => {
            println!("{}", Feistel::drop_plpgsql());
            Ok(())
        }
        DbCommands::FeistelDdl { drop: false } => {
            let config = load_config(config)?;
            if config.ids.permutation != PermutationKind::Feistel {
                eprintln!(
                    "{} ids.permutation is not \"feistel\"; the server will not use this function.",
                    "Warning:".yellow().bold()
                );
            }
            let feistel = Feistel::new(config.ids.key, config.ids.modulus)
                .context("Invalid [ids] configuration")?;
            println!("{}", feistel.to_plpgsql());
            println!(
                "{}",
                format!(
                    "-- column default: {FEISTEL_FUNCTION_NAME}(nextval('{GLOBAL_SEQUENCE_NAME}'))"
                )
                .dimmed()
            );
            Ok(())
        }
    }
}
