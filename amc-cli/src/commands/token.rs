use std::path::Path;

use amc_service::auth::TokenVerifier;
use amc_service::ids::IdCodec;
use anyhow::{Context, Result};
use clap::Subcommand;

use super::load_config;

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Sign a bearer token for a user
    Issue {
        /// Internal user id
        #[arg(conflicts_with = "public_id", required_unless_present = "public_id")]
        user_id: Option<u64>,

        /// Public user id token instead of the internal id
        #[arg(long)]
        public_id: Option<String>,
    },
}

pub fn execute(command: TokenCommands, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;

    match command {
        TokenCommands::Issue { user_id, public_id } => {
            let codec = IdCodec::from_config(&config.ids).context("Invalid [ids] configuration")?;
            let subject = match (user_id, public_id) {
                (Some(id), _) => codec
                    .encode(id)
                    .with_context(|| format!("Cannot encode {id}"))?,
                (None, Some(token)) => {
                    codec
                        .decode(&token)
                        .with_context(|| format!("{token} is not a valid public id"))?;
                    token
                }
                (None, None) => anyhow::bail!("Pass a user id or --public-id"),
            };

            let token = TokenVerifier::new(&config.auth).issue(&subject)?;
            println!("{token}");
            Ok(())
        }
    }
}
