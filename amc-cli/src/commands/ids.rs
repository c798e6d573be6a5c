use std::path::Path;

use amc_service::ids::{find_coprime, IdCodec};
use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use super::load_config;

#[derive(Subcommand)]
pub enum IdsCommands {
    /// Print the public token of internal ids
    Encode {
        /// Internal ids
        #[arg(required = true)]
        ids: Vec<u64>,
    },
    /// Print the internal id behind public tokens
    Decode {
        /// Public id tokens
        #[arg(required = true)]
        tokens: Vec<String>,
    },
    /// Generate a random multiplicative key for a modulus
    Keygen {
        /// Permutation domain; defaults to the configured modulus
        #[arg(long)]
        modulus: Option<u64>,
    },
}

pub fn execute(command: IdsCommands, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;

    match command {
        IdsCommands::Encode { ids } => {
            let codec = IdCodec::from_config(&config.ids).context("Invalid [ids] configuration")?;
            for id in ids {
                let token = codec
                    .encode(id)
                    .with_context(|| format!("Cannot encode {id}"))?;
                println!("{}\t{}", id, token.green());
            }
            Ok(())
        }
        IdsCommands::Decode { tokens } => {
            let codec = IdCodec::from_config(&config.ids).context("Invalid [ids] configuration")?;
            let mut failed = 0;
            for token in tokens {
                match codec.decode(&token) {
                    Ok(id) => println!("{}\t{}", token, id.to_string().green()),
                    Err(e) => {
                        failed += 1;
                        println!("{}\t{}", token, e.to_string().red());
                    }
                }
            }
            if failed > 0 {
                anyhow::bail!("{failed} token(s) did not decode");
            }
            Ok(())
        }
        IdsCommands::Keygen { modulus } => {
            let modulus = modulus.unwrap_or(config.ids.modulus);
            let key = keygen(modulus)?;
            println!("{}", "# Add to the [ids] section of config.toml".dimmed());
            println!("modulus = {modulus}");
            println!("key = {}", key.to_string().green());
            println!();
            println!(
                "{} changing the key invalidates every public id already handed out.",
                "Warning:".yellow().bold()
            );
            Ok(())
        }
    }
}

fn keygen(modulus: u64) -> Result<u64> {
    find_coprime(modulus).with_context(|| format!("No key for modulus {modulus}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use amc_service::ids::gcd;

    #[test]
    fn test_keygen_is_coprime() {
        for modulus in [3, 10, 1_000, u64::from(u32::MAX)] {
            let key = keygen(modulus).unwrap();
            assert!((2..modulus).contains(&key));
            assert_eq!(gcd(modulus, key), 1);
        }
    }

    #[test]
    fn test_keygen_rejects_tiny_modulus() {
        assert!(keygen(2).is_err());
    }
}
