//! Internal id <-> public token conversion

use super::alphabet::Alphabet;
use super::permutation::{Feistel, Multiplicative, Permutation};
use super::{IdConfigError, IdError};
use crate::config::{IdsConfig, PermutationKind};

/// Converts internal sequential ids to public tokens and back.
///
/// Built once at startup and shared read-only between requests. Two layers
/// are composed: a keyed [`Permutation`] hides ordering, and a salted
/// [`Alphabet`] renders the permuted number as text.
///
/// # Example
///
/// ```rust
/// use amc_service::ids::{Alphabet, IdCodec, Multiplicative, Permutation, DEFAULT_ALPHABET};
///
/// let codec = IdCodec::new(
///     Permutation::Multiplicative(Multiplicative::new(542_174, u32::MAX as u64).unwrap()),
///     Alphabet::new("pepper", DEFAULT_ALPHABET, 0).unwrap(),
/// );
/// let token = codec.encode(42).unwrap();
/// assert_eq!(codec.decode(&token).unwrap(), 42);
/// ```
#[derive(Debug, Clone)]
pub struct IdCodec {
    permutation: Permutation,
    alphabet: Alphabet,
}

impl IdCodec {
    pub fn new(permutation: Permutation, alphabet: Alphabet) -> Self {
        Self {
            permutation,
            alphabet,
        }
    }

    /// Build the codec from configuration.
    ///
    /// Any error here is a deployment mistake and should abort startup.
    pub fn from_config(config: &IdsConfig) -> Result<Self, IdConfigError> {
        let permutation = match config.permutation {
            PermutationKind::Multiplicative => {
                Permutation::Multiplicative(Multiplicative::new(config.key, config.modulus)?)
            }
            PermutationKind::Feistel => Permutation::Feistel(Feistel::new(config.key, config.modulus)?),
        };
        let alphabet = Alphabet::new(&config.salt, &config.alphabet, config.min_length)?;

        tracing::debug!(
            permutation = ?config.permutation,
            domain = permutation.domain(),
            min_length = config.min_length,
            "Id codec initialized"
        );

        Ok(Self::new(permutation, alphabet))
    }

    pub fn permutation(&self) -> &Permutation {
        &self.permutation
    }

    /// Exclusive upper bound of encodable ids
    pub fn domain(&self) -> u64 {
        self.permutation.domain()
    }

    /// Encode an internal id. Deterministic for a given configuration.
    pub fn encode(&self, id: u64) -> Result<String, IdError> {
        let domain = self.domain();
        if id >= domain {
            return Err(IdError::OutOfRange { id, domain });
        }
        Ok(self.alphabet.encode(self.permutation.permute(id)))
    }

    /// Decode a public token.
    ///
    /// Every failure collapses into [`IdError::InvalidToken`]; the caller
    /// cannot tell a malformed token from one minted with another key.
    pub fn decode(&self, token: &str) -> Result<u64, IdError> {
        let permuted = self.alphabet.decode(token).ok_or(IdError::InvalidToken)?;
        if permuted >= self.domain() {
            return Err(IdError::InvalidToken);
        }
        Ok(self.permutation.invert(permuted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::DEFAULT_ALPHABET;
    use proptest::prelude::*;

    fn config(permutation: PermutationKind) -> IdsConfig {
        IdsConfig {
            permutation,
            ..IdsConfig::default()
        }
    }

    #[test]
    fn test_from_default_config() {
        let codec = IdCodec::from_config(&IdsConfig::default()).unwrap();
        assert_eq!(codec.domain(), u32::MAX as u64);
        let token = codec.encode(1).unwrap();
        assert_eq!(codec.decode(&token).unwrap(), 1);
    }

    #[test]
    fn test_from_config_rejects_shared_factor() {
        let config = IdsConfig {
            modulus: 1 << 20,
            key: 542_174,
            ..IdsConfig::default()
        };
        assert!(matches!(
            IdCodec::from_config(&config),
            Err(IdConfigError::NotCoprime { .. })
        ));
    }

    #[test]
    fn test_from_config_rejects_short_alphabet() {
        let config = IdsConfig {
            alphabet: "abc123".to_string(),
            ..IdsConfig::default()
        };
        assert!(matches!(
            IdCodec::from_config(&config),
            Err(IdConfigError::AlphabetTooShort { .. })
        ));
    }

    #[test]
    fn test_encode_outside_domain() {
        let codec = IdCodec::from_config(&IdsConfig::default()).unwrap();
        let err = codec.encode(u32::MAX as u64).unwrap_err();
        assert_eq!(
            err,
            IdError::OutOfRange {
                id: u32::MAX as u64,
                domain: u32::MAX as u64
            }
        );
    }

    #[test]
    fn test_decoded_value_outside_domain_is_invalid() {
        let codec = IdCodec::from_config(&IdsConfig::default()).unwrap();
        let alphabet = Alphabet::new("SaAaAalTy", DEFAULT_ALPHABET, 0).unwrap();
        let forged = alphabet.encode(u64::from(u32::MAX) + 10);
        assert_eq!(codec.decode(&forged), Err(IdError::InvalidToken));
    }

    #[test]
    fn test_sequential_ids_do_not_look_sequential() {
        let codec = IdCodec::from_config(&IdsConfig::default()).unwrap();
        let tokens: Vec<String> = (1..=20).map(|id| codec.encode(id).unwrap()).collect();
        let mut sorted = tokens.clone();
        sorted.sort();
        assert_ne!(tokens, sorted);
    }

    #[test]
    fn test_single_character_mutation_never_panics() {
        let codec = IdCodec::from_config(&IdsConfig::default()).unwrap();
        let token = codec.encode(123_456).unwrap();
        for position in 0..token.len() {
            for replacement in DEFAULT_ALPHABET.chars() {
                let mut mutated: Vec<char> = token.chars().collect();
                if mutated[position] == replacement {
                    continue;
                }
                mutated[position] = replacement;
                let mutated: String = mutated.into_iter().collect();
                match codec.decode(&mutated) {
                    Ok(id) => assert_ne!(id, 123_456),
                    Err(e) => assert_eq!(e, IdError::InvalidToken),
                }
            }
        }
    }

    proptest! {
        #[test]
        fn multiplicative_codec_is_a_bijection(id in 0u64..u32::MAX as u64) {
            let codec = IdCodec::from_config(&config(PermutationKind::Multiplicative)).unwrap();
            let token = codec.encode(id).unwrap();
            prop_assert_eq!(codec.decode(&token).unwrap(), id);
            prop_assert_eq!(codec.encode(id).unwrap(), token);
        }

        #[test]
        fn feistel_codec_is_a_bijection(id in 0u64..(1u64 << 32)) {
            let codec = IdCodec::from_config(&config(PermutationKind::Feistel)).unwrap();
            let token = codec.encode(id).unwrap();
            prop_assert_eq!(codec.decode(&token).unwrap(), id);
        }
    }
}
