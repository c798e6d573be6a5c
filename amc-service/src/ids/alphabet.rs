//! Salted alphabet encoding
//!
//! Renders a single integer as a short token in the hashids format via
//! [`harsh`]. Decoding re-encodes the result and compares, so only canonical
//! tokens are accepted.

use std::fmt;
use std::sync::Arc;

use harsh::Harsh;

use super::IdConfigError;

/// Base62 alphabet used when none is configured
pub const DEFAULT_ALPHABET: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ1234567890";

const MIN_ALPHABET_LENGTH: usize = 16;

/// Salted alphabet codec for one non-negative integer per token
#[derive(Clone)]
pub struct Alphabet {
    harsh: Arc<Harsh>,
    /// Longest canonical token; anything longer is rejected before decoding
    max_token_len: usize,
}

impl Alphabet {
    pub fn new(salt: &str, alphabet: &str, min_length: usize) -> Result<Self, IdConfigError> {
        if !alphabet.is_ascii() {
            return Err(IdConfigError::Alphabet(
                "alphabet must be ASCII".to_string(),
            ));
        }
        let mut unique: Vec<char> = Vec::with_capacity(alphabet.len());
        for c in alphabet.chars() {
            if !unique.contains(&c) {
                unique.push(c);
            }
        }
        if unique.len() < MIN_ALPHABET_LENGTH {
            return Err(IdConfigError::AlphabetTooShort {
                minimum: MIN_ALPHABET_LENGTH,
                actual: unique.len(),
            });
        }
        if unique.iter().any(|c| c.is_whitespace()) {
            return Err(IdConfigError::AlphabetWhitespace);
        }

        let harsh = Harsh::builder()
            .salt(salt)
            .alphabet(unique.into_iter().collect::<String>())
            .length(min_length)
            .build()
            .map_err(|e| IdConfigError::Alphabet(e.to_string()))?;
        let max_token_len = harsh.encode(&[u64::MAX]).len().max(min_length);

        Ok(Self {
            harsh: Arc::new(harsh),
            max_token_len,
        })
    }

    pub fn encode(&self, value: u64) -> String {
        self.harsh.encode(&[value])
    }

    /// Decode a token, returning `None` for anything that is not the canonical
    /// encoding of exactly one integer.
    pub fn decode(&self, token: &str) -> Option<u64> {
        if token.is_empty() || !token.is_ascii() || token.len() > self.max_token_len {
            return None;
        }
        match self.harsh.decode(token).ok()?.as_slice() {
            [value] if self.encode(*value) == token => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Debug for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Alphabet")
            .field("max_token_len", &self.max_token_len)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(min_length: usize) -> Alphabet {
        Alphabet::new("SaAaAalTy", DEFAULT_ALPHABET, min_length).unwrap()
    }

    #[test]
    fn test_known_hashids_vectors() {
        let plain = Alphabet::new("this is my salt", DEFAULT_ALPHABET, 0).unwrap();
        assert_eq!(plain.encode(12_345), "NkK9");
        assert_eq!(plain.decode("NkK9"), Some(12_345));

        let padded = Alphabet::new("this is my salt", DEFAULT_ALPHABET, 8).unwrap();
        assert_eq!(padded.encode(1), "gB0NV05e");
        assert_eq!(padded.decode("gB0NV05e"), Some(1));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let a = codec(0);
        assert_eq!(a.encode(542_174), a.encode(542_174));
        assert_ne!(a.encode(1), a.encode(2));
    }

    #[test]
    fn test_roundtrip_edges() {
        for min_length in [0, 8, 12] {
            let a = codec(min_length);
            for value in [0, 1, 99, 100, 101, 542_174, u32::MAX as u64, u64::MAX] {
                let token = a.encode(value);
                assert!(token.len() >= min_length);
                assert_eq!(a.decode(&token), Some(value), "token {token}");
            }
        }
    }

    #[test]
    fn test_salt_changes_tokens() {
        let a = Alphabet::new("one", DEFAULT_ALPHABET, 0).unwrap();
        let b = Alphabet::new("two", DEFAULT_ALPHABET, 0).unwrap();
        let token = a.encode(12_345);
        assert_ne!(token, b.encode(12_345));
        assert_ne!(b.decode(&token), Some(12_345));
    }

    #[test]
    fn test_min_length_padding() {
        let a = codec(12);
        for value in [0, 7, 1_000, 542_174] {
            let token = a.encode(value);
            assert_eq!(token.chars().count(), 12);
            assert_eq!(a.decode(&token), Some(value));
        }
    }

    #[test]
    fn test_rejects_garbage() {
        let a = codec(0);
        assert_eq!(a.decode(""), None);
        assert_eq!(a.decode("!!!"), None);
        assert_eq!(a.decode("   "), None);
        assert_eq!(a.decode("ÿÿÿÿ"), None);
    }

    #[test]
    fn test_rejects_non_canonical_suffix() {
        let a = codec(0);
        let token = a.encode(42);
        for extra in ['c', 'f', 'a', '1'] {
            let extended = format!("{token}{extra}");
            assert_ne!(a.decode(&extended), Some(42), "token {extended}");
        }
    }

    #[test]
    fn test_rejects_overflowing_token() {
        let a = codec(0);
        let long: String = std::iter::repeat('z').take(40).collect();
        assert_eq!(a.decode(&long), None);
    }

    #[test]
    fn test_alphabet_validation() {
        assert!(matches!(
            Alphabet::new("", "abcdefg", 0),
            Err(IdConfigError::AlphabetTooShort { minimum: 16, actual: 7 })
        ));
        assert!(matches!(
            Alphabet::new("", "abcdefghijklmnop qrstuvwxyz", 0),
            Err(IdConfigError::AlphabetWhitespace)
        ));
        assert!(matches!(
            Alphabet::new("", "abcdefghijklmnopqrstuvwxyzé", 0),
            Err(IdConfigError::Alphabet(_))
        ));
        // duplicates are collapsed before the length check
        assert!(Alphabet::new("", "aaaaaaaaaaaaaaaaaaaaaaaaaa", 0).is_err());
    }

    #[test]
    fn test_alphabet_without_default_separators() {
        let a = Alphabet::new("pepper", "0123456789ABDEGJKLMNOPQRVWXYZ", 0).unwrap();
        for value in [0, 5, 31_337, u32::MAX as u64] {
            assert_eq!(a.decode(&a.encode(value)), Some(value));
        }
    }
}
