//! Obfuscated public identifiers
//!
//! Rows are keyed by sequential integers internally. Everything that leaves
//! the service carries an opaque token instead, produced by [`IdCodec`]:
//!
//! ```text
//! internal id --permute--> scattered u64 --alphabet--> "gR7kq"
//! ```
//!
//! Rotating the key, modulus or salt invalidates every token handed out so
//! far. Treat them as persistent deployment configuration.

mod alphabet;
mod codec;
mod extract;
mod permutation;

pub use alphabet::{Alphabet, DEFAULT_ALPHABET};
pub use codec::IdCodec;
pub use extract::PublicId;
pub use permutation::{
    find_coprime, gcd, mod_inverse, Feistel, Multiplicative, Permutation, FEISTEL_FUNCTION_NAME,
    GLOBAL_SEQUENCE_NAME,
};

use thiserror::Error;

/// Per-request id conversion failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// Internal id outside the permutation domain
    #[error("id {id} is outside the encodable range [0, {domain})")]
    OutOfRange { id: u64, domain: u64 },

    /// Token is malformed, non-canonical, or minted under another configuration
    #[error("invalid id token")]
    InvalidToken,
}

/// Startup-time configuration failures. These are fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdConfigError {
    #[error("obfuscation key {key} is not coprime to modulus {modulus}")]
    NotCoprime { key: u64, modulus: u64 },

    #[error("modulus {0} is too small")]
    ModulusTooSmall(u64),

    #[error("alphabet needs at least {minimum} unique characters, got {actual}")]
    AlphabetTooShort { minimum: usize, actual: usize },

    #[error("alphabet must not contain whitespace")]
    AlphabetWhitespace,

    #[error("invalid alphabet: {0}")]
    Alphabet(String),
}
