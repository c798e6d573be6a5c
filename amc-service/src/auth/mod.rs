//! Authentication: bearer token verification and password hashing
//!
//! Tokens are issued by an external identity provider sharing the HS256
//! secret; this service only verifies them. Registration hashes passwords with
//! Argon2id so the provider can check them later.
//!
//! # Example
//!
//! ```rust
//! use amc_service::auth::TokenVerifier;
//! use amc_service::config::Config;
//!
//! let verifier = TokenVerifier::new(&Config::default().auth);
//! let token = verifier.issue("gR7kq").unwrap();
//! assert_eq!(verifier.verify(&token).unwrap().sub, "gR7kq");
//! ```

mod password;
mod token;

pub use password::PasswordHasher;
pub use token::{bearer_token, Caller, Claims, MaybeCaller, TokenVerifier};
