//! # amc-service
//!
//! REST backend for a catalogue of exercises and the users who author and
//! favorite them.
//!
//! ## Features
//!
//! - **Public ids**: internal integer keys never leave the service; every id
//!   in a URL or body is an obfuscated, reversible token
//! - **Pagination**: `page` / `per_page`; page counts and links sit beside `items`
//! - **Expansion**: related resources render as links unless named in
//!   `?expand=`, with dotted paths for nested relations
//! - **Storage**: in-memory by default, PostgreSQL behind the `database`
//!   feature
//! - **Auth**: Argon2id password hashes, HS256 bearer tokens
//! - **Graceful shutdown**: SIGTERM and SIGINT
//!
//! ## Example
//!
//! ```rust,no_run
//! use amc_service::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config);
//!
//!     let state = AppState::builder()
//!         .config(config.clone())
//!         .build()
//!         .await?;
//!
//!     Server::new(config).serve(router(state)).await
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod expand;
pub mod health;
pub mod ids;
pub mod models;
pub mod observability;
pub mod pagination;
pub mod query;
pub mod repository;
pub mod responses;
pub mod routes;
pub mod server;
pub mod state;
pub mod validation;

#[cfg(feature = "database")]
pub mod database;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::auth::{Caller, MaybeCaller, PasswordHasher, TokenVerifier};
    pub use crate::config::{Config, IdsConfig, PermutationKind};
    pub use crate::error::{Error, Result};
    pub use crate::expand::{Expand, Expandable, Representation};
    pub use crate::health::{health, readiness};
    pub use crate::ids::{IdCodec, PublicId};
    pub use crate::models::{Exercise, User, EXERCISE, USER};
    pub use crate::observability::init_tracing;
    pub use crate::pagination::{CollectionUrl, Page, PageRequest, Pager};
    pub use crate::query::QueryParams;
    pub use crate::repository::{
        ExerciseRepository, MemoryStore, RepositoryError, RepositoryErrorKind, UserRepository,
    };
    pub use crate::responses::{Created, NoContent};
    pub use crate::routes::router;
    pub use crate::server::Server;
    pub use crate::state::{AppState, AppStateBuilder};

    #[cfg(feature = "database")]
    pub use crate::repository::PgStore;

    pub use axum::{
        extract::{Query, State},
        routing::{delete, get, post, put},
        Json, Router,
    };
}
