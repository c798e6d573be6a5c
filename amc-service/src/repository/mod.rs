//! Storage abstraction
//!
//! Handlers talk to [`UserRepository`] and [`ExerciseRepository`] trait
//! objects. Two backends implement them:
//!
//! - [`MemoryStore`]: in-process, used without a configured database and in tests
//! - `PgStore` (feature `database`): PostgreSQL through sqlx
//!
//! Listings are paginated by wrapping a repository and a filter in a
//! [`RepositorySource`], which the pager counts once and slices once.
//!
//! # Example
//!
//! ```rust
//! use amc_service::models::{NewUser, User, UserChanges, UserFilter};
//! use amc_service::repository::{MemoryStore, ReadRepository, Repository};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//!     let store = MemoryStore::new();
//!     let users: &dyn Repository<User, NewUser, UserChanges, UserFilter> = &store;
//!     let joey = users
//!         .create(NewUser {
//!             username: "joey".to_string(),
//!             email: None,
//!             password_hash: String::new(),
//!         })
//!         .await
//!         .unwrap();
//!     assert_eq!(users.count(&UserFilter).await.unwrap(), 1);
//!     assert!(users.find_by_id(joey.id).await.unwrap().is_some());
//! # });
//! ```

mod error;
mod memory;
#[cfg(feature = "database")]
mod postgres;
mod source;
mod traits;

pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
pub use memory::MemoryStore;
#[cfg(feature = "database")]
pub use postgres::{schema, PgStore, FAVORITES_TABLE};
pub use source::RepositorySource;
pub use traits::{
    ExerciseRepository, FavoriteRepository, ReadRepository, Repository, RepositoryResult,
    UserRepository,
};
