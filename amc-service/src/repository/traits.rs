//! Repository trait definitions
//!
//! The traits are object safe (via `async_trait`) so handlers can hold
//! `Arc<dyn UserRepository>` and stay agnostic of the backing store.
//!
//! - [`ReadRepository`]: lookups, filtered listing and counting
//! - [`Repository`]: adds create, update and delete
//! - [`FavoriteRepository`]: the user/exercise favorites association

use async_trait::async_trait;

use super::error::RepositoryError;
use crate::models::{
    Exercise, ExerciseChanges, ExerciseFilter, NewExercise, NewUser, User, UserChanges, UserFilter,
};
use crate::pagination::Window;
use crate::validation::UniqueLookup;

/// Result type for repository operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Read side of a repository.
///
/// `find_all` must return rows in a stable order (ascending id) so that
/// offset windows never skip or repeat rows between pages.
#[async_trait]
pub trait ReadRepository<Entity, Filter>: Send + Sync
where
    Entity: Send + 'static,
    Filter: Sync + 'static,
{
    /// `Ok(None)` when no row has this id
    async fn find_by_id(&self, id: u64) -> RepositoryResult<Option<Entity>>;

    /// Rows matching `filter`, restricted to `window` when given
    async fn find_all(
        &self,
        filter: &Filter,
        window: Option<Window>,
    ) -> RepositoryResult<Vec<Entity>>;

    /// Number of rows matching `filter`
    async fn count(&self, filter: &Filter) -> RepositoryResult<u64>;
}

/// Full CRUD repository
#[async_trait]
pub trait Repository<Entity, Create, Update, Filter>: ReadRepository<Entity, Filter>
where
    Entity: Send + 'static,
    Create: Send + 'static,
    Update: Send + 'static,
    Filter: Sync + 'static,
{
    /// Insert a row; the store assigns id and timestamps
    async fn create(&self, data: Create) -> RepositoryResult<Entity>;

    /// Apply `data` to an existing row.
    ///
    /// # Errors
    ///
    /// `NotFound` kind when the row does not exist.
    async fn update(&self, id: u64, data: Update) -> RepositoryResult<Entity>;

    /// `true` if a row was deleted, `false` if it did not exist
    async fn delete(&self, id: u64) -> RepositoryResult<bool>;
}

/// Ordered set of exercises a user marked as favorite
#[async_trait]
pub trait FavoriteRepository: Send + Sync {
    /// `false` if it was already a favorite
    async fn add_favorite(&self, user_id: u64, exercise_id: u64) -> RepositoryResult<bool>;

    /// `false` if it was not a favorite
    async fn remove_favorite(&self, user_id: u64, exercise_id: u64) -> RepositoryResult<bool>;
}

/// User storage with collision lookups for its unique columns
pub trait UserRepository:
    Repository<User, NewUser, UserChanges, UserFilter> + UniqueLookup
{
}

impl<T> UserRepository for T where
    T: Repository<User, NewUser, UserChanges, UserFilter> + UniqueLookup
{
}

/// Exercise storage together with favorites
pub trait ExerciseRepository:
    Repository<Exercise, NewExercise, ExerciseChanges, ExerciseFilter> + FavoriteRepository
{
}

impl<T> ExerciseRepository for T where
    T: Repository<Exercise, NewExercise, ExerciseChanges, ExerciseFilter> + FavoriteRepository
{
}
