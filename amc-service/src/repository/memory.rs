//! In-process store
//!
//! Used when no database is configured and by the test suite. All entity
//! types share one id sequence, like the database's global sequence, so an
//! id never names two different rows.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::error::{RepositoryError, RepositoryOperation};
use super::traits::{FavoriteRepository, ReadRepository, Repository, RepositoryResult};
use crate::models::{
    Exercise, ExerciseChanges, ExerciseFilter, NewExercise, NewUser, User, UserChanges,
    UserFilter, EXERCISE, USER,
};
use crate::pagination::Window;
use crate::validation::UniqueLookup;

#[derive(Debug, Default)]
struct Tables {
    last_id: u64,
    users: BTreeMap<u64, User>,
    exercises: BTreeMap<u64, Exercise>,
    /// (user, exercise) in the order they were favorited
    favorites: Vec<(u64, u64)>,
}

impl Tables {
    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    fn user_column_taken(&self, column: &str, value: &str, exclude_id: Option<u64>) -> bool {
        self.users.values().any(|user| {
            Some(user.id) != exclude_id
                && match column {
                    "username" => user.username == value,
                    "email" => user.email.as_deref() == Some(value),
                    _ => false,
                }
        })
    }

    fn first_taken_user_column(&self, user: &UserCandidate<'_>, exclude_id: Option<u64>) -> Option<&'static str> {
        if let Some(username) = user.username {
            if self.user_column_taken("username", username, exclude_id) {
                return Some("username");
            }
        }
        if let Some(email) = user.email {
            if self.user_column_taken("email", email, exclude_id) {
                return Some("email");
            }
        }
        None
    }

    fn is_favorite(&self, user_id: u64, exercise_id: u64) -> bool {
        self.favorites.contains(&(user_id, exercise_id))
    }
}

struct UserCandidate<'a> {
    username: Option<&'a str>,
    email: Option<&'a str>,
}

/// `tokio::sync::RwLock` backed store implementing every repository trait
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn slice<T: Clone>(rows: Vec<&T>, window: Option<Window>) -> Vec<T> {
    match window {
        Some(window) => rows
            .into_iter()
            .skip(usize::try_from(window.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(window.limit).unwrap_or(usize::MAX))
            .cloned()
            .collect(),
        None => rows.into_iter().cloned().collect(),
    }
}

#[async_trait]
impl ReadRepository<User, UserFilter> for MemoryStore {
    async fn find_by_id(&self, id: u64) -> RepositoryResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_all(
        &self,
        _filter: &UserFilter,
        window: Option<Window>,
    ) -> RepositoryResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(slice(tables.users.values().collect(), window))
    }

    async fn count(&self, _filter: &UserFilter) -> RepositoryResult<u64> {
        Ok(self.tables.read().await.users.len() as u64)
    }
}

#[async_trait]
impl Repository<User, NewUser, UserChanges, UserFilter> for MemoryStore {
    async fn create(&self, data: NewUser) -> RepositoryResult<User> {
        let mut tables = self.tables.write().await;
        let candidate = UserCandidate {
            username: Some(&data.username),
            email: data.email.as_deref(),
        };
        if let Some(column) = tables.first_taken_user_column(&candidate, None) {
            return Err(RepositoryError::already_exists(USER.table, column));
        }

        let now = Utc::now();
        let user = User {
            id: tables.next_id(),
            username: data.username,
            email: data.email,
            password_hash: data.password_hash,
            created_at: now,
            updated_at: now,
            last_login: None,
        };
        tables.users.insert(user.id, user.clone());
        tracing::debug!(user_id = user.id, "Created user");
        Ok(user)
    }

    async fn update(&self, id: u64, data: UserChanges) -> RepositoryResult<User> {
        let mut tables = self.tables.write().await;
        let candidate = UserCandidate {
            username: data.username.as_deref(),
            email: data.email.as_deref(),
        };
        if let Some(column) = tables.first_taken_user_column(&candidate, Some(id)) {
            return Err(RepositoryError::already_exists(USER.table, column)
                .with_operation(RepositoryOperation::Update));
        }

        let user = tables.users.get_mut(&id).ok_or_else(|| {
            RepositoryError::not_found(USER.name, id.to_string())
                .with_operation(RepositoryOperation::Update)
        })?;
        if let Some(username) = data.username {
            user.username = username;
        }
        if let Some(email) = data.email {
            user.email = Some(email);
        }
        if let Some(last_login) = data.last_login {
            user.last_login = Some(last_login);
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete(&self, id: u64) -> RepositoryResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        tables.favorites.retain(|(user_id, _)| *user_id != id);
        for exercise in tables.exercises.values_mut() {
            if exercise.author_id == Some(id) {
                exercise.author_id = None;
            }
        }
        tracing::debug!(user_id = id, "Deleted user");
        Ok(true)
    }
}

#[async_trait]
impl UniqueLookup for MemoryStore {
    async fn find_conflicts(
        &self,
        candidates: &[(&'static str, String)],
        exclude_id: Option<u64>,
    ) -> RepositoryResult<Vec<&'static str>> {
        let tables = self.tables.read().await;
        Ok(candidates
            .iter()
            .filter(|(column, value)| tables.user_column_taken(column, value, exclude_id))
            .map(|(column, _)| *column)
            .collect())
    }
}

#[async_trait]
impl ReadRepository<Exercise, ExerciseFilter> for MemoryStore {
    async fn find_by_id(&self, id: u64) -> RepositoryResult<Option<Exercise>> {
        Ok(self.tables.read().await.exercises.get(&id).cloned())
    }

    async fn find_all(
        &self,
        filter: &ExerciseFilter,
        window: Option<Window>,
    ) -> RepositoryResult<Vec<Exercise>> {
        let tables = self.tables.read().await;
        let rows = tables
            .exercises
            .values()
            .filter(|ex| matches_filter(&tables, ex, filter))
            .collect();
        Ok(slice(rows, window))
    }

    async fn count(&self, filter: &ExerciseFilter) -> RepositoryResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .exercises
            .values()
            .filter(|ex| matches_filter(&tables, ex, filter))
            .count() as u64)
    }
}

fn matches_filter(tables: &Tables, exercise: &Exercise, filter: &ExerciseFilter) -> bool {
    filter.author_id.is_none_or(|author| exercise.author_id == Some(author))
        && filter
            .favorited_by
            .is_none_or(|user| tables.is_favorite(user, exercise.id))
}

#[async_trait]
impl Repository<Exercise, NewExercise, ExerciseChanges, ExerciseFilter> for MemoryStore {
    async fn create(&self, data: NewExercise) -> RepositoryResult<Exercise> {
        let mut tables = self.tables.write().await;
        if let Some(author_id) = data.author_id {
            if !tables.users.contains_key(&author_id) {
                return Err(RepositoryError::constraint_violation(
                    RepositoryOperation::Create,
                    "Author does not exist",
                )
                .with_entity(USER.name, author_id.to_string()));
            }
        }

        let now = Utc::now();
        let exercise = Exercise {
            id: tables.next_id(),
            title: data.title,
            description: data.description,
            data: data.data,
            author_id: data.author_id,
            created_at: now,
            updated_at: now,
        };
        tables.exercises.insert(exercise.id, exercise.clone());
        tracing::debug!(exercise_id = exercise.id, author_id = ?exercise.author_id, "Created exercise");
        Ok(exercise)
    }

    async fn update(&self, id: u64, data: ExerciseChanges) -> RepositoryResult<Exercise> {
        let mut tables = self.tables.write().await;
        let exercise = tables.exercises.get_mut(&id).ok_or_else(|| {
            RepositoryError::not_found(EXERCISE.name, id.to_string())
                .with_operation(RepositoryOperation::Update)
        })?;
        if let Some(title) = data.title {
            exercise.title = title;
        }
        if let Some(description) = data.description {
            exercise.description = description;
        }
        if let Some(data) = data.data {
            exercise.data = data;
        }
        exercise.updated_at = Utc::now();
        Ok(exercise.clone())
    }

    async fn delete(&self, id: u64) -> RepositoryResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.exercises.remove(&id).is_none() {
            return Ok(false);
        }
        tables.favorites.retain(|(_, exercise_id)| *exercise_id != id);
        Ok(true)
    }
}

#[async_trait]
impl FavoriteRepository for MemoryStore {
    async fn add_favorite(&self, user_id: u64, exercise_id: u64) -> RepositoryResult<bool> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(RepositoryError::not_found(USER.name, user_id.to_string())
                .with_operation(RepositoryOperation::Favorite));
        }
        if !tables.exercises.contains_key(&exercise_id) {
            return Err(RepositoryError::not_found(EXERCISE.name, exercise_id.to_string())
                .with_operation(RepositoryOperation::Favorite));
        }
        if tables.is_favorite(user_id, exercise_id) {
            return Ok(false);
        }
        tables.favorites.push((user_id, exercise_id));
        Ok(true)
    }

    async fn remove_favorite(&self, user_id: u64, exercise_id: u64) -> RepositoryResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.favorites.len();
        tables
            .favorites
            .retain(|pair| *pair != (user_id, exercise_id));
        Ok(tables.favorites.len() != before)
    }
}
