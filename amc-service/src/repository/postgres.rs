//! PostgreSQL store
//!
//! Every table draws ids from one global sequence so an id never names rows
//! of two different types. Unique indexes back the collision validation and
//! catch the race between check and insert.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use super::error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
use super::traits::{FavoriteRepository, ReadRepository, Repository, RepositoryResult};
use crate::ids::GLOBAL_SEQUENCE_NAME;
use crate::models::{
    Exercise, ExerciseChanges, ExerciseFilter, NewExercise, NewUser, User, UserChanges,
    UserFilter, EXERCISE, USER,
};
use crate::pagination::Window;
use crate::validation::UniqueLookup;

/// Association table for favorites
pub const FAVORITES_TABLE: &str = "user_favorite_exercise";

/// Schema statements, in execution order
pub fn schema() -> Vec<String> {
    vec![
        format!("CREATE SEQUENCE IF NOT EXISTS {GLOBAL_SEQUENCE_NAME}"),
        format!(
            "CREATE TABLE IF NOT EXISTS {users} (
                id BIGINT PRIMARY KEY DEFAULT nextval('{GLOBAL_SEQUENCE_NAME}'),
                username VARCHAR(32) NOT NULL UNIQUE,
                email TEXT UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                last_login TIMESTAMPTZ
            )",
            users = USER.table
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {exercises} (
                id BIGINT PRIMARY KEY DEFAULT nextval('{GLOBAL_SEQUENCE_NAME}'),
                title VARCHAR(128) NOT NULL,
                description TEXT NOT NULL,
                data JSONB NOT NULL DEFAULT '{{}}',
                author_id BIGINT REFERENCES {users}(id) ON DELETE SET NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
            exercises = EXERCISE.table,
            users = USER.table
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS {exercises}_author_id_idx ON {exercises} (author_id)",
            exercises = EXERCISE.table
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {FAVORITES_TABLE} (
                user_id BIGINT NOT NULL REFERENCES {users}(id) ON DELETE CASCADE,
                exercise_id BIGINT NOT NULL REFERENCES {exercises}(id) ON DELETE CASCADE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                PRIMARY KEY (user_id, exercise_id)
            )",
            users = USER.table,
            exercises = EXERCISE.table
        ),
    ]
}

/// sqlx-backed store implementing every repository trait
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create missing tables
    pub async fn migrate(&self) -> RepositoryResult<()> {
        for statement in schema() {
            sqlx::query(&statement)
                .execute(&self.pool)
                .await
                .map_err(|e| RepositoryError::from(e).with_operation(RepositoryOperation::Migrate))?;
        }
        tracing::info!("Database schema is up to date");
        Ok(())
    }
}

/// Internal ids beyond `i64::MAX` cannot exist in the database
fn db_id(id: u64) -> Option<i64> {
    i64::try_from(id).ok()
}

fn row_id(row: &PgRow, column: &str) -> Result<u64, sqlx::Error> {
    let id: i64 = row.try_get(column)?;
    u64::try_from(id).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row_id(row, "id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        last_login: row.try_get("last_login")?,
    })
}

fn exercise_from_row(row: &PgRow) -> Result<Exercise, sqlx::Error> {
    let author_id: Option<i64> = row.try_get("author_id")?;
    Ok(Exercise {
        id: row_id(row, "id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        data: row.try_get("data")?,
        author_id: author_id.and_then(|id| u64::try_from(id).ok()),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn limit_offset(window: Option<Window>) -> (Option<i64>, i64) {
    match window {
        Some(w) => (
            Some(i64::try_from(w.limit).unwrap_or(i64::MAX)),
            i64::try_from(w.offset).unwrap_or(i64::MAX),
        ),
        None => (None, 0),
    }
}

#[async_trait]
impl ReadRepository<User, UserFilter> for PgStore {
    async fn find_by_id(&self, id: u64) -> RepositoryResult<Option<User>> {
        let Some(id) = db_id(id) else {
            return Ok(None);
        };
        let row = sqlx::query(&format!("SELECT * FROM {} WHERE id = $1", USER.table))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_all(
        &self,
        _filter: &UserFilter,
        window: Option<Window>,
    ) -> RepositoryResult<Vec<User>> {
        let (limit, offset) = limit_offset(window);
        let rows = sqlx::query(&format!(
            "SELECT * FROM {} ORDER BY id LIMIT $1 OFFSET $2",
            USER.table
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::from(e).with_operation(RepositoryOperation::FindAll))?;
        Ok(rows.iter().map(user_from_row).collect::<Result<Vec<_>, _>>()?)
    }

    async fn count(&self, _filter: &UserFilter) -> RepositoryResult<u64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", USER.table))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::from(e).with_operation(RepositoryOperation::Count))?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl Repository<User, NewUser, UserChanges, UserFilter> for PgStore {
    async fn create(&self, data: NewUser) -> RepositoryResult<User> {
        let row = sqlx::query(&format!(
            "INSERT INTO {} (username, email, password_hash) VALUES ($1, $2, $3) RETURNING *",
            USER.table
        ))
        .bind(&data.username)
        .bind(&data.email)
        .bind(&data.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from(e).with_operation(RepositoryOperation::Create))?;
        let user = user_from_row(&row)?;
        tracing::debug!(user_id = user.id, "Created user");
        Ok(user)
    }

    async fn update(&self, id: u64, data: UserChanges) -> RepositoryResult<User> {
        let not_found = || {
            RepositoryError::not_found(USER.name, id.to_string())
                .with_operation(RepositoryOperation::Update)
        };
        let key = db_id(id).ok_or_else(not_found)?;
        let row = sqlx::query(&format!(
            "UPDATE {} SET
                username = COALESCE($2, username),
                email = COALESCE($3, email),
                last_login = COALESCE($4, last_login),
                updated_at = now()
             WHERE id = $1
             RETURNING *",
            USER.table
        ))
        .bind(key)
        .bind(&data.username)
        .bind(&data.email)
        .bind(data.last_login)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::from(e).with_operation(RepositoryOperation::Update))?
        .ok_or_else(not_found)?;
        Ok(user_from_row(&row)?)
    }

    async fn delete(&self, id: u64) -> RepositoryResult<bool> {
        let Some(id) = db_id(id) else {
            return Ok(false);
        };
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", USER.table))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::from(e).with_operation(RepositoryOperation::Delete))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UniqueLookup for PgStore {
    async fn find_conflicts(
        &self,
        candidates: &[(&'static str, String)],
        exclude_id: Option<u64>,
    ) -> RepositoryResult<Vec<&'static str>> {
        let exclude = exclude_id.and_then(db_id);
        let mut taken = Vec::new();
        for (column, value) in candidates {
            // Column names are interpolated, so only registered ones are accepted
            if !USER.unique_columns.contains(column) {
                continue;
            }
            let exists: bool = sqlx::query_scalar(&format!(
                "SELECT EXISTS (SELECT 1 FROM {} WHERE {column} = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
                USER.table
            ))
            .bind(value)
            .bind(exclude)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::from(e).with_operation(RepositoryOperation::UniqueLookup))?;
            if exists {
                taken.push(*column);
            }
        }
        Ok(taken)
    }
}

const EXERCISE_FILTER: &str = "($1::BIGINT IS NULL OR e.author_id = $1)
    AND ($2::BIGINT IS NULL OR EXISTS (
        SELECT 1 FROM user_favorite_exercise f WHERE f.exercise_id = e.id AND f.user_id = $2
    ))";

fn filter_ids(filter: &ExerciseFilter) -> (Option<i64>, Option<i64>) {
    // An id that cannot exist must still filter, so map it to an impossible one
    let id = |value: Option<u64>| value.map(|v| db_id(v).unwrap_or(-1));
    (id(filter.author_id), id(filter.favorited_by))
}

#[async_trait]
impl ReadRepository<Exercise, ExerciseFilter> for PgStore {
    async fn find_by_id(&self, id: u64) -> RepositoryResult<Option<Exercise>> {
        let Some(id) = db_id(id) else {
            return Ok(None);
        };
        let row = sqlx::query(&format!("SELECT * FROM {} WHERE id = $1", EXERCISE.table))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(exercise_from_row).transpose()?)
    }

    async fn find_all(
        &self,
        filter: &ExerciseFilter,
        window: Option<Window>,
    ) -> RepositoryResult<Vec<Exercise>> {
        let (author_id, favorited_by) = filter_ids(filter);
        let (limit, offset) = limit_offset(window);
        let rows = sqlx::query(&format!(
            "SELECT e.* FROM {} e WHERE {EXERCISE_FILTER} ORDER BY e.id LIMIT $3 OFFSET $4",
            EXERCISE.table
        ))
        .bind(author_id)
        .bind(favorited_by)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::from(e).with_operation(RepositoryOperation::FindAll))?;
        Ok(rows.iter().map(exercise_from_row).collect::<Result<Vec<_>, _>>()?)
    }

    async fn count(&self, filter: &ExerciseFilter) -> RepositoryResult<u64> {
        let (author_id, favorited_by) = filter_ids(filter);
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} e WHERE {EXERCISE_FILTER}",
            EXERCISE.table
        ))
        .bind(author_id)
        .bind(favorited_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from(e).with_operation(RepositoryOperation::Count))?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl Repository<Exercise, NewExercise, ExerciseChanges, ExerciseFilter> for PgStore {
    async fn create(&self, data: NewExercise) -> RepositoryResult<Exercise> {
        let row = sqlx::query(&format!(
            "INSERT INTO {} (title, description, data, author_id) VALUES ($1, $2, $3, $4) RETURNING *",
            EXERCISE.table
        ))
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.data)
        .bind(data.author_id.and_then(db_id))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from(e).with_operation(RepositoryOperation::Create))?;
        let exercise = exercise_from_row(&row)?;
        tracing::debug!(exercise_id = exercise.id, author_id = ?exercise.author_id, "Created exercise");
        Ok(exercise)
    }

    async fn update(&self, id: u64, data: ExerciseChanges) -> RepositoryResult<Exercise> {
        let not_found = || {
            RepositoryError::not_found(EXERCISE.name, id.to_string())
                .with_operation(RepositoryOperation::Update)
        };
        let key = db_id(id).ok_or_else(not_found)?;
        let row = sqlx::query(&format!(
            "UPDATE {} SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                data = COALESCE($4, data),
                updated_at = now()
             WHERE id = $1
             RETURNING *",
            EXERCISE.table
        ))
        .bind(key)
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.data)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::from(e).with_operation(RepositoryOperation::Update))?
        .ok_or_else(not_found)?;
        Ok(exercise_from_row(&row)?)
    }

    async fn delete(&self, id: u64) -> RepositoryResult<bool> {
        let Some(id) = db_id(id) else {
            return Ok(false);
        };
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", EXERCISE.table))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::from(e).with_operation(RepositoryOperation::Delete))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl FavoriteRepository for PgStore {
    async fn add_favorite(&self, user_id: u64, exercise_id: u64) -> RepositoryResult<bool> {
        let (Some(user), Some(exercise)) = (db_id(user_id), db_id(exercise_id)) else {
            return Err(RepositoryError::not_found(EXERCISE.name, exercise_id.to_string())
                .with_operation(RepositoryOperation::Favorite));
        };
        let result = sqlx::query(&format!(
            "INSERT INTO {FAVORITES_TABLE} (user_id, exercise_id) VALUES ($1, $2) ON CONFLICT DO NOTHING"
        ))
        .bind(user)
        .bind(exercise)
        .execute(&self.pool)
        .await
        .map_err(|e| match RepositoryError::from(e) {
            // Foreign key violation: the user or the exercise is gone
            err if err.kind == RepositoryErrorKind::ConstraintViolation => {
                RepositoryError::not_found(EXERCISE.name, exercise_id.to_string())
                    .with_operation(RepositoryOperation::Favorite)
            }
            err => err.with_operation(RepositoryOperation::Favorite),
        })?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_favorite(&self, user_id: u64, exercise_id: u64) -> RepositoryResult<bool> {
        let (Some(user), Some(exercise)) = (db_id(user_id), db_id(exercise_id)) else {
            return Ok(false);
        };
        let result = sqlx::query(&format!(
            "DELETE FROM {FAVORITES_TABLE} WHERE user_id = $1 AND exercise_id = $2"
        ))
        .bind(user)
        .bind(exercise)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::from(e).with_operation(RepositoryOperation::Favorite))?;
        Ok(result.rows_affected() > 0)
    }
}
