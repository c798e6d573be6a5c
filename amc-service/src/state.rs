//! Application state management

use std::sync::Arc;

use axum::extract::FromRef;

#[cfg(feature = "database")]
use sqlx::PgPool;

use crate::auth::{PasswordHasher, TokenVerifier};
use crate::config::Config;
use crate::error::Result;
use crate::ids::IdCodec;
use crate::models::{EXERCISE, USER};
use crate::repository::{ExerciseRepository, MemoryStore, UserRepository};

/// Application state shared across handlers
///
/// Everything in here is immutable after startup; cloning is a handful of
/// reference count bumps.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    codec: Arc<IdCodec>,
    verifier: Arc<TokenVerifier>,
    hasher: Arc<PasswordHasher>,
    users: Arc<dyn UserRepository>,
    exercises: Arc<dyn ExerciseRepository>,
}

impl AppState {
    /// Create a builder for the application state
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn codec(&self) -> &IdCodec {
        &self.codec
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    pub fn users(&self) -> &dyn UserRepository {
        self.users.as_ref()
    }

    pub fn exercises(&self) -> &dyn ExerciseRepository {
        self.exercises.as_ref()
    }

    /// Absolute link builder for this deployment
    pub fn links(&self) -> Links<'_> {
        Links {
            base: self.config.service.base_url(),
            codec: &self.codec,
        }
    }
}

impl FromRef<AppState> for Arc<IdCodec> {
    fn from_ref(state: &AppState) -> Self {
        state.codec.clone()
    }
}

impl FromRef<AppState> for Arc<TokenVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.verifier.clone()
    }
}

/// Absolute URLs of resources, with ids encoded as public tokens
#[derive(Clone, Copy)]
pub struct Links<'a> {
    base: &'a str,
    codec: &'a IdCodec,
}

impl Links<'_> {
    pub fn token(&self, id: u64) -> Result<String> {
        Ok(self.codec.encode(id)?)
    }

    pub fn users(&self) -> String {
        format!("{}{}", self.base, USER.collection_path)
    }

    pub fn user(&self, id: u64) -> Result<String> {
        Ok(format!("{}{}", self.base, USER.member_path(&self.token(id)?)))
    }

    pub fn exercise(&self, id: u64) -> Result<String> {
        Ok(format!("{}{}", self.base, EXERCISE.member_path(&self.token(id)?)))
    }

    /// Exercise collection filtered by author
    pub fn exercises_by_author(&self, user_id: u64) -> Result<String> {
        self.exercises_filtered("author_id", user_id)
    }

    /// Exercise collection filtered by who favorited them
    pub fn favorites_of(&self, user_id: u64) -> Result<String> {
        self.exercises_filtered("favorited_by", user_id)
    }

    fn exercises_filtered(&self, param: &str, user_id: u64) -> Result<String> {
        Ok(format!(
            "{}{}?{param}={}",
            self.base,
            EXERCISE.collection_path,
            self.token(user_id)?
        ))
    }
}

/// Builder for [`AppState`]
///
/// Storage is picked in this order: stores set explicitly, then an explicit
/// pool or the `database` config section (feature `database`), then an
/// in-memory store.
#[derive(Default)]
pub struct AppStateBuilder {
    config: Option<Config>,
    users: Option<Arc<dyn UserRepository>>,
    exercises: Option<Arc<dyn ExerciseRepository>>,
    #[cfg(feature = "database")]
    db_pool: Option<PgPool>,
}

impl AppStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration (defaults to `Config::default()`)
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Back both repositories with one in-memory store
    pub fn memory_store(mut self, store: Arc<MemoryStore>) -> Self {
        self.users = Some(store.clone());
        self.exercises = Some(store);
        self
    }

    pub fn stores(
        mut self,
        users: Arc<dyn UserRepository>,
        exercises: Arc<dyn ExerciseRepository>,
    ) -> Self {
        self.users = Some(users);
        self.exercises = Some(exercises);
        self
    }

    /// Use an existing pool instead of connecting from config
    #[cfg(feature = "database")]
    pub fn db_pool(mut self, pool: PgPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    /// Build the state.
    ///
    /// # Errors
    ///
    /// Invalid identifier or password parameters, and database connection
    /// or migration failures, abort startup.
    pub async fn build(self) -> Result<AppState> {
        let config = self.config.unwrap_or_default();

        let codec = IdCodec::from_config(&config.ids)?;
        tracing::info!(
            permutation = ?config.ids.permutation,
            domain = codec.domain(),
            "Identifier codec ready"
        );
        let verifier = TokenVerifier::new(&config.auth);
        let hasher = PasswordHasher::new(&config.password)?;

        let (users, exercises) = match (self.users, self.exercises) {
            (Some(users), Some(exercises)) => (users, exercises),
            #[cfg(feature = "database")]
            _ => Self::database_stores(&config, self.db_pool).await?,
            #[cfg(not(feature = "database"))]
            _ => {
                if config.database.is_some() {
                    tracing::warn!("Database configured but the `database` feature is disabled");
                }
                Self::memory_stores()
            }
        };

        Ok(AppState {
            config: Arc::new(config),
            codec: Arc::new(codec),
            verifier: Arc::new(verifier),
            hasher: Arc::new(hasher),
            users,
            exercises,
        })
    }

    #[cfg(feature = "database")]
    async fn database_stores(
        config: &Config,
        pool: Option<PgPool>,
    ) -> Result<(Arc<dyn UserRepository>, Arc<dyn ExerciseRepository>)> {
        let migrate = config.database.as_ref().is_some_and(|db| db.migrate);
        let pool = match (pool, &config.database) {
            (Some(pool), _) => pool,
            (None, Some(db_config)) => crate::database::create_pool(db_config).await?,
            (None, None) => return Ok(Self::memory_stores()),
        };

        let store = Arc::new(crate::repository::PgStore::new(pool));
        if migrate {
            store.migrate().await?;
        }
        tracing::info!("Using PostgreSQL storage");
        let users: Arc<dyn UserRepository> = store.clone();
        let exercises: Arc<dyn ExerciseRepository> = store;
        Ok((users, exercises))
    }

    fn memory_stores() -> (Arc<dyn UserRepository>, Arc<dyn ExerciseRepository>) {
        tracing::info!("Using in-memory storage");
        let store = Arc::new(MemoryStore::new());
        let users: Arc<dyn UserRepository> = store.clone();
        let exercises: Arc<dyn ExerciseRepository> = store;
        (users, exercises)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::ids::IdConfigError;

    #[tokio::test]
    async fn test_links_use_public_tokens() {
        let mut config = Config::default();
        config.service.public_url = "https://amc.example.org/".to_string();
        let state = AppState::builder().config(config).build().await.unwrap();
        let links = state.links();
        let token = links.token(7).unwrap();

        assert_ne!(token, "7");
        assert_eq!(links.users(), "https://amc.example.org/v1/users");
        assert_eq!(
            links.user(7).unwrap(),
            format!("https://amc.example.org/v1/users/{token}")
        );
        assert_eq!(
            links.exercises_by_author(7).unwrap(),
            format!("https://amc.example.org/v1/exercises?author_id={token}")
        );
        assert_eq!(
            links.favorites_of(7).unwrap(),
            format!("https://amc.example.org/v1/exercises?favorited_by={token}")
        );
    }

    #[tokio::test]
    async fn test_bad_ids_config_is_fatal() {
        let mut config = Config::default();
        config.ids.modulus = 10;
        config.ids.key = 4;
        let result = AppState::builder().config(config).build().await;
        assert!(matches!(
            result,
            Err(Error::Ids(IdConfigError::NotCoprime { key: 4, modulus: 10 }))
        ));
    }

    #[tokio::test]
    async fn test_explicit_memory_store_is_shared() {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::builder()
            .memory_store(store)
            .build()
            .await
            .unwrap();
        assert_eq!(
            state.users().count(&crate::models::UserFilter).await.unwrap(),
            0
        );
    }
}
