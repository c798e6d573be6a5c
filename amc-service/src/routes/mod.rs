//! REST surface
//!
//! | method | path | handler |
//! |---|---|---|
//! | GET | `/v1` | [`index`] |
//! | GET, POST | `/v1/users` | [`users::list_users`], [`users::create_user`] |
//! | GET | `/v1/users/profile` | [`users::get_profile`] |
//! | GET, PUT, DELETE | `/v1/users/{id}` | [`users::get_user`], [`users::update_user`], [`users::delete_user`] |
//! | POST | `/v1/users/{id}/favorites` | [`users::update_favorites`] |
//! | GET, POST | `/v1/exercises` | [`exercises::list_exercises`], [`exercises::create_exercise`] |
//! | GET, PUT, DELETE | `/v1/exercises/{id}` | [`exercises::get_exercise`], [`exercises::update_exercise`], [`exercises::delete_exercise`] |
//! | GET | `/health`, `/ready` | [`crate::health`] |
//!
//! `{id}` segments carry public id tokens.

pub mod exercises;
pub mod users;
mod views;

pub use views::{Profile, RequestContext};

use axum::extract::{FromRequest, Request, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::health;
use crate::models::{EXERCISE, USER};
use crate::state::AppState;
use crate::validation::ValidationErrors;

/// Field name for errors about the body as a whole
pub const SCHEMA_ERROR_FIELD: &str = "_schema";

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::readiness))
        .route("/v1", get(index))
        .route(
            USER.collection_path,
            get(users::list_users).post(users::create_user),
        )
        .route("/v1/users/profile", get(users::get_profile))
        .route(
            "/v1/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/v1/users/{id}/favorites", post(users::update_favorites))
        .route(
            EXERCISE.collection_path,
            get(exercises::list_exercises).post(exercises::create_exercise),
        )
        .route(
            "/v1/exercises/{id}",
            get(exercises::get_exercise)
                .put(exercises::update_exercise)
                .delete(exercises::delete_exercise),
        )
        .with_state(state)
}

/// `GET /v1`: entry points
pub async fn index(State(state): State<AppState>) -> Json<Value> {
    let base = state.config().service.base_url();
    Json(json!({
        "register": format!("{base}{}", USER.collection_path),
        "profile": format!("{base}{}/profile", USER.collection_path),
        "users": state.links().users(),
        "exercises": format!("{base}{}", EXERCISE.collection_path),
    }))
}

/// JSON body extractor whose rejections use the validation envelope
///
/// A body that is not JSON, or does not have the expected shape, is a 400
/// with the problem reported under `_schema`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!(error = %rejection, "Rejected request body");
                Err(ValidationErrors::single(SCHEMA_ERROR_FIELD, rejection.body_text()).into())
            }
        }
    }
}
