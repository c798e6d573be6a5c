//! Health check handlers

use std::collections::BTreeMap;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::models::{ExerciseFilter, UserFilter};
use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service name
    pub service: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Readiness check response with dependency status
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub service: String,
    pub dependencies: BTreeMap<String, DependencyStatus>,
}

/// Individual dependency status
#[derive(Debug, Serialize, Deserialize)]
pub struct DependencyStatus {
    pub healthy: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Liveness probe; 200 whenever the process serves requests
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        service: state.config().service.name.clone(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    };

    (StatusCode::OK, Json(response))
}

/// Readiness probe: both stores must answer a count.
///
/// 503 when any of them fails.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let mut dependencies = BTreeMap::new();

    let users = state.users().count(&UserFilter).await;
    let exercises = state.exercises().count(&ExerciseFilter::default()).await;

    for (name, result) in [("users", users), ("exercises", exercises)] {
        let status = match result {
            Ok(_) => DependencyStatus {
                healthy: true,
                message: None,
            },
            Err(e) => {
                tracing::error!(store = name, "Readiness check failed: {}", e);
                DependencyStatus {
                    healthy: false,
                    message: Some(e.kind.to_string()),
                }
            }
        };
        dependencies.insert(name.to_string(), status);
    }

    let ready = dependencies.values().all(|d| d.healthy);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = ReadinessResponse {
        ready,
        service: state.config().service.name.clone(),
        dependencies,
    };

    (status, Json(response))
}
