//! Path parameter extractor for obfuscated ids

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts, Path};
use http::request::Parts;

use super::IdCodec;
use crate::error::Error;

/// Internal id decoded from the single `{id}` path segment.
///
/// Decoding failures reject with [`Error::InvalidId`], which renders exactly
/// like a missing row (404).
///
/// ```rust,ignore
/// async fn get_user(State(state): State<AppState>, PublicId(id): PublicId) -> Result<Json<Value>> {
///     let user = state
///         .users()
///         .find_by_id(id)
///         .await?
///         .ok_or_else(|| Error::NotFound(format!("user {id}")))?;
///     // ...
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicId(pub u64);

impl<S> FromRequestParts<S> for PublicId
where
    S: Send + Sync,
    Arc<IdCodec>: FromRef<S>,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(token) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| Error::InvalidId)?;

        let codec = Arc::<IdCodec>::from_ref(state);
        let id = codec.decode(&token).map_err(|e| {
            tracing::debug!(token = %token, error = %e, "Rejected public id");
            Error::InvalidId
        })?;

        Ok(Self(id))
    }
}
