//! Response types with non-200 status codes

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// HTTP 201 Created with a `Location` header
///
/// ```rust,ignore
/// async fn create_user(/* ... */) -> Result<Created<Value>> {
///     let href = state.links().user(user.id)?;
///     Ok(Created::new(body).with_location(href))
/// }
/// ```
#[derive(Debug)]
pub struct Created<T> {
    data: T,
    location: Option<String>,
}

impl<T> Created<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            location: None,
        }
    }

    /// Absolute URL of the created resource
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        let mut response = (StatusCode::CREATED, Json(&self.data)).into_response();

        if let Some(location) = self.location {
            match HeaderValue::from_str(&location) {
                Ok(value) => {
                    response.headers_mut().insert(header::LOCATION, value);
                }
                Err(_) => tracing::warn!(%location, "Location is not a valid header value"),
            }
        }

        response
    }
}

/// HTTP 204 No Content
#[derive(Debug, Clone, Copy)]
pub struct NoContent;

impl IntoResponse for NoContent {
    fn into_response(self) -> Response {
        StatusCode::NO_CONTENT.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_created_sets_location() {
        let response = Created::new(json!({"id": "gR7kq"}))
            .with_location("http://localhost:8080/v1/users/gR7kq")
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers()[header::LOCATION],
            "http://localhost:8080/v1/users/gR7kq"
        );
    }

    #[test]
    fn test_no_content() {
        let response = NoContent.into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
