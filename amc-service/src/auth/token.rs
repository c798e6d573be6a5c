//! Bearer token verification and caller extraction
//!
//! Tokens are HS256 JWTs whose `sub` claim is the caller's public user id
//! token. Handlers that need an authenticated user take [`Caller`]; handlers
//! that only tailor the response to the caller take [`MaybeCaller`].

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use chrono::{Duration, Utc};
use http::{header::AUTHORIZATION, request::Parts, HeaderMap};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::error::{Error, Result};
use crate::ids::IdCodec;

/// JWT claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Public id token of the user
    pub sub: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Validates bearer tokens against the shared secret
#[derive(Clone)]
pub struct TokenVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: Option<String>,
    lifetime: Duration,
}

impl TokenVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.secret.as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway_secs;
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            issuer: config.issuer.clone(),
            lifetime: Duration::seconds(config.token_lifetime_secs),
        }
    }

    /// Decode and validate `token`
    ///
    /// # Errors
    ///
    /// [`Error::Unauthorized`] for a bad signature, an expired token, or a
    /// wrong issuer.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| Error::Unauthorized(e.to_string()))
    }

    /// Mint a token for the user behind public id `sub`.
    ///
    /// Login is handled by the identity provider; this exists for tests and
    /// operator tooling.
    pub fn issue(&self, sub: &str) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: sub.to_string(),
            exp: (now + self.lifetime).timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| Error::Internal(format!("Failed to sign token: {e}")))
    }

    /// Verify `token` and decode its subject into an internal user id
    pub fn authenticate(&self, token: &str, codec: &IdCodec) -> Result<u64> {
        let claims = self.verify(token)?;
        codec
            .decode(&claims.sub)
            .map_err(|_| Error::Unauthorized("Token subject is not a valid user id".to_string()))
    }
}

/// Bearer token from the `Authorization` header.
///
/// `Ok(None)` when the header is absent; an error when it is present but not
/// a bearer credential.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(Some)
        .ok_or_else(|| Error::Unauthorized("Invalid Authorization header format".to_string()))
}

/// Internal id of the authenticated caller; rejects with 401 otherwise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub u64);

/// Internal id of the caller if a token was sent.
///
/// A token that is present but invalid still rejects with 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaybeCaller(pub Option<u64>);

impl<S> FromRequestParts<S> for MaybeCaller
where
    S: Send + Sync,
    Arc<TokenVerifier>: FromRef<S>,
    Arc<IdCodec>: FromRef<S>,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let Some(token) = bearer_token(&parts.headers)? else {
            return Ok(Self(None));
        };

        let verifier = Arc::<TokenVerifier>::from_ref(state);
        let codec = Arc::<IdCodec>::from_ref(state);
        let id = verifier.authenticate(token, &codec).inspect_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
        })?;

        Ok(Self(Some(id)))
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
    Arc<TokenVerifier>: FromRef<S>,
    Arc<IdCodec>: FromRef<S>,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let MaybeCaller(id) = MaybeCaller::from_request_parts(parts, state).await?;
        id.map(Self)
            .ok_or_else(|| Error::Unauthorized("Missing Authorization header".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IdsConfig;
    use http::{HeaderValue, Request};

    fn config() -> AuthConfig {
        AuthConfig {
            secret: "test-secret".to_string(),
            issuer: Some("amc".to_string()),
            leeway_secs: 0,
            token_lifetime_secs: 60,
        }
    }

    #[derive(Clone)]
    struct TestState {
        verifier: Arc<TokenVerifier>,
        codec: Arc<IdCodec>,
    }

    impl FromRef<TestState> for Arc<TokenVerifier> {
        fn from_ref(state: &TestState) -> Self {
            state.verifier.clone()
        }
    }

    impl FromRef<TestState> for Arc<IdCodec> {
        fn from_ref(state: &TestState) -> Self {
            state.codec.clone()
        }
    }

    fn state() -> TestState {
        TestState {
            verifier: Arc::new(TokenVerifier::new(&config())),
            codec: Arc::new(IdCodec::from_config(&IdsConfig::default()).unwrap()),
        }
    }

    fn parts(authorization: Option<&str>) -> Parts {
        let mut request = Request::builder().uri("/v1/users/profile");
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }
        request.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_issue_then_verify() {
        let verifier = TokenVerifier::new(&config());
        let token = verifier.issue("gR7kq").unwrap();
        let claims = verifier.verify(&token).unwrap();
        assert_eq!(claims.sub, "gR7kq");
        assert_eq!(claims.iss.as_deref(), Some("amc"));
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_rejects_other_secret() {
        let token = TokenVerifier::new(&config()).issue("gR7kq").unwrap();
        let other = TokenVerifier::new(&AuthConfig {
            secret: "another-secret".to_string(),
            ..config()
        });
        assert!(matches!(other.verify(&token), Err(Error::Unauthorized(_))));
    }

    #[test]
    fn test_rejects_wrong_issuer() {
        let token = TokenVerifier::new(&AuthConfig {
            issuer: Some("someone-else".to_string()),
            ..config()
        })
        .issue("gR7kq")
        .unwrap();
        assert!(TokenVerifier::new(&config()).verify(&token).is_err());
    }

    #[test]
    fn test_rejects_expired() {
        let expired = TokenVerifier::new(&AuthConfig {
            token_lifetime_secs: -120,
            ..config()
        })
        .issue("gR7kq")
        .unwrap();
        assert!(TokenVerifier::new(&config()).verify(&expired).is_err());
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers).unwrap(), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).unwrap(), Some("abc.def"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert!(bearer_token(&headers).is_err());
    }

    #[tokio::test]
    async fn test_caller_extraction() {
        let state = state();
        let token = state
            .verifier
            .issue(&state.codec.encode(42).unwrap())
            .unwrap();

        let mut authorized = parts(Some(&format!("Bearer {token}")));
        let Caller(id) = Caller::from_request_parts(&mut authorized, &state)
            .await
            .unwrap();
        assert_eq!(id, 42);

        let mut anonymous = parts(None);
        assert!(matches!(
            Caller::from_request_parts(&mut anonymous, &state).await,
            Err(Error::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_maybe_caller() {
        let state = state();

        let mut anonymous = parts(None);
        let MaybeCaller(id) = MaybeCaller::from_request_parts(&mut anonymous, &state)
            .await
            .unwrap();
        assert_eq!(id, None);

        let mut garbage = parts(Some("Bearer not-a-jwt"));
        assert!(MaybeCaller::from_request_parts(&mut garbage, &state)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_subject_must_be_a_public_id() {
        let state = state();
        let token = state.verifier.issue("!!!").unwrap();
        let mut request = parts(Some(&format!("Bearer {token}")));
        assert!(matches!(
            Caller::from_request_parts(&mut request, &state).await,
            Err(Error::Unauthorized(_))
        ));
    }
}
