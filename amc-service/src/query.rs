//! Raw query string access for list endpoints
//!
//! List endpoints read repeated keys (`expand=a&expand=b`), keep unknown keys
//! for link generation, and must report malformed numbers as client errors
//! rather than rejecting the request outright. A typed `Query<T>` cannot do
//! all three, so the pairs are kept as-is and interpreted by the pager and the
//! expansion parser.
//!
//! # Example
//!
//! ```rust
//! use amc_service::query::QueryParams;
//!
//! let params = QueryParams::parse(Some("page=2&expand=author,tags&expand=author&q=x%20y"));
//! assert_eq!(params.get("page"), Some("2"));
//! assert_eq!(params.get_all("expand").count(), 2);
//! assert_eq!(params.get("q"), Some("x y"));
//! ```

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use http::request::Parts;

/// Decoded `key=value` pairs in their original order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Parse an `application/x-www-form-urlencoded` query string
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        let pairs = raw
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();
        Self { pairs }
    }

    /// Build from explicit pairs
    #[must_use]
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Last value given for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value given for `key`, in order
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<S> FromRequestParts<S> for QueryParams
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::parse(parts.uri.query()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        assert!(QueryParams::parse(None).is_empty());
        assert!(QueryParams::parse(Some("")).is_empty());
    }

    #[test]
    fn test_last_value_wins() {
        let params = QueryParams::parse(Some("page=1&page=3"));
        assert_eq!(params.get("page"), Some("3"));
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn test_repeated_keys_keep_order() {
        let params = QueryParams::parse(Some("a=b,c&x=1&a=x"));
        let values: Vec<&str> = params.get_all("a").collect();
        assert_eq!(values, vec!["b,c", "x"]);
        assert_eq!(params.pairs().len(), 3);
    }

    #[test]
    fn test_percent_and_plus_decoding() {
        let params = QueryParams::parse(Some("title=push+ups&tag=a%26b"));
        assert_eq!(params.get("title"), Some("push ups"));
        assert_eq!(params.get("tag"), Some("a&b"));
    }

    #[test]
    fn test_from_pairs() {
        let params = QueryParams::from_pairs([("page", "2"), ("per_page", "10")]);
        assert_eq!(params.get("per_page"), Some("10"));
    }
}
