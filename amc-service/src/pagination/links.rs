//! Navigational links for paginated collections

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::query::QueryParams;

/// The collection URL a page was requested from, minus its pagination
/// parameters.
///
/// Every other query parameter is preserved, repeated keys included, so a
/// filtered or expanded listing stays filtered and expanded while paging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionUrl {
    base: String,
    params: Vec<(String, String)>,
}

impl CollectionUrl {
    /// `origin` is the absolute service base (`https://host`), `path` the
    /// request path (`/v1/exercises`).
    pub fn new(origin: &str, path: &str, params: &QueryParams) -> Self {
        let params = params
            .pairs()
            .iter()
            .filter(|(k, _)| k != "page" && k != "per_page")
            .cloned()
            .collect();
        Self {
            base: format!("{}{}", origin.trim_end_matches('/'), path),
            params,
        }
    }

    /// Absolute URL of `page`
    pub fn page_url(&self, page: u64, per_page: u64) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("page", &page.to_string());
        query.append_pair("per_page", &per_page.to_string());
        for (key, value) in &self.params {
            query.append_pair(key, value);
        }
        format!("{}?{}", self.base, query.finish())
    }
}

/// Page descriptor as rendered to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub page: u64,
    pub pages: u64,
    pub per_page: u64,
    pub total: u64,
    pub first: String,
    pub last: String,
    pub current: String,
    pub prev: Option<String>,
    pub next: Option<String>,
}
