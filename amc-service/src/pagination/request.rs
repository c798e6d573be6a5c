//! Requested page window

use crate::query::QueryParams;

/// Page used when the client does not ask for one
pub const DEFAULT_PAGE: i64 = 1;

/// Page size used when the client does not ask for one
pub const DEFAULT_PER_PAGE: i64 = 10;

/// Largest page size a client may request
pub const MAX_PER_PAGE: i64 = 100;

/// Page and page size as the client asked for them.
///
/// Values are kept signed and unvalidated; [`super::Pager::new`] decides what
/// is acceptable so that every problem can be reported at once. Values that
/// could not be parsed at all are remembered as messages and replaced by the
/// defaults.
///
/// # Example
///
/// ```rust
/// use amc_service::pagination::PageRequest;
/// use amc_service::query::QueryParams;
///
/// let request = PageRequest::from_params(&QueryParams::parse(Some("page=3")));
/// assert_eq!(request.page(), 3);
/// assert_eq!(request.per_page(), 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    per_page: i64,
    malformed: Vec<String>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_PER_PAGE)
    }
}

impl PageRequest {
    #[must_use]
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page,
            per_page,
            malformed: Vec::new(),
        }
    }

    /// Read `page` and `per_page` from the query string
    #[must_use]
    pub fn from_params(params: &QueryParams) -> Self {
        let mut malformed = Vec::new();
        let page = parse_param(params, "page", DEFAULT_PAGE, &mut malformed);
        let per_page = parse_param(params, "per_page", DEFAULT_PER_PAGE, &mut malformed);
        Self {
            page,
            per_page,
            malformed,
        }
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
    }

    /// Messages for parameters that were not integers
    pub fn malformed(&self) -> &[String] {
        &self.malformed
    }
}

fn parse_param(params: &QueryParams, key: &str, default: i64, malformed: &mut Vec<String>) -> i64 {
    match params.get(key).map(str::trim) {
        None | Some("") => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            malformed.push(format!("{key} must be an integer, got '{raw}'."));
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let request = PageRequest::from_params(&QueryParams::default());
        assert_eq!(request, PageRequest::default());
        assert_eq!(request.page(), 1);
        assert_eq!(request.per_page(), 10);
        assert!(request.malformed().is_empty());
    }

    #[test]
    fn test_explicit_values() {
        let params = QueryParams::parse(Some("page=4&per_page=25&expand=author"));
        let request = PageRequest::from_params(&params);
        assert_eq!(request.page(), 4);
        assert_eq!(request.per_page(), 25);
    }

    #[test]
    fn test_out_of_range_values_are_kept_for_validation() {
        let params = QueryParams::parse(Some("page=0&per_page=500"));
        let request = PageRequest::from_params(&params);
        assert_eq!(request.page(), 0);
        assert_eq!(request.per_page(), 500);
        assert!(request.malformed().is_empty());
    }

    #[test]
    fn test_malformed_values_fall_back_to_defaults() {
        let params = QueryParams::parse(Some("page=two&per_page=1e3"));
        let request = PageRequest::from_params(&params);
        assert_eq!(request.page(), DEFAULT_PAGE);
        assert_eq!(request.per_page(), DEFAULT_PER_PAGE);
        assert_eq!(
            request.malformed(),
            &[
                "page must be an integer, got 'two'.".to_string(),
                "per_page must be an integer, got '1e3'.".to_string(),
            ]
        );
    }

    #[test]
    fn test_blank_value_uses_default() {
        let request = PageRequest::from_params(&QueryParams::parse(Some("page=&per_page=")));
        assert_eq!(request, PageRequest::default());
    }
}
