//! The client's `expand` directive

use std::collections::BTreeSet;

use crate::query::QueryParams;

/// Query parameter carrying relation names to inline
pub const EXPAND_PARAM: &str = "expand";

/// Relation names to inline instead of linking.
///
/// Accepts repeated and comma-joined values; order and duplicates do not
/// matter. A dotted path (`author.authored_exercises`) expands `author` and,
/// inside it, `authored_exercises`. A bare name applies to the current level
/// only, which keeps cyclic relations from expanding forever.
///
/// # Example
///
/// ```rust
/// use amc_service::expand::Expand;
///
/// let expand = Expand::parse(["author,favorites", "author.authored_exercises"]);
/// assert!(expand.contains("author"));
/// assert!(expand.contains("favorites"));
/// assert!(!expand.contains("authored_exercises"));
/// assert!(expand.nested("author").contains("authored_exercises"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expand {
    paths: BTreeSet<String>,
}

impl Expand {
    /// Nothing expanded
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Parse raw parameter values
    #[must_use]
    pub fn parse<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let paths = values
            .into_iter()
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(|path| {
                path.split('.')
                    .map(str::trim)
                    .filter(|segment| !segment.is_empty())
                    .collect::<Vec<_>>()
                    .join(".")
            })
            .filter(|path| !path.is_empty())
            .collect();
        Self { paths }
    }

    /// Read every `expand` value from the query string
    #[must_use]
    pub fn from_params(params: &QueryParams) -> Self {
        Self::parse(params.get_all(EXPAND_PARAM))
    }

    /// Whether the relation `name` at this level should be inlined
    pub fn contains(&self, name: &str) -> bool {
        self.paths.iter().any(|path| {
            path == name
                || path
                    .strip_prefix(name)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    /// The directive that applies inside the relation `name`
    #[must_use]
    pub fn nested(&self, name: &str) -> Self {
        let paths = self
            .paths
            .iter()
            .filter_map(|path| path.strip_prefix(name)?.strip_prefix('.'))
            .map(str::to_string)
            .collect();
        Self { paths }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Normalized paths, sorted
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combines_repeated_and_comma_joined_values() {
        let params = QueryParams::parse(Some("expand=b,c&per_page=5&expand=x"));
        let expand = Expand::from_params(&params);
        assert_eq!(expand.paths().collect::<Vec<_>>(), vec!["b", "c", "x"]);
    }

    #[test]
    fn test_deduplicates_and_ignores_blanks() {
        let expand = Expand::parse(["author, author", ",", " ", "author,"]);
        assert_eq!(expand.paths().collect::<Vec<_>>(), vec!["author"]);
    }

    #[test]
    fn test_order_is_irrelevant() {
        assert_eq!(Expand::parse(["a,b"]), Expand::parse(["b", "a"]));
    }

    #[test]
    fn test_empty_when_absent() {
        let expand = Expand::from_params(&QueryParams::parse(Some("page=2")));
        assert!(expand.is_empty());
        assert!(!expand.contains("author"));
    }

    #[test]
    fn test_prefix_is_not_a_match() {
        let expand = Expand::parse(["authored_exercises"]);
        assert!(!expand.contains("author"));
        assert!(expand.contains("authored_exercises"));
    }

    #[test]
    fn test_nested_paths() {
        let expand = Expand::parse(["author.authored_exercises.author", "favorites"]);
        assert!(expand.contains("author"));

        let inner = expand.nested("author");
        assert!(inner.contains("authored_exercises"));
        assert!(!inner.contains("favorites"));

        let innermost = inner.nested("authored_exercises");
        assert!(innermost.contains("author"));
        assert!(innermost.nested("author").is_empty());
    }

    #[test]
    fn test_bare_name_does_not_propagate() {
        let expand = Expand::parse(["author"]);
        assert!(expand.nested("author").is_empty());
    }

    #[test]
    fn test_malformed_dots_are_normalized() {
        let expand = Expand::parse(["author..authored_exercises.", ".author"]);
        assert_eq!(
            expand.paths().collect::<Vec<_>>(),
            vec!["author", "author.authored_exercises"]
        );
    }
}
