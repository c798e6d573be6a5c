//! Page validation and windowed fetching

use async_trait::async_trait;
use thiserror::Error;

use super::links::{CollectionUrl, PageMeta};
use super::request::{PageRequest, MAX_PER_PAGE};
use crate::error::Result;

/// Offset/limit slice of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Number of rows to skip
    pub offset: u64,
    /// Maximum number of rows to return
    pub limit: u64,
}

impl Window {
    #[must_use]
    pub const fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// Window for a 1-indexed page
    #[must_use]
    pub const fn page(page: u64, per_page: u64) -> Self {
        Self {
            offset: page.saturating_sub(1) * per_page,
            limit: per_page,
        }
    }
}

/// One or more problems with the requested page, reported together
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", messages.join(" "))]
pub struct PaginationError {
    messages: Vec<String>,
}

impl PaginationError {
    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

/// A countable, sliceable collection
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Send;

    /// Total number of items in the collection
    async fn count(&self) -> Result<u64>;

    /// Items inside `window`, in a stable order
    async fn fetch(&self, window: Window) -> Result<Vec<Self::Item>>;
}

/// A validated page descriptor.
///
/// # Example
///
/// ```rust
/// use amc_service::pagination::{CollectionUrl, PageRequest, Pager};
/// use amc_service::query::QueryParams;
///
/// let url = CollectionUrl::new("http://localhost:8080", "/v1/exercises", &QueryParams::default());
/// let pager = Pager::new(&PageRequest::new(2, 10), 25, url).unwrap();
/// assert_eq!(pager.pages(), 3);
/// assert_eq!(pager.window().offset, 10);
/// assert_eq!(pager.meta().next.as_deref(), Some("http://localhost:8080/v1/exercises?page=3&per_page=10"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pager {
    page: u64,
    per_page: u64,
    pages: u64,
    total: u64,
    url: CollectionUrl,
}

impl Pager {
    /// Validate `request` against a known total.
    ///
    /// Every violated rule contributes a message; nothing short-circuits.
    /// An empty collection still has one (empty) page.
    pub fn new(
        request: &PageRequest,
        total: u64,
        url: CollectionUrl,
    ) -> std::result::Result<Self, PaginationError> {
        let mut messages: Vec<String> = request.malformed().to_vec();
        let page = request.page();
        let per_page = request.per_page();

        if per_page > MAX_PER_PAGE {
            messages.push(format!("Max per_page is {MAX_PER_PAGE}."));
        }
        if per_page < 1 {
            messages.push("per_page must be at least 1.".to_string());
        }

        let pages = if per_page >= 1 {
            total.div_ceil(per_page as u64).max(1)
        } else {
            1
        };

        if page < 1 {
            messages.push(format!("Page {page} out of range, pages start at 1."));
        } else if per_page >= 1 && page as u64 > pages {
            messages.push(format!(
                "Page {page} out of range, collection has {pages} pages."
            ));
        }

        if !messages.is_empty() {
            return Err(PaginationError { messages });
        }

        Ok(Self {
            page: page as u64,
            per_page: per_page as u64,
            pages,
            total,
            url,
        })
    }

    /// Count `source` once, validate, then fetch the one requested window.
    pub async fn query<S: PageSource>(
        request: &PageRequest,
        source: &S,
        url: CollectionUrl,
    ) -> Result<Page<S::Item>> {
        let total = source.count().await?;
        let pager = Self::new(request, total, url)?;
        let items = source.fetch(pager.window()).await?;
        tracing::debug!(
            page = pager.page,
            per_page = pager.per_page,
            total,
            returned = items.len(),
            "Fetched page"
        );
        Ok(pager.with_items(items))
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    pub fn pages(&self) -> u64 {
        self.pages
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.per_page
    }

    pub fn limit(&self) -> u64 {
        self.per_page
    }

    pub fn window(&self) -> Window {
        Window::new(self.offset(), self.limit())
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.pages
    }

    /// Page numbers and absolute navigation links
    pub fn meta(&self) -> PageMeta {
        let link = |page| self.url.page_url(page, self.per_page);
        PageMeta {
            page: self.page,
            pages: self.pages,
            per_page: self.per_page,
            total: self.total,
            first: link(1),
            last: link(self.pages),
            current: link(self.page),
            prev: self.has_prev().then(|| link(self.page - 1)),
            next: self.has_next().then(|| link(self.page + 1)),
        }
    }

    /// Attach the fetched items
    pub fn with_items<T>(self, items: Vec<T>) -> Page<T> {
        Page { pager: self, items }
    }
}

/// A page descriptor together with the items of its window
#[derive(Debug, Clone)]
pub struct Page<T> {
    pager: Pager,
    items: Vec<T>,
}

impl<T> Page<T> {
    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_parts(self) -> (Pager, Vec<T>) {
        (self.pager, self.items)
    }
}
