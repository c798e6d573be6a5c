//! Offset pagination for collection endpoints
//!
//! A list handler turns the query string into a [`PageRequest`], hands it to
//! [`Pager::query`] together with a [`PageSource`], and renders the resulting
//! [`Page`]. The source is counted once and sliced once.
//!
//! Requested values are validated together: `page=0&per_page=500` yields a
//! single [`PaginationError`] carrying both messages.

mod links;
mod pager;
mod request;

pub use links::{CollectionUrl, PageMeta};
pub use pager::{Page, PageSource, Pager, PaginationError, Window};
pub use request::{PageRequest, DEFAULT_PAGE, DEFAULT_PER_PAGE, MAX_PER_PAGE};
