//! Expansion-aware serialization
//!
//! Responses link to related resources by default. Clients inline them with
//! `?expand=author` (or `?expand=author.authored_exercises` to go deeper).
//! Collections are wrapped in a [`PageEnvelope`] so pagination links are
//! always found in the same place.

mod directive;
mod render;

pub use directive::{Expand, EXPAND_PARAM};
pub use render::{render_all, render_page, Expandable, PageEnvelope, Representation};
