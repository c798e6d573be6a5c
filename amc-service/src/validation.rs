//! Write-path validation
//!
//! Field rules collect into a [`ValidationErrors`] map so the client sees
//! every problem at once. Unique-column collisions are checked against the
//! store with [`check_unique`] and flagged as conflicts, which the error
//! layer turns into a 409 instead of a 400.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

use crate::error::Result;
use crate::repository::RepositoryResult;

/// Message for a field that must be present
pub const MISSING_FIELD: &str = "Missing data for required field.";

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid")
});

/// Field name to message, plus whether the failure is a collision
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
    conflicts: bool,
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.conflicts { "Conflict" } else { "Validation failed" };
        write!(f, "{kind}:")?;
        for (field, message) in &self.fields {
            write!(f, " {field}: {message}")?;
        }
        Ok(())
    }
}

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// One generic failure
    #[must_use]
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.insert(field, message);
        errors
    }

    /// Record a failure; the first message for a field wins
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.entry(field.into()).or_insert_with(|| message.into());
    }

    /// Mark as a uniqueness collision
    #[must_use]
    pub fn into_conflict(mut self) -> Self {
        self.conflicts = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn is_conflict(&self) -> bool {
        self.conflicts
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn into_fields(self) -> BTreeMap<String, String> {
        self.fields
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> std::result::Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// Looks up which unique values are already taken
#[async_trait]
pub trait UniqueLookup: Send + Sync {
    /// Columns among `candidates` whose value is held by a row other than
    /// `exclude_id`
    async fn find_conflicts(
        &self,
        candidates: &[(&'static str, String)],
        exclude_id: Option<u64>,
    ) -> RepositoryResult<Vec<&'static str>>;
}

/// Fail with a conflict naming every colliding column.
///
/// Pass the row's own id as `update_id` when updating so that keeping a value
/// unchanged is not reported as a collision with itself.
pub async fn check_unique<L: UniqueLookup + ?Sized>(
    lookup: &L,
    candidates: &[(&'static str, String)],
    update_id: Option<u64>,
) -> Result<()> {
    if candidates.is_empty() {
        return Ok(());
    }

    let taken = lookup.find_conflicts(candidates, update_id).await?;
    if taken.is_empty() {
        return Ok(());
    }

    tracing::debug!(columns = ?taken, update_id, "Unique columns already in use");
    let mut errors = ValidationErrors::new();
    for column in taken {
        errors.insert(column, conflict_message(column));
    }
    Err(errors.into_conflict().into())
}

/// `"{Column} is already in use."`
pub fn conflict_message(column: &str) -> String {
    format!("{} is already in use.", title_case(column))
}

fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut at_word_start = true;
    for c in value.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// Required field; returns the value when present
pub fn required<'a>(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&'a str>,
) -> Option<&'a str> {
    if value.is_none() {
        errors.insert(field, MISSING_FIELD);
    }
    value
}

/// Character count within `min..=max`
pub fn length(errors: &mut ValidationErrors, field: &str, value: &str, min: usize, max: usize) {
    let count = value.chars().count();
    if count < min || count > max {
        errors.insert(field, format!("Length must be between {min} and {max}."));
    }
}

/// At least `min` characters
pub fn min_length(errors: &mut ValidationErrors, field: &str, value: &str, min: usize) {
    if value.chars().count() < min {
        errors.insert(field, format!("Shorter than minimum length {min}."));
    }
}

pub fn email(errors: &mut ValidationErrors, field: &str, value: &str) {
    if !EMAIL_REGEX.is_match(value) {
        errors.insert(field, "Not a valid email address.");
    }
}

/// Value must be one of `choices`
pub fn one_of(errors: &mut ValidationErrors, field: &str, value: &str, choices: &[&str]) {
    if !choices.contains(&value) {
        errors.insert(field, format!("Must be one of {}", choices.join(", ")));
    }
}
