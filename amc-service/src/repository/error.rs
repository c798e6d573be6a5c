//! Repository error types
//!
//! # Example
//!
//! ```rust
//! use amc_service::repository::{RepositoryError, RepositoryErrorKind};
//!
//! let error = RepositoryError::not_found("User", "17");
//! assert!(matches!(error.kind, RepositoryErrorKind::NotFound));
//! assert!(error.entity_id.is_some());
//! ```

use std::fmt;

/// Operation being performed when the repository error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    FindById,
    FindAll,
    Count,
    Create,
    Update,
    Delete,
    /// Adding or removing a favorite
    Favorite,
    /// Checking unique columns before a write
    UniqueLookup,
    /// Creating the schema
    Migrate,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FindById => write!(f, "find_by_id"),
            Self::FindAll => write!(f, "find_all"),
            Self::Count => write!(f, "count"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Favorite => write!(f, "favorite"),
            Self::UniqueLookup => write!(f, "unique_lookup"),
            Self::Migrate => write!(f, "migrate"),
        }
    }
}

/// Category of repository error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// Entity was not found
    NotFound,
    /// A unique column already holds the value
    AlreadyExists,
    /// Foreign key or check constraint
    ConstraintViolation,
    ConnectionFailed,
    Timeout,
    /// Underlying database error
    DatabaseError,
    Other,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::ConstraintViolation => write!(f, "constraint_violation"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::DatabaseError => write!(f, "database_error"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured repository error with operation context
///
/// Entity ids in here are internal integers; they are logged, never sent to
/// clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryError {
    /// The operation being performed when the error occurred
    pub operation: RepositoryOperation,
    /// The category of error
    pub kind: RepositoryErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The type of entity involved (e.g., "User", "Exercise")
    pub entity_type: Option<String>,
    /// The id of the row involved
    pub entity_id: Option<String>,
    /// Column behind a constraint violation
    pub column: Option<String>,
}

impl RepositoryError {
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
            column: None,
        }
    }

    /// Create a "not found" error with entity context
    pub fn not_found(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::FindById,
            RepositoryErrorKind::NotFound,
            "Entity not found",
        )
        .with_entity(entity_type, entity_id)
    }

    /// Create an "already exists" error naming the colliding column
    pub fn already_exists(entity_type: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::Create,
            RepositoryErrorKind::AlreadyExists,
            "Entity already exists",
        )
        .with_column(entity_type, column)
    }

    pub fn constraint_violation(
        operation: RepositoryOperation,
        message: impl Into<String>,
    ) -> Self {
        Self::new(operation, RepositoryErrorKind::ConstraintViolation, message)
    }

    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::FindById,
            RepositoryErrorKind::ConnectionFailed,
            message,
        )
    }

    pub fn timeout(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::Timeout, message)
    }

    pub fn database_error(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::DatabaseError, message)
    }

    #[must_use]
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Attach the table or entity type and the offending column
    #[must_use]
    pub fn with_column(mut self, entity_type: impl Into<String>, column: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self.column = Some(column.into());
        self
    }

    #[must_use]
    pub fn with_operation(mut self, operation: RepositoryOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Transient failures worth retrying
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            RepositoryErrorKind::ConnectionFailed | RepositoryErrorKind::Timeout
        )
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        match (&self.entity_type, &self.entity_id, &self.column) {
            (Some(entity_type), Some(entity_id), _) => write!(f, " [{entity_type}: {entity_id}]")?,
            (Some(entity_type), None, Some(column)) => write!(f, " [{entity_type}.{column}]")?,
            _ => {}
        }
        Ok(())
    }
}

impl std::error::Error for RepositoryError {}

#[cfg(feature = "database")]
impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::Error as E;
        match err {
            E::RowNotFound => Self::new(
                RepositoryOperation::FindById,
                RepositoryErrorKind::NotFound,
                "Row not found",
            ),
            E::PoolTimedOut => Self::timeout(
                RepositoryOperation::FindAll,
                "Connection pool timed out",
            ),
            E::PoolClosed => Self::connection_failed("Connection pool is closed"),
            E::Io(e) => Self::connection_failed(e.to_string()),
            E::Database(db) => {
                let table = db.table().unwrap_or("unknown").to_string();
                let constraint = db.constraint().unwrap_or("unknown");
                let column = constraint_column(&table, constraint).to_string();
                if db.is_unique_violation() {
                    Self::already_exists(table, column)
                } else if db.is_foreign_key_violation() || db.is_check_violation() {
                    Self::constraint_violation(RepositoryOperation::Create, db.message())
                        .with_column(table, column)
                } else {
                    Self::database_error(RepositoryOperation::FindAll, db.message())
                }
            }
            other => Self::database_error(RepositoryOperation::FindAll, other.to_string()),
        }
    }
}

/// Column behind a default Postgres constraint name (`users_email_key` -> `email`)
#[cfg(feature = "database")]
fn constraint_column<'a>(table: &str, constraint: &'a str) -> &'a str {
    let column = constraint
        .strip_prefix(table)
        .and_then(|rest| rest.strip_prefix('_'))
        .unwrap_or(constraint);
    ["_key", "_fkey", "_check"]
        .iter()
        .find_map(|suffix| column.strip_suffix(suffix))
        .unwrap_or(column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_entity() {
        let error = RepositoryError::not_found("Exercise", "42");
        assert_eq!(
            error.to_string(),
            "Repository not_found error during find_by_id: Entity not found [Exercise: 42]"
        );
    }

    #[test]
    fn test_display_without_entity() {
        let error = RepositoryError::timeout(RepositoryOperation::Count, "slow");
        assert_eq!(error.to_string(), "Repository timeout error during count: slow");
    }

    #[test]
    fn test_already_exists_names_column() {
        let error = RepositoryError::already_exists("User", "email");
        assert_eq!(error.kind, RepositoryErrorKind::AlreadyExists);
        assert_eq!(error.column.as_deref(), Some("email"));
        assert_eq!(error.entity_id, None);
        assert_eq!(
            error.to_string(),
            "Repository already_exists error during create: Entity already exists [User.email]"
        );
    }

    #[test]
    fn test_with_operation() {
        let error = RepositoryError::already_exists("User", "username")
            .with_operation(RepositoryOperation::Update);
        assert_eq!(error.operation, RepositoryOperation::Update);
    }

    #[cfg(feature = "database")]
    #[test]
    fn test_constraint_column() {
        assert_eq!(constraint_column("users", "users_email_key"), "email");
        assert_eq!(constraint_column("exercises", "exercises_author_id_fkey"), "author_id");
        assert_eq!(constraint_column("users", "custom_name"), "custom_name");
    }

    #[test]
    fn test_is_retriable() {
        assert!(RepositoryError::connection_failed("refused").is_retriable());
        assert!(RepositoryError::timeout(RepositoryOperation::FindAll, "t").is_retriable());
        assert!(!RepositoryError::not_found("User", "1").is_retriable());
        assert!(!RepositoryError::already_exists("User", "email").is_retriable());
        assert!(
            !RepositoryError::database_error(RepositoryOperation::Create, "syntax").is_retriable()
        );
    }
}
