//! Domain entities, write inputs and the entity registry

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validation::{self, ValidationErrors};

/// Maximum username length
pub const USERNAME_MAX_LENGTH: usize = 32;

/// Maximum exercise title length
pub const TITLE_MAX_LENGTH: usize = 128;

/// Exercises can be edited by their author for this many hours after creation
pub const MAX_EDIT_HOURS: i64 = 3;

/// A registered user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// A user-authored exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub data: Value,
    /// `None` once the author deleted their account
    pub author_id: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Exercise {
    /// Whether the exercise is still inside its edit window at `now`
    pub fn edit_window_open(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at < Duration::hours(MAX_EDIT_HOURS)
    }

    /// Whether `caller` may edit this exercise right now
    pub fn allow_edit(&self, caller: Option<u64>, now: DateTime<Utc>) -> bool {
        caller.is_some() && caller == self.author_id && self.edit_window_open(now)
    }
}

/// Validated data for a new user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
}

/// Validated partial update of a user; `None` leaves a column untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Users have no list filters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserFilter;

/// Validated data for a new exercise
#[derive(Debug, Clone, PartialEq)]
pub struct NewExercise {
    pub title: String,
    pub description: String,
    pub data: Value,
    pub author_id: Option<u64>,
}

/// Validated partial update of an exercise
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExerciseChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub data: Option<Value>,
}

/// Exercise list filters, both optional and combined with AND
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExerciseFilter {
    pub author_id: Option<u64>,
    pub favorited_by: Option<u64>,
}

/// Static description of a persisted entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDescriptor {
    pub name: &'static str,
    pub table: &'static str,
    /// Collection endpoint relative to the public base URL
    pub collection_path: &'static str,
    /// Columns checked by collision validation
    pub unique_columns: &'static [&'static str],
    /// Relations rendered as links unless expanded
    pub relations: &'static [&'static str],
}

impl EntityDescriptor {
    /// Path of one member of the collection
    pub fn member_path(&self, token: &str) -> String {
        format!("{}/{token}", self.collection_path)
    }
}

pub const USER: EntityDescriptor = EntityDescriptor {
    name: "User",
    table: "users",
    collection_path: "/v1/users",
    unique_columns: &["username", "email"],
    relations: &["authored_exercises", "favorite_exercises"],
};

pub const EXERCISE: EntityDescriptor = EntityDescriptor {
    name: "Exercise",
    table: "exercises",
    collection_path: "/v1/exercises",
    unique_columns: &[],
    relations: &["author"],
};

/// Every entity type the service persists
pub const ENTITIES: &[EntityDescriptor] = &[USER, EXERCISE];

/// Look up a descriptor by entity name, case-insensitively
pub fn entity(name: &str) -> Option<&'static EntityDescriptor> {
    ENTITIES.iter().find(|e| e.name.eq_ignore_ascii_case(name))
}

/// `POST /v1/users` body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUserInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Fields of a registration that passed field validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidUserInput {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
}

impl NewUserInput {
    /// Field rules; uniqueness is checked separately against the store
    pub fn validate(self, min_password_length: usize) -> Result<ValidUserInput, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let username = self.username.map(|u| u.trim().to_string());
        if let Some(username) = validation::required(&mut errors, "username", username.as_deref()) {
            validation::length(&mut errors, "username", username, 1, USERNAME_MAX_LENGTH);
        }
        let email = normalize_email(self.email);
        if let Some(email) = &email {
            validation::email(&mut errors, "email", email);
        }
        if let Some(password) = validation::required(&mut errors, "password", self.password.as_deref()) {
            validation::min_length(&mut errors, "password", password, min_password_length);
        }

        errors.into_result()?;
        Ok(ValidUserInput {
            username: username.unwrap_or_default(),
            email,
            password: self.password.unwrap_or_default(),
        })
    }
}

/// `PUT /v1/users/{id}` body. Passwords are not changed here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatchInput {
    pub username: Option<String>,
    pub email: Option<String>,
}

impl UserPatchInput {
    pub fn validate(self) -> Result<UserChanges, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let username = self.username.map(|u| u.trim().to_string());
        if let Some(username) = &username {
            validation::length(&mut errors, "username", username, 1, USERNAME_MAX_LENGTH);
        }
        let email = normalize_email(self.email);
        if let Some(email) = &email {
            validation::email(&mut errors, "email", email);
        }

        errors.into_result()?;
        Ok(UserChanges {
            username,
            email,
            last_login: None,
        })
    }
}

/// `POST /v1/exercises` body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewExerciseInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub data: Option<Value>,
}

impl NewExerciseInput {
    pub fn validate(self, author_id: u64) -> Result<NewExercise, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(title) = validation::required(&mut errors, "title", self.title.as_deref()) {
            validation::length(&mut errors, "title", title, 1, TITLE_MAX_LENGTH);
        }
        validation::required(&mut errors, "description", self.description.as_deref());
        check_data(&mut errors, self.data.as_ref());

        errors.into_result()?;
        Ok(NewExercise {
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            data: self.data.unwrap_or_else(|| Value::Object(Default::default())),
            author_id: Some(author_id),
        })
    }
}

/// `PUT /v1/exercises/{id}` body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExercisePatchInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub data: Option<Value>,
}

impl ExercisePatchInput {
    pub fn validate(self) -> Result<ExerciseChanges, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(title) = &self.title {
            validation::length(&mut errors, "title", title, 1, TITLE_MAX_LENGTH);
        }
        check_data(&mut errors, self.data.as_ref());

        errors.into_result()?;
        Ok(ExerciseChanges {
            title: self.title,
            description: self.description,
            data: self.data,
        })
    }
}

/// What to do with a favorite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteOp {
    Favorite,
    Unfavorite,
}

/// `POST /v1/users/{id}/favorites` body: `{"id": "<exercise token>", "action": "favorite"}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FavoriteAction {
    pub id: Option<String>,
    pub action: Option<String>,
}

/// A favorite action that passed field validation; the token is decoded by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidFavoriteAction {
    pub token: String,
    pub op: FavoriteOp,
}

impl FavoriteAction {
    pub const FAVORITE: &'static str = "favorite";
    pub const UNFAVORITE: &'static str = "unfavorite";

    pub fn validate(self) -> Result<ValidFavoriteAction, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        validation::required(&mut errors, "id", self.id.as_deref());
        let op = match validation::required(&mut errors, "action", self.action.as_deref()) {
            Some(Self::FAVORITE) => Some(FavoriteOp::Favorite),
            Some(Self::UNFAVORITE) => Some(FavoriteOp::Unfavorite),
            Some(other) => {
                validation::one_of(
                    &mut errors,
                    "action",
                    other,
                    &[Self::FAVORITE, Self::UNFAVORITE],
                );
                None
            }
            None => None,
        };

        errors.into_result()?;
        match (self.id, op) {
            (Some(token), Some(op)) => Ok(ValidFavoriteAction { token, op }),
            _ => Err(ValidationErrors::single("action", validation::MISSING_FIELD)),
        }
    }
}

/// Blank emails are treated as absent
fn normalize_email(email: Option<String>) -> Option<String> {
    email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
}

fn check_data(errors: &mut ValidationErrors, data: Option<&Value>) {
    if let Some(data) = data {
        if !data.is_object() {
            errors.insert("data", "Not a valid mapping type.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exercise(created_at: DateTime<Utc>) -> Exercise {
        Exercise {
            id: 1,
            title: "Scales".to_string(),
            description: "C major".to_string(),
            data: json!({}),
            author_id: Some(7),
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_allow_edit_window() {
        let created = Utc::now();
        let ex = exercise(created);
        assert!(ex.allow_edit(Some(7), created + Duration::minutes(179)));
        assert!(!ex.allow_edit(Some(7), created + Duration::hours(3)));
        assert!(!ex.allow_edit(Some(8), created));
        assert!(!ex.allow_edit(None, created));
    }

    #[test]
    fn test_orphaned_exercise_is_not_editable() {
        let created = Utc::now();
        let mut ex = exercise(created);
        ex.author_id = None;
        assert!(!ex.allow_edit(None, created));
    }

    #[test]
    fn test_registry() {
        assert_eq!(entity("user"), Some(&USER));
        assert_eq!(entity("EXERCISE").map(|e| e.table), Some("exercises"));
        assert!(entity("rating").is_none());
        assert_eq!(USER.member_path("abc"), "/v1/users/abc");
    }

    #[test]
    fn test_new_user_collects_every_field_error() {
        let input = NewUserInput {
            username: None,
            email: Some("nope".to_string()),
            password: Some("short".to_string()),
        };
        let errors = input.validate(8).unwrap_err();
        let fields = errors.fields();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields["username"], validation::MISSING_FIELD);
        assert_eq!(fields["email"], "Not a valid email address.");
        assert_eq!(fields["password"], "Shorter than minimum length 8.");
    }

    #[test]
    fn test_new_user_trims_and_drops_blank_email() {
        let input = NewUserInput {
            username: Some("  joey ".to_string()),
            email: Some("   ".to_string()),
            password: Some("correct horse".to_string()),
        };
        let valid = input.validate(8).unwrap();
        assert_eq!(valid.username, "joey");
        assert_eq!(valid.email, None);
    }

    #[test]
    fn test_username_too_long() {
        let patch = UserPatchInput {
            username: Some("x".repeat(USERNAME_MAX_LENGTH + 1)),
            email: None,
        };
        let errors = patch.validate().unwrap_err();
        assert_eq!(errors.fields()["username"], "Length must be between 1 and 32.");
    }

    #[test]
    fn test_new_exercise_requires_title_and_description() {
        let errors = NewExerciseInput {
            data: Some(json!([1, 2])),
            ..Default::default()
        }
        .validate(1)
        .unwrap_err();
        let fields = errors.fields();
        assert_eq!(fields["title"], validation::MISSING_FIELD);
        assert_eq!(fields["description"], validation::MISSING_FIELD);
        assert_eq!(fields["data"], "Not a valid mapping type.");
    }

    #[test]
    fn test_new_exercise_defaults_data() {
        let ex = NewExerciseInput {
            title: Some("Scales".to_string()),
            description: Some("C major".to_string()),
            data: None,
        }
        .validate(3)
        .unwrap();
        assert_eq!(ex.data, json!({}));
        assert_eq!(ex.author_id, Some(3));
    }

    #[test]
    fn test_favorite_action() {
        let ok = FavoriteAction {
            id: Some("abc".to_string()),
            action: Some("unfavorite".to_string()),
        }
        .validate()
        .unwrap();
        assert_eq!(ok.op, FavoriteOp::Unfavorite);

        let errors = FavoriteAction {
            id: None,
            action: Some("like".to_string()),
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.fields()["id"], validation::MISSING_FIELD);
        assert_eq!(errors.fields()["action"], "Must be one of favorite, unfavorite");
    }
}
