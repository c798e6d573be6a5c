//! JSON representations of users and exercises

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::TryFutureExt;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::expand::{Expand, Expandable, Representation};
use crate::models::{Exercise, ExerciseFilter, User};
use crate::state::{AppState, Links};

/// Everything a representation may depend on for one request
pub struct RequestContext {
    state: AppState,
    caller: Option<u64>,
    now: DateTime<Utc>,
}

impl RequestContext {
    pub fn new(state: AppState, caller: Option<u64>) -> Self {
        Self {
            state,
            caller,
            now: Utc::now(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn caller(&self) -> Option<u64> {
        self.caller
    }

    fn links(&self) -> Links<'_> {
        self.state.links()
    }
}

/// The owner's view of their own account
pub struct Profile(pub User);

fn timestamp(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Fields shared by the public and the owner's view
fn user_fields(user: &User, links: Links<'_>) -> Result<Representation> {
    Ok(Representation::new()
        .field("id", links.token(user.id)?)
        .field("username", user.username.as_str())
        .field("href", links.user(user.id)?))
}

async fn authored_exercises(
    representation: Representation,
    ctx: &RequestContext,
    expand: &Expand,
    user_id: u64,
) -> Result<Representation> {
    let filter = ExerciseFilter {
        author_id: Some(user_id),
        favorited_by: None,
    };
    representation
        .to_many(
            ctx,
            expand,
            "authored_exercises",
            ctx.links().exercises_by_author(user_id)?,
            || ctx.state.exercises().find_all(&filter, None).map_err(Error::from),
        )
        .await
}

#[async_trait]
impl Expandable<RequestContext> for User {
    async fn render(&self, ctx: &RequestContext, expand: &Expand) -> Result<Value> {
        let representation = user_fields(self, ctx.links())?;
        let representation = authored_exercises(representation, ctx, expand, self.id).await?;
        Ok(representation.build())
    }
}

#[async_trait]
impl Expandable<RequestContext> for Profile {
    async fn render(&self, ctx: &RequestContext, expand: &Expand) -> Result<Value> {
        let user = &self.0;
        let favorites = ExerciseFilter {
            author_id: None,
            favorited_by: Some(user.id),
        };

        let representation = user_fields(user, ctx.links())?
            .field("email", user.email.clone())
            .field("created_at", timestamp(user.created_at))
            .field("updated_at", timestamp(user.updated_at))
            .field("last_login", user.last_login.map(timestamp));
        let representation = authored_exercises(representation, ctx, expand, user.id)
            .await?
            .to_many(
                ctx,
                expand,
                "favorite_exercises",
                ctx.links().favorites_of(user.id)?,
                || ctx.state.exercises().find_all(&favorites, None).map_err(Error::from),
            )
            .await?;
        Ok(representation.build())
    }
}

#[async_trait]
impl Expandable<RequestContext> for Exercise {
    async fn render(&self, ctx: &RequestContext, expand: &Expand) -> Result<Value> {
        let links = ctx.links();
        let author_id = self.author_id;
        let author_link = author_id.map(|id| links.user(id)).transpose()?;

        let representation = Representation::new()
            .field("id", links.token(self.id)?)
            .field("title", self.title.as_str())
            .field("description", self.description.as_str())
            .field("data", self.data.clone())
            .field("href", links.exercise(self.id)?)
            .field("allow_edit", self.allow_edit(ctx.caller, ctx.now))
            .field("created_at", timestamp(self.created_at))
            .field("updated_at", timestamp(self.updated_at))
            .to_one(ctx, expand, "author", author_link, || async move {
                match author_id {
                    Some(id) => ctx.state.users().find_by_id(id).await.map_err(Error::from),
                    None => Ok(None),
                }
            })
            .await?;
        Ok(representation.build())
    }
}
