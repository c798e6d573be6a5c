//! `/v1/users` endpoints

use axum::extract::State;
use axum::Json;
use serde_json::Value;

use super::views::{Profile, RequestContext};
use super::Payload;
use crate::auth::{Caller, MaybeCaller};
use crate::error::{Error, Result};
use crate::expand::{render_page, Expand, Expandable, PageEnvelope};
use crate::ids::PublicId;
use crate::models::{
    FavoriteAction, FavoriteOp, NewUser, NewUserInput, User, UserFilter, UserPatchInput, USER,
};
use crate::pagination::{CollectionUrl, Page, PageRequest, Pager};
use crate::query::QueryParams;
use crate::repository::RepositorySource;
use crate::responses::{Created, NoContent};
use crate::state::AppState;
use crate::validation::check_unique;

async fn find_user(state: &AppState, id: u64) -> Result<User> {
    state
        .users()
        .find_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("{} {id}", USER.name)))
}

/// Only the owner may act on their account
fn require_owner(caller: u64, id: u64) -> Result<()> {
    if caller == id {
        Ok(())
    } else {
        Err(Error::Forbidden(
            "You are not allowed to modify this user.".to_string(),
        ))
    }
}

/// `GET /v1/users`
pub async fn list_users(
    State(state): State<AppState>,
    MaybeCaller(caller): MaybeCaller,
    params: QueryParams,
) -> Result<PageEnvelope> {
    let request = PageRequest::from_params(&params);
    let url = CollectionUrl::new(
        state.config().service.base_url(),
        USER.collection_path,
        &params,
    );

    let source = RepositorySource::new(state.users(), UserFilter);
    let page: Page<User> = Pager::query(&request, &source, url).await?;

    let ctx = RequestContext::new(state, caller);
    render_page(&ctx, &page, &Expand::from_params(&params)).await
}

/// `POST /v1/users`: register
pub async fn create_user(
    State(state): State<AppState>,
    params: QueryParams,
    Payload(input): Payload<NewUserInput>,
) -> Result<Created<Value>> {
    let input = input.validate(state.config().password.min_length)?;

    let mut candidates = vec![("username", input.username.clone())];
    if let Some(email) = &input.email {
        candidates.push(("email", email.clone()));
    }
    check_unique(state.users(), &candidates, None).await?;

    let password_hash = state.hasher().hash_blocking(input.password).await?;
    let user = state
        .users()
        .create(NewUser {
            username: input.username,
            email: input.email,
            password_hash,
        })
        .await?;
    tracing::info!(user_id = user.id, "User registered");

    let location = state.links().user(user.id)?;
    let ctx = RequestContext::new(state, Some(user.id));
    let body = Profile(user)
        .render(&ctx, &Expand::from_params(&params))
        .await?;
    Ok(Created::new(body).with_location(location))
}

/// `GET /v1/users/profile`
pub async fn get_profile(
    State(state): State<AppState>,
    Caller(caller): Caller,
    params: QueryParams,
) -> Result<Json<Value>> {
    let user = find_user(&state, caller).await?;
    let ctx = RequestContext::new(state, Some(caller));
    let body = Profile(user)
        .render(&ctx, &Expand::from_params(&params))
        .await?;
    Ok(Json(body))
}

/// `GET /v1/users/{id}`: the owner gets the profile view
pub async fn get_user(
    State(state): State<AppState>,
    PublicId(id): PublicId,
    MaybeCaller(caller): MaybeCaller,
    params: QueryParams,
) -> Result<Json<Value>> {
    let user = find_user(&state, id).await?;
    let expand = Expand::from_params(&params);
    let ctx = RequestContext::new(state, caller);

    let body = if caller == Some(id) {
        Profile(user).render(&ctx, &expand).await?
    } else {
        user.render(&ctx, &expand).await?
    };
    Ok(Json(body))
}

/// `PUT /v1/users/{id}`
pub async fn update_user(
    State(state): State<AppState>,
    PublicId(id): PublicId,
    Caller(caller): Caller,
    params: QueryParams,
    Payload(input): Payload<UserPatchInput>,
) -> Result<Json<Value>> {
    find_user(&state, id).await?;
    require_owner(caller, id)?;

    let changes = input.validate()?;
    let candidates: Vec<_> = [("username", &changes.username), ("email", &changes.email)]
        .into_iter()
        .filter_map(|(column, value)| Some((column, value.clone()?)))
        .collect();
    check_unique(state.users(), &candidates, Some(id)).await?;

    let user = state.users().update(id, changes).await?;
    tracing::info!(user_id = id, "User updated");

    let ctx = RequestContext::new(state, Some(caller));
    let body = Profile(user)
        .render(&ctx, &Expand::from_params(&params))
        .await?;
    Ok(Json(body))
}

/// `DELETE /v1/users/{id}`
///
/// Favorites go with the account; authored exercises stay, without an author.
pub async fn delete_user(
    State(state): State<AppState>,
    PublicId(id): PublicId,
    Caller(caller): Caller,
) -> Result<NoContent> {
    require_owner(caller, id)?;
    if !state.users().delete(id).await? {
        return Err(Error::NotFound(format!("{} {id}", USER.name)));
    }
    tracing::info!(user_id = id, "User deleted");
    Ok(NoContent)
}

/// `POST /v1/users/{id}/favorites`
///
/// Body: `{"id": "<exercise token>", "action": "favorite" | "unfavorite"}`.
/// Repeating an action is not an error.
pub async fn update_favorites(
    State(state): State<AppState>,
    PublicId(id): PublicId,
    Caller(caller): Caller,
    params: QueryParams,
    Payload(input): Payload<FavoriteAction>,
) -> Result<Json<Value>> {
    let user = find_user(&state, id).await?;
    require_owner(caller, id)?;

    let action = input.validate()?;
    let exercise_id = state.codec().decode(&action.token)?;
    let changed = match action.op {
        FavoriteOp::Favorite => state.exercises().add_favorite(id, exercise_id).await?,
        FavoriteOp::Unfavorite => state.exercises().remove_favorite(id, exercise_id).await?,
    };
    tracing::debug!(user_id = id, exercise_id, op = ?action.op, changed, "Favorites updated");

    let ctx = RequestContext::new(state, Some(caller));
    let body = Profile(user)
        .render(&ctx, &Expand::from_params(&params))
        .await?;
    Ok(Json(body))
}
