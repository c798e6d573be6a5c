//! `/v1/exercises` endpoints

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::Value;

use super::views::RequestContext;
use super::Payload;
use crate::auth::{Caller, MaybeCaller};
use crate::error::{Error, Result};
use crate::expand::{render_page, Expand, Expandable, PageEnvelope};
use crate::ids::{IdCodec, PublicId};
use crate::models::{Exercise, ExerciseFilter, ExercisePatchInput, NewExerciseInput, EXERCISE};
use crate::pagination::{CollectionUrl, Page, PageRequest, Pager};
use crate::query::QueryParams;
use crate::repository::RepositorySource;
use crate::responses::{Created, NoContent};
use crate::state::AppState;

async fn find_exercise(state: &AppState, id: u64) -> Result<Exercise> {
    state
        .exercises()
        .find_by_id(id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("{} {id}", EXERCISE.name)))
}

/// Decode the `author_id` and `favorited_by` filter tokens.
///
/// A token that does not decode names no user, so it is reported the same
/// way as an unknown path id.
fn exercise_filter(params: &QueryParams, codec: &IdCodec) -> Result<ExerciseFilter> {
    let decode = |name: &str| params.get(name).map(|token| codec.decode(token)).transpose();
    Ok(ExerciseFilter {
        author_id: decode("author_id")?,
        favorited_by: decode("favorited_by")?,
    })
}

/// `GET /v1/exercises`
pub async fn list_exercises(
    State(state): State<AppState>,
    MaybeCaller(caller): MaybeCaller,
    params: QueryParams,
) -> Result<PageEnvelope> {
    let filter = exercise_filter(&params, state.codec())?;
    let request = PageRequest::from_params(&params);
    let url = CollectionUrl::new(
        state.config().service.base_url(),
        EXERCISE.collection_path,
        &params,
    );

    let source = RepositorySource::new(state.exercises(), filter);
    let page: Page<Exercise> = Pager::query(&request, &source, url).await?;

    let ctx = RequestContext::new(state, caller);
    render_page(&ctx, &page, &Expand::from_params(&params)).await
}

/// `POST /v1/exercises`: the caller becomes the author
pub async fn create_exercise(
    State(state): State<AppState>,
    Caller(caller): Caller,
    params: QueryParams,
    Payload(input): Payload<NewExerciseInput>,
) -> Result<Created<Value>> {
    // A token can outlive the account it was issued for
    if state.users().find_by_id(caller).await?.is_none() {
        return Err(Error::Unauthorized("Caller account no longer exists".to_string()));
    }

    let new_exercise = input.validate(caller)?;
    let exercise = state.exercises().create(new_exercise).await?;
    tracing::info!(exercise_id = exercise.id, author_id = caller, "Exercise created");

    let location = state.links().exercise(exercise.id)?;
    let ctx = RequestContext::new(state, Some(caller));
    let body = exercise
        .render(&ctx, &Expand::from_params(&params))
        .await?;
    Ok(Created::new(body).with_location(location))
}

/// `GET /v1/exercises/{id}`
pub async fn get_exercise(
    State(state): State<AppState>,
    PublicId(id): PublicId,
    MaybeCaller(caller): MaybeCaller,
    params: QueryParams,
) -> Result<Json<Value>> {
    let exercise = find_exercise(&state, id).await?;
    let ctx = RequestContext::new(state, caller);
    let body = exercise
        .render(&ctx, &Expand::from_params(&params))
        .await?;
    Ok(Json(body))
}

/// `PUT /v1/exercises/{id}`: author only, inside the edit window
pub async fn update_exercise(
    State(state): State<AppState>,
    PublicId(id): PublicId,
    Caller(caller): Caller,
    params: QueryParams,
    Payload(input): Payload<ExercisePatchInput>,
) -> Result<Json<Value>> {
    let exercise = find_exercise(&state, id).await?;
    if exercise.author_id != Some(caller) {
        return Err(Error::Forbidden(
            "You are not allowed to modify this exercise.".to_string(),
        ));
    }
    if !exercise.edit_window_open(Utc::now()) {
        return Err(Error::Forbidden(
            "This exercise can no longer be edited.".to_string(),
        ));
    }

    let changes = input.validate()?;
    let exercise = state.exercises().update(id, changes).await?;
    tracing::info!(exercise_id = id, "Exercise updated");

    let ctx = RequestContext::new(state, Some(caller));
    let body = exercise
        .render(&ctx, &Expand::from_params(&params))
        .await?;
    Ok(Json(body))
}

/// `DELETE /v1/exercises/{id}`: author only
pub async fn delete_exercise(
    State(state): State<AppState>,
    PublicId(id): PublicId,
    Caller(caller): Caller,
) -> Result<NoContent> {
    let exercise = find_exercise(&state, id).await?;
    if exercise.author_id != Some(caller) {
        return Err(Error::Forbidden(
            "You are not allowed to delete this exercise.".to_string(),
        ));
    }

    state.exercises().delete(id).await?;
    tracing::info!(exercise_id = id, "Exercise deleted");
    Ok(NoContent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IdsConfig;

    #[test]
    fn test_exercise_filter() {
        let codec = IdCodec::from_config(&IdsConfig::default()).unwrap();
        let token = codec.encode(12).unwrap();

        let params = QueryParams::parse(Some(&format!("author_id={token}&page=2")));
        let filter = exercise_filter(&params, &codec).unwrap();
        assert_eq!(filter.author_id, Some(12));
        assert_eq!(filter.favorited_by, None);

        let params = QueryParams::parse(Some("favorited_by=%21%21"));
        assert!(matches!(
            exercise_filter(&params, &codec),
            Err(Error::InvalidId)
        ));

        let filter = exercise_filter(&QueryParams::default(), &codec).unwrap();
        assert_eq!(filter, ExerciseFilter::default());
    }
}
