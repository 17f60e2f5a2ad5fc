//! Group membership handlers.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use crate::error::ApiError;
use crate::groups::members::PutOutcome;
use crate::schema::accounts::AccountInfo;
use crate::schema::groups::MembersInput;
use crate::state::AppState;

/// Lists the direct members of a group.
///
/// `GET /groups/{id}/members`
pub async fn list_members(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<AccountInfo>>, ApiError> {
    let caller = state.caller(&headers)?;
    let resource = state.groups_collection().parse(&caller, &id)?;
    let members = state.membership_editor().list_members(&resource)?;
    Ok(Json(members))
}

/// Adds members to an internal group and returns the added accounts.
///
/// `POST /groups/{id}/members` and `POST /groups/{id}/members.add`
pub async fn add_members(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Vec<AccountInfo>>, ApiError> {
    let caller = state.caller(&headers)?;
    let tokens = MembersInput::parse(&body)?;
    let resource = state.groups_collection().parse(&caller, &id)?;
    let added = state
        .membership_editor()
        .add_members(&caller, &resource, &tokens)
        .await?;
    Ok(Json(added))
}

/// Returns one member of a group.
///
/// `GET /groups/{id}/members/{member}`
pub async fn get_member(
    State(state): State<AppState>,
    Path((id, member)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Json<AccountInfo>, ApiError> {
    let caller = state.caller(&headers)?;
    let resource = state.groups_collection().parse(&caller, &id)?;
    state
        .membership_editor()
        .find_member(&caller, &resource, &member)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Not found: {member}")))
}

/// Adds a single member. An existing member is returned unchanged with 200;
/// a newly added one with 201.
///
/// `PUT /groups/{id}/members/{member}`
pub async fn put_member(
    State(state): State<AppState>,
    Path((id, member)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<AccountInfo>), ApiError> {
    let caller = state.caller(&headers)?;
    let resource = state.groups_collection().parse(&caller, &id)?;
    match state
        .membership_editor()
        .put_member(&caller, &resource, &member)
        .await?
    {
        PutOutcome::Existing(info) => Ok((StatusCode::OK, Json(info))),
        PutOutcome::Added(info) => Ok((StatusCode::CREATED, Json(info))),
    }
}
