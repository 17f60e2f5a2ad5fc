//! Change read handlers.

use axum::extract::{Path, Query, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, IF_NONE_MATCH};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use critic_core::{ChangeState, ListChangesOption, OptionSet};

use crate::error::ApiError;
use crate::schema::changes::ChangeQuery;
use crate::state::AppState;

/// Responses depend on options and plugin state, so caches must revalidate.
pub const CACHE_DIRECTIVE: &str = "private, max-age=0, must-revalidate";

/// Options implied by the `/detail` view.
pub const DETAIL_OPTIONS: [ListChangesOption; 4] = [
    ListChangesOption::Labels,
    ListChangesOption::DetailedLabels,
    ListChangesOption::DetailedAccounts,
    ListChangesOption::Messages,
];

/// Returns a change shaped by the requested output options.
///
/// `GET /changes/{id}?o=...&O=...&meta=...`
pub async fn get_change(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let query = ChangeQuery::from_pairs(&params)?;
    render_change(&state, &id, query, &headers)
}

/// Returns a change with labels, votes, detailed accounts and messages.
///
/// `GET /changes/{id}/detail`
pub async fn get_change_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let mut query = ChangeQuery::from_pairs(&params)?;
    query.options = query.options.union(&OptionSet::of(&DETAIL_OPTIONS));
    render_change(&state, &id, query, &headers)
}

fn render_change(
    state: &AppState,
    id: &str,
    query: ChangeQuery,
    headers: &HeaderMap,
) -> Result<Response, ApiError> {
    let change = state.changes_collection().parse(id)?;
    let plugins = state.plugins.clone();
    let info = state.change_json(query.options).format(
        change,
        query.meta,
        &|changes: &[ChangeState]| plugins.create_all(changes),
    )?;

    let body = serde_json::to_vec(&info)
        .map_err(|e| ApiError::InternalError(format!("cannot encode change: {e}")))?;
    let etag = format!("\"{}\"", blake3::hash(&body).to_hex());

    let revalidated = headers
        .get(IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.split(',').any(|tag| tag.trim() == etag));
    if revalidated {
        return Ok((
            StatusCode::NOT_MODIFIED,
            [
                (CACHE_CONTROL, CACHE_DIRECTIVE.to_string()),
                (ETAG, etag),
            ],
        )
            .into_response());
    }

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, "application/json".to_string()),
            (CACHE_CONTROL, CACHE_DIRECTIVE.to_string()),
            (ETAG, etag),
        ],
        body,
    )
        .into_response())
}
