//! Router assembly for the critic HTTP API.
//!
//! [`build_router`] wires all handler functions to their routes with
//! CORS and tracing middleware layers.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Builds the complete axum router with all API routes.
///
/// Routes use axum 0.8 `/{param}` path syntax.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Changes
        .route("/changes/{id}", get(handlers::changes::get_change))
        .route(
            "/changes/{id}/detail",
            get(handlers::changes::get_change_detail),
        )
        // Group membership
        .route(
            "/groups/{id}/members",
            get(handlers::groups::list_members).post(handlers::groups::add_members),
        )
        .route(
            "/groups/{id}/members.add",
            post(handlers::groups::add_members),
        )
        .route(
            "/groups/{id}/members/{member}",
            get(handlers::groups::get_member).put(handlers::groups::put_member),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
