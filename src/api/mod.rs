//! HTTP control API
//!
//! The operator-facing surface: timer CRUD and runtime commands, settings,
//! the remote route table, and a websocket sink of coalesced snapshots.

pub mod handlers;
pub mod responses;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use handlers::*;

/// Create the HTTP router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/timers", get(list_timers_handler).post(create_timer_handler))
        .route(
            "/timers/:id",
            get(get_timer_handler)
                .patch(update_timer_handler)
                .delete(delete_timer_handler),
        )
        .route("/timers/:id/move/:direction", post(move_timer_handler))
        .route("/timers/:id/start", post(start_timer_handler))
        .route("/timers/:id/stop", post(stop_timer_handler))
        .route("/timers/:id/pause", post(pause_timer_handler))
        .route("/timers/:id/unpause", post(unpause_timer_handler))
        .route("/timers/:id/elapsed", post(seek_timer_handler))
        .route("/osc/routes", get(osc_routes_handler))
        .route("/settings", get(list_settings_handler))
        .route("/settings/:key", put(update_setting_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .route("/ui/ws", get(ui_websocket_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
