//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State, WebSocketUpgrade},
    http::StatusCode,
    response::{Json, Response},
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info};

use super::responses::{
    fail, ok, settings_error_status, timer_error_status, ApiResult, HealthResponse, StatusResponse,
};
use crate::{
    broadcast::TimerSnapshot,
    error::{SettingsError, TimerError},
    osc::RouteInfo,
    settings::Setting,
    state::{
        clamp_millis, AppState, MoveDirection, NewTimer, Timer, TimerPatch, TimerRegistry,
        TimerStatus,
    },
    utils::push_snapshots,
};

/// Body of POST /timers/:id/elapsed
#[derive(Debug, Deserialize)]
pub struct SeekRequest {
    pub elapsed_ms: f64,
}

/// Body of PUT /settings/:key
#[derive(Debug, Deserialize)]
pub struct SettingValue {
    pub value: Value,
}

fn timer_result<T>(action: &str, result: Result<T, TimerError>) -> ApiResult<T> {
    match result {
        Ok(data) => ok(data),
        Err(e) => {
            error!("Failed to {}: {}", action, e);
            fail(timer_error_status(&e), e.to_string())
        }
    }
}

fn settings_result<T>(action: &str, result: Result<T, SettingsError>) -> ApiResult<T> {
    match result {
        Ok(data) => ok(data),
        Err(e) => {
            error!("Failed to {}: {}", action, e);
            fail(settings_error_status(&e), e.to_string())
        }
    }
}

fn bad_body<T>(rejection: JsonRejection) -> ApiResult<T> {
    fail(StatusCode::BAD_REQUEST, rejection.body_text())
}

fn runtime_command(
    state: &AppState,
    id: i64,
    action: &str,
    op: fn(&mut TimerRegistry, i64) -> Result<Timer, TimerError>,
) -> ApiResult<TimerSnapshot> {
    let result = state.with_registry(|registry| {
        op(registry, id).map(|timer| TimerSnapshot::from(&timer))
    });
    if result.is_ok() {
        info!("Timer {} {}", id, action);
    }
    timer_result(action, result)
}

/// Handle GET /timers - ordered snapshot of every timer
pub async fn list_timers_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<TimerSnapshot>> {
    timer_result("list timers", state.ui_snapshot())
}

/// Handle POST /timers - create a timer
pub async fn create_timer_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewTimer>, JsonRejection>,
) -> ApiResult<TimerSnapshot> {
    let Json(new) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_body(rejection),
    };
    let result = state.with_registry(|registry| {
        registry
            .create(new)
            .map(|timer| TimerSnapshot::from(&timer))
    });
    timer_result("create timer", result)
}

/// Handle GET /timers/:id
pub async fn get_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<TimerSnapshot> {
    let result = state.with_registry(|registry| registry.get(id).map(TimerSnapshot::from));
    timer_result("get timer", result)
}

/// Handle PATCH /timers/:id - partial update
pub async fn update_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    payload: Result<Json<TimerPatch>, JsonRejection>,
) -> ApiResult<TimerSnapshot> {
    let Json(patch) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_body(rejection),
    };
    let result = state.with_registry(|registry| {
        registry
            .update(id, patch)
            .map(|timer| TimerSnapshot::from(&timer))
    });
    timer_result("update timer", result)
}

/// Handle DELETE /timers/:id
pub async fn delete_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<bool> {
    let result = state.with_registry(|registry| registry.delete(id).map(|()| true));
    timer_result("delete timer", result)
}

/// Handle POST /timers/:id/move/:direction - swap with the neighbour
///
/// `data` is false when the timer is already at that edge.
pub async fn move_timer_handler(
    State(state): State<Arc<AppState>>,
    Path((id, direction)): Path<(i64, String)>,
) -> ApiResult<bool> {
    let result = direction.parse::<MoveDirection>().and_then(|direction| {
        state.with_registry(|registry| registry.move_timer(id, direction))
    });
    timer_result("move timer", result)
}

/// Handle POST /timers/:id/start
pub async fn start_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<TimerSnapshot> {
    runtime_command(&state, id, "started", TimerRegistry::start)
}

/// Handle POST /timers/:id/stop
pub async fn stop_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<TimerSnapshot> {
    runtime_command(&state, id, "stopped", TimerRegistry::stop)
}

/// Handle POST /timers/:id/pause
pub async fn pause_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<TimerSnapshot> {
    runtime_command(&state, id, "paused", TimerRegistry::pause)
}

/// Handle POST /timers/:id/unpause
pub async fn unpause_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<TimerSnapshot> {
    runtime_command(&state, id, "unpaused", TimerRegistry::unpause)
}

/// Handle POST /timers/:id/elapsed - seek to a position
pub async fn seek_timer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    payload: Result<Json<SeekRequest>, JsonRejection>,
) -> ApiResult<TimerSnapshot> {
    let Json(seek) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_body(rejection),
    };
    let elapsed_ms = clamp_millis(seek.elapsed_ms);
    let result = state.with_registry(|registry| {
        registry
            .set_elapsed_time(id, elapsed_ms)
            .map(|timer| TimerSnapshot::from(&timer))
    });
    timer_result("seek timer", result)
}

/// Handle GET /osc/routes - remote command table
pub async fn osc_routes_handler(State(state): State<Arc<AppState>>) -> ApiResult<Vec<RouteInfo>> {
    ok(state.router.routes())
}

/// Handle GET /settings
pub async fn list_settings_handler(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Setting>> {
    settings_result(
        "list settings",
        state.with_settings(|settings| Ok(settings.all())),
    )
}

/// Handle PUT /settings/:key
pub async fn update_setting_handler(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    payload: Result<Json<SettingValue>, JsonRejection>,
) -> ApiResult<Setting> {
    let Json(body) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_body(rejection),
    };
    settings_result(
        "update setting",
        state.with_settings(|settings| settings.set(&key, body.value)),
    )
}

/// Handle GET /status - uptime and listener overview
pub async fn status_handler(State(state): State<Arc<AppState>>) -> ApiResult<StatusResponse> {
    let counts = state.with_registry(|registry| {
        let timers = registry.get_all(false)?;
        let running = timers
            .iter()
            .filter(|timer| timer.status == TimerStatus::Running)
            .count();
        Ok((timers.len(), running))
    });
    let (timer_count, running_timers) = match counts {
        Ok(counts) => counts,
        Err(e) => {
            error!("Failed to get timer counts: {}", e);
            return fail(timer_error_status(&e), e.to_string());
        }
    };

    ok(StatusResponse {
        uptime: state.get_uptime(),
        timer_count,
        running_timers,
        osc_address: state.osc.address().await,
        dashboard_address: state.dashboard.address().await,
    })
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> ApiResult<HealthResponse> {
    ok(HealthResponse::ok())
}

/// Handle GET /ui/ws - coalesced full snapshots for the control UI
pub async fn ui_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        let updates = state.ui_updates.subscribe();
        let initial = match state.ui_snapshot() {
            Ok(timers) => Arc::new(timers),
            Err(e) => {
                error!("UI viewer connected without a snapshot: {}", e);
                updates.borrow().clone()
            }
        };
        push_snapshots(socket, initial, updates).await;
    })
}
