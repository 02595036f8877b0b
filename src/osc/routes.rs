//! `/ShowTrak` remote-control routes

use std::sync::Arc;

use tracing::info;

use super::router::{CommandRouter, HandlerResult, RouteParams};
use crate::{
    error::TimerError,
    state::{parse_millis, AppState, Timer, TimerPatch, TimerRegistry, TimerType},
};

type TimerOp = fn(&mut TimerRegistry, i64) -> Result<Timer, TimerError>;
type BulkOp = fn(&mut TimerRegistry) -> Result<usize, TimerError>;

/// Build the router with every remote command in precedence order
pub fn build_router() -> CommandRouter<Arc<AppState>> {
    let mut router: CommandRouter<Arc<AppState>> = CommandRouter::new();
    router
        .route(
            "/ShowTrak/Shutdown",
            "Close the ShowTrak Timers application",
            |_, state: Arc<AppState>| async move {
                state.request_shutdown();
                HandlerResult::Handled
            },
        )
        .route(
            "/ShowTrak/Timer/:TimerID/Start",
            "Start a timer with the given ID",
            |params, state| timer_command(params, state, TimerRegistry::start),
        )
        .route(
            "/ShowTrak/Timer/:TimerID/Stop",
            "Stop and reset a timer with the given ID",
            |params, state| timer_command(params, state, TimerRegistry::stop),
        )
        .route(
            "/ShowTrak/Timer/:TimerID/Pause",
            "Pause a timer with the given ID",
            |params, state| timer_command(params, state, TimerRegistry::pause),
        )
        .route(
            "/ShowTrak/Timer/:TimerID/Unpause",
            "Unpause a timer with the given ID",
            |params, state| timer_command(params, state, TimerRegistry::unpause),
        )
        .route(
            "/ShowTrak/Timer/:TimerID/JumpToTime/:TimeInMS",
            "Jump to a specific time (ms) in a timer with the given ID",
            |params, state| async move { jump_to_time(&params, &state) },
        )
        .route(
            "/ShowTrak/Timer/:TimerID/Rename/:Name",
            "Rename a timer with the given ID",
            |params, state| async move { rename(&params, &state) },
        )
        .route(
            "/ShowTrak/Timer/:TimerID/SetDuration/:DurationMS",
            "Set the duration (ms) of a timer or countdown with the given ID",
            |params, state| async move { set_duration(&params, &state) },
        )
        .route(
            "/ShowTrak/All/Start",
            "Start all timers",
            |_, state| bulk_command(state, TimerRegistry::start_all),
        )
        .route(
            "/ShowTrak/All/Stop",
            "Stop and reset all timers",
            |_, state| bulk_command(state, TimerRegistry::stop_all),
        )
        .route(
            "/ShowTrak/All/Pause",
            "Pause all timers",
            |_, state| bulk_command(state, TimerRegistry::pause_all),
        )
        .route(
            "/ShowTrak/All/Unpause",
            "Unpause all timers",
            |_, state| bulk_command(state, TimerRegistry::unpause_all),
        );
    router
}

fn outcome<T>(result: Result<T, TimerError>) -> HandlerResult {
    match result {
        Ok(_) => HandlerResult::Handled,
        Err(e) => HandlerResult::Error(e.to_string()),
    }
}

async fn timer_command(params: RouteParams, state: Arc<AppState>, op: TimerOp) -> HandlerResult {
    let Some(id) = params.parse_i64("TimerID") else {
        return HandlerResult::Declined;
    };
    outcome(state.with_registry(|registry| op(registry, id)))
}

async fn bulk_command(state: Arc<AppState>, op: BulkOp) -> HandlerResult {
    let result = state.with_registry(op);
    if let Ok(count) = &result {
        info!("Bulk command applied to {} timers", count);
    }
    outcome(result)
}

fn jump_to_time(params: &RouteParams, state: &AppState) -> HandlerResult {
    let (Some(id), Some(elapsed_ms)) = (
        params.parse_i64("TimerID"),
        params.get("TimeInMS").and_then(parse_millis),
    ) else {
        return HandlerResult::Declined;
    };
    outcome(state.with_registry(|registry| registry.set_elapsed_time(id, elapsed_ms)))
}

fn rename(params: &RouteParams, state: &AppState) -> HandlerResult {
    let (Some(id), Some(name)) = (params.parse_i64("TimerID"), params.get("Name")) else {
        return HandlerResult::Declined;
    };
    let patch = TimerPatch {
        name: Some(name.to_string()),
        ..TimerPatch::default()
    };
    outcome(state.with_registry(|registry| registry.update(id, patch)))
}

fn set_duration(params: &RouteParams, state: &AppState) -> HandlerResult {
    let (Some(id), Some(duration_ms)) = (
        params.parse_i64("TimerID"),
        params.get("DurationMS").and_then(parse_millis),
    ) else {
        return HandlerResult::Declined;
    };
    outcome(state.with_registry(|registry| {
        if registry.get(id)?.timer_type() == TimerType::Stopwatch {
            return Err(TimerError::Validation {
                field: "duration_ms",
                reason: format!("timer {} is a stopwatch", id),
            });
        }
        let patch = TimerPatch {
            duration_ms: Some(i64::try_from(duration_ms).unwrap_or(i64::MAX)),
            ..TimerPatch::default()
        };
        registry.update(id, patch)
    }))
}
