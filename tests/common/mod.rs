#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use showtrak_timers::{
    events::EventBus,
    state::{AppState, NewTimer},
    store::SqliteStore,
};

pub fn app_state() -> Arc<AppState> {
    let state = AppState::new(
        Box::new(SqliteStore::open_in_memory().expect("timer store")),
        Box::new(SqliteStore::open_in_memory().expect("settings store")),
        EventBus::new(),
        Duration::from_millis(400),
    )
    .expect("app state");
    Arc::new(state)
}

pub fn create(state: &AppState, timer_type: &str, name: &str, duration_ms: Option<i64>) -> i64 {
    state
        .with_registry(|registry| {
            registry.create(NewTimer {
                timer_type: timer_type.to_string(),
                name: name.to_string(),
                duration_ms,
                ..NewTimer::default()
            })
        })
        .expect("create timer")
        .id
}

pub fn names(state: &AppState) -> Vec<String> {
    state
        .timers()
        .expect("timers")
        .into_iter()
        .map(|timer| timer.name)
        .collect()
}
