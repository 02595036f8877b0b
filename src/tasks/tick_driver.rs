//! Periodic timer advancement

use std::{sync::Arc, time::Duration};

use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::state::AppState;

/// Background task that advances every timer by `interval_ms` each period
pub async fn tick_driver_task(state: Arc<AppState>, interval_ms: u64) {
    info!("Starting tick driver every {}ms", interval_ms);

    let mut ticker = interval(Duration::from_millis(interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if let Err(e) = state.with_registry(|registry| Ok(registry.tick(interval_ms))) {
            error!("Tick failed: {}", e);
        }
    }
}
