//! Restarts network listeners when their settings change

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::{events::AppEvent, state::AppState};

/// Which listener a setting key configures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    Dashboard,
    Osc,
}

impl ListenerKind {
    pub fn for_setting(key: &str) -> Option<Self> {
        if key.starts_with("WEB_") {
            Some(Self::Dashboard)
        } else if key.starts_with("OSC_") {
            Some(Self::Osc)
        } else {
            None
        }
    }
}

/// Background task that applies listener setting changes
pub async fn listener_supervisor_task(state: Arc<AppState>) {
    info!("Starting listener supervisor task");
    let mut events = state.events.subscribe();

    loop {
        let key = match events.recv().await {
            Ok(AppEvent::SettingsChanged { key }) => key,
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                debug!("Listener supervisor skipped {} events", skipped);
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        let Some(kind) = ListenerKind::for_setting(&key) else {
            continue;
        };
        info!("{} changed, restarting {:?} listener", key, kind);
        // Bind failures are already logged and announced by the listener
        let result = match kind {
            ListenerKind::Dashboard => state.dashboard.restart(&state).await,
            ListenerKind::Osc => state.osc.restart(&state).await,
        };
        match result {
            Ok(true) => {}
            Ok(false) => info!("{:?} listener left stopped", kind),
            Err(e) => warn!("{:?} listener restart failed: {}", kind, e),
        }
    }

    info!("Listener supervisor task stopped");
}
