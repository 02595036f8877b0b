//! Operator notifications written to the log

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use crate::{
    events::{AppEvent, NotifyLevel},
    state::AppState,
};

/// Background task that logs every `Notify` event at its level
pub async fn notification_task(state: Arc<AppState>) {
    let mut events = state.events.subscribe();

    loop {
        match events.recv().await {
            Ok(AppEvent::Notify { message, level }) => match level {
                NotifyLevel::Info | NotifyLevel::Success => info!(?level, "{}", message),
                NotifyLevel::Warning => warn!("{}", message),
                NotifyLevel::Error => error!("{}", message),
            },
            Ok(_) | Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => break,
        }
    }
}
