//! Application event bus
//!
//! A cloneable publisher handle passed to every component that needs to
//! announce or observe changes.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::state::Timer;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Every event carried by the bus
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The registry committed a mutation; carries the ordered snapshot
    TimersChanged(Arc<Vec<Timer>>),
    SettingsChanged { key: String },
    Notify { message: String, level: NotifyLevel },
}

impl AppEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TimersChanged(_) => "TimersChanged",
            Self::SettingsChanged { .. } => "SettingsChanged",
            Self::Notify { .. } => "Notify",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: AppEvent) {
        let name = event.name();
        if self.tx.send(event).is_err() {
            debug!("No subscribers for {} event", name);
        }
    }

    pub fn notify(&self, message: impl Into<String>, level: NotifyLevel) {
        self.publish(AppEvent::Notify {
            message: message.into(),
            level,
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
