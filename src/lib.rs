//! ShowTrak Timers - live show timers with remote control
//!
//! This library provides an ordered, persisted registry of timers, countdowns
//! and stopwatches, driven by a periodic tick and controlled over OSC and an
//! HTTP API, with rate-limited snapshots pushed to a control UI and a
//! read-only web dashboard.

pub mod api;
pub mod broadcast;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod events;
pub mod osc;
pub mod settings;
pub mod state;
pub mod store;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use error::{ListenerError, RouteError, SettingsError, StoreError, TimerError};
pub use events::{AppEvent, EventBus, NotifyLevel};
pub use state::AppState;
pub use store::SqliteStore;
pub use utils::signals::shutdown_signal;
