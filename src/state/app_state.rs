//! Main application state shared by every task and handler

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};
use tokio::{
    sync::{watch, Notify},
    task::JoinHandle,
};
use tracing::info;

use super::{Timer, TimerRegistry};
use crate::{
    broadcast::{spawn_sink, ui_snapshot, web_snapshot, TimerSnapshot, WebTimerView},
    dashboard::DashboardServer,
    error::{SettingsError, TimerError},
    events::EventBus,
    osc::{routes::build_router, CommandRouter, OscListener},
    settings::Settings,
    store::{SettingsStore, TimerStore},
};

/// Address and enablement of one network listener, read from settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerSettings {
    pub enabled: bool,
    pub bind: String,
    pub port: u16,
}

impl ListenerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

pub struct AppState {
    /// Publisher handle for change and notification events
    pub events: EventBus,
    /// Single writer for every timer mutation
    pub registry: Mutex<TimerRegistry>,
    pub settings: Mutex<Settings>,
    /// Remote command routes, fixed at startup
    pub router: CommandRouter<Arc<AppState>>,
    pub osc: OscListener,
    pub dashboard: DashboardServer,
    /// Minimum spacing between two snapshots sent to the same sink
    pub emit_interval: Duration,
    /// Coalesced snapshots for the control UI
    pub ui_updates: watch::Sender<Arc<Vec<TimerSnapshot>>>,
    pub shutdown: Notify,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        timer_store: Box<dyn TimerStore>,
        settings_store: Box<dyn SettingsStore>,
        events: EventBus,
        emit_interval: Duration,
    ) -> Result<Self, SettingsError> {
        let settings = Settings::load(settings_store, events.clone())?;
        let (ui_updates, _) = watch::channel(Arc::new(Vec::new()));

        Ok(Self {
            registry: Mutex::new(TimerRegistry::new(timer_store, events.clone())),
            settings: Mutex::new(settings),
            events,
            router: build_router(),
            osc: OscListener::new(),
            dashboard: DashboardServer::new(),
            emit_interval,
            ui_updates,
            shutdown: Notify::new(),
            start_time: Instant::now(),
        })
    }

    /// Run `f` with exclusive access to the registry
    pub fn with_registry<R, F>(&self, f: F) -> Result<R, TimerError>
    where
        F: FnOnce(&mut TimerRegistry) -> Result<R, TimerError>,
    {
        let mut registry = self.registry.lock().map_err(|_| TimerError::Poisoned)?;
        f(&mut registry)
    }

    /// Run `f` with exclusive access to the settings
    pub fn with_settings<R, F>(&self, f: F) -> Result<R, SettingsError>
    where
        F: FnOnce(&mut Settings) -> Result<R, SettingsError>,
    {
        let mut settings = self.settings.lock().map_err(|_| SettingsError::Poisoned)?;
        f(&mut settings)
    }

    pub fn timers(&self) -> Result<Vec<Timer>, TimerError> {
        self.with_registry(|registry| Ok(registry.get_all(false)?.to_vec()))
    }

    pub fn ui_snapshot(&self) -> Result<Vec<TimerSnapshot>, TimerError> {
        self.with_registry(|registry| Ok(ui_snapshot(registry.get_all(false)?)))
    }

    pub fn web_snapshot(&self) -> Result<Vec<WebTimerView>, TimerError> {
        self.with_registry(|registry| Ok(web_snapshot(registry.get_all(false)?)))
    }

    pub fn listener_settings(
        &self,
        enable_key: &str,
        bind_key: &str,
        port_key: &str,
        default_port: u16,
    ) -> ListenerSettings {
        let settings = self.settings.lock().unwrap_or_else(PoisonError::into_inner);
        ListenerSettings {
            enabled: settings.bool_value(enable_key),
            bind: settings.text_value(bind_key).unwrap_or("0.0.0.0").to_string(),
            port: settings.port_value(port_key).unwrap_or(default_port),
        }
    }

    /// Start the coalescing task feeding [`AppState::ui_updates`]
    pub fn spawn_ui_sink(self: &Arc<Self>) -> JoinHandle<()> {
        let state = Arc::clone(self);
        spawn_sink(
            "UI",
            self.events.subscribe(),
            self.emit_interval,
            |timers: &[Timer]| Arc::new(ui_snapshot(timers)),
            move |snapshot| {
                state.ui_updates.send_replace(snapshot);
            },
        )
    }

    /// Ask the process to shut down
    pub fn request_shutdown(&self) {
        info!("Application shutdown requested");
        self.shutdown.notify_one();
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}
