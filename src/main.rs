//! ShowTrak Timers - live show timers with remote control
//!
//! This is the main entry point for the showtrak-timers application.

use std::{fs, sync::Arc};

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use showtrak_timers::{
    api::create_router,
    config::Config,
    events::EventBus,
    state::AppState,
    store::SqliteStore,
    tasks::{listener_supervisor_task, notification_task, tick_driver_task},
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level; RUST_LOG overrides
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("showtrak_timers={},tower_http=info", config.log_level()))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting showtrak-timers v{}", env!("CARGO_PKG_VERSION"));

    let db_path = config
        .database_path()
        .context("no data directory available; pass --database")?;
    if !config.is_in_memory() {
        if let Some(parent) = db_path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    info!(
        "Configuration: api={}, database={}, tick={}ms, emit={}ms",
        config.address(),
        db_path.display(),
        config.tick_interval_ms,
        config.emit_interval_ms
    );

    // The registry and the settings manager each own a connection
    let timer_store = SqliteStore::open(&db_path)
        .with_context(|| format!("failed to open timer database {}", db_path.display()))?;
    let settings_store = SqliteStore::open(&db_path)
        .with_context(|| format!("failed to open settings database {}", db_path.display()))?;

    // Create application state
    let state = Arc::new(
        AppState::new(
            Box::new(timer_store),
            Box::new(settings_store),
            EventBus::new(),
            config.emit_interval(),
        )
        .context("failed to load settings")?,
    );

    // Sinks subscribe before the first load so they receive the initial snapshot
    state.spawn_ui_sink();
    tokio::spawn(notification_task(Arc::clone(&state)));

    let count = state
        .with_registry(|registry| registry.load_all(false).map(|timers| timers.len()))
        .context("failed to load timers")?;
    info!("Loaded {} timers", count);

    if let Err(e) = state.osc.start(&state).await {
        error!("OSC listener unavailable: {}", e);
    }
    if let Err(e) = state.dashboard.start(&state).await {
        error!("Web dashboard unavailable: {}", e);
    }
    tokio::spawn(listener_supervisor_task(Arc::clone(&state)));

    if config.no_tick {
        info!("Tick driver disabled");
    } else {
        tokio::spawn(tick_driver_task(Arc::clone(&state), config.tick_interval_ms));
    }

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind control API on {}", addr))?;

    info!("Control API running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET    /timers                        - List timers");
    info!("  POST   /timers                        - Create a timer");
    info!("  PATCH  /timers/:id                    - Update a timer");
    info!("  DELETE /timers/:id                    - Delete a timer");
    info!("  POST   /timers/:id/move/:direction    - Move a timer UP or DOWN");
    info!("  POST   /timers/:id/start|stop|pause|unpause");
    info!("  POST   /timers/:id/elapsed            - Seek a timer");
    info!("  GET    /settings, PUT /settings/:key  - Settings");
    info!("  GET    /osc/routes                    - OSC command table");
    info!("  GET    /ui/ws                         - Live snapshots");
    info!("  GET    /status, /health");

    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
        _ = state.shutdown.notified() => {
            info!("Shutdown requested remotely");
        }
    }

    if let Err(e) = state.osc.stop().await {
        error!("Failed to stop OSC listener: {}", e);
    }
    if let Err(e) = state.dashboard.stop().await {
        error!("Failed to stop web dashboard: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}
