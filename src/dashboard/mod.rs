//! Read-only web dashboard
//!
//! Serves the sanitized web snapshot over plain HTTP and a websocket on its
//! own port, configured by the `WEB_*` settings.
//!
//! | Path | Description |
//! |------|-------------|
//! | `/api/timers` | Current snapshot of every timer shown on the web |
//! | `/ws` | Websocket: full snapshot on connect, then coalesced updates |

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{State, WebSocketUpgrade},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use tokio::{
    net::TcpListener,
    sync::{oneshot, watch, Mutex},
    task::JoinHandle,
};
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
};
use tracing::{error, info, warn};

use crate::{
    broadcast::{spawn_sink, web_snapshot, WebTimerView},
    error::ListenerError,
    events::NotifyLevel,
    settings::{WEB_DASHBOARD_BIND, WEB_DASHBOARD_PORT, WEB_ENABLE_DASHBOARD},
    state::{AppState, Timer},
    utils::push_snapshots,
};

const DEFAULT_DASHBOARD_PORT: u16 = 4300;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

pub type WebSnapshot = Arc<Vec<WebTimerView>>;

/// Per-server state handed to the dashboard handlers
#[derive(Clone)]
pub struct DashboardState {
    pub app: Arc<AppState>,
    pub updates: watch::Receiver<WebSnapshot>,
}

struct RunningDashboard {
    addr: String,
    shutdown_tx: oneshot::Sender<()>,
    server: JoinHandle<()>,
    sink: JoinHandle<()>,
}

/// Start/stop handle for the dashboard HTTP server
#[derive(Default)]
pub struct DashboardServer {
    running: Mutex<Option<RunningDashboard>>,
}

impl DashboardServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Bound address, when running
    pub async fn address(&self) -> Option<String> {
        self.running.lock().await.as_ref().map(|running| running.addr.clone())
    }

    /// Bind and serve. Returns `Ok(false)` when disabled in settings; starting
    /// a running server is a no-op.
    pub async fn start(&self, state: &Arc<AppState>) -> Result<bool, ListenerError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Ok(true);
        }

        let settings = state.listener_settings(
            WEB_ENABLE_DASHBOARD,
            WEB_DASHBOARD_BIND,
            WEB_DASHBOARD_PORT,
            DEFAULT_DASHBOARD_PORT,
        );
        if !settings.enabled {
            info!("Web dashboard disabled in settings");
            return Ok(false);
        }

        let addr = settings.address();
        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(e) => {
                let err = ListenerError::from_bind("Web dashboard", &addr, e);
                error!("{}", err);
                state.events.notify(err.to_string(), NotifyLevel::Error);
                return Err(err);
            }
        };

        let initial = state.web_snapshot().unwrap_or_else(|e| {
            warn!("Dashboard starting without timers: {}", e);
            Vec::new()
        });
        let (updates_tx, updates_rx) = watch::channel(Arc::new(initial));
        let sink = spawn_sink(
            "web dashboard",
            state.events.subscribe(),
            state.emit_interval,
            |timers: &[Timer]| Arc::new(web_snapshot(timers)),
            move |snapshot| {
                updates_tx.send_replace(snapshot);
            },
        );

        let app = dashboard_router(DashboardState {
            app: Arc::clone(state),
            updates: updates_rx,
        });
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
                error!("Web dashboard server error: {}", e);
            }
        });

        info!("Web dashboard running on http://{}", addr);
        state
            .events
            .notify(format!("Web dashboard listening on {}", addr), NotifyLevel::Success);
        *running = Some(RunningDashboard {
            addr,
            shutdown_tx,
            server,
            sink,
        });
        Ok(true)
    }

    /// Stop serving and disconnect viewers. Returns whether it was running.
    pub async fn stop(&self) -> Result<bool, ListenerError> {
        let Some(running) = self.running.lock().await.take() else {
            return Ok(false);
        };
        // Dropping the snapshot publisher ends every open websocket
        running.sink.abort();
        let _ = running.sink.await;
        let _ = running.shutdown_tx.send(());

        let mut server = running.server;
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await.is_err() {
            warn!("Web dashboard did not drain in time; aborting");
            server.abort();
            let _ = server.await;
        }
        info!("Web dashboard on {} stopped", running.addr);
        Ok(true)
    }

    pub async fn restart(&self, state: &Arc<AppState>) -> Result<bool, ListenerError> {
        self.stop().await?;
        self.start(state).await
    }
}

/// Routes served by the dashboard, with the hardening headers applied
pub fn dashboard_router(state: DashboardState) -> Router {
    Router::new()
        .route("/api/timers", get(timers_handler))
        .route("/ws", get(websocket_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET]),
        )
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .with_state(state)
}

/// Handle GET /api/timers - current web snapshot
async fn timers_handler(State(state): State<DashboardState>) -> Response {
    match state.app.web_snapshot() {
        Ok(timers) => Json(timers).into_response(),
        Err(e) => {
            error!("Failed to build dashboard snapshot: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Handle GET /ws - live dashboard updates
async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<DashboardState>) -> Response {
    ws.on_upgrade(move |socket| async move {
        let initial = match state.app.web_snapshot() {
            Ok(timers) => Arc::new(timers),
            Err(e) => {
                warn!("Dashboard viewer connected without a snapshot: {}", e);
                state.updates.borrow().clone()
            }
        };
        push_snapshots(socket, initial, state.updates).await;
    })
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use super::*;
    use crate::{events::EventBus, state::NewTimer, store::SqliteStore};

    fn app_state() -> Arc<AppState> {
        let events = EventBus::new();
        let state = AppState::new(
            Box::new(SqliteStore::open_in_memory().unwrap()),
            Box::new(SqliteStore::open_in_memory().unwrap()),
            events,
            Duration::from_millis(400),
        )
        .unwrap();
        Arc::new(state)
    }

    fn router_for(state: &Arc<AppState>) -> Router {
        let (_tx, updates) = watch::channel(Arc::new(Vec::new()));
        dashboard_router(DashboardState {
            app: Arc::clone(state),
            updates,
        })
    }

    #[tokio::test]
    async fn serves_only_timers_shown_on_web_with_hardening_headers() {
        let state = app_state();
        state
            .with_registry(|registry| {
                registry.create(NewTimer {
                    timer_type: "TIMER".to_string(),
                    name: "Visible".to_string(),
                    ..NewTimer::default()
                })?;
                registry.create(NewTimer {
                    timer_type: "TIMER".to_string(),
                    name: "Hidden".to_string(),
                    show_on_web: false,
                    ..NewTimer::default()
                })
            })
            .unwrap();

        let response = router_for(&state)
            .oneshot(Request::get("/api/timers").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[header::X_FRAME_OPTIONS], "SAMEORIGIN");
        assert_eq!(headers[header::REFERRER_POLICY], "no-referrer");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let timers: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let names: Vec<&str> = timers
            .as_array()
            .unwrap()
            .iter()
            .map(|timer| timer["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Visible"]);
    }

    #[tokio::test]
    async fn disabled_dashboard_does_not_bind() {
        let state = app_state();
        state
            .with_settings(|settings| settings.set(WEB_ENABLE_DASHBOARD, serde_json::json!(false)))
            .unwrap();

        assert!(!state.dashboard.start(&state).await.unwrap());
        assert!(!state.dashboard.is_running().await);
        assert!(!state.dashboard.stop().await.unwrap());
    }

    #[tokio::test]
    async fn start_is_idempotent_and_stop_releases_the_port() {
        let state = app_state();
        state
            .with_settings(|settings| {
                settings.set(WEB_DASHBOARD_BIND, serde_json::json!("127.0.0.1"))?;
                settings.set(WEB_DASHBOARD_PORT, serde_json::json!(0))
            })
            .unwrap();

        assert!(state.dashboard.start(&state).await.unwrap());
        assert!(state.dashboard.start(&state).await.unwrap());
        assert!(state.dashboard.is_running().await);

        assert!(state.dashboard.stop().await.unwrap());
        assert!(!state.dashboard.is_running().await);
        assert!(!state.dashboard.stop().await.unwrap());
    }

    #[tokio::test]
    async fn port_in_use_is_reported() {
        let blocker = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = blocker.local_addr().unwrap().port();

        let state = app_state();
        let mut notifications = state.events.subscribe();
        state
            .with_settings(|settings| {
                settings.set(WEB_DASHBOARD_BIND, serde_json::json!("127.0.0.1"))?;
                settings.set(WEB_DASHBOARD_PORT, serde_json::json!(port))
            })
            .unwrap();

        let err = state.dashboard.start(&state).await.unwrap_err();
        assert!(matches!(err, ListenerError::AddrInUse { .. }));
        assert!(!state.dashboard.is_running().await);

        let mut saw_error = false;
        while let Ok(event) = notifications.try_recv() {
            if let crate::events::AppEvent::Notify { level, .. } = event {
                saw_error |= level == NotifyLevel::Error;
            }
        }
        assert!(saw_error);
    }
}
