//! OSC remote control
//!
//! A UDP listener that decodes OSC packets and dispatches every message
//! address through the command router.

pub mod router;
pub mod routes;

pub use router::{CommandRouter, HandlerResult, RouteInfo, RouteParams};

use std::sync::Arc;

use rosc::{OscMessage, OscPacket};
use tokio::{net::UdpSocket, sync::Mutex, task::JoinHandle};
use tracing::{debug, error, info, warn};

use crate::{
    error::ListenerError,
    events::NotifyLevel,
    settings::{OSC_BIND, OSC_ENABLE, OSC_PORT},
    state::AppState,
};

const DEFAULT_OSC_PORT: u16 = 3333;
const MAX_PACKET_SIZE: usize = 65_536;

struct RunningOsc {
    addr: String,
    task: JoinHandle<()>,
}

/// Start/stop handle for the OSC UDP listener
#[derive(Default)]
pub struct OscListener {
    running: Mutex<Option<RunningOsc>>,
}

impl OscListener {
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

    /// Bind and start receiving. Returns `Ok(false)` when disabled in settings;
    /// starting a running listener is a no-op.
    pub async fn start(&self, state: &Arc<AppState>) -> Result<bool, ListenerError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Ok(true);
        }

        let settings = state.listener_settings(OSC_ENABLE, OSC_BIND, OSC_PORT, DEFAULT_OSC_PORT);
        if !settings.enabled {
            info!("OSC listener disabled in settings");
            return Ok(false);
        }

        let addr = settings.address();
        let socket = match UdpSocket::bind(&addr).await {
            Ok(socket) => socket,
            Err(e) => {
                let err = ListenerError::from_bind("OSC", &addr, e);
                error!("{}", err);
                state.events.notify(err.to_string(), NotifyLevel::Error);
                return Err(err);
            }
        };

        info!("OSC listener running on udp://{}", addr);
        state
            .events
            .notify(format!("OSC listening on {}", addr), NotifyLevel::Success);
        let task = tokio::spawn(receive_loop(socket, Arc::clone(state)));
        *running = Some(RunningOsc { addr, task });
        Ok(true)
    }

    /// Stop receiving and release the socket. Returns whether it was running.
    pub async fn stop(&self) -> Result<bool, ListenerError> {
        let Some(running) = self.running.lock().await.take() else {
            return Ok(false);
        };
        running.task.abort();
        // Wait for the socket to drop so a restart can rebind the same port
        let _ = running.task.await;
        info!("OSC listener on {} stopped", running.addr);
        Ok(true)
    }

    pub async fn restart(&self, state: &Arc<AppState>) -> Result<bool, ListenerError> {
        self.stop().await?;
        self.start(state).await
    }
}

async fn receive_loop(socket: UdpSocket, state: Arc<AppState>) {
    let mut buf = vec![0u8; MAX_PACKET_SIZE];
    loop {
        let (size, peer) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                warn!("OSC receive failed: {}", e);
                continue;
            }
        };

        match rosc::decoder::decode_udp(&buf[..size]) {
            Ok((_, packet)) => {
                for message in flatten(packet) {
                    debug!("OSC message {} from {}", message.addr, peer);
                    // Outcomes are logged by the router
                    let _ = state.router.dispatch(&message.addr, Arc::clone(&state)).await;
                }
            }
            Err(e) => warn!("Dropping malformed OSC packet from {}: {:?}", peer, e),
        }
    }
}

/// Messages of a packet in order, descending into nested bundles
pub fn flatten(packet: OscPacket) -> Vec<OscMessage> {
    match packet {
        OscPacket::Message(message) => vec![message],
        OscPacket::Bundle(bundle) => bundle.content.into_iter().flat_map(flatten).collect(),
    }
}
