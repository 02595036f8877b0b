//! Update fan-out to the UI and dashboard sinks
//!
//! Each sink runs its own coalescing task subscribed to the event bus, so a
//! slow or absent sink never holds back another one.

pub mod coalescer;
pub mod snapshot;

pub use coalescer::Coalescer;
pub use snapshot::{ui_snapshot, web_snapshot, TimerSnapshot, WebTimerView};

use std::{future, time::Duration};

use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
    time::{sleep_until, Instant},
};
use tracing::{debug, info};

use crate::{events::AppEvent, state::Timer};

/// Default minimum spacing between two emissions to the same sink
pub const EMIT_MIN_INTERVAL: Duration = Duration::from_millis(400);

/// Forward coalesced, sanitized snapshots of every `TimersChanged` event to
/// `emit` until the bus closes
pub async fn run_sink<T, S, E>(
    name: &'static str,
    mut events: broadcast::Receiver<AppEvent>,
    min_interval: Duration,
    sanitize: S,
    mut emit: E,
) where
    S: Fn(&[Timer]) -> T,
    E: FnMut(T),
{
    info!("Starting {} update sink", name);
    let mut coalescer = Coalescer::new(min_interval);

    loop {
        let deadline = coalescer.deadline();
        tokio::select! {
            received = events.recv() => match received {
                Ok(AppEvent::TimersChanged(timers)) => {
                    if let Some(payload) = coalescer.offer(Instant::now(), sanitize(&timers)) {
                        emit(payload);
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!("{} sink skipped {} stale events", name, skipped);
                }
                Err(RecvError::Closed) => break,
            },
            _ = wait_until(deadline) => {
                if let Some(payload) = coalescer.fire(Instant::now()) {
                    emit(payload);
                }
            }
        }
    }

    info!("{} update sink stopped", name);
}

/// Spawn [`run_sink`] as a background task
pub fn spawn_sink<T, S, E>(
    name: &'static str,
    events: broadcast::Receiver<AppEvent>,
    min_interval: Duration,
    sanitize: S,
    emit: E,
) -> JoinHandle<()>
where
    T: Send + 'static,
    S: Fn(&[Timer]) -> T + Send + 'static,
    E: FnMut(T) + Send + 'static,
{
    tokio::spawn(run_sink(name, events, min_interval, sanitize, emit))
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::{sync::mpsc, time::sleep};

    use super::*;
    use crate::{
        events::EventBus,
        state::{Timer, TimerKind},
    };

    fn changed(count: usize) -> AppEvent {
        let timer = Timer::new(1, TimerKind::Stopwatch, "t".to_string(), String::new(), 1);
        AppEvent::TimersChanged(Arc::new(vec![timer; count]))
    }

    #[tokio::test(start_paused = true)]
    async fn burst_yields_one_emission_with_latest_payload() {
        let bus = EventBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = spawn_sink(
            "test",
            bus.subscribe(),
            EMIT_MIN_INTERVAL,
            |timers: &[Timer]| timers.len(),
            move |payload| {
                let _ = tx.send((Instant::now(), payload));
            },
        );

        let start = Instant::now();
        bus.publish(changed(1));
        let (at, payload) = rx.recv().await.expect("immediate emission");
        assert_eq!(payload, 1);
        assert_eq!(at, start);

        for count in [2, 3, 4] {
            sleep(Duration::from_millis(50)).await;
            bus.publish(changed(count));
        }

        let (at, payload) = rx.recv().await.expect("deferred emission");
        assert_eq!(payload, 4);
        assert_eq!(at.duration_since(start), EMIT_MIN_INTERVAL);

        sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
        sink.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn ignores_unrelated_events() {
        let bus = EventBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = spawn_sink(
            "test",
            bus.subscribe(),
            EMIT_MIN_INTERVAL,
            |timers: &[Timer]| timers.len(),
            move |payload| {
                let _ = tx.send(payload);
            },
        );

        bus.publish(AppEvent::SettingsChanged {
            key: "OSC_PORT".to_string(),
        });
        sleep(Duration::from_millis(10)).await;
        assert!(rx.try_recv().is_err());
        sink.abort();
    }

    #[tokio::test]
    async fn stops_when_bus_closes() {
        let bus = EventBus::new();
        let receiver = bus.subscribe();
        drop(bus);
        run_sink("test", receiver, EMIT_MIN_INTERVAL, |t: &[Timer]| t.len(), |_| {}).await;
    }
}
