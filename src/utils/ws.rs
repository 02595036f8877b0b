//! Websocket push of coalesced timer snapshots

use axum::extract::ws::{Message, WebSocket};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Event name carried by every snapshot message
pub const TIMERS_UPDATE_EVENT: &str = "timers:update";

fn envelope<T: Serialize>(timers: &T) -> Option<String> {
    let message = serde_json::json!({
        "event": TIMERS_UPDATE_EVENT,
        "timers": timers,
    });
    match serde_json::to_string(&message) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!("Failed to encode timer snapshot: {}", e);
            None
        }
    }
}

async fn send<T: Serialize>(socket: &mut WebSocket, timers: &T) -> bool {
    match envelope(timers) {
        Some(text) => socket.send(Message::Text(text.into())).await.is_ok(),
        None => true,
    }
}

/// Send `initial` right away, then every snapshot published on `updates`
/// until the client leaves or the publisher goes away.
pub async fn push_snapshots<T>(mut socket: WebSocket, initial: T, mut updates: watch::Receiver<T>)
where
    T: Serialize + Clone + Send + Sync,
{
    let _ = updates.borrow_and_update();
    if !send(&mut socket, &initial).await {
        return;
    }

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    debug!("Snapshot publisher closed; dropping viewer");
                    break;
                }
                let timers = updates.borrow_and_update().clone();
                if !send(&mut socket, &timers).await {
                    break; // Client disconnected
                }
            }
            received = socket.recv() => match received {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                _ => {} // Ignore other messages
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_names_the_event() {
        let text = envelope(&vec![1, 2]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["event"], "timers:update");
        assert_eq!(value["timers"], serde_json::json!([1, 2]));
    }
}
