//! Rate limiting of change notifications
//!
//! Emits at most once per `min_interval`, always with the newest payload.
//! Intermediate payloads are overwritten, never queued.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug)]
pub struct Coalescer<T> {
    min_interval: Duration,
    last_emit_at: Option<Instant>,
    pending: Option<T>,
    deadline: Option<Instant>,
}

impl<T> Coalescer<T> {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_emit_at: None,
            pending: None,
            deadline: None,
        }
    }

    /// Offer a fresh payload.
    ///
    /// Returns it back when it should be emitted right away; otherwise it
    /// replaces any pending payload and a deadline is scheduled if none is.
    pub fn offer(&mut self, now: Instant, payload: T) -> Option<T> {
        let ready = self
            .last_emit_at
            .map_or(true, |last| now.saturating_duration_since(last) >= self.min_interval);

        if ready && self.deadline.is_none() {
            self.last_emit_at = Some(now);
            self.pending = None;
            return Some(payload);
        }

        self.pending = Some(payload);
        if self.deadline.is_none() {
            let due = self
                .last_emit_at
                .map_or(now, |last| last + self.min_interval);
            self.deadline = Some(due.max(now));
        }
        None
    }

    /// When the deferred emission is due, if one is scheduled
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Take the pending payload once the deadline has passed
    pub fn fire(&mut self, now: Instant) -> Option<T> {
        self.deadline = None;
        let payload = self.pending.take()?;
        self.last_emit_at = Some(now);
        Some(payload)
    }
}
