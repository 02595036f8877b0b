//! Sanitized views of the registry sent to sinks

use serde::Serialize;

use crate::state::{format_time, Timer, TimerStatus, TimerType};

/// Full timer view for the control UI; no internal bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerSnapshot {
    pub id: i64,
    pub timer_type: TimerType,
    pub name: String,
    pub description: String,
    pub duration_ms: Option<u64>,
    pub weight: i64,
    pub text_alert: bool,
    pub audio_alert: bool,
    pub show_on_web: bool,
    pub status: TimerStatus,
    pub total_time_readable: String,
    pub state: StateSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateSnapshot {
    pub elapsed_ms: u64,
    pub elapsed_readable: String,
    pub paused_ms: u64,
    pub paused_readable: String,
    pub countdown_remaining_ms: Option<u64>,
    pub countdown_remaining_readable: Option<String>,
}

impl From<&Timer> for TimerSnapshot {
    fn from(timer: &Timer) -> Self {
        Self {
            id: timer.id,
            timer_type: timer.timer_type(),
            name: timer.name.clone(),
            description: timer.description.clone(),
            duration_ms: timer.duration_ms(),
            weight: timer.weight,
            text_alert: timer.text_alert,
            audio_alert: timer.audio_alert,
            show_on_web: timer.show_on_web,
            status: timer.status,
            total_time_readable: timer.total_time_readable.clone(),
            state: StateSnapshot {
                elapsed_ms: timer.state.elapsed_ms,
                elapsed_readable: timer.state.elapsed_readable.clone(),
                paused_ms: timer.state.paused_ms,
                paused_readable: timer.state.paused_readable.clone(),
                countdown_remaining_ms: timer.state.countdown_remaining_ms,
                countdown_remaining_readable: timer.state.countdown_remaining_readable.clone(),
            },
        }
    }
}

/// Read-only dashboard view of one visible timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebTimerView {
    pub id: i64,
    pub weight: i64,
    pub timer_type: TimerType,
    pub name: String,
    pub description: String,
    pub duration_ms: Option<u64>,
    pub total_time_readable: String,
    pub status: TimerStatus,
    pub state: WebStateView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebStateView {
    pub elapsed_ms: u64,
    pub elapsed_readable: String,
    pub remaining_ms: Option<u64>,
    pub remaining_readable: Option<String>,
}

pub fn ui_snapshot(timers: &[Timer]) -> Vec<TimerSnapshot> {
    timers.iter().map(TimerSnapshot::from).collect()
}

/// Visible timers only, ordered by `(weight, id)`, with remaining time for
/// every timer that has a duration
pub fn web_snapshot(timers: &[Timer]) -> Vec<WebTimerView> {
    let mut visible: Vec<&Timer> = timers.iter().filter(|timer| timer.show_on_web).collect();
    visible.sort_by_key(|timer| (timer.weight, timer.id));
    visible
        .into_iter()
        .map(|timer| {
            let remaining_ms = timer
                .duration_ms()
                .map(|duration| duration.saturating_sub(timer.state.elapsed_ms));
            WebTimerView {
                id: timer.id,
                weight: timer.weight,
                timer_type: timer.timer_type(),
                name: timer.name.clone(),
                description: timer.description.clone(),
                duration_ms: timer.duration_ms(),
                total_time_readable: timer.total_time_readable.clone(),
                status: timer.status,
                state: WebStateView {
                    elapsed_ms: timer.state.elapsed_ms,
                    elapsed_readable: timer.state.elapsed_readable.clone(),
                    remaining_ms,
                    remaining_readable: remaining_ms
                        .map(|ms| format_time(i64::try_from(ms).unwrap_or(i64::MAX))),
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TimerKind;

    fn timer(id: i64, weight: i64, kind: TimerKind, show_on_web: bool) -> Timer {
        let mut timer = Timer::new(id, kind, format!("t{}", id), String::new(), weight);
        timer.show_on_web = show_on_web;
        timer
    }

    #[test]
    fn web_snapshot_filters_hidden_and_sorts() {
        let timers = vec![
            timer(3, 2, TimerKind::Stopwatch, true),
            timer(1, 2, TimerKind::Timer { duration_ms: 1000 }, true),
            timer(2, 1, TimerKind::Timer { duration_ms: 1000 }, false),
        ];
        let ids: Vec<i64> = web_snapshot(&timers).iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn web_snapshot_computes_remaining_for_timed_kinds_only() {
        let mut running = timer(1, 1, TimerKind::Timer { duration_ms: 125_000 }, true);
        running.start();
        running.set_elapsed_time(5_000);
        let stopwatch = timer(2, 2, TimerKind::Stopwatch, true);

        let views = web_snapshot(&[running, stopwatch]);
        assert_eq!(views[0].state.remaining_ms, Some(120_000));
        assert_eq!(views[0].state.remaining_readable.as_deref(), Some("02:00"));
        assert_eq!(views[1].state.remaining_ms, None);
        assert_eq!(views[1].state.remaining_readable, None);
    }

    #[test]
    fn ui_snapshot_keeps_hidden_timers_and_order() {
        let timers = vec![
            timer(5, 1, TimerKind::Countdown { duration_ms: 60_000 }, false),
            timer(4, 2, TimerKind::Stopwatch, true),
        ];
        let snapshot = ui_snapshot(&timers);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].id, 5);
        assert_eq!(snapshot[0].state.countdown_remaining_ms, Some(60_000));

        let json = serde_json::to_value(&snapshot[0]).expect("serialize");
        assert_eq!(json["timer_type"], "COUNTDOWN");
        assert_eq!(json["status"], "STANDBY");
        assert!(json["state"].get("start_time").is_none());
    }
}
