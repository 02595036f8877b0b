//! Timer entity and its state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Duration assigned to timers and countdowns created without one
pub const DEFAULT_DURATION_MS: u64 = 60_000;

/// Interval between two ticks of the driver
pub const TICK_INTERVAL_MS: u64 = 300;

const ZERO_READABLE: &str = "00:00:00";

/// Format milliseconds as `MM:SS` under one hour, `HH:MM:SS` otherwise.
///
/// Zero and negative values render as `00:00:00`.
pub fn format_time(milliseconds: i64) -> String {
    if milliseconds <= 0 {
        return ZERO_READABLE.to_string();
    }
    let total_seconds = milliseconds / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours == 0 {
        format!("{:02}:{:02}", minutes, seconds)
    } else {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

fn format_ms(milliseconds: u64) -> String {
    format_time(i64::try_from(milliseconds).unwrap_or(i64::MAX))
}

/// Parse a millisecond value received as text.
///
/// Negative and non-finite numbers clamp to zero; text that is not a number
/// at all yields `None`.
pub fn parse_millis(text: &str) -> Option<u64> {
    let value: f64 = text.trim().parse().ok()?;
    Some(clamp_millis(value))
}

/// Clamp a numeric millisecond value to a whole, non-negative count
pub fn clamp_millis(value: f64) -> u64 {
    if !value.is_finite() || value < 0.0 {
        return 0;
    }
    value.floor() as u64
}

/// Keep a duration only where the type uses one and the value is usable
pub fn normalize_duration(timer_type: TimerType, duration_ms: Option<i64>) -> Option<u64> {
    match timer_type {
        TimerType::Stopwatch => None,
        _ => duration_ms.and_then(|ms| u64::try_from(ms).ok()),
    }
}

/// Timer classification as stored and displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimerType {
    Timer,
    Countdown,
    Stopwatch,
}

impl TimerType {
    /// Fold any input into a known type; unrecognized values become `Timer`
    pub fn normalize(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "COUNTDOWN" => Self::Countdown,
            "STOPWATCH" => Self::Stopwatch,
            _ => Self::Timer,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timer => "TIMER",
            Self::Countdown => "COUNTDOWN",
            Self::Stopwatch => "STOPWATCH",
        }
    }
}

/// Per-type duration semantics. Stopwatches carry no target duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Timer { duration_ms: u64 },
    Countdown { duration_ms: u64 },
    Stopwatch,
}

impl TimerKind {
    /// Build a kind from a type and an optional duration, falling back to
    /// [`DEFAULT_DURATION_MS`] when a duration is required but missing
    pub fn new(timer_type: TimerType, duration_ms: Option<u64>) -> Self {
        let duration_ms = duration_ms.unwrap_or(DEFAULT_DURATION_MS);
        match timer_type {
            TimerType::Timer => Self::Timer { duration_ms },
            TimerType::Countdown => Self::Countdown { duration_ms },
            TimerType::Stopwatch => Self::Stopwatch,
        }
    }

    pub fn timer_type(&self) -> TimerType {
        match self {
            Self::Timer { .. } => TimerType::Timer,
            Self::Countdown { .. } => TimerType::Countdown,
            Self::Stopwatch => TimerType::Stopwatch,
        }
    }

    pub fn duration_ms(&self) -> Option<u64> {
        match self {
            Self::Timer { duration_ms } | Self::Countdown { duration_ms } => Some(*duration_ms),
            Self::Stopwatch => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimerStatus {
    Standby,
    Running,
    Paused,
    Complete,
}

/// Runtime counters of a timer; never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeState {
    pub start_time: Option<DateTime<Utc>>,
    pub elapsed_ms: u64,
    pub elapsed_readable: String,
    pub paused_ms: u64,
    pub paused_readable: String,
    pub countdown_remaining_ms: Option<u64>,
    pub countdown_remaining_readable: Option<String>,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self {
            start_time: None,
            elapsed_ms: 0,
            elapsed_readable: ZERO_READABLE.to_string(),
            paused_ms: 0,
            paused_readable: ZERO_READABLE.to_string(),
            countdown_remaining_ms: None,
            countdown_remaining_readable: None,
        }
    }
}

/// One controllable timer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    pub id: i64,
    pub kind: TimerKind,
    pub name: String,
    pub description: String,
    pub text_alert: bool,
    pub audio_alert: bool,
    pub show_on_web: bool,
    pub weight: i64,
    pub status: TimerStatus,
    pub state: RuntimeState,
    pub total_time_readable: String,
}

impl Timer {
    /// Create a timer in `STANDBY` with fresh runtime state
    pub fn new(id: i64, kind: TimerKind, name: String, description: String, weight: i64) -> Self {
        let mut timer = Self {
            id,
            kind,
            name,
            description,
            text_alert: false,
            audio_alert: false,
            show_on_web: true,
            weight,
            status: TimerStatus::Standby,
            state: RuntimeState::default(),
            total_time_readable: ZERO_READABLE.to_string(),
        };
        timer.refresh_derived();
        timer
    }

    pub fn timer_type(&self) -> TimerType {
        self.kind.timer_type()
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.kind.duration_ms()
    }

    /// Change the kind and recompute the fields derived from it.
    ///
    /// A completed timer turned into a stopwatch is reset to standby.
    pub fn set_kind(&mut self, kind: TimerKind) {
        self.kind = kind;
        if self.kind == TimerKind::Stopwatch && self.status == TimerStatus::Complete {
            self.stop();
            return;
        }
        self.refresh_derived();
    }

    /// Restart from zero, whatever the current status
    pub fn start(&mut self) {
        self.status = TimerStatus::Running;
        self.state.start_time = Some(Utc::now());
        self.state.elapsed_ms = 0;
        self.state.paused_ms = 0;
        self.refresh_derived();
    }

    /// Back to `STANDBY` with all runtime state cleared
    pub fn stop(&mut self) {
        self.status = TimerStatus::Standby;
        self.state = RuntimeState::default();
        self.refresh_derived();
    }

    /// Accepted from any status; callers decide whether it is meaningful
    pub fn pause(&mut self) {
        self.status = TimerStatus::Paused;
    }

    /// Resume without resetting elapsed time
    pub fn unpause(&mut self) {
        self.status = TimerStatus::Running;
    }

    /// Advance the counters by one tick interval
    pub fn tick(&mut self, interval_ms: u64) {
        match self.status {
            TimerStatus::Running => {
                self.state.elapsed_ms = self.state.elapsed_ms.saturating_add(interval_ms)
            }
            TimerStatus::Paused => {
                self.state.paused_ms = self.state.paused_ms.saturating_add(interval_ms)
            }
            TimerStatus::Standby | TimerStatus::Complete => {}
        }
        self.refresh_derived();
        self.check_completion();
    }

    /// Seek to an absolute elapsed time; backward seeks are allowed
    pub fn set_elapsed_time(&mut self, elapsed_ms: u64) {
        self.state.elapsed_ms = elapsed_ms;
        self.refresh_derived();
        self.check_completion();
    }

    /// Mark complete; stopwatches never complete
    pub fn complete(&mut self) {
        if self.kind == TimerKind::Stopwatch {
            return;
        }
        self.status = TimerStatus::Complete;
    }

    pub fn is_complete(&self) -> bool {
        self.status == TimerStatus::Complete
    }

    fn check_completion(&mut self) {
        if self.status != TimerStatus::Running {
            return;
        }
        if let Some(duration_ms) = self.kind.duration_ms() {
            if self.state.elapsed_ms >= duration_ms {
                self.complete();
            }
        }
    }

    fn refresh_derived(&mut self) {
        self.total_time_readable = format_ms(self.kind.duration_ms().unwrap_or(0));
        self.state.elapsed_readable = format_ms(self.state.elapsed_ms);
        self.state.paused_readable = format_ms(self.state.paused_ms);

        match self.kind {
            TimerKind::Countdown { duration_ms } => {
                let remaining = duration_ms.saturating_sub(self.state.elapsed_ms);
                self.state.countdown_remaining_ms = Some(remaining);
                self.state.countdown_remaining_readable = Some(format_ms(remaining));
            }
            _ => {
                self.state.countdown_remaining_ms = None;
                self.state.countdown_remaining_readable = None;
            }
        }
    }
}
