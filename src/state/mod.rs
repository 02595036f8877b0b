//! State management module
//!
//! The timer entity, the ordered registry that owns every timer, and the
//! application state shared by tasks and handlers.

pub mod app_state;
pub mod registry;
pub mod timer;

// Re-export main types
pub use app_state::{AppState, ListenerSettings};
pub use registry::{MoveDirection, NewTimer, TimerPatch, TimerRegistry};
pub use timer::{
    clamp_millis, format_time, normalize_duration, parse_millis, RuntimeState, Timer, TimerKind,
    TimerStatus, TimerType, DEFAULT_DURATION_MS, TICK_INTERVAL_MS,
};
