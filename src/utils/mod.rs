//! Utility functions module
//!
//! Signal handling and the websocket snapshot push shared by both sinks.

pub mod signals;
pub mod ws;

// Re-export main functions
pub use signals::shutdown_signal;
pub use ws::push_snapshots;
