//! Background tasks module
//!
//! Long-running tasks spawned at startup: the tick driver, the listener
//! supervisor, and the notification log.

pub mod listener_supervisor;
pub mod notifications;
pub mod tick_driver;

// Re-export main functions
pub use listener_supervisor::listener_supervisor_task;
pub use notifications::notification_task;
pub use tick_driver::tick_driver_task;
