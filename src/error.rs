//! Error types shared across the registry, store, router and listeners

use thiserror::Error;

/// Failures raised by the row store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("unsupported schema version {found}, max supported {supported}")]
    UnsupportedSchemaVersion { found: i64, supported: i64 },
    #[error("failed to encode setting value: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Failures raised by timer registry operations
#[derive(Debug, Error)]
pub enum TimerError {
    #[error("timer {0} not found")]
    NotFound(i64),
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("persistence failure: {0}")]
    Store(#[from] StoreError),
    #[error("timer registry lock poisoned")]
    Poisoned,
}

/// Failures raised by the settings manager
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("unknown setting key: {0}")]
    UnknownKey(String),
    #[error("setting {key} expects a {expected} value")]
    TypeMismatch { key: String, expected: &'static str },
    #[error("persistence failure: {0}")]
    Store(#[from] StoreError),
    #[error("settings lock poisoned")]
    Poisoned,
}

/// Failures raised while dispatching a remote command
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    /// No registered pattern has the shape of the incoming path
    #[error("invalid route: {0}")]
    InvalidRoute(String),
    /// Patterns matched the shape but every handler declined
    #[error("route incomplete but has matching path: {0}")]
    Incomplete(String),
    #[error("route {path} failed: {reason}")]
    Handler { path: String, reason: String },
}

/// Failures raised while binding a network listener
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("{listener} port {addr} is in use")]
    AddrInUse { listener: &'static str, addr: String },
    #[error("{listener} cannot bind address {addr}")]
    AddrNotAvailable { listener: &'static str, addr: String },
    #[error("{listener} failed on {addr}: {source}")]
    Io {
        listener: &'static str,
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

impl ListenerError {
    /// Classify a bind error for the given listener and address
    pub fn from_bind(listener: &'static str, addr: &str, err: std::io::Error) -> Self {
        let addr = addr.to_string();
        match err.kind() {
            std::io::ErrorKind::AddrInUse => Self::AddrInUse { listener, addr },
            std::io::ErrorKind::AddrNotAvailable => Self::AddrNotAvailable { listener, addr },
            _ => Self::Io { listener, addr, source: err },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_errors_are_classified_by_kind() {
        let in_use = std::io::Error::from(std::io::ErrorKind::AddrInUse);
        assert!(matches!(
            ListenerError::from_bind("OSC", "0.0.0.0:3333", in_use),
            ListenerError::AddrInUse { .. }
        ));

        let unavailable = std::io::Error::from(std::io::ErrorKind::AddrNotAvailable);
        let err = ListenerError::from_bind("Web dashboard", "10.9.9.9:4300", unavailable);
        assert_eq!(err.to_string(), "Web dashboard cannot bind address 10.9.9.9:4300");

        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert!(matches!(
            ListenerError::from_bind("OSC", "0.0.0.0:80", denied),
            ListenerError::Io { .. }
        ));
    }
}
