//! API response structures

use axum::{http::StatusCode, response::Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SettingsError, TimerError};

/// Envelope of every control API response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub data: Option<T>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response carrying `data`
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            error: None,
            data: Some(data),
            timestamp: Utc::now(),
        }
    }

    /// Create a failed response carrying `message`
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(message.into()),
            data: None,
            timestamp: Utc::now(),
        }
    }
}

/// Status code and body returned by every handler
pub type ApiResult<T> = (StatusCode, Json<ApiResponse<T>>);

pub fn ok<T>(data: T) -> ApiResult<T> {
    (StatusCode::OK, Json(ApiResponse::success(data)))
}

pub fn fail<T>(status: StatusCode, message: impl Into<String>) -> ApiResult<T> {
    (status, Json(ApiResponse::failure(message)))
}

pub fn timer_error_status(err: &TimerError) -> StatusCode {
    match err {
        TimerError::NotFound(_) => StatusCode::NOT_FOUND,
        TimerError::Validation { .. } => StatusCode::BAD_REQUEST,
        TimerError::Store(_) | TimerError::Poisoned => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn settings_error_status(err: &SettingsError) -> StatusCode {
    match err {
        SettingsError::UnknownKey(_) => StatusCode::NOT_FOUND,
        SettingsError::TypeMismatch { .. } => StatusCode::BAD_REQUEST,
        SettingsError::Store(_) | SettingsError::Poisoned => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Listener and uptime overview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub uptime: String,
    pub timer_count: usize,
    pub running_timers: usize,
    pub osc_address: Option<String>,
    pub dashboard_address: Option<String>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
