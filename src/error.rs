//! Crate-wide error type.

/// Errors surfaced by the navigation engine and its adapters.
///
/// Unrecognized maneuvers and speech failures are deliberately absent:
/// those degrade to fallback narration or are swallowed with a log line.
#[derive(Debug, thiserror::Error)]
pub enum NavError {
    #[error("route has no steps or no geometry")]
    EmptyRoute,

    #[error("navigation is not active")]
    NotNavigating,

    #[error("navigation already in progress")]
    AlreadyNavigating,

    #[error("no route found")]
    NoRoute,

    #[error("location unavailable: {0}")]
    LocationUnavailable(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GPX parse error: {0}")]
    Gpx(String),

    #[error("JNI error: {0}")]
    Jni(#[from] jni::errors::Error),
}
