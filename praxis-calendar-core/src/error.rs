use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Event store error ({status}): {message}")]
    Store { status: u16, message: String },

    #[error("Event not found: {0}")]
    NotFound(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Invalid date window: {0}")]
    InvalidWindow(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Calendar import failed: {0}")]
    Import(String),

    #[error("Network timeout")]
    Timeout,
}

pub type Result<T> = std::result::Result<T, Error>;
