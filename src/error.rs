use thiserror::Error;

/// Failures at the edges of the game: configuration, files and the audio device.
/// The gameplay core itself never fails.
#[derive(Debug, Error)]
pub enum HarkError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("audio error: {0}")]
    Audio(String),
}

pub type Result<T> = std::result::Result<T, HarkError>;
