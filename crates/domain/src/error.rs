/// Shared error type used across all CoachRelay crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("auth: {0}")]
    Auth(String),

    /// The polling ceiling was exceeded before the remote job reached a
    /// terminal state. The remote job is not cancelled and may still finish.
    #[error("upstream timeout: {0}")]
    UpstreamTimeout(String),

    /// The remote job reached the `failed` terminal state.
    #[error("upstream job failed: {reason}")]
    UpstreamFailure { reason: String },

    /// Network/transport error talking to the remote reasoning service.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
