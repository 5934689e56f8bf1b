use thiserror::Error;

/// Errors produced by the client-facing core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Daemon unavailable: {0}")]
    DaemonUnavailable(String),

    #[error("Daemon error ({code}): {message}")]
    Daemon { code: String, message: String },

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed daemon response: {0}")]
    MalformedResponse(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl From<CoreError> for String {
    fn from(err: CoreError) -> Self {
        err.to_string()
    }
}

impl CoreError {
    /// True when the failure means the daemon is not reachable at all,
    /// as opposed to the daemon answering with an error.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, CoreError::DaemonUnavailable(_))
    }
}
