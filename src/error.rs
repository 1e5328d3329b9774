use thiserror::Error;

/// Result type for Glasses 3 operations
pub type Result<T> = std::result::Result<T, G3Error>;

/// Errors that can occur when talking to a pair of Glasses 3
#[derive(Error, Debug)]
pub enum G3Error {
    /// An operation needing a live WebSocket was attempted without one
    #[error("no active websocket connection to the glasses")]
    NotConnected,

    /// Connect or discovery did not finish in time
    #[error("timed out: {0}")]
    Timeout(&'static str),

    /// The transport was closed or broke in the middle of an exchange
    #[error("connection closed")]
    ConnectionClosed,

    /// The response id did not match the request id
    #[error("response id {actual:?} does not match request id {expected}: {response}")]
    InvalidId {
        /// Id of the request that was sent
        expected: u32,
        /// Id found in the response, if any
        actual: Option<u64>,
        /// Raw response envelope
        response: serde_json::Value,
    },

    /// The glasses explicitly rejected a command
    #[error("request to {path} failed: {detail}")]
    SemanticFailure {
        /// Path the request was sent to
        path: String,
        /// What the glasses reported
        detail: String,
    },

    /// A response could not be parsed
    #[error("malformed response: {0}")]
    Malformed(String),

    /// WebSocket protocol error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// HTTP error while probing or downloading recordings
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The service discovery backend failed
    #[error("discovery error: {0}")]
    Discovery(String),

    /// A caller-supplied argument was rejected before any I/O
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Coarse classification of a [`G3Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotConnected,
    Timeout,
    ConnectionClosed,
    InvalidId,
    SemanticFailure,
    Malformed,
    Transport,
    InvalidArgument,
}

impl G3Error {
    /// Classify this error without inspecting its payload
    pub fn kind(&self) -> ErrorKind {
        match self {
            G3Error::NotConnected => ErrorKind::NotConnected,
            G3Error::Timeout(_) => ErrorKind::Timeout,
            G3Error::ConnectionClosed => ErrorKind::ConnectionClosed,
            G3Error::InvalidId { .. } => ErrorKind::InvalidId,
            G3Error::SemanticFailure { .. } => ErrorKind::SemanticFailure,
            G3Error::Malformed(_) | G3Error::Json(_) => ErrorKind::Malformed,
            G3Error::WebSocket(_)
            | G3Error::Http(_)
            | G3Error::Io(_)
            | G3Error::Discovery(_) => ErrorKind::Transport,
            G3Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }

    /// Whether the connection should be re-established before retrying
    pub fn requires_reconnect(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NotConnected | ErrorKind::ConnectionClosed | ErrorKind::InvalidId
        )
    }
}
