//! Client error types.

/// Errors surfaced by the gateway, auth flows and page controllers.
///
/// Display strings are user-facing: page controllers render them
/// verbatim into the status area.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced an HTTP response.
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response carrying the server's message.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// No usable token in the local session.
    #[error("Not authenticated.")]
    AuthenticationRequired,

    /// 401 or 403 from the server.
    #[error("{message}")]
    Authorization { status: u16, message: String },

    /// 429 from the server.
    #[error("{message}")]
    RateLimited { message: String },

    /// Client-side form checks, or a server rejecting a submitted form.
    #[error("{0}")]
    Validation(String),

    /// The same action is already running.
    #[error("Another request is already in progress.")]
    Busy,

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// HTTP status the server answered with, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } | Self::Authorization { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// True for failures that mean the session is no longer accepted.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationRequired | Self::Authorization { .. }
        )
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
