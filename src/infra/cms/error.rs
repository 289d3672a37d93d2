use thiserror::Error;

/// Why a CMS call failed. Logged by the client; never returned to callers of
/// the fail-soft operations.
#[derive(Debug, Error)]
pub enum CmsError {
    #[error("invalid CMS url: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid credential: {0}")]
    Credential(String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("CMS responded with status {status}")]
    Status { status: u16, body: String },
    #[error("failed to decode CMS response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl CmsError {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Url(_) | Self::Credential(_) => "request",
            Self::Transport(err) if err.is_timeout() => "timeout",
            Self::Transport(_) => "transport",
            Self::Status { .. } => "status",
            Self::Decode(_) => "decode",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
