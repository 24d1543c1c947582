/// Failures talking to the session record store or the report generator.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("session id must not be empty")]
    InvalidSessionId,
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("report generation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Failures of the call session's user-initiated operations.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("a call is already in progress")]
    AlreadyActive,
    #[error("failed to open voice channel: {0:#}")]
    Channel(anyhow::Error),
}
