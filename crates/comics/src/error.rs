use thiserror::Error;

/// Shown when the session can no longer be refreshed automatically.
pub const FAILED_TO_REFRESH_TOKEN: &str =
    "Failed to refresh the token. Sign in again through the WebView to fix this error.";

/// Shown when a signed-in chapter load cannot obtain its page credential.
pub const FAILED_TO_GET_CREDENTIAL: &str = "Failed to get the credential to read the chapter.";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{0}")]
    RefreshFailed(String),
    #[error("{0}")]
    CredentialFetchFailed(String),
    #[error("api error (code={code}): {message}")]
    Api { code: i64, message: String },
    #[error("unexpected http status {status} for {url}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        url: String,
    },
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("tls error: {0}")]
    Tls(#[from] rustls::Error),
    #[error("url parse error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("other: {0}")]
    Other(String),
}

impl SourceError {
    pub(crate) fn refresh_failed() -> Self {
        Self::RefreshFailed(FAILED_TO_REFRESH_TOKEN.to_string())
    }

    pub(crate) fn credential_fetch_failed() -> Self {
        Self::CredentialFetchFailed(FAILED_TO_GET_CREDENTIAL.to_string())
    }

    /// Check if this error can only be fixed by signing in again.
    pub fn requires_relogin(&self) -> bool {
        matches!(self, Self::RefreshFailed(_))
    }
}
