use litrank_core::source::SourceError;

#[derive(Debug, thiserror::Error)]
pub enum OpenAlexError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

pub type Result<T> = std::result::Result<T, OpenAlexError>;

impl From<OpenAlexError> for SourceError {
    fn from(err: OpenAlexError) -> Self {
        match err {
            OpenAlexError::Http(e) => SourceError::from(e),
            OpenAlexError::Json(e) => SourceError::Parse(e.to_string()),
            OpenAlexError::Api { status, .. } => SourceError::UnexpectedStatus(status),
        }
    }
}
