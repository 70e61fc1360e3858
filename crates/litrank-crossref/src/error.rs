use litrank_core::source::SourceError;

#[derive(Debug, thiserror::Error)]
pub enum CrossrefError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

pub type Result<T> = std::result::Result<T, CrossrefError>;

impl From<CrossrefError> for SourceError {
    fn from(err: CrossrefError) -> Self {
        match err {
            CrossrefError::Http(e) => SourceError::from(e),
            CrossrefError::Json(e) => SourceError::Parse(e.to_string()),
            CrossrefError::Api { status, .. } => SourceError::UnexpectedStatus(status),
        }
    }
}
