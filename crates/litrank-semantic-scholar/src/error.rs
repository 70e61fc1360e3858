use litrank_core::source::SourceError;

#[derive(Debug, thiserror::Error)]
pub enum SemanticScholarError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

pub type Result<T> = std::result::Result<T, SemanticScholarError>;

impl From<SemanticScholarError> for SourceError {
    fn from(err: SemanticScholarError) -> Self {
        match err {
            SemanticScholarError::Http(e) => SourceError::from(e),
            SemanticScholarError::Json(e) => SourceError::Parse(e.to_string()),
            SemanticScholarError::Api { status, .. } => SourceError::UnexpectedStatus(status),
        }
    }
}
