use litrank_core::source::SourceError;

#[derive(Debug, thiserror::Error)]
pub enum PubmedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::de::DeError),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

pub type Result<T> = std::result::Result<T, PubmedError>;

impl From<PubmedError> for SourceError {
    fn from(err: PubmedError) -> Self {
        match err {
            PubmedError::Http(e) => SourceError::from(e),
            PubmedError::Json(e) => SourceError::Parse(e.to_string()),
            PubmedError::Xml(e) => SourceError::Parse(e.to_string()),
            PubmedError::Api { status, .. } => SourceError::UnexpectedStatus(status),
        }
    }
}
