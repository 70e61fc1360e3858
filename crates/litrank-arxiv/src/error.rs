use litrank_core::source::SourceError;

#[derive(Debug, thiserror::Error)]
pub enum ArxivError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed parse error: {0}")]
    Feed(#[from] feed_rs::parser::ParseFeedError),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

pub type Result<T> = std::result::Result<T, ArxivError>;

impl From<ArxivError> for SourceError {
    fn from(err: ArxivError) -> Self {
        match err {
            ArxivError::Http(e) => SourceError::from(e),
            ArxivError::Feed(e) => SourceError::Parse(e.to_string()),
            ArxivError::Api { status, .. } => SourceError::UnexpectedStatus(status),
        }
    }
}
