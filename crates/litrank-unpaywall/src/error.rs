#[derive(Debug, thiserror::Error)]
pub enum UnpaywallError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error (status {status})")]
    Api { status: u16 },
}

pub type Result<T> = std::result::Result<T, UnpaywallError>;
