//! Pipeline-level errors that map to the transport status codes in §6
//! (`PipelineError`), following the teacher's per-crate `thiserror` enum shape.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing/malformed query, out-of-range limit, unknown filter value.
    /// Maps to HTTP 422.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Malformed date or unknown publication type. Maps to HTTP 400.
    #[error("bad input: {0}")]
    BadInput(String),

    /// Requested paper id is not present in the paper cache / annotation store.
    /// Maps to HTTP 404.
    #[error("paper not found: {0}")]
    PaperNotFound(String),

    /// A feature the presentation layer advertises but the pipeline doesn't
    /// implement (e.g. the publication endpoint, §6). Maps to HTTP 501.
    #[error("not implemented: {0}")]
    NotImplemented(String),
}

impl PipelineError {
    pub fn status_code(&self) -> u16 {
        match self {
            PipelineError::InvalidRequest(_) => 422,
            PipelineError::BadInput(_) => 400,
            PipelineError::PaperNotFound(_) => 404,
            PipelineError::NotImplemented(_) => 501,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
