//! The `Source` trait every bibliographic adapter implements (§4.1).

use async_trait::async_trait;
use thiserror::Error;

use crate::types::PaperRecord;

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchParams<'a> {
    pub query: &'a str,
    pub limit: usize,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
}

/// One external bibliographic API. Adapters retry transient failures
/// internally (see [`crate::retry`]) and translate rate limiting / not-found
/// into empty results rather than errors — [`SourceError`] is reserved for
/// failures the circuit breaker (§4.11) should actually observe.
#[async_trait]
pub trait Source: Send + Sync {
    fn id(&self) -> &'static str;

    /// Issue one source-specific query, returning up to `params.limit` records.
    async fn search(&self, params: SearchParams<'_>) -> Result<Vec<PaperRecord>, SourceError>;

    /// Resolve a single record by this source's id format. `Ok(None)` on a
    /// confirmed not-found (e.g. HTTP 404), never an error.
    async fn get(&self, paper_id: &str) -> Result<Option<PaperRecord>, SourceError>;

    /// Papers citing this one, for sources that expose a citation graph
    /// (currently Semantic Scholar). Defaults to empty for sources that don't.
    async fn get_citations(&self, _source_id: &str, _limit: usize) -> Result<Vec<PaperRecord>, SourceError> {
        Ok(Vec::new())
    }

    /// Papers this one cites, for sources that expose a citation graph
    /// (currently Semantic Scholar). Defaults to empty for sources that don't.
    async fn get_references(&self, _source_id: &str, _limit: usize) -> Result<Vec<PaperRecord>, SourceError> {
        Ok(Vec::new())
    }

    /// This source's own notion of "related work" (currently OpenAlex's
    /// `related_to` filter). Defaults to empty for sources that don't have one.
    async fn get_related_works(&self, _source_id: &str, _limit: usize) -> Result<Vec<PaperRecord>, SourceError> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("network error: {0}")]
    Network(String),
    #[error("upstream returned an unexpected status: {0}")]
    UnexpectedStatus(u16),
    #[error("response could not be parsed: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

/// Fill in `relevance_score` from rank order when a source has no native
/// relevance score of its own (§4.1): `1.0 − (position / total) · 0.5`.
pub fn relevance_from_rank(position: usize, total: usize) -> f64 {
    if total == 0 {
        return 1.0;
    }
    1.0 - (position as f64 / total as f64) * 0.5
}
