//! Normalization, dedup, ranking and caching pipeline for fanned-out
//! bibliographic search results.
//!
//! This crate owns the hard-engineering core described in the system
//! overview: source fan-out orchestration, canonical-work clustering and
//! merge, feature extraction and two-stage ranking, and the query-keyed
//! result cache. Adapter crates implement [`source::Source`]; presentation
//! crates (CLI, MCP server) construct a [`pipeline::Pipeline`] and call
//! [`pipeline::Pipeline::search`].

pub mod annotation;
pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod enrich;
pub mod error;
pub mod explain;
pub mod features;
pub mod merge;
pub mod normalize;
pub mod pipeline;
pub mod ranking;
pub mod retry;
pub mod similarity;
pub mod source;
pub mod types;
pub mod workkey;

pub use config::Config;
pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, SearchRequest, SearchResponse, SortBy};
pub use ranking::RankingMode;
pub use source::{SearchParams, Source, SourceError};
pub use types::{Author, DataQualityFlag, MergedPaper, PaperRecord, SourceTag, WorkType};
