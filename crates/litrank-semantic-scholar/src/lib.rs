//! Semantic Scholar Graph API adapter implementing `litrank_core::Source`.

pub mod client;
pub mod error;

pub use client::SemanticScholarClient;
pub use error::SemanticScholarError;
