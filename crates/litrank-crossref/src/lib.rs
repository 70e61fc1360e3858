//! Crossref works adapter implementing `litrank_core::Source`.

pub mod client;
pub mod error;

pub use client::CrossrefClient;
pub use error::CrossrefError;
