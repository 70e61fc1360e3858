//! arXiv adapter implementing `litrank_core::Source`.

pub mod client;
pub mod error;

pub use client::ArxivClient;
pub use error::ArxivError;
