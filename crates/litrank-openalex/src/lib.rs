//! OpenAlex works-search adapter implementing `litrank_core::Source`.

pub mod client;
pub mod error;

pub use client::OpenAlexClient;
pub use error::OpenAlexError;
