//! Unpaywall adapter implementing `litrank_core::enrich::OpenAccessResolver`.

pub mod client;
pub mod error;

pub use client::UnpaywallClient;
pub use error::UnpaywallError;
