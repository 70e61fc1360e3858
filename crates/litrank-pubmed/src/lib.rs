//! PubMed/NCBI E-utilities adapter implementing `litrank_core::Source`.

pub mod client;
pub mod error;

pub use client::PubmedClient;
pub use error::PubmedError;
