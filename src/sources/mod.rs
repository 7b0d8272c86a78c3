//! Literature source capabilities.
//!
//! Each external lookup sits behind its own narrow trait so the digest runner
//! can be driven by deterministic stand-ins in tests:
//!
//! - [`IdSearch`] resolves a search term and a date into PMIDs
//! - [`SummaryLookup`] resolves a PMID into a [`PaperSummary`]
//! - [`AbstractLookup`] resolves a PMID into its abstract text
//!
//! [`PubMedSource`] implements all three against NCBI E-utilities.

pub mod mock;
mod pubmed;

pub use mock::MockSource;
pub use pubmed::{extract_abstract, PubMedSource, PUBMED_EUTILS_URL, PUBMED_RETMAX};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{PaperSummary, Pmid};

/// Resolve a search term into the identifiers published on a given date
#[async_trait]
pub trait IdSearch: Send + Sync {
    async fn search_ids(&self, term: &str, date: NaiveDate) -> Result<Vec<Pmid>, SourceError>;
}

/// Resolve an identifier into its summary record
#[async_trait]
pub trait SummaryLookup: Send + Sync {
    async fn summary(&self, pmid: &str) -> Result<PaperSummary, SourceError>;
}

/// Resolve an identifier into its abstract; empty when the record has none
#[async_trait]
pub trait AbstractLookup: Send + Sync {
    async fn abstract_text(&self, pmid: &str) -> Result<String, SourceError>;
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// The API answered with an error
    #[error("API error: {0}")]
    Api(String),

    /// Parsing error (XML, JSON)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Paper not found
    #[error("Paper not found: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

impl From<quick_xml::Error> for SourceError {
    fn from(err: quick_xml::Error) -> Self {
        SourceError::Parse(format!("XML: {}", err))
    }
}
