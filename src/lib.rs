//! # PubMed Digest
//!
//! Searches PubMed for papers published on a given day, keeps the ones with a
//! qualifying publication type, summarizes each with a generative language
//! service and emails one digest per search term.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Paper summaries, the publication-type filter and the digest text
//! - [`sources`]: PubMed E-utilities lookups behind narrow capability traits
//! - [`llm`]: Prompt construction and the OpenAI text generator
//! - [`mail`]: Digest email formatting and SMTP delivery
//! - [`runner`]: Per-term run controller with whole-term retry
//! - [`utils`]: HTTP client, dates and retry policy
//! - [`config`]: Environment-based configuration

pub mod config;
pub mod llm;
pub mod mail;
pub mod models;
pub mod runner;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use config::DigestConfig;
pub use models::{Digest, PaperSummary};
pub use runner::{DigestRunner, RunReport, Services, TermOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
