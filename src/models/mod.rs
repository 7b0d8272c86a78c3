//! Core data models for papers and digests.

mod digest;
mod paper;
mod pubtype;

pub use digest::Digest;
pub use paper::{pubmed_url, PaperSummary, Pmid, PUBMED_ARTICLE_URL};
pub use pubtype::{check_pubtype, PUBMED_PUBTYPES};
