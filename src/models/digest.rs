//! Per-term digest accumulator.

use super::paper::pubmed_url;

/// Text body collected for one search term
///
/// A fresh digest is created for every attempt at a term, so nothing carries
/// over from a failed attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Digest {
    term: String,
    body: String,
    papers: usize,
}

impl Digest {
    /// Start an empty digest for `term`
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            body: String::new(),
            papers: 0,
        }
    }

    /// Append one document block: header, generated summary, source link
    pub fn push(&mut self, pmid: &str, summary: &str) {
        self.body.push_str(&format!(
            "Notification of new PubMed papers ({})\n\n{}\n\n{}\n\n\n",
            self.term,
            summary,
            pubmed_url(pmid)
        ));
        self.papers += 1;
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    /// Accumulated text
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Number of appended documents
    pub fn papers(&self) -> usize {
        self.papers
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}
