//! Paper records as returned by the E-utilities summary endpoint.

use serde::{Deserialize, Serialize};

/// Public landing page for PubMed records
pub const PUBMED_ARTICLE_URL: &str = "https://pubmed.ncbi.nlm.nih.gov";

/// PubMed identifier, kept as the opaque string E-utilities returns
pub type Pmid = String;

/// Summary record for a single PubMed document
///
/// Deserialized directly from an entry of the `esummary` `result` map. Only
/// the fields the digest needs are kept; everything else is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperSummary {
    /// PubMed identifier
    #[serde(default)]
    pub uid: Pmid,

    /// Article title
    #[serde(default)]
    pub title: String,

    /// Publication types, e.g. "Journal Article" or "Review"
    #[serde(default)]
    pub pubtype: Vec<String>,
}

impl PaperSummary {
    /// Create a summary record
    pub fn new(uid: impl Into<Pmid>, title: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            title: title.into(),
            pubtype: Vec::new(),
        }
    }

    /// Add publication types
    pub fn pubtypes<I, S>(mut self, pubtypes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pubtype.extend(pubtypes.into_iter().map(Into::into));
        self
    }
}

/// Link back to the PubMed page of a document
pub fn pubmed_url(pmid: &str) -> String {
    format!("{}/{}", PUBMED_ARTICLE_URL, pmid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_esummary_entry() {
        let json = r#"{
            "uid": "38000001",
            "pubdate": "2024 Jan 2",
            "title": "A randomized trial of something.",
            "pubtype": ["Journal Article", "Randomized Controlled Trial"],
            "authors": [{"name": "Smith J"}]
        }"#;

        let summary: PaperSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.uid, "38000001");
        assert_eq!(summary.title, "A randomized trial of something.");
        assert_eq!(summary.pubtype.len(), 2);
    }

    #[test]
    fn test_deserialize_without_pubtype() {
        let summary: PaperSummary =
            serde_json::from_str(r#"{"uid": "1", "title": "Untyped"}"#).unwrap();
        assert!(summary.pubtype.is_empty());
    }

    #[test]
    fn test_pubmed_url() {
        assert_eq!(pubmed_url("12345"), "https://pubmed.ncbi.nlm.nih.gov/12345");
    }
}
