//! PubMed research source implementation using E-utilities API.

use async_trait::async_trait;
use chrono::NaiveDate;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{PaperSummary, Pmid};
use crate::sources::{AbstractLookup, IdSearch, SourceError, SummaryLookup};
use crate::utils::{to_yyyymmdd, HttpClient};

/// PubMed E-utilities API base URL
pub const PUBMED_EUTILS_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// Maximum number of identifiers requested per search
pub const PUBMED_RETMAX: usize = 1000;

/// Element paths (outermost first) whose `AbstractText` children hold the abstract
const ABSTRACT_PATHS: &[&[&[u8]]] = &[
    &[
        b"PubmedArticleSet",
        b"PubmedArticle",
        b"MedlineCitation",
        b"Article",
        b"Abstract",
    ],
    &[
        b"PubmedArticleSet",
        b"PubmedBookArticle",
        b"BookDocument",
        b"Abstract",
    ],
];

/// PubMed research source
///
/// Uses NCBI E-utilities: `esearch` for identifiers, `esummary` for titles and
/// publication types, `efetch` for abstracts.
#[derive(Debug, Clone)]
pub struct PubMedSource {
    client: Arc<HttpClient>,
    base_url: String,
    api_key: Option<String>,
}

impl PubMedSource {
    /// Create with a custom HTTP client
    pub fn with_client(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            base_url: PUBMED_EUTILS_URL.to_string(),
            api_key: None,
        }
    }

    /// Point the source at a different E-utilities host
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// NCBI API key, raising the request quota when set
    pub fn api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    fn endpoint(&self, tool: &str, params: Vec<(&str, String)>) -> String {
        let mut params = params;
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}/{}.fcgi?{}", self.base_url, tool, query)
    }

    /// Build E-utilities search URL for papers published on `date`
    fn build_search_url(&self, term: &str, date: NaiveDate) -> String {
        let date = to_yyyymmdd(date);
        self.endpoint(
            "esearch",
            vec![
                ("db", "pubmed".to_string()),
                ("retmode", "json".to_string()),
                ("sort", "pub_date".to_string()),
                ("term", term.to_string()),
                ("mindate", date.clone()),
                ("maxdate", date),
                ("retmax", PUBMED_RETMAX.to_string()),
                ("retstart", "0".to_string()),
            ],
        )
    }

    fn build_summary_url(&self, pmid: &str) -> String {
        self.endpoint(
            "esummary",
            vec![
                ("db", "pubmed".to_string()),
                ("retmode", "json".to_string()),
                ("id", pmid.to_string()),
            ],
        )
    }

    fn build_fetch_url(&self, pmid: &str) -> String {
        self.endpoint(
            "efetch",
            vec![
                ("db", "pubmed".to_string()),
                ("retmode", "xml".to_string()),
                ("id", pmid.to_string()),
            ],
        )
    }

    async fn get_text(&self, url: &str, tool: &str) -> Result<String, SourceError> {
        let response =
            self.client.get(url).send().await.map_err(|e| {
                SourceError::Network(format!("Failed to call PubMed {}: {}", tool, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Api(format!(
                "PubMed {} returned status: {}",
                tool, status
            )));
        }

        response
            .text()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read response: {}", e)))
    }

    /// Parse E-utilities search response JSON
    fn parse_search_response(json: &str) -> Result<Vec<Pmid>, SourceError> {
        #[derive(Debug, Deserialize)]
        struct ESearchResponse {
            esearchresult: ESearchResult,
        }

        #[derive(Debug, Deserialize)]
        struct ESearchResult {
            #[serde(default)]
            idlist: Vec<String>,
            #[serde(rename = "ERROR", default)]
            error: Option<String>,
        }

        let response: ESearchResponse = serde_json::from_str(json)?;
        if let Some(error) = response.esearchresult.error {
            return Err(SourceError::Api(format!("PubMed search failed: {}", error)));
        }

        Ok(response.esearchresult.idlist)
    }

    /// Parse E-utilities summary response JSON for a single identifier
    fn parse_summary_response(json: &str, pmid: &str) -> Result<PaperSummary, SourceError> {
        #[derive(Debug, Deserialize)]
        struct ESummaryResponse {
            #[serde(default)]
            result: HashMap<String, serde_json::Value>,
        }

        let mut response: ESummaryResponse = serde_json::from_str(json)?;
        let entry = response
            .result
            .remove(pmid)
            .ok_or_else(|| SourceError::NotFound(pmid.to_string()))?;

        if let Some(error) = entry.get("error").and_then(|e| e.as_str()) {
            return Err(SourceError::NotFound(format!("{}: {}", pmid, error)));
        }

        let mut summary: PaperSummary = serde_json::from_value(entry)?;
        if summary.uid.is_empty() {
            summary.uid = pmid.to_string();
        }

        Ok(summary)
    }
}

/// Extract the abstract from an `efetch` XML document.
///
/// All `AbstractText` sections are joined with a newline, keeping text inside
/// inline markup. Returns an empty string when the record has no `Abstract`.
pub fn extract_abstract(xml: &str) -> Result<String, SourceError> {
    let mut reader = Reader::from_str(xml);

    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut sections: Vec<String> = Vec::new();
    // Stack depth of the open AbstractText element and its text so far
    let mut current: Option<(usize, String)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                if current.is_none() && name == b"AbstractText" && is_abstract_parent(&path) {
                    current = Some((path.len(), String::new()));
                }
                path.push(name);
            }
            Event::End(_) => {
                path.pop();
                if let Some((depth, _)) = &current {
                    if path.len() == *depth {
                        if let Some((_, text)) = current.take() {
                            sections.push(text);
                        }
                    }
                }
            }
            Event::Text(e) => {
                if let Some((_, text)) = current.as_mut() {
                    text.push_str(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if let Some((_, text)) = current.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(sections.join("\n"))
}

fn is_abstract_parent(path: &[Vec<u8>]) -> bool {
    ABSTRACT_PATHS.iter().any(|expected| {
        expected.len() == path.len()
            && expected
                .iter()
                .zip(path)
                .all(|(want, have)| *want == have.as_slice())
    })
}

#[async_trait]
impl IdSearch for PubMedSource {
    async fn search_ids(&self, term: &str, date: NaiveDate) -> Result<Vec<Pmid>, SourceError> {
        let url = self.build_search_url(term, date);
        let json = self.get_text(&url, "esearch").await?;
        let ids = Self::parse_search_response(&json)?;

        tracing::debug!(term, count = ids.len(), "PubMed search finished");
        Ok(ids)
    }
}

#[async_trait]
impl SummaryLookup for PubMedSource {
    async fn summary(&self, pmid: &str) -> Result<PaperSummary, SourceError> {
        let url = self.build_summary_url(pmid);
        let json = self.get_text(&url, "esummary").await?;
        Self::parse_summary_response(&json, pmid)
    }
}

#[async_trait]
impl AbstractLookup for PubMedSource {
    async fn abstract_text(&self, pmid: &str) -> Result<String, SourceError> {
        let url = self.build_fetch_url(pmid);
        let xml = self.get_text(&url, "efetch").await?;
        extract_abstract(&xml)
    }
}
