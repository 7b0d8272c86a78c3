//! Mock source for testing purposes.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::models::{PaperSummary, Pmid};
use crate::sources::{AbstractLookup, IdSearch, SourceError, SummaryLookup};

/// A mock source that serves predefined papers and records every call.
///
/// Papers are registered per search term; a search for any other term returns
/// no identifiers. Papers without a registered abstract return an empty one.
#[derive(Debug, Default)]
pub struct MockSource {
    ids: Mutex<HashMap<String, Vec<Pmid>>>,
    summaries: Mutex<HashMap<Pmid, PaperSummary>>,
    abstracts: Mutex<HashMap<Pmid, String>>,
    search_failures: Mutex<u32>,
    calls: Mutex<Vec<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockSource {
    /// Create a new mock source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a paper returned when searching for `term`.
    pub fn add_paper(&self, term: &str, summary: PaperSummary, abstract_text: Option<&str>) {
        let pmid = summary.uid.clone();
        lock(&self.ids)
            .entry(term.to_string())
            .or_default()
            .push(pmid.clone());
        if let Some(text) = abstract_text {
            lock(&self.abstracts).insert(pmid.clone(), text.to_string());
        }
        lock(&self.summaries).insert(pmid, summary);
    }

    /// Make the next `count` searches fail with a network error.
    pub fn fail_next_searches(&self, count: u32) {
        *lock(&self.search_failures) = count;
    }

    /// Calls received so far, as `search:<term>`, `summary:<pmid>` or `abstract:<pmid>`.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: String) {
        lock(&self.calls).push(call);
    }
}

#[async_trait]
impl IdSearch for MockSource {
    async fn search_ids(&self, term: &str, _date: NaiveDate) -> Result<Vec<Pmid>, SourceError> {
        self.record(format!("search:{}", term));

        {
            let mut failures = lock(&self.search_failures);
            if *failures > 0 {
                *failures -= 1;
                return Err(SourceError::Network("mock search failure".to_string()));
            }
        }

        Ok(lock(&self.ids).get(term).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl SummaryLookup for MockSource {
    async fn summary(&self, pmid: &str) -> Result<PaperSummary, SourceError> {
        self.record(format!("summary:{}", pmid));
        lock(&self.summaries)
            .get(pmid)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(pmid.to_string()))
    }
}

#[async_trait]
impl AbstractLookup for MockSource {
    async fn abstract_text(&self, pmid: &str) -> Result<String, SourceError> {
        self.record(format!("abstract:{}", pmid));
        Ok(lock(&self.abstracts).get(pmid).cloned().unwrap_or_default())
    }
}

/// Helper function to create a mock paper summary for testing.
pub fn make_summary(pmid: &str, title: &str, pubtypes: &[&str]) -> PaperSummary {
    PaperSummary::new(pmid, title).pubtypes(pubtypes.iter().copied())
}
