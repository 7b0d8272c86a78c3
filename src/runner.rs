//! Digest run controller.
//!
//! Processes search terms one after another. Each term is collected from
//! scratch on every attempt (search, filter, summarize, assemble), then mailed
//! once if anything qualified. Mail failures are logged and never retried.

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

use crate::llm::{build_prompt, GenerateError, TextGenerator, DEFAULT_LANGUAGE};
use crate::mail::{DigestEmail, MailError, Mailer, Recipients};
use crate::models::{check_pubtype, Digest};
use crate::sources::{AbstractLookup, IdSearch, SourceError, SummaryLookup};
use crate::utils::{to_yyyymmdd, with_retry, Classify, FailureKind, RetryPolicy, RetryResult};

/// The external capabilities a run depends on
#[derive(Clone)]
pub struct Services {
    pub search: Arc<dyn IdSearch>,
    pub summaries: Arc<dyn SummaryLookup>,
    pub abstracts: Arc<dyn AbstractLookup>,
    pub generator: Arc<dyn TextGenerator>,
    pub mailer: Arc<dyn Mailer>,
}

/// Why an attempt at a term failed
#[derive(Debug, thiserror::Error)]
pub enum TermError {
    #[error("Rate limit exceeded by the text generation service")]
    RateLimited { retry_after: Option<u64> },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Generate(GenerateError),
}

impl From<GenerateError> for TermError {
    fn from(err: GenerateError) -> Self {
        match err {
            GenerateError::RateLimited { retry_after } => TermError::RateLimited { retry_after },
            other => TermError::Generate(other),
        }
    }
}

impl Classify for TermError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            TermError::RateLimited { .. } => FailureKind::RateLimit,
            _ => FailureKind::Other,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            TermError::RateLimited { retry_after } => retry_after.map(Duration::from_secs),
            _ => None,
        }
    }
}

/// What happened to one search term
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermOutcome {
    /// A digest with `papers` documents was delivered
    Sent { papers: usize, attempts: u32 },
    /// Nothing passed the publication-type filter; no mail was sent
    NoPapers { attempts: u32 },
    /// The digest was built but delivery failed
    MailFailed { papers: usize, error: String },
    /// The retry budget ran out
    GaveUp { attempts: u32, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermReport {
    pub term: String,
    pub outcome: TermOutcome,
}

/// Outcome of a whole run, one entry per term in configuration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub search_date: NaiveDate,
    pub terms: Vec<TermReport>,
}

impl RunReport {
    /// Number of digests delivered
    pub fn sent(&self) -> usize {
        self.terms
            .iter()
            .filter(|t| matches!(t.outcome, TermOutcome::Sent { .. }))
            .count()
    }
}

/// Runs the digest for a list of search terms
pub struct DigestRunner {
    services: Services,
    recipients: Recipients,
    retry: RetryPolicy,
    language: String,
}

impl DigestRunner {
    pub fn new(services: Services, recipients: Recipients) -> Self {
        Self {
            services,
            recipients,
            retry: RetryPolicy::default(),
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Language the summaries are requested in
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Process every term for papers published on `search_date`
    pub async fn run(&self, queries: &[String], search_date: NaiveDate) -> RunReport {
        let mut terms = Vec::with_capacity(queries.len());

        for term in queries {
            let outcome = self.run_term(term, search_date).await;
            terms.push(TermReport {
                term: term.clone(),
                outcome,
            });
        }

        RunReport { search_date, terms }
    }

    /// Collect and send the digest for one term, retrying per the policy
    pub async fn run_term(&self, term: &str, search_date: NaiveDate) -> TermOutcome {
        let result = with_retry(&self.retry, |attempt| {
            self.collect_digest(term, search_date, attempt)
        })
        .await;

        let (digest, attempts) = match result {
            RetryResult::Success { value, attempts } => (value, attempts),
            RetryResult::Exhausted { error, attempts } => {
                tracing::error!(term, attempts, %error, "Giving up on query");
                return TermOutcome::GaveUp {
                    attempts,
                    error: error.to_string(),
                };
            }
        };

        if digest.is_empty() {
            tracing::info!(term, "No new papers for query");
            return TermOutcome::NoPapers { attempts };
        }

        match self.send_digest(&digest, search_date).await {
            Ok(()) => {
                tracing::info!(term, papers = digest.papers(), "Email sent for query");
                TermOutcome::Sent {
                    papers: digest.papers(),
                    attempts,
                }
            }
            Err(error) => {
                tracing::error!(term, %error, "Failed to send email for query");
                TermOutcome::MailFailed {
                    papers: digest.papers(),
                    error: error.to_string(),
                }
            }
        }
    }

    /// One full attempt at a term, starting from an empty digest
    async fn collect_digest(
        &self,
        term: &str,
        search_date: NaiveDate,
        attempt: u32,
    ) -> Result<Digest, TermError> {
        let ids = self.services.search.search_ids(term, search_date).await?;
        tracing::info!(term, attempt, count = ids.len(), "Fetched paper IDs");

        let mut digest = Digest::new(term);

        for pmid in &ids {
            let summary = self.services.summaries.summary(pmid).await?;
            let qualifies = check_pubtype(&summary.pubtype);
            tracing::debug!(pmid = %pmid, pubtype = ?summary.pubtype, qualifies, "Checked publication type");
            if !qualifies {
                continue;
            }

            let abstract_text = self.services.abstracts.abstract_text(pmid).await?;
            tracing::debug!(pmid = %pmid, title = %summary.title, abstract_len = abstract_text.len(), "Summarizing paper");

            let prompt = build_prompt(&self.language, &summary.title, &abstract_text);
            let content = self.services.generator.generate(&prompt).await?;

            digest.push(pmid, &content);
        }

        Ok(digest)
    }

    async fn send_digest(&self, digest: &Digest, search_date: NaiveDate) -> Result<(), MailError> {
        let email = DigestEmail::new(
            digest.term(),
            digest.body(),
            &to_yyyymmdd(search_date),
            self.recipients.clone(),
        );

        self.services.mailer.deliver(&email).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_maps_to_its_own_kind() {
        let err = TermError::from(GenerateError::RateLimited {
            retry_after: Some(5),
        });
        assert!(matches!(err, TermError::RateLimited { retry_after: Some(5) }));
        assert_eq!(err.failure_kind(), FailureKind::RateLimit);
        assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_other_failures_share_a_kind() {
        let generate = TermError::from(GenerateError::Network("reset".to_string()));
        let source = TermError::from(SourceError::Parse("bad json".to_string()));

        assert_eq!(generate.failure_kind(), FailureKind::Other);
        assert_eq!(source.failure_kind(), FailureKind::Other);
        assert_eq!(source.retry_after(), None);
    }

    #[test]
    fn test_run_report_counts_sent() {
        let report = RunReport {
            search_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            terms: vec![
                TermReport {
                    term: "a".to_string(),
                    outcome: TermOutcome::Sent { papers: 2, attempts: 1 },
                },
                TermReport {
                    term: "b".to_string(),
                    outcome: TermOutcome::NoPapers { attempts: 1 },
                },
            ],
        };
        assert_eq!(report.sent(), 1);
    }
}
