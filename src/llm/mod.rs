//! Text generation for paper summaries.
//!
//! The digest only needs one capability from a language model: turn a prompt
//! into text. [`TextGenerator`] captures that, and [`OpenAiGenerator`] is the
//! production implementation.

mod openai;

pub use openai::{OpenAiGenerator, DEFAULT_MODEL, OPENAI_API_URL};

use async_trait::async_trait;

/// Default language summaries are written in
pub const DEFAULT_LANGUAGE: &str = "Japanese";

/// Generate text from a single user prompt
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns the generated text, whitespace-trimmed
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError>;
}

/// Errors from the generative text service
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// The request quota is exhausted; retry later
    #[error("Rate limit exceeded")]
    RateLimited {
        /// Seconds suggested by a `Retry-After` header, if any
        retry_after: Option<u64>,
    },

    /// The service answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// The response body could not be understood
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for GenerateError {
    fn from(err: reqwest::Error) -> Self {
        GenerateError::Network(err.to_string())
    }
}

/// Build the summarization prompt for one paper
pub fn build_prompt(language: &str, title: &str, abstract_text: &str) -> String {
    format!(
        "You are a highly educated and trained researcher. Please explain the following paper in {}, \
         separating the title and summary with line breaks. Be sure to write the main points in \
         bullet-point format.\n\ntitle: {}\nabstract: {}",
        language, title, abstract_text
    )
}
