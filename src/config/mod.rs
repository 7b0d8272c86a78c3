//! Configuration management.
//!
//! All settings come from the process environment, optionally primed from a
//! `.env` file. Required variables:
//!
//! ```bash
//! export OPENAI_API_KEY="sk-..."
//! export SMTP_SERVER="smtp.gmail.com"
//! export SMTP_PORT="587"
//! export SMTP_USERNAME="me@gmail.com"
//! export SMTP_PASSWORD="app-password"
//! export SENDER_EMAIL="me@gmail.com"
//! export RECIPIENT_EMAIL="team@example.com"
//! export PUBMED_QUERIES="sepsis,heart failure"
//! ```
//!
//! `CC_EMAIL` and `BCC_EMAIL` take comma-separated lists. The remaining
//! variables tune the run and all have defaults: `OPENAI_MODEL`,
//! `OPENAI_BASE_URL`, `SUMMARY_LANGUAGE`, `NCBI_API_KEY`, `PUBMED_BASE_URL`,
//! `PUBMED_LOOKBACK_DAYS`, `PUBMED_SEARCH_DATE`, `DIGEST_MAX_ATTEMPTS`,
//! `DIGEST_RATE_LIMIT_DELAY_SECS`, `DIGEST_RETRY_DELAY_SECS`,
//! `HTTP_TIMEOUT_SECS`.

use chrono::NaiveDate;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::llm::{DEFAULT_LANGUAGE, DEFAULT_MODEL, OPENAI_API_URL};
use crate::mail::{Recipients, SmtpSettings};
use crate::sources::PUBMED_EUTILS_URL;
use crate::utils::{days_before, parse_yyyymmdd, RetryPolicy, DEFAULT_TIMEOUT};

/// Default number of days between today and the searched publication date
pub const DEFAULT_LOOKBACK_DAYS: u64 = 1;

/// Raw environment, deserialized by the `config` crate (keys are lowercased)
#[derive(Debug, Deserialize)]
struct EnvSettings {
    openai_api_key: String,
    smtp_server: String,
    smtp_port: String,
    smtp_username: String,
    smtp_password: String,
    sender_email: String,
    recipient_email: String,
    pubmed_queries: String,
    #[serde(default)]
    cc_email: Option<String>,
    #[serde(default)]
    bcc_email: Option<String>,
    #[serde(default)]
    openai_model: Option<String>,
    #[serde(default)]
    openai_base_url: Option<String>,
    #[serde(default)]
    summary_language: Option<String>,
    #[serde(default)]
    ncbi_api_key: Option<String>,
    #[serde(default)]
    pubmed_base_url: Option<String>,
    #[serde(default)]
    pubmed_lookback_days: Option<String>,
    #[serde(default)]
    pubmed_search_date: Option<String>,
    #[serde(default)]
    digest_max_attempts: Option<String>,
    #[serde(default)]
    digest_rate_limit_delay_secs: Option<String>,
    #[serde(default)]
    digest_retry_delay_secs: Option<String>,
    #[serde(default)]
    http_timeout_secs: Option<String>,
}

/// Generative service settings
#[derive(Debug)]
pub struct OpenAiConfig {
    pub api_key: SecretString,
    pub model: String,
    pub base_url: String,
    /// Language the summaries are written in
    pub language: String,
}

/// E-utilities settings
#[derive(Debug)]
pub struct PubMedConfig {
    pub base_url: String,
    pub api_key: Option<SecretString>,
}

/// Which publication date to search for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDate {
    /// A fixed date
    On(NaiveDate),
    /// This many days before the run starts
    DaysBefore(u64),
}

impl SearchDate {
    /// Resolve against the run's start date
    pub fn resolve(&self, today: NaiveDate) -> NaiveDate {
        match self {
            SearchDate::On(date) => *date,
            SearchDate::DaysBefore(days) => days_before(today, *days),
        }
    }
}

/// Everything one run needs, built once at startup
#[derive(Debug)]
pub struct DigestConfig {
    /// Search terms, processed in order
    pub queries: Vec<String>,
    pub openai: OpenAiConfig,
    pub pubmed: PubMedConfig,
    pub smtp: SmtpSettings,
    pub recipients: Recipients,
    pub retry: RetryPolicy,
    pub search_date: SearchDate,
    pub http_timeout: Duration,
}

impl DigestConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(config::Environment::default())
    }

    /// Load from an explicit variable map instead of the process environment
    pub fn from_map(vars: config::Map<String, String>) -> Result<Self, ConfigError> {
        Self::load(config::Environment::default().source(Some(vars)))
    }

    fn load(environment: config::Environment) -> Result<Self, ConfigError> {
        let settings: EnvSettings = config::Config::builder()
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        Self::try_from(settings)
    }
}

impl TryFrom<EnvSettings> for DigestConfig {
    type Error = ConfigError;

    fn try_from(env: EnvSettings) -> Result<Self, Self::Error> {
        let queries = split_list(&env.pubmed_queries);
        if queries.is_empty() {
            return Err(ConfigError::Invalid(
                "PUBMED_QUERIES must contain at least one search term".to_string(),
            ));
        }

        let search_date = match non_empty(env.pubmed_search_date) {
            Some(value) => SearchDate::On(parse_yyyymmdd(&value).map_err(|e| {
                ConfigError::Invalid(format!(
                    "PUBMED_SEARCH_DATE must be YYYY/MM/DD, got '{}': {}",
                    value, e
                ))
            })?),
            None => SearchDate::DaysBefore(
                parse_optional("PUBMED_LOOKBACK_DAYS", env.pubmed_lookback_days)?
                    .unwrap_or(DEFAULT_LOOKBACK_DAYS),
            ),
        };

        let mut retry = RetryPolicy::default();
        if let Some(max) = parse_optional::<u32>("DIGEST_MAX_ATTEMPTS", env.digest_max_attempts)? {
            if max == 0 {
                return Err(ConfigError::Invalid(
                    "DIGEST_MAX_ATTEMPTS must be at least 1".to_string(),
                ));
            }
            retry = retry.max_attempts(max);
        }
        if let Some(secs) =
            parse_optional("DIGEST_RATE_LIMIT_DELAY_SECS", env.digest_rate_limit_delay_secs)?
        {
            retry.rate_limit_delay = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_optional("DIGEST_RETRY_DELAY_SECS", env.digest_retry_delay_secs)? {
            retry.failure_delay = Duration::from_secs(secs);
        }

        let http_timeout = parse_optional("HTTP_TIMEOUT_SECS", env.http_timeout_secs)?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);
        if http_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "HTTP_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }

        let smtp_port = parse_value("SMTP_PORT", &env.smtp_port)?;

        let recipients = Recipients::new(env.sender_email.trim(), env.recipient_email.trim())
            .cc(env.cc_email.as_deref().map(split_list).unwrap_or_default())
            .bcc(env.bcc_email.as_deref().map(split_list).unwrap_or_default());

        Ok(Self {
            queries,
            openai: OpenAiConfig {
                api_key: SecretString::from(env.openai_api_key),
                model: non_empty(env.openai_model).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                base_url: non_empty(env.openai_base_url)
                    .unwrap_or_else(|| OPENAI_API_URL.to_string()),
                language: non_empty(env.summary_language)
                    .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            },
            pubmed: PubMedConfig {
                base_url: non_empty(env.pubmed_base_url)
                    .unwrap_or_else(|| PUBMED_EUTILS_URL.to_string()),
                api_key: non_empty(env.ncbi_api_key).map(SecretString::from),
            },
            smtp: SmtpSettings {
                server: env.smtp_server.trim().to_string(),
                port: smtp_port,
                username: env.smtp_username,
                password: SecretString::from(env.smtp_password),
            },
            recipients,
            retry,
            search_date,
            http_timeout,
        })
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_value<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| {
        ConfigError::Invalid(format!("{} has invalid value '{}': {}", name, value, e))
    })
}

fn parse_optional<T>(name: &str, value: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    non_empty(value)
        .map(|v| parse_value(name, &v))
        .transpose()
}

/// Load a `.env` file from the working directory, if there is one.
///
/// Variables already set in the process take precedence.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn required() -> config::Map<String, String> {
        [
            ("OPENAI_API_KEY", "sk-test"),
            ("SMTP_SERVER", "smtp.example.com"),
            ("SMTP_PORT", "587"),
            ("SMTP_USERNAME", "user@example.com"),
            ("SMTP_PASSWORD", "secret"),
            ("SENDER_EMAIL", "sender@example.com"),
            ("RECIPIENT_EMAIL", "to@example.com"),
            ("PUBMED_QUERIES", "sepsis, heart failure"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn with(mut vars: config::Map<String, String>, key: &str, value: &str) -> config::Map<String, String> {
        vars.insert(key.to_string(), value.to_string());
        vars
    }

    #[test]
    fn test_required_only_uses_defaults() {
        let config = DigestConfig::from_map(required()).unwrap();

        assert_eq!(config.queries, vec!["sepsis", "heart failure"]);
        assert_eq!(config.openai.api_key.expose_secret(), "sk-test");
        assert_eq!(config.openai.model, "gpt-4o-mini");
        assert_eq!(config.openai.language, "Japanese");
        assert_eq!(config.openai.base_url, OPENAI_API_URL);
        assert_eq!(config.pubmed.base_url, PUBMED_EUTILS_URL);
        assert!(config.pubmed.api_key.is_none());
        assert_eq!(config.smtp.server, "smtp.example.com");
        assert_eq!(config.smtp.port, 587);
        assert_eq!(config.smtp.password.expose_secret(), "secret");
        assert_eq!(config.recipients.sender, "sender@example.com");
        assert_eq!(config.recipients.to, "to@example.com");
        assert!(config.recipients.cc.is_empty());
        assert!(config.recipients.bcc.is_empty());
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.search_date, SearchDate::DaysBefore(1));
        assert_eq!(config.http_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_recipient_lists() {
        let vars = with(required(), "CC_EMAIL", "a@example.com, b@example.com,");
        let vars = with(vars, "BCC_EMAIL", "hidden@example.com");
        let config = DigestConfig::from_map(vars).unwrap();

        assert_eq!(config.recipients.cc, vec!["a@example.com", "b@example.com"]);
        assert_eq!(config.recipients.bcc, vec!["hidden@example.com"]);
    }

    #[test]
    fn test_empty_cc_is_no_cc() {
        let config = DigestConfig::from_map(with(required(), "CC_EMAIL", "")).unwrap();
        assert!(config.recipients.cc.is_empty());
    }

    #[test]
    fn test_missing_required_variable_fails() {
        let mut vars = required();
        vars.remove("SMTP_SERVER");

        let err = DigestConfig::from_map(vars).err().unwrap();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn test_invalid_port_fails() {
        let err = DigestConfig::from_map(with(required(), "SMTP_PORT", "smtp"))
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("SMTP_PORT")));
    }

    #[test]
    fn test_blank_queries_fail() {
        let err = DigestConfig::from_map(with(required(), "PUBMED_QUERIES", " , "))
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_retry_overrides() {
        let vars = with(required(), "DIGEST_MAX_ATTEMPTS", "5");
        let vars = with(vars, "DIGEST_RATE_LIMIT_DELAY_SECS", "10");
        let vars = with(vars, "DIGEST_RETRY_DELAY_SECS", "2");
        let config = DigestConfig::from_map(vars).unwrap();

        assert_eq!(config.retry.max_attempts, Some(5));
        assert_eq!(config.retry.rate_limit_delay, Duration::from_secs(10));
        assert_eq!(config.retry.failure_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_zero_max_attempts_fails() {
        let result = DigestConfig::from_map(with(required(), "DIGEST_MAX_ATTEMPTS", "0"));
        assert!(result.is_err());
    }

    #[test]
    fn test_search_date_overrides() {
        let config =
            DigestConfig::from_map(with(required(), "PUBMED_SEARCH_DATE", "2024/02/29")).unwrap();
        assert_eq!(
            config.search_date,
            SearchDate::On(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );

        let config = DigestConfig::from_map(with(required(), "PUBMED_LOOKBACK_DAYS", "7")).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();
        assert_eq!(
            config.search_date.resolve(today),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );

        let result = DigestConfig::from_map(with(required(), "PUBMED_SEARCH_DATE", "2024-02-29"));
        assert!(result.is_err());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("a,b , c"), vec!["a", "b", "c"]);
        assert!(split_list("").is_empty());
        assert!(split_list(" ,, ").is_empty());
    }
}
