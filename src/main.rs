use anyhow::{Context, Result};
use pubmed_digest::config::{load_dotenv, DigestConfig};
use pubmed_digest::llm::OpenAiGenerator;
use pubmed_digest::mail::SmtpMailer;
use pubmed_digest::runner::{DigestRunner, Services, TermOutcome};
use pubmed_digest::sources::PubMedSource;
use pubmed_digest::utils::{to_yyyymmdd, HttpClient};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let dotenv = load_dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "pubmed_digest=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(path) = dotenv {
        tracing::info!("Loaded environment from {}", path.display());
    }

    let config = DigestConfig::from_env().context("Failed to load configuration")?;

    // Search date is fixed for the whole run
    let search_date = config
        .search_date
        .resolve(chrono::Local::now().date_naive());

    let http = Arc::new(
        HttpClient::with_timeout(config.http_timeout).context("Failed to build HTTP client")?,
    );

    let pubmed = Arc::new(
        PubMedSource::with_client(http.clone())
            .base_url(&config.pubmed.base_url)
            .api_key(
                config
                    .pubmed
                    .api_key
                    .as_ref()
                    .map(|key| key.expose_secret().to_string()),
            ),
    );

    let generator = OpenAiGenerator::new(http, config.openai.api_key)
        .model(&config.openai.model)
        .base_url(&config.openai.base_url);

    let mailer = SmtpMailer::new(&config.smtp).context("Failed to configure SMTP transport")?;

    let services = Services {
        search: pubmed.clone(),
        summaries: pubmed.clone(),
        abstracts: pubmed,
        generator: Arc::new(generator),
        mailer: Arc::new(mailer),
    };

    let runner = DigestRunner::new(services, config.recipients.clone())
        .retry_policy(config.retry)
        .language(&config.openai.language);

    tracing::info!(
        search_date = %to_yyyymmdd(search_date),
        queries = config.queries.len(),
        "Starting PubMed digest"
    );

    let report = runner.run(&config.queries, search_date).await;

    for term in &report.terms {
        match &term.outcome {
            TermOutcome::Sent { papers, attempts } => {
                tracing::info!(term = %term.term, papers, attempts, "Digest delivered")
            }
            TermOutcome::NoPapers { .. } => {
                tracing::info!(term = %term.term, "No digest needed")
            }
            TermOutcome::MailFailed { papers, error } => {
                tracing::warn!(term = %term.term, papers, %error, "Digest not delivered")
            }
            TermOutcome::GaveUp { attempts, error } => {
                tracing::warn!(term = %term.term, attempts, %error, "Digest abandoned")
            }
        }
    }

    tracing::info!(
        sent = report.sent(),
        terms = report.terms.len(),
        "PubMed digest finished"
    );

    Ok(())
}
