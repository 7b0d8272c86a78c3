//! Digest email formatting and delivery.

mod smtp;

pub use smtp::{build_message, SmtpMailer, SmtpSettings};

use async_trait::async_trait;

/// Who a digest is sent from and to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipients {
    pub sender: String,
    /// Primary recipient
    pub to: String,
    /// Listed in the `Cc` header
    pub cc: Vec<String>,
    /// Envelope only, never in headers
    pub bcc: Vec<String>,
}

impl Recipients {
    pub fn new(sender: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            to: to.into(),
            cc: Vec::new(),
            bcc: Vec::new(),
        }
    }

    pub fn cc(mut self, cc: Vec<String>) -> Self {
        self.cc = cc;
        self
    }

    pub fn bcc(mut self, bcc: Vec<String>) -> Self {
        self.bcc = bcc;
        self
    }

    /// Every address the message is delivered to: primary, then CC, then BCC
    pub fn envelope_recipients(&self) -> Vec<&str> {
        std::iter::once(self.to.as_str())
            .chain(self.cc.iter().map(String::as_str))
            .chain(self.bcc.iter().map(String::as_str))
            .collect()
    }
}

/// A fully formatted digest message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestEmail {
    pub subject: String,
    pub recipients: Recipients,
    pub text_body: String,
    pub html_body: String,
}

impl DigestEmail {
    /// Format the digest for `term`, searched on `search_date` (`YYYY/MM/DD`)
    pub fn new(term: &str, digest: &str, search_date: &str, recipients: Recipients) -> Self {
        Self {
            subject: format!(
                "Notification of new papers ({}) - Search date: {}",
                term, search_date
            ),
            recipients,
            text_body: digest.to_string(),
            html_body: render_html(digest),
        }
    }
}

/// Wrap plain digest text in a minimal HTML document, one `<br>` per line break
pub fn render_html(text: &str) -> String {
    let mut html = String::with_capacity(text.len() + 32);
    html.push_str("<html><body>");
    for c in text.chars() {
        match c {
            '&' => html.push_str("&amp;"),
            '<' => html.push_str("&lt;"),
            '>' => html.push_str("&gt;"),
            '\n' => html.push_str("<br>"),
            _ => html.push(c),
        }
    }
    html.push_str("</body></html>");
    html
}

/// Deliver a formatted digest
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn deliver(&self, email: &DigestEmail) -> Result<(), MailError>;
}

/// Errors that can occur while building or sending mail
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid email address '{address}': {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("Failed to build email message: {0}")]
    Build(String),

    #[error("Failed to send email via SMTP: {0}")]
    Transport(String),
}

impl From<lettre::error::Error> for MailError {
    fn from(err: lettre::error::Error) -> Self {
        MailError::Build(err.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for MailError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        MailError::Transport(err.to_string())
    }
}
