//! SMTP delivery over STARTTLS.

use async_trait::async_trait;
use lettre::address::Envelope;
use lettre::message::{header::ContentType, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::{ExposeSecret, SecretString};

use super::{DigestEmail, MailError, Mailer};

/// Relay connection settings
#[derive(Debug)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
}

/// Sends digests through an authenticated STARTTLS relay
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Create a mailer for the given relay. No connection is made until delivery.
    pub fn new(settings: &SmtpSettings) -> Result<Self, MailError> {
        let creds = Credentials::new(
            settings.username.clone(),
            settings.password.expose_secret().to_string(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.server)?
            .port(settings.port)
            .credentials(creds)
            .build();

        Ok(Self { transport })
    }
}

fn mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.trim().parse().map_err(|source| MailError::Address {
        address: address.to_string(),
        source,
    })
}

/// Build the multipart message for a digest.
///
/// CC recipients are written to the `Cc` header. BCC recipients only appear in
/// the SMTP envelope.
pub fn build_message(email: &DigestEmail) -> Result<Message, MailError> {
    let recipients = &email.recipients;
    let from = mailbox(&recipients.sender)?;
    let to = mailbox(&recipients.to)?;

    let mut builder = Message::builder()
        .from(from.clone())
        .to(to)
        .subject(email.subject.as_str());

    for cc in &recipients.cc {
        builder = builder.cc(mailbox(cc)?);
    }

    let envelope_to = recipients
        .envelope_recipients()
        .into_iter()
        .map(|address| mailbox(address).map(|m| m.email))
        .collect::<Result<Vec<Address>, _>>()?;
    builder = builder.envelope(Envelope::new(Some(from.email), envelope_to)?);

    let message = builder.multipart(
        MultiPart::alternative()
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_PLAIN)
                    .body(email.text_body.clone()),
            )
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_HTML)
                    .body(email.html_body.clone()),
            ),
    )?;

    Ok(message)
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn deliver(&self, email: &DigestEmail) -> Result<(), MailError> {
        let message = build_message(email)?;

        self.transport.send(message).await?;

        tracing::info!(
            to = %email.recipients.to,
            cc = email.recipients.cc.len(),
            bcc = email.recipients.bcc.len(),
            subject = %email.subject,
            "Email sent successfully"
        );

        Ok(())
    }
}
