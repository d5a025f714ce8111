use std::time::Duration;

use chrono::NaiveDate;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::Channel;
use crate::config::EmailConfig;
use crate::error::{AppError, AppResult};

/// Plain-text report mail. The transport is the STARTTLS SMTP relay unless
/// one is supplied with [`EmailChannel::with_transport`].
pub struct EmailChannel<T = AsyncSmtpTransport<Tokio1Executor>> {
    config: EmailConfig,
    transport: T,
}

impl EmailChannel {
    pub fn new(config: &EmailConfig) -> AppResult<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)
            .map_err(|e| AppError::Email(e.to_string()))?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.sender.clone(),
                config.password.clone(),
            ))
            .timeout(Some(Duration::from_secs(30)))
            .build();

        Ok(Self::with_transport(config, transport))
    }
}

impl<T> EmailChannel<T> {
    pub fn with_transport(config: &EmailConfig, transport: T) -> Self {
        Self {
            config: config.clone(),
            transport,
        }
    }
}

pub fn subject_for(date: NaiveDate) -> String {
    format!("Pelangi Daily Report - {}", date.format("%Y-%m-%d"))
}

fn build_message(config: &EmailConfig, body: &str, date: NaiveDate) -> AppResult<Message> {
    let from: Mailbox = config
        .sender
        .parse()
        .map_err(|e| AppError::Email(format!("invalid sender address: {e}")))?;
    let to: Mailbox = config
        .recipient
        .parse()
        .map_err(|e| AppError::Email(format!("invalid recipient address: {e}")))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(subject_for(date))
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(|e| AppError::Email(e.to_string()))
}

#[async_trait::async_trait]
impl<T> Channel for EmailChannel<T>
where
    T: AsyncTransport + Send + Sync,
    T::Error: std::fmt::Display,
{
    fn name(&self) -> &str {
        "email"
    }

    async fn send(&self, text: &str) -> AppResult<()> {
        let message = build_message(&self.config, text, crate::report_now().date_naive())?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Email(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lettre::transport::stub::AsyncStubTransport;

    fn config() -> EmailConfig {
        EmailConfig {
            smtp_server: "smtp.example.com".to_string(),
            smtp_port: 587,
            sender: "moltbot@example.com".to_string(),
            password: "secret".to_string(),
            recipient: "ops@example.com".to_string(),
        }
    }

    #[test]
    fn test_subject_carries_date() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        assert_eq!(subject_for(date), "Pelangi Daily Report - 2026-10-17");
    }

    #[test]
    fn test_build_message_headers() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let message = build_message(&config(), "report body", date).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("From: moltbot@example.com"));
        assert!(raw.contains("To: ops@example.com"));
        assert!(raw.contains("Subject: Pelangi Daily Report - 2026-10-17"));
        assert!(raw.contains("Content-Type: text/plain"));
    }

    #[test]
    fn test_build_message_rejects_bad_address() {
        let mut bad = config();
        bad.recipient = "not an address".to_string();
        let date = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let err = build_message(&bad, "body", date).unwrap_err();
        assert!(matches!(err, AppError::Email(_)));
    }

    #[tokio::test]
    async fn test_new_builds_smtp_channel() {
        let channel = EmailChannel::new(&config()).unwrap();
        assert_eq!(channel.name(), "email");
    }

    #[tokio::test]
    async fn test_send_hands_message_to_transport() {
        let transport = AsyncStubTransport::new_ok();
        let channel = EmailChannel::with_transport(&config(), transport.clone());

        channel.send("🏨 PELANGI CAPSULE HOSTEL").await.unwrap();

        let messages = transport.messages().await;
        assert_eq!(messages.len(), 1);
        let (envelope, raw) = &messages[0];
        assert_eq!(
            envelope.from().map(ToString::to_string),
            Some("moltbot@example.com".to_string())
        );
        assert_eq!(
            envelope.to().iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec!["ops@example.com".to_string()]
        );
        let subject = subject_for(crate::report_now().date_naive());
        assert!(raw.contains(&format!("Subject: {subject}")));
    }

    #[tokio::test]
    async fn test_transport_failure_is_email_error() {
        let channel = EmailChannel::with_transport(&config(), AsyncStubTransport::new_error());
        let err = channel.send("report").await.unwrap_err();
        assert!(matches!(err, AppError::Email(_)));
    }

    #[tokio::test]
    async fn test_bad_address_never_reaches_transport() {
        let mut bad = config();
        bad.sender = "nobody".to_string();
        let transport = AsyncStubTransport::new_ok();
        let channel = EmailChannel::with_transport(&bad, transport.clone());

        assert!(channel.send("report").await.is_err());
        assert!(transport.messages().await.is_empty());
    }
}
