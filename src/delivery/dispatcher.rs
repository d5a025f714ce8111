use opentelemetry::KeyValue;
use tracing::Instrument;

use super::{
    BackupWriter, Channel, DeliveryOutcome, DeliverySummary, EmailChannel, TelegramChannel,
    WebhookChannel,
};
use crate::config::Config;
use crate::error::AppResult;
use crate::telemetry::metrics::DELIVERY_ATTEMPTS;

pub struct Dispatcher {
    backup: BackupWriter,
    channels: Vec<Box<dyn Channel>>,
}

impl Dispatcher {
    pub fn new(backup: BackupWriter, channels: Vec<Box<dyn Channel>>) -> Self {
        Self { backup, channels }
    }

    /// Builds every channel that has credentials; the rest are skipped with
    /// a notice.
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let mut channels: Vec<Box<dyn Channel>> = Vec::new();

        match &config.telegram {
            Some(telegram) => channels.push(Box::new(TelegramChannel::new(
                &config.telegram_api_url,
                telegram,
            )?)),
            None => tracing::info!("Telegram credentials not configured, skipping channel"),
        }

        match &config.whatsapp_api_url {
            Some(url) => channels.push(Box::new(WebhookChannel::new(url)?)),
            None => tracing::info!("WhatsApp API not configured, skipping channel"),
        }

        match &config.email {
            Some(email) => channels.push(Box::new(EmailChannel::new(email)?)),
            None => tracing::info!("Email delivery not configured, skipping channel"),
        }

        Ok(Self::new(BackupWriter::new(&config.backup_dir), channels))
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Writes the backup, then offers the report to every channel in turn.
    #[tracing::instrument(
        name = "delivery dispatch",
        skip(self, report),
        fields(delivery.channels = self.channels.len(), delivery.succeeded)
    )]
    pub async fn deliver(&self, report: &str) -> DeliverySummary {
        let backup = match self.backup.save(report, None).await {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::error!(error = %e, "Failed to save report backup");
                None
            }
        };

        let mut outcomes = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            outcomes.push(send_through(channel.as_ref(), report).await);
        }

        let summary = DeliverySummary { backup, outcomes };
        let succeeded = summary.outcomes.iter().filter(|o| o.delivered).count();
        tracing::Span::current().record("delivery.succeeded", succeeded);

        if !summary.delivered() {
            tracing::warn!("No delivery channel succeeded, report saved to file only");
        }

        summary
    }

    /// Sends `text` through the first configured channel only. Failures are
    /// logged and swallowed.
    pub async fn send_alert(&self, text: &str) -> Option<DeliveryOutcome> {
        let Some(channel) = self.channels.first() else {
            tracing::warn!("No channel configured for alerts, alert not sent");
            return None;
        };
        Some(send_through(channel.as_ref(), text).await)
    }
}

async fn send_through(channel: &dyn Channel, text: &str) -> DeliveryOutcome {
    let span = tracing::info_span!(
        "delivery.send",
        delivery.channel = %channel.name(),
        otel.status_code = tracing::field::Empty,
    );

    let result = channel.send(text).instrument(span.clone()).await;

    let status = if result.is_ok() { "ok" } else { "error" };
    DELIVERY_ATTEMPTS.add(
        1,
        &[
            KeyValue::new("delivery.channel", channel.name().to_string()),
            KeyValue::new("delivery.status", status),
        ],
    );

    match result {
        Ok(()) => {
            span.record("otel.status_code", "OK");
            tracing::info!(channel = %channel.name(), "Report sent");
            DeliveryOutcome {
                channel: channel.name().to_string(),
                delivered: true,
                error: None,
            }
        }
        Err(e) => {
            span.record("otel.status_code", "ERROR");
            tracing::error!(channel = %channel.name(), error = %e, "Delivery failed");
            DeliveryOutcome {
                channel: channel.name().to_string(),
                delivered: false,
                error: Some(e.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubChannel {
        name: &'static str,
        fail: bool,
        sends: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl Channel for StubChannel {
        fn name(&self) -> &str {
            self.name
        }

        async fn send(&self, _text: &str) -> AppResult<()> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(AppError::Delivery(format!("{} is down", self.name)))
            } else {
                Ok(())
            }
        }
    }

    fn stub(name: &'static str, fail: bool) -> (Box<dyn Channel>, Arc<AtomicUsize>) {
        let sends = Arc::new(AtomicUsize::new(0));
        let channel = StubChannel {
            name,
            fail,
            sends: sends.clone(),
        };
        (Box::new(channel), sends)
    }

    #[tokio::test]
    async fn test_every_channel_tried_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (first, first_sends) = stub("telegram", true);
        let (second, second_sends) = stub("whatsapp", false);
        let dispatcher = Dispatcher::new(BackupWriter::new(dir.path()), vec![first, second]);

        let summary = dispatcher.deliver("report").await;

        assert_eq!(first_sends.load(Ordering::SeqCst), 1);
        assert_eq!(second_sends.load(Ordering::SeqCst), 1);
        assert!(summary.delivered());
        assert_eq!(summary.outcomes.len(), 2);
        assert!(!summary.outcomes[0].delivered);
        assert_eq!(
            summary.outcomes[0].error.as_deref(),
            Some("Delivery error: telegram is down")
        );
        assert!(summary.backup.is_some());
    }

    #[tokio::test]
    async fn test_all_failed_is_not_delivered() {
        let dir = tempfile::tempdir().unwrap();
        let (only, _) = stub("email", true);
        let dispatcher = Dispatcher::new(BackupWriter::new(dir.path()), vec![only]);

        let summary = dispatcher.deliver("report").await;

        assert!(!summary.delivered());
        assert!(summary.backup.is_some());
    }

    #[tokio::test]
    async fn test_backup_failure_does_not_block_channels() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file in the way").unwrap();

        let (only, sends) = stub("telegram", false);
        let dispatcher = Dispatcher::new(BackupWriter::new(blocker.join("sub")), vec![only]);

        let summary = dispatcher.deliver("report").await;

        assert!(summary.backup.is_none());
        assert_eq!(sends.load(Ordering::SeqCst), 1);
        assert!(summary.delivered());
    }

    #[tokio::test]
    async fn test_alert_uses_first_channel_only() {
        let dir = tempfile::tempdir().unwrap();
        let (first, first_sends) = stub("telegram", true);
        let (second, second_sends) = stub("whatsapp", false);
        let dispatcher = Dispatcher::new(BackupWriter::new(dir.path()), vec![first, second]);

        let outcome = dispatcher.send_alert("alert").await.unwrap();

        assert!(!outcome.delivered);
        assert_eq!(first_sends.load(Ordering::SeqCst), 1);
        assert_eq!(second_sends.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_alert_without_channels() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = Dispatcher::new(BackupWriter::new(dir.path()), Vec::new());
        assert!(dispatcher.send_alert("alert").await.is_none());
    }

    #[test]
    fn test_from_config_skips_unconfigured() {
        let config = Config::from_lookup(|key| match key {
            "WHATSAPP_API_URL" => Some("http://wa.local/send".to_string()),
            "TELEGRAM_BOT_TOKEN" => Some("token".to_string()),
            "TELEGRAM_CHAT_ID" => Some("42".to_string()),
            _ => None,
        })
        .unwrap();

        let dispatcher = Dispatcher::from_config(&config).unwrap();
        assert_eq!(dispatcher.channel_names(), vec!["telegram", "whatsapp"]);
    }
}
