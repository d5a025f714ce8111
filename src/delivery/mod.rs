pub mod backup;
pub mod dispatcher;
pub mod email;
pub mod telegram;
pub mod webhook;

pub use backup::BackupWriter;
pub use dispatcher::Dispatcher;
pub use email::EmailChannel;
pub use telegram::TelegramChannel;
pub use webhook::WebhookChannel;

use std::path::PathBuf;

use crate::error::AppResult;

/// A single remote delivery target. Channels are stateless between sends.
#[async_trait::async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, text: &str) -> AppResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub channel: String,
    pub delivered: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DeliverySummary {
    pub backup: Option<PathBuf>,
    pub outcomes: Vec<DeliveryOutcome>,
}

impl DeliverySummary {
    /// True when at least one remote channel accepted the report.
    pub fn delivered(&self) -> bool {
        self.outcomes.iter().any(|o| o.delivered)
    }
}
