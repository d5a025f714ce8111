use std::time::Duration;

use serde::Serialize;

use super::Channel;
use crate::config::TelegramConfig;
use crate::error::{AppError, AppResult};

pub struct TelegramChannel {
    http: reqwest::Client,
    api_url: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramChannel {
    pub fn new(api_url: &str, config: &TelegramConfig) -> AppResult<Self> {
        Ok(Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()?,
            api_url: api_url.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_url, self.bot_token)
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

#[async_trait::async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, text: &str) -> AppResult<()> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "Markdown",
        };

        // The endpoint embeds the bot token, keep it out of error messages.
        self.http
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::Http(e.without_url()))?;

        Ok(())
    }
}
