use std::time::Duration;

use serde_json::json;

use super::Channel;
use crate::error::{AppError, AppResult};

/// Generic messaging API (a WhatsApp gateway in practice) that accepts
/// `{"message": "..."}`.
pub struct WebhookChannel {
    http: reqwest::Client,
    url: String,
}

impl WebhookChannel {
    pub fn new(url: &str) -> AppResult<Self> {
        Ok(Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()?,
            url: url.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl Channel for WebhookChannel {
    fn name(&self) -> &str {
        "whatsapp"
    }

    async fn send(&self, text: &str) -> AppResult<()> {
        // Gateway URLs often carry an API key in the query string.
        self.http
            .post(&self.url)
            .json(&json!({ "message": text }))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::Http(e.without_url()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_posts_message_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .and(body_json(json!({"message": "daily report"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let channel = WebhookChannel::new(&format!("{}/send", server.uri())).unwrap();
        channel.send("daily report").await.unwrap();
        assert_eq!(channel.name(), "whatsapp");
    }

    #[tokio::test]
    async fn test_error_does_not_leak_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .and(query_param("apikey", "s3cr3t-key"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let channel =
            WebhookChannel::new(&format!("{}/send?apikey=s3cr3t-key", server.uri())).unwrap();
        let err = channel.send("daily report").await.unwrap_err();

        assert!(matches!(err, AppError::Http(_)));
        assert!(err.to_string().contains("500"));
        assert!(!err.to_string().contains("s3cr3t-key"));
    }

    #[tokio::test]
    async fn test_unreachable_gateway_does_not_leak_api_key() {
        let channel = WebhookChannel::new("http://127.0.0.1:1/send?apikey=s3cr3t-key").unwrap();
        let err = channel.send("daily report").await.unwrap_err();
        assert!(!err.to_string().contains("s3cr3t-key"));
    }
}
