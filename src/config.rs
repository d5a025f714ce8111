use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveTime;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub sender: String,
    pub password: String,
    pub recipient: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub mcp_url: String,
    pub mcp_health_url: String,
    pub mcp_timeout: Duration,
    pub health_timeout: Duration,
    pub health_max_attempts: u32,
    pub health_retry_delay: Duration,
    pub report_time: NaiveTime,
    pub poll_interval: Duration,
    pub run_on_startup: bool,
    pub backup_dir: PathBuf,
    pub telegram: Option<TelegramConfig>,
    pub telegram_api_url: String,
    pub whatsapp_api_url: Option<String>,
    pub email: Option<EmailConfig>,
    pub otel_service_name: String,
    pub otel_exporter_endpoint: Option<String>,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Empty values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mcp_url = get("MCP_URL").unwrap_or_else(|| "http://localhost:3001/mcp".to_string());
        let mcp_health_url = get("MCP_HEALTH_URL").unwrap_or_else(|| health_url_for(&mcp_url));

        let telegram = match (get("TELEGRAM_BOT_TOKEN"), get("TELEGRAM_CHAT_ID")) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramConfig { bot_token, chat_id }),
            _ => None,
        };

        let email = match (
            get("SMTP_SERVER"),
            get("EMAIL_SENDER"),
            get("EMAIL_RECIPIENT"),
        ) {
            (Some(smtp_server), Some(sender), Some(recipient)) => Some(EmailConfig {
                smtp_server,
                smtp_port: parse_or("SMTP_PORT", get("SMTP_PORT"), 587)?,
                sender,
                password: get("EMAIL_PASSWORD").unwrap_or_default(),
                recipient,
            }),
            _ => None,
        };

        let report_time = match get("REPORT_TIME") {
            Some(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|e| {
                AppError::Config(format!("REPORT_TIME must be HH:MM, got {raw:?}: {e}"))
            })?,
            None => NaiveTime::from_hms_opt(9, 0, 0)
                .ok_or_else(|| AppError::Config("invalid default report time".into()))?,
        };

        let health_max_attempts: u32 =
            parse_or("HEALTH_MAX_ATTEMPTS", get("HEALTH_MAX_ATTEMPTS"), 3)?;
        if health_max_attempts == 0 {
            return Err(AppError::Config(
                "HEALTH_MAX_ATTEMPTS must be at least 1".into(),
            ));
        }

        Ok(Self {
            environment: get("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            mcp_url,
            mcp_health_url,
            mcp_timeout: Duration::from_secs(parse_or(
                "MCP_TIMEOUT_SECS",
                get("MCP_TIMEOUT_SECS"),
                30,
            )?),
            health_timeout: Duration::from_secs(parse_or(
                "HEALTH_TIMEOUT_SECS",
                get("HEALTH_TIMEOUT_SECS"),
                5,
            )?),
            health_max_attempts,
            health_retry_delay: Duration::from_secs(parse_or(
                "HEALTH_RETRY_DELAY_SECS",
                get("HEALTH_RETRY_DELAY_SECS"),
                5,
            )?),
            report_time,
            poll_interval: Duration::from_secs(parse_or(
                "POLL_INTERVAL_SECS",
                get("POLL_INTERVAL_SECS"),
                60,
            )?),
            run_on_startup: parse_or("RUN_ON_STARTUP", get("RUN_ON_STARTUP"), false)?,
            backup_dir: get("BACKUP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            telegram,
            telegram_api_url: get("TELEGRAM_API_URL")
                .unwrap_or_else(|| "https://api.telegram.org".to_string()),
            whatsapp_api_url: get("WHATSAPP_API_URL"),
            email,
            otel_service_name: get("OTEL_SERVICE_NAME")
                .unwrap_or_else(|| "pelangi-daily-report".to_string()),
            otel_exporter_endpoint: get("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Health endpoint sitting next to the MCP endpoint on the same host.
pub fn health_url_for(mcp_url: &str) -> String {
    let trimmed = mcp_url.trim_end_matches('/');
    if let Some(base) = trimmed.strip_suffix("/mcp") {
        format!("{base}/health")
    } else if trimmed.contains("/mcp") {
        trimmed.replacen("/mcp", "/health", 1)
    } else {
        format!("{trimmed}/health")
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} must be a valid value, got {raw:?}: {e}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppResult<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.mcp_url, "http://localhost:3001/mcp");
        assert_eq!(config.mcp_health_url, "http://localhost:3001/health");
        assert_eq!(config.mcp_timeout, Duration::from_secs(30));
        assert_eq!(config.health_timeout, Duration::from_secs(5));
        assert_eq!(config.health_max_attempts, 3);
        assert_eq!(config.health_retry_delay, Duration::from_secs(5));
        assert_eq!(config.report_time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert!(!config.run_on_startup);
        assert!(config.telegram.is_none());
        assert!(config.whatsapp_api_url.is_none());
        assert!(config.email.is_none());
        assert!(config.otel_exporter_endpoint.is_none());
        assert!(!config.is_production());
    }

    #[test]
    fn test_empty_values_count_as_unset() {
        let config = config_from(&[
            ("TELEGRAM_BOT_TOKEN", ""),
            ("TELEGRAM_CHAT_ID", "12345"),
            ("WHATSAPP_API_URL", "  "),
        ])
        .unwrap();
        assert!(config.telegram.is_none());
        assert!(config.whatsapp_api_url.is_none());
    }

    #[test]
    fn test_channels_configured() {
        let config = config_from(&[
            ("TELEGRAM_BOT_TOKEN", "token"),
            ("TELEGRAM_CHAT_ID", "42"),
            ("WHATSAPP_API_URL", "http://wa.local/send"),
            ("SMTP_SERVER", "smtp.example.com"),
            ("EMAIL_SENDER", "bot@example.com"),
            ("EMAIL_PASSWORD", "secret"),
            ("EMAIL_RECIPIENT", "ops@example.com"),
        ])
        .unwrap();

        let telegram = config.telegram.unwrap();
        assert_eq!(telegram.bot_token, "token");
        assert_eq!(telegram.chat_id, "42");
        assert_eq!(config.whatsapp_api_url.as_deref(), Some("http://wa.local/send"));

        let email = config.email.unwrap();
        assert_eq!(email.smtp_port, 587);
        assert_eq!(email.password, "secret");
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let err = config_from(&[("MCP_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));

        let err = config_from(&[("REPORT_TIME", "9am")]).unwrap_err();
        assert!(err.to_string().contains("REPORT_TIME"));

        let err = config_from(&[("HEALTH_MAX_ATTEMPTS", "0")]).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_report_time_parsed() {
        let config = config_from(&[("REPORT_TIME", "21:30"), ("RUN_ON_STARTUP", "true")]).unwrap();
        assert_eq!(config.report_time, NaiveTime::from_hms_opt(21, 30, 0).unwrap());
        assert!(config.run_on_startup);
    }

    #[test]
    fn test_health_url_for() {
        assert_eq!(
            health_url_for("http://localhost:3001/mcp"),
            "http://localhost:3001/health"
        );
        assert_eq!(
            health_url_for("http://localhost:3001/mcp/"),
            "http://localhost:3001/health"
        );
        assert_eq!(
            health_url_for("http://host/api/mcp/v1"),
            "http://host/api/health/v1"
        );
        assert_eq!(health_url_for("http://host:9000"), "http://host:9000/health");
    }
}
