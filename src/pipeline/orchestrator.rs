use std::time::{Duration, Instant};

use opentelemetry::KeyValue;

use crate::config::Config;
use crate::delivery::{DeliverySummary, Dispatcher};
use crate::mcp::ToolSource;
use crate::telemetry::metrics::{
    REPORT_GENERATION_DURATION, REPORT_RUNS, REPORT_SECTIONS_UNAVAILABLE,
};

use super::format::Report;
use super::retrieve;

#[derive(Debug, Clone, Copy)]
pub struct HealthPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl From<&Config> for HealthPolicy {
    fn from(config: &Config) -> Self {
        Self {
            max_attempts: config.health_max_attempts,
            retry_delay: config.health_retry_delay,
        }
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    /// Health check never passed; an alert was attempted instead.
    ServerUnavailable,
    Completed {
        report: Report,
        delivery: DeliverySummary,
    },
}

impl RunOutcome {
    fn label(&self) -> &'static str {
        match self {
            RunOutcome::ServerUnavailable => "server_unavailable",
            RunOutcome::Completed { delivery, .. } if delivery.delivered() => "delivered",
            RunOutcome::Completed { .. } => "saved_only",
        }
    }
}

/// Polls the health endpoint until it answers or the attempts run out.
pub async fn wait_for_server(source: &dyn ToolSource, policy: &HealthPolicy) -> bool {
    for attempt in 1..=policy.max_attempts {
        if source.health_check().await {
            tracing::info!(attempt, "MCP server is healthy");
            return true;
        }

        tracing::warn!(
            attempt,
            max_attempts = policy.max_attempts,
            "MCP server health check failed"
        );

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.retry_delay).await;
        }
    }

    tracing::error!(
        attempts = policy.max_attempts,
        "MCP server unavailable after all attempts"
    );
    false
}

pub fn alert_message(at: chrono::DateTime<chrono_tz::Tz>) -> String {
    format!(
        "🚨 MOLTBOT ALERT\n\
         Failed to connect to PelangiManager MCP server.\n\
         Please check if the server is running.\n\
         Time: {}",
        at.format("%Y-%m-%d %H:%M:%S")
    )
}

/// One full run: health check, then either an alert or report generation
/// followed by delivery. Never fails; every problem ends up in the logs.
#[tracing::instrument(
    name = "pipeline report",
    skip_all,
    fields(
        report.outcome,
        report.duration_ms,
    )
)]
pub async fn run_once(
    source: &dyn ToolSource,
    dispatcher: &Dispatcher,
    policy: &HealthPolicy,
) -> RunOutcome {
    let start = Instant::now();
    tracing::info!(
        started_at = %crate::report_now().format("%Y-%m-%d %H:%M:%S"),
        "Report generation started"
    );

    let outcome = if wait_for_server(source, policy).await {
        let snapshot = retrieve::retrieve(source).await;
        let report = Report::assemble(&snapshot, crate::report_now());

        REPORT_GENERATION_DURATION.record(start.elapsed().as_secs_f64(), &[]);
        REPORT_SECTIONS_UNAVAILABLE.add(report.unavailable_sections() as u64, &[]);

        let text = report.to_string();
        tracing::info!("Generated report:\n{text}");

        let delivery = dispatcher.deliver(&text).await;
        RunOutcome::Completed { report, delivery }
    } else {
        let alert = alert_message(crate::report_now());
        dispatcher.send_alert(&alert).await;
        RunOutcome::ServerUnavailable
    };

    let span = tracing::Span::current();
    span.record("report.outcome", outcome.label());
    span.record("report.duration_ms", start.elapsed().as_millis() as u64);
    REPORT_RUNS.add(1, &[KeyValue::new("report.outcome", outcome.label())]);

    tracing::info!(outcome = outcome.label(), "Report generation completed");
    outcome
}
