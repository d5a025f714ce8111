use tokio::signal;

use pelangi_daily_report::config::Config;
use pelangi_daily_report::delivery::Dispatcher;
use pelangi_daily_report::mcp::McpClient;
use pelangi_daily_report::pipeline::{HealthPolicy, run_once};
use pelangi_daily_report::scheduler::{self, DailySchedule};
use pelangi_daily_report::telemetry::init_telemetry;
use pelangi_daily_report::REPORT_TZ;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let telemetry_guard = init_telemetry(&config)?;

    tracing::info!(
        environment = %config.environment,
        mcp_url = %config.mcp_url,
        report_time = %config.report_time.format("%H:%M"),
        timezone = %REPORT_TZ,
        "Starting Moltbot daily report scheduler for PelangiManager"
    );

    let result = serve(&config).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "Fatal error, scheduler stopped");
    }

    tracing::info!("Moltbot scheduler stopped");
    telemetry_guard.shutdown();

    result
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    let client = McpClient::new(config)?;
    let dispatcher = Dispatcher::from_config(config)?;
    let policy = HealthPolicy::from(config);
    let schedule = DailySchedule::new(config.report_time, REPORT_TZ);

    tracing::info!(
        channels = ?dispatcher.channel_names(),
        backup_dir = %config.backup_dir.display(),
        "Delivery initialized"
    );

    let shutdown = shutdown_signal();

    let (client, dispatcher, policy) = (&client, &dispatcher, &policy);
    scheduler::run(
        &schedule,
        config.poll_interval,
        config.run_on_startup,
        chrono::Utc::now,
        shutdown,
        move || async move {
            run_once(client, dispatcher, policy).await;
        },
    )
    .await;

    Ok(())
}

/// Installs the SIGINT and SIGTERM handlers immediately; the returned future
/// resolves on the first of them.
#[cfg(unix)]
fn shutdown_signal() -> impl Future<Output = ()> {
    use signal::unix::{SignalKind, signal};

    let interrupt = signal(SignalKind::interrupt());
    let terminate = signal(SignalKind::terminate());

    async move {
        tokio::select! {
            _ = recv_signal(interrupt, "SIGINT") => {},
            _ = recv_signal(terminate, "SIGTERM") => {},
        }

        tracing::info!("Shutdown signal received");
    }
}

#[cfg(unix)]
async fn recv_signal(stream: std::io::Result<signal::unix::Signal>, name: &str) {
    match stream {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            tracing::error!(error = %e, signal = name, "Failed to install signal handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
fn shutdown_signal() -> impl Future<Output = ()> {
    async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }

        tracing::info!("Shutdown signal received");
    }
}
