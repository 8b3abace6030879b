mod browser;
mod config;
mod error;
mod files;
mod pipeline;
mod request;
mod routes;
mod runs;
mod server;
mod state;

use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use config::{AgentConfig, CliArgs};
use state::AgentState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "lms_report_agent=info,tower_http=info".into());
    // The non-blocking writer guard must live for the whole process.
    let _log_guard = match &args.log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let file_name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "lms-report-agent.log".into());
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    };

    info!("Starting lms-report-agent v{}", env!("CARGO_PKG_VERSION"));

    let config = AgentConfig::from_args(args);
    std::fs::create_dir_all(&config.downloads_dir)?;
    info!("Downloads dir: {:?}", config.downloads_dir);
    info!("WebDriver endpoint: {}", config.webdriver_url);

    let port = config.port;
    let state = Arc::new(AgentState::new(config));

    let router = server::build_router(state.clone());
    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{port}")).await?;
    info!("Agent listening on http://127.0.0.1:{port}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Agent shutting down");

    // Stray browser sessions die with the server.
    let cancelled = state.runs.cancel_all().await;
    if cancelled > 0 {
        info!("Cancelled {cancelled} in-flight run(s) on shutdown");
    }

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Received shutdown signal");
}
