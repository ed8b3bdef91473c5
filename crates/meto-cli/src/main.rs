use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use meto_cli::{Services, Settings};
use meto_config::AppConfig;
use meto_db::{DbClient, DbConnectionBuilder};
use meto_ingest::OpenMeteoClient;
use meto_sinks::{PdfSink, XlsxSink};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    // Observability
    meto_obs::init("metod");

    // Config
    let cfg = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        AppConfig::default()
    });

    // Store
    let opts = DbConnectionBuilder::new(cfg.database_url())
        .build()
        .context("Invalid database URL")?;
    let db = DbClient::with_options(opts, cfg.database_max_connections())
        .await
        .context("Failed to open database")?;
    db.init_schema()
        .await
        .context("Failed to initialize schema")?;
    tracing::info!(url = %cfg.database_url(), "Database ready");

    // Upstream
    let fetcher = OpenMeteoClient::new(
        &cfg.upstream_base_url(),
        Duration::from_secs(cfg.upstream_timeout_secs()),
    )?;

    let services = Services {
        store: Arc::new(db),
        fetcher: Arc::new(fetcher),
        table_sink: Arc::new(XlsxSink::new()),
        document_sink: Arc::new(PdfSink::new()),
    };
    let settings = Settings {
        window_hours: cfg.report_window_hours(),
        past_days: cfg.upstream_past_days(),
        timezone: cfg.upstream_timezone(),
    };

    let (app, state) = meto_cli::build_app(services, settings);

    // Start HTTP server
    let addr: SocketAddr = cfg
        .http_bind()
        .parse()
        .context("Invalid HTTP bind address")?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    // Mark ready just before serving
    meto_cli::set_ready(&state, true);

    tracing::info!(%addr, "HTTP server listening");
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
