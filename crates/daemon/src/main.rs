use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use archive_validator_daemon::{
    api,
    archive::ArchiveStore,
    backend::HttpBackend,
    config::ServiceConfig,
    service::ProtocolAdapter,
};
use clap::Parser;
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(
    name = "archive-validator-daemon",
    version,
    about = "Test-bed bridge to the archive validation backend"
)]
struct Cli {
    /// Optional TOML configuration file. Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where the HTTP API will listen, e.g. 127.0.0.1:8080
    #[arg(long)]
    listen: Option<String>,

    /// Backend upload endpoint.
    #[arg(long)]
    backend_endpoint: Option<String>,

    /// Rewrite http:// report URLs to https:// before fetching.
    #[arg(long, default_value_t = false)]
    force_https: bool,

    /// Timeout in seconds for each backend request.
    #[arg(long)]
    backend_timeout_seconds: Option<u64>,

    /// Directory for temporary archive copies.
    #[arg(long)]
    tmp_dir: Option<PathBuf>,

    /// Service id reported by the module definition.
    #[arg(long)]
    service_id: Option<String>,

    /// Service version reported by the module definition.
    #[arg(long)]
    service_version: Option<String>,

    /// Max request body size in bytes.
    #[arg(long)]
    max_request_bytes: Option<usize>,

    /// Log level (env-filter syntax). RUST_LOG takes precedence.
    #[arg(long, default_value = "info")]
    log: String,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<ServiceConfig> {
        let mut cfg = match &self.config {
            Some(path) => ServiceConfig::load_from(path)?,
            None => ServiceConfig::default(),
        };
        if let Some(v) = self.listen {
            cfg.listen = v;
        }
        if let Some(v) = self.backend_endpoint {
            cfg.backend_endpoint = v;
        }
        if self.force_https {
            cfg.force_https = true;
        }
        if let Some(v) = self.backend_timeout_seconds {
            cfg.backend_timeout_seconds = v;
        }
        if let Some(v) = self.tmp_dir {
            cfg.tmp_dir = v;
        }
        if let Some(v) = self.service_id {
            cfg.service_id = v;
        }
        if let Some(v) = self.service_version {
            cfg.service_version = v;
        }
        if let Some(v) = self.max_request_bytes {
            cfg.max_request_bytes = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = cli.into_config()?;
    info!("starting daemon with config: {:?}", config);

    let archives = ArchiveStore::new(config.tmp_dir.clone());
    let purged = archives.purge().await;
    if purged > 0 {
        info!(purged, tmp_dir = %config.tmp_dir.display(), "removed leftover archives");
    }

    let backend = HttpBackend::new(&config).context("build backend client")?;
    let adapter = Arc::new(ProtocolAdapter::new(
        Arc::new(backend),
        archives,
        &config.service_id,
        &config.service_version,
    ));

    let app = api::router(adapter, config.max_request_bytes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = config
        .listen
        .parse()
        .with_context(|| format!("invalid listen address '{}'", config.listen))?;
    info!("listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    info!("shutdown requested");
}
