use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use waystay::config::{Config, LoggingConfig};
use waystay::{AppState, build_router};

#[derive(Debug, Parser)]
#[command(name = "waystay", version, about = "WayStay AI travel backend")]
struct Args {
    /// Path to config.toml (defaults to ./conf/config.toml or ./config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Override server.host
    #[arg(long)]
    host: Option<String>,

    /// Override server.port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref(), std::io::stderr)?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let _guard = init_logging(&config.logging);
    tracing::info!(
        "Starting WayStay backend v{} (model {}, AI key present: {})",
        env!("CARGO_PKG_VERSION"),
        config.ai.model,
        config.ai.api_key.is_some()
    );
    if config.identity.api_key.is_none() {
        tracing::warn!("Identity provider API key not set; sign-in endpoints will answer 503");
    }

    let address = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::from_config(config)?);
    state.session_store.init();
    state.request_tracker.init();

    let app = build_router(Arc::clone(&state));
    let listener = TcpListener::bind(&address).await?;
    tracing::info!("Server listening on http://{}", address);
    tracing::info!("Swagger UI at http://{}/swagger-ui", address);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    state.request_tracker.dispose();
    state.session_store.dispose();
    tracing::info!("Server shut down");
    Ok(())
}

/// Load the config under a console-only subscriber, since the real one
/// depends on `[logging]` and is not installed yet.
fn load_config<W>(path: Option<&str>, make_writer: W) -> anyhow::Result<Config>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let bootstrap =
        tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).with_writer(make_writer).finish();
    tracing::subscriber::with_default(bootstrap, || Config::load(path))
}

/// Console logging, plus a daily-rolling file when `logging.file` is set.
/// `RUST_LOG` takes precedence over `logging.level`.
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let registry = tracing_subscriber::registry().with(filter).with(tracing_subscriber::fmt::layer());

    match logging.file.as_deref().map(std::path::Path::new) {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(std::path::Path::new("."));
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("waystay.log");
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, name));
            registry
                .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        },
        None => {
            registry.init();
            None
        },
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
