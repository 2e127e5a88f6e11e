//! Omnirelay server binary.
//!
//! Starts an axum HTTP server that relays agent and call operations to the
//! OmniDimension platform, with structured logging and graceful shutdown on
//! SIGTERM/SIGINT.

use omnirelay_platform::OmniClient;
use omnirelay_server::{app, config, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

const CONFIG_PATH_ENV: &str = "OMNIRELAY_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Where the config file path came from, reported once at startup.
#[derive(Debug, Clone, Copy)]
enum PathSource {
    Argument,
    Environment,
    Default,
}

/// First non-blank of: the first CLI argument, `OMNIRELAY_CONFIG_PATH`,
/// then `config.toml`.
fn config_path() -> (String, PathSource) {
    let non_blank = |value: String| (!value.trim().is_empty()).then_some(value);

    std::env::args()
        .nth(1)
        .and_then(non_blank)
        .map(|path| (path, PathSource::Argument))
        .or_else(|| {
            std::env::var(CONFIG_PATH_ENV)
                .ok()
                .and_then(non_blank)
                .map(|path| (path, PathSource::Environment))
        })
        .unwrap_or_else(|| (DEFAULT_CONFIG_PATH.to_string(), PathSource::Default))
}

#[tokio::main]
async fn main() {
    let (config_path, path_source) = config_path();

    // Load configuration
    let config = config::load_config(Some(config_path.as_str()))
        .expect("failed to load configuration (is OMNIDIM_API_KEY set?)");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = ?path_source,
        path = %config_path,
        platform = ?config.platform,
        "resolved startup configuration"
    );

    // The platform client is the only shared resource; build it once.
    let client = OmniClient::new(&config.platform)
        .expect("failed to construct platform client, check [platform] settings");

    let state = AppState::from_config(Arc::new(client), &config);
    let app = app(state);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, service = %config.server.service_name, "starting omnirelay server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address, is another process using this port?");

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("omnirelay server shut down");
}

/// Resolves once the process is asked to stop.
///
/// A signal listener that cannot be installed is logged and then never fires,
/// so the other one still ends the server.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let received = tokio::select! {
        () = interrupt => "SIGINT",
        () = terminate => "SIGTERM",
    };
    tracing::info!(signal = received, "draining connections before shutdown");
}
