//! MailGate - mail-proxy auth responder entry point

use anyhow::Result;
use mailgate_common::Config;
use mailgate_core::{AuthEngine, MemoryDirectory};
use mailgate_http::AppState;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting MailGate auth responder...");

    // Load configuration and the optional static user directory. A failed
    // load does not abort: the responder keeps serving and answers 5xx so
    // the proxy sees a retryable error instead of a refused connection.
    let state = match load_state() {
        Ok((config, directory)) => {
            info!(
                local_domains = config.local_domains.len(),
                bind = %config.bind,
                "Configuration loaded"
            );
            if !config.enabled {
                warn!("Responder is disabled; every auth query will be answered with 403");
            }
            AppState::new(Some(config), AuthEngine::new(Arc::new(directory)))
        }
        Err(e) => {
            error!(
                "Startup configuration failed: {}. Serving 5xx until restarted with valid configuration.",
                e
            );
            AppState::new(None, AuthEngine::new(Arc::new(MemoryDirectory::new())))
        }
    };

    let bind = state
        .config
        .as_ref()
        .map(|config| config.bind.clone())
        .unwrap_or_else(|| "0.0.0.0:8080".to_string());

    let app = mailgate_http::create_router(Arc::new(state));
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("Auth responder listening on {}", bind);

    // Start HTTP server
    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    info!("MailGate started successfully");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    server_handle.abort();

    info!("MailGate shutdown complete");

    Ok(())
}

fn load_state() -> mailgate_common::Result<(Config, MemoryDirectory)> {
    let config = Config::load()?;
    let directory = match &config.users_file {
        Some(path) => MemoryDirectory::from_file(path)?,
        None => MemoryDirectory::new(),
    };
    Ok((config, directory))
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mailgate_core=debug,mailgate_http=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_level(true))
        .with(filter)
        .init();
}
