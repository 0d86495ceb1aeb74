//! confab-server - REST API server binary.

use std::net::SocketAddr;
use std::path::PathBuf;

use confab_core::config::{default_config_path, MultiChatConfig};
use confab_server::{create_server, create_server_with_auth, AppState};
use tokio::signal;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// `CONFAB_CONFIG`, then the default path, then the environment alone.
fn load_config() -> Result<MultiChatConfig, Box<dyn std::error::Error>> {
    let path = std::env::var("CONFAB_CONFIG")
        .map(PathBuf::from)
        .ok()
        .or_else(|| Some(default_config_path()).filter(|p| p.exists()));

    let config = match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            let mut config = MultiChatConfig::from_file(&path)?;
            config.apply_env()?;
            config.validate()?;
            config
        }
        None => MultiChatConfig::from_env()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive(Level::INFO.into())
                .add_directive("confab_server=debug".parse()?),
        )
        .init();

    // Get configuration from environment
    let host = std::env::var("CONFAB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("CONFAB_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .map_err(|e| format!("CONFAB_PORT must be a valid port number: {}", e))?;
    let require_auth = std::env::var("CONFAB_REQUIRE_AUTH").is_ok();

    let config = load_config()?;
    let mut state = AppState::from_config(&config).await?;
    info!(
        max_chats = config.chats.max_chats,
        soft_delete = config.chats.soft_delete,
        "Chat layer ready"
    );

    // Create server with or without auth
    let app = if require_auth {
        let key = std::env::var("CONFAB_API_KEY").unwrap_or_default();
        if key.is_empty() {
            warn!("CONFAB_REQUIRE_AUTH is set but CONFAB_API_KEY is empty, requests are not checked");
        }
        state = state.with_api_key(key);
        info!("Authentication enabled");
        create_server_with_auth(state)
    } else {
        info!("Authentication disabled");
        create_server(state)
    };

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting confab-server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            info!("Shutdown signal received");
        })
        .await?;

    info!("Server stopped cleanly");
    Ok(())
}
