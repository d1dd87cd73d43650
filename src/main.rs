//! Tycho server binary.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use tycho::api::{self, AppState};
use tycho::auth::SessionManager;
use tycho::config::GatewayConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tycho=info".into()),
        )
        .init();

    let config = GatewayConfig::from_env()?;
    info!("tycho v{}", env!("CARGO_PKG_VERSION"));

    let store = config.build_token_store();
    info!(
        backend = %config.storage_backend,
        key = %config.storage_key,
        "token store ready"
    );

    let sessions = SessionManager::new(config.oauth.clone(), store);
    let state = Arc::new(AppState {
        config: config.clone(),
        sessions,
    });

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
