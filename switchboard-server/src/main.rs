//! switchboard: HTTP gateway over a priority-ordered pool of LLM providers.

use std::sync::Arc;

use switchboard_pool::ProviderPool;
use switchboard_server::config::ServerConfig;
use switchboard_server::routes::{self, AppState};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::load()?;
    let pool = ProviderPool::new()?;
    for provider in config.providers {
        pool.add_provider(provider);
    }

    let state = AppState {
        pool: Arc::new(pool),
    };
    let app = routes::router(state);

    let listener = TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "switchboard listening");
    axum::serve(listener, app).await?;
    Ok(())
}
