use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use traders_den::{config::Config, routes, state::AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("traders_den=info,tower_http=info")),
        )
        .init();

    info!("==================================================");
    info!("  THE TRADER'S DEN");
    info!("==================================================");

    let config = Config::from_env()?;
    info!("Reddit API: {}", config.reddit_api_url);
    info!("Yahoo Finance: {}", config.yahoo_base_url);
    info!("Credentials file: {}", config.credentials_path.display());
    info!(
        "Mention scan: top {} hot post(s) of r/{}",
        config.mention_post_limit, config.mention_subreddit
    );

    let state: Arc<AppState> = AppState::from_config(&config);
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    info!("Server running on port {}", config.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await
        }
    }
}
