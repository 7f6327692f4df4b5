use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use news_aggregator::ai::AiSearcher;
use news_aggregator::config::Config;
use news_aggregator::fetcher::Fetcher;
use news_aggregator::registry::CategoryRegistry;
use news_aggregator::routes::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "news_aggregator=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::var("NEWS_CONFIG").unwrap_or_else(|_| "feeds.toml".to_string());
    let config = Config::load_or_default(&config_path)?;
    let registry = Arc::new(CategoryRegistry::from_config(&config)?);
    info!(
        "Loaded {} categories (default '{}')",
        config.categories.len(),
        config.default_category
    );

    // AI backend is optional
    let api_key = std::env::var("GEMINI_API_KEY").ok();
    let searcher = Arc::new(AiSearcher::from_config(api_key, &config.gemini)?);
    if searcher.is_available() {
        info!("Gemini API configured");
    } else {
        warn!("GEMINI_API_KEY not set, AI search disabled");
    }

    let fetcher = Arc::new(Fetcher::new(
        registry,
        Duration::from_secs(config.fetch_timeout_secs),
    )?);

    let state = Arc::new(AppState::new(fetcher, searcher));
    let app = routes::router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Server starting on http://{}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
