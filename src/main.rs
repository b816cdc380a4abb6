use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use nextread_api::{
    config::Config,
    routes::{create_router, AppState},
    services::{
        catalog::HttpCatalogClient,
        engine::{EngineSettings, RecommendationEngine},
        enrich::HttpMetadataClient,
        llm::OpenAiCompletionClient,
        scoring::ScoringWeights,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let completion_client = OpenAiCompletionClient::new(
        config.llm_api_key.clone(),
        config.llm_api_url.clone(),
        config.llm_model.clone(),
        Duration::from_secs(config.llm_timeout_secs),
    );
    let catalog_client = HttpCatalogClient::new(
        config.catalog_api_url.clone(),
        Duration::from_secs(config.catalog_timeout_secs),
    );
    let metadata_client = HttpMetadataClient::new(
        config.metadata_api_url.clone(),
        Duration::from_secs(config.metadata_timeout_secs),
    );

    let engine = RecommendationEngine::new(
        Arc::new(completion_client),
        Arc::new(catalog_client),
        Arc::new(metadata_client),
        EngineSettings {
            max_retries: config.max_retries,
            cache_ttl: chrono::Duration::seconds(config.cache_ttl_secs as i64),
            enrichment_delay: Duration::from_millis(config.enrichment_delay_ms),
            scoring_weights: ScoringWeights::default(),
        },
    );

    let app = create_router(AppState::new(engine));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
