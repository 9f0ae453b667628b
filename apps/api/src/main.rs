use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use smarthire_api::config::Config;
use smarthire_api::corpus::ResumeStore;
use smarthire_api::llm_client::LlmClient;
use smarthire_api::retrieval::embedding::OpenAiEmbedder;
use smarthire_api::retrieval::index::FileVectorIndex;
use smarthire_api::routes::build_router;
use smarthire_api::state::AppState;
use smarthire_api::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    telemetry::init(&config.rust_log);
    info!("Starting SmartHire API v{}", env!("CARGO_PKG_VERSION"));

    let llm = LlmClient::new(config.providers.clone()).context("building LLM client")?;
    let chain: Vec<&str> = llm.providers().iter().map(|p| p.name.as_str()).collect();
    info!(providers = ?chain, "LLM client initialized");

    let embedder = OpenAiEmbedder::new(
        config.embedding_url.clone(),
        config.embedding_model.clone(),
        config.embedding_api_key.clone(),
    )
    .context("building embedding client")?;
    let index = FileVectorIndex::new(config.index_path.clone(), Arc::new(embedder));
    if !index.exists() {
        warn!(
            path = %index.path().display(),
            "vector index not built yet; search falls back to keyword matches"
        );
    }

    let store = ResumeStore::new(config.structured_dir.clone());
    info!(dir = %store.dir().display(), records = store.count(), "resume store ready");

    let state = AppState {
        config: config.clone(),
        store,
        llm,
        index: Arc::new(index),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
