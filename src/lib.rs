// Transcript Analyzer - LLM-backed summary and sentiment service
//
// - analysis: prompt construction, reply rescue, the analyzer itself
// - llm_engine: provider abstraction, OpenAI-compatible client, retry
// - storage: append-only CSV of results
// - http: axum routes and server

pub mod analysis;
pub mod config;
pub mod http;
pub mod llm_engine;
pub mod state;
pub mod storage;

use anyhow::{bail, Context};

use config::AnalyzerConfig;
use state::AppState;

pub fn init_logging() {
    // stderr, RUST_LOG overrides the default level
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

/// Load configuration from the environment and serve until shutdown.
pub async fn run() -> anyhow::Result<()> {
    init_logging();

    let config = AnalyzerConfig::from_env();
    if !config.has_api_key() {
        bail!(
            "{} is not set. Export it (or {}) before starting the server.",
            config::ENV_API_KEY,
            config::ENV_API_KEY_FALLBACK
        );
    }

    let state = AppState::from_config(&config).context("Failed to build LLM provider")?;

    log::info!("Transcript analyzer v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Model: {} via {}", config.model.model, config.api_url);
    log::info!("Results will be appended to {}", config.result_log_path.display());
    log::info!("Endpoints: POST /analyze, POST /analyze/batch, GET /health");

    http::serve(&config.bind_addr, state)
        .await
        .with_context(|| format!("Server on {} failed", config.bind_addr))
}
