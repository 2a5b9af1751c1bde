use anyhow::Context;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod db;
mod jobs;
mod llm;
mod media;
mod pipeline;
mod retry;
mod services;

use config::{Config, JobStoreKind};
use jobs::JobStore;

fn open_store(config: &Config) -> anyhow::Result<Arc<dyn JobStore>> {
    match config.job_store {
        JobStoreKind::Memory => Ok(Arc::new(jobs::MemoryJobStore::new())),
        JobStoreKind::Sqlite => {
            if let Some(parent) = config.db_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let db = db::Database::new(&config.db_path)?;
            info!("Job database initialized at {:?}", config.db_path);
            Ok(Arc::new(db))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    std::fs::create_dir_all(&config.output_dir)?;
    let store = open_store(&config)?;

    let collaborators = services::Collaborators::from_config(&config)?;
    let scripts = collaborators.scripts.clone();
    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()?;
    let composer = Arc::new(pipeline::Composer::new(
        collaborators,
        http,
        pipeline::PipelineSettings::from_config(&config),
    ));
    let processor = Arc::new(jobs::processor::JobProcessor::new(store.clone(), composer));

    let bind_addr = config.bind_addr;
    let state = api::AppState {
        config: Arc::new(config),
        store,
        processor,
        scripts,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_credentials(false);

    let app = Router::new()
        .route("/health", get(api::health))
        .merge(api::router(state))
        .layer(cors);

    info!("Starting shortgen server on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
