//! Service entry point

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use knowledge_orchestrator::api::{build_router, AppState};
use knowledge_orchestrator::config::Config;
use knowledge_orchestrator::orchestrator::RequestOrchestrator;
use knowledge_orchestrator::SERVICE_VERSION;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = Config::load()?;
    let bind_addr = config.server.bind_addr();
    let max_body_bytes = config.server.max_body_bytes;

    let orchestrator = Arc::new(RequestOrchestrator::new(config)?);
    let router = build_router(AppState { orchestrator }, max_body_bytes);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(version = SERVICE_VERSION, %bind_addr, "Knowledge orchestrator listening");
    axum::serve(listener, router).await?;

    Ok(())
}
