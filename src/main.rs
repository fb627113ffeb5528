mod api;
mod config;
mod dispatcher;
mod error;
mod export;
mod merge;
mod normalize;
mod pipeline;
mod providers;
mod signer;
mod types;

use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::error::Result;
use crate::pipeline::KeywordPipeline;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // Credentials are checked per request; report what is missing up front.
    if let Err(e) = cfg.naver_credentials() {
        warn!("Naver search ad lookups unavailable: {e}");
    }
    if let Err(e) = cfg.google_credentials() {
        warn!("Google Ads lookups unavailable: {e}");
    }
    info!(
        "Lookup limit {} keywords, HTTP timeout {}s",
        cfg.lookup_limit, cfg.http_timeout_secs
    );

    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let pipeline = KeywordPipeline::new(Arc::new(cfg))?;
    let app = router(ApiState { pipeline });

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
