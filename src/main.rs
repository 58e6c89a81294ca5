use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use lotto_board::api::routes::{router, ApiState};
use lotto_board::config::Config;
use lotto_board::error::Result;
use lotto_board::refresh::LatestRefresher;
use lotto_board::source::{HttpDrawSource, LatencyStats};

#[tokio::main]
async fn main() {
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
    // --- Draw source ---
    let latency = Arc::new(LatencyStats::new());
    let source = Arc::new(HttpDrawSource::new(&cfg, Arc::clone(&latency))?);
    info!(
        "Draw source: {} (timeout {}s, latest-round TTL {}s)",
        cfg.draw_api_url, cfg.request_timeout_secs, cfg.latest_cache_ttl_secs,
    );

    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let refresh_secs = cfg.latest_refresh_secs;
    let api_state = ApiState::new(cfg, source, latency);

    // --- Background latest-round refresh ---
    if refresh_secs > 0 {
        let refresher = LatestRefresher::new(
            Arc::clone(&api_state.resolver),
            Arc::clone(&api_state.health),
            Duration::from_secs(refresh_secs),
        );
        tokio::spawn(async move { refresher.run().await });
        info!("Latest-round refresh every {refresh_secs}s");
    }

    // HTTP API server
    let app = router(api_state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
