//! One-shot crawl of every published draw into a static JSON file.
//!
//! Usage: `snapshot [OUTPUT_PATH]` (default `data/lotto_draws.json`).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use lotto_board::config::Config;
use lotto_board::error::Result;
use lotto_board::fetcher::crawl_all;
use lotto_board::source::{HttpDrawSource, LatencyStats};
use lotto_board::types::Draw;

const DEFAULT_OUTPUT: &str = "data/lotto_draws.json";
const PAUSE_EVERY: u32 = 50;
const PAUSE: Duration = Duration::from_millis(250);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    updated_at: String,
    draws: Vec<SnapshotDraw>,
}

#[derive(Serialize)]
struct SnapshotDraw {
    round: u32,
    date: NaiveDate,
    nums: [u8; 6],
    bonus: u8,
}

impl From<Draw> for SnapshotDraw {
    fn from(d: Draw) -> Self {
        Self {
            round: d.round,
            date: d.date,
            nums: d.numbers,
            bonus: d.bonus,
        }
    }
}

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

    let output = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    if let Err(e) = run(cfg, output).await {
        error!("Snapshot failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config, output: PathBuf) -> Result<()> {
    let source = HttpDrawSource::new(&cfg, Arc::new(LatencyStats::new()))?;
    info!("Crawling draws from {}", cfg.draw_api_url);

    let draws = crawl_all(&source, PAUSE_EVERY, PAUSE).await?;
    let snapshot = Snapshot {
        updated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        draws: draws.into_iter().map(SnapshotDraw::from).collect(),
    };

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let body = serde_json::to_string_pretty(&snapshot)?;
    tokio::fs::write(&output, body).await?;

    info!("Wrote {} draws to {}", snapshot.draws.len(), output.display());
    Ok(())
}
