use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::config::{CRAWL_MAX_CONSECUTIVE_MISSES, FETCH_BATCH_SIZE};
use crate::error::{AppError, Result};
use crate::source::{self, DrawSource, Probe};
use crate::types::Draw;

/// Direct lookup of one round. NotFound and transport errors are returned
/// as-is; nothing is retried.
pub async fn fetch_draw(source: &dyn DrawSource, round: u32) -> Result<Draw> {
    source.query(round).await.map_err(|e| {
        if e.is_transport() {
            warn!(round, "draw lookup failed: {e}");
        }
        e
    })
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WindowStats {
    pub requested: u32,
    pub found: u32,
    pub missing: u32,
    pub failed: u32,
}

/// Fetches a trailing window of draws in sequential batches of concurrent
/// point queries.
pub struct RangeFetcher {
    source: Arc<dyn DrawSource>,
    batch_size: u32,
}

impl RangeFetcher {
    pub fn new(source: Arc<dyn DrawSource>) -> Self {
        Self::with_batch_size(source, FETCH_BATCH_SIZE)
    }

    pub fn with_batch_size(source: Arc<dyn DrawSource>, batch_size: u32) -> Self {
        Self {
            source,
            batch_size: batch_size.max(1),
        }
    }

    /// Draws for rounds `latest - size + 1 ..= latest` (clamped at round 1).
    /// Rounds that miss or error are left out; the result is never longer
    /// than `size` and is in no guaranteed order.
    pub async fn fetch_window(&self, latest_round: u32, size: u32) -> Vec<Draw> {
        self.fetch_window_with_stats(latest_round, size).await.0
    }

    pub async fn fetch_window_with_stats(&self, latest_round: u32, size: u32) -> (Vec<Draw>, WindowStats) {
        let mut stats = WindowStats::default();
        if latest_round == 0 || size == 0 {
            return (Vec::new(), stats);
        }
        let oldest = latest_round.saturating_sub(size - 1).max(1);
        stats.requested = latest_round - oldest + 1;

        let mut draws = Vec::with_capacity(stats.requested as usize);
        let mut batch_top = latest_round;

        loop {
            let batch_bottom = batch_top.saturating_sub(self.batch_size - 1).max(oldest);
            let queries = (batch_bottom..=batch_top)
                .rev()
                .map(|round| source::probe(self.source.as_ref(), round));

            for outcome in join_all(queries).await {
                match outcome {
                    Probe::Found(draw) => {
                        stats.found += 1;
                        draws.push(draw);
                    }
                    Probe::Missing => stats.missing += 1,
                    Probe::Failed => stats.failed += 1,
                }
            }

            if batch_bottom == oldest {
                break;
            }
            batch_top = batch_bottom - 1;
        }

        debug!(
            latest_round,
            requested = stats.requested,
            found = stats.found,
            missing = stats.missing,
            failed = stats.failed,
            "window fetched"
        );
        (draws, stats)
    }
}

/// Query rounds 1, 2, 3, ... in order until `CRAWL_MAX_CONSECUTIVE_MISSES`
/// rounds in a row are not found. Sleeps `pause` after every `pause_every`
/// rounds to stay polite to the source.
///
/// Any error other than NotFound aborts the crawl with that error.
pub async fn crawl_all(source: &dyn DrawSource, pause_every: u32, pause: Duration) -> Result<Vec<Draw>> {
    let mut draws = Vec::new();
    let mut misses = 0u32;
    let mut round = 1u32;

    loop {
        match source.query(round).await {
            Ok(draw) => {
                misses = 0;
                draws.push(draw);
            }
            Err(AppError::NotFound(_)) => {
                misses += 1;
                if misses >= CRAWL_MAX_CONSECUTIVE_MISSES {
                    break;
                }
            }
            Err(e) => {
                warn!(round, fetched = draws.len(), "crawl aborted: {e}");
                return Err(e);
            }
        }
        round += 1;
        if pause_every > 0 && round % pause_every == 0 {
            tokio::time::sleep(pause).await;
        }
    }

    info!(count = draws.len(), last_round = round, "crawl finished");
    Ok(draws)
}
