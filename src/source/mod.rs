pub mod http;
pub mod latency;

#[cfg(test)]
pub mod testing;

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::types::Draw;

pub use http::HttpDrawSource;
pub use latency::LatencyStats;

/// Point-query access to published draws, one round at a time.
///
/// Implementations return `Err(AppError::NotFound(round))` when the round has
/// no draw and a transport-family error (see [`AppError::is_transport`]) when
/// the source could not be reached or answered garbage.
///
/// Precondition relied on by the latest-round search: rounds exist
/// contiguously from 1 up to some maximum M. Every round in `1..=M` succeeds
/// and every round above M is not found. A source that violates this (a gap,
/// or a higher round appearing while a lower one is missing) leaves the
/// search result undefined.
///
/// [`AppError::is_transport`]: crate::error::AppError::is_transport
#[async_trait]
pub trait DrawSource: Send + Sync {
    async fn query(&self, round: u32) -> Result<Draw>;
}

/// Outcome of a single probe, with transport failures kept apart from clean
/// misses so callers can count them.
#[derive(Debug)]
pub enum Probe {
    Found(Draw),
    Missing,
    Failed,
}

impl Probe {
    pub fn is_found(&self) -> bool {
        matches!(self, Probe::Found(_))
    }
}

/// Query `round`, folding every error into a non-draw outcome.
pub async fn probe<S: DrawSource + ?Sized>(source: &S, round: u32) -> Probe {
    match source.query(round).await {
        Ok(draw) => Probe::Found(draw),
        Err(e) if e.is_transport() => {
            debug!(round, "probe failed: {e}");
            Probe::Failed
        }
        Err(_) => Probe::Missing,
    }
}
