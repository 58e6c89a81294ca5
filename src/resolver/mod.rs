//! Latest-round discovery against a point-query source.
//!
//! The source has no "latest" primitive, so the highest existing round is
//! found by searching outward from a wall-clock estimate:
//!
//! 1. probe downward from `estimate - 8` until a round succeeds,
//! 2. probe upward from `estimate + 8` in steps of 2 until a round fails,
//! 3. bisect between the two until the bracket is adjacent.
//!
//! Every probe is sequential; each step acts on the latest known bracket.
//! Transport failures count as misses, so an outage mid-search can settle
//! on a round below the true latest. That result is cached like any other.

pub mod estimate;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{probe, LATEST_ROUND_CACHE_KEY};
use crate::error::{AppError, Result};
use crate::source::{self, DrawSource, Probe};
use crate::state::TtlCache;

pub use estimate::RoundEstimator;

/// Whether a bounded search loop stopped on its condition or ran out of steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Converged,
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confirmation {
    /// The returned round was itself observed to succeed.
    Verified,
    /// No probe ever succeeded at the returned round; it is the floor the
    /// downward probe gave up on.
    Unconfirmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub round: u32,
    pub confirmation: Confirmation,
    pub estimate: u32,
    pub downward: SearchStatus,
    pub upward: SearchStatus,
    pub bisection: SearchStatus,
    /// Point queries issued to produce this resolution.
    pub probes: u32,
}

/// Where a returned resolution came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Cache,
    Search,
}

pub type LatestCache = TtlCache<String, Resolution>;

#[derive(Debug, Default)]
struct Tally {
    probes: u32,
    failed: u32,
}

pub struct LatestRoundResolver {
    source: Arc<dyn DrawSource>,
    cache: Arc<LatestCache>,
    ttl: Duration,
    estimator: RoundEstimator,
}

impl LatestRoundResolver {
    pub fn new(
        source: Arc<dyn DrawSource>,
        cache: Arc<LatestCache>,
        ttl: Duration,
        estimator: RoundEstimator,
    ) -> Self {
        Self { source, cache, ttl, estimator }
    }

    /// Latest round, from cache when fresh, otherwise searched from the
    /// current wall-clock estimate.
    pub async fn resolve_latest(&self) -> Result<Resolution> {
        self.resolve_latest_with_origin().await.map(|(res, _)| res)
    }

    pub async fn resolve_latest_with_origin(&self) -> Result<(Resolution, Origin)> {
        if let Some(cached) = self.cached() {
            return Ok((cached, Origin::Cache));
        }
        let res = self.search(self.estimator.estimate_now()).await?;
        Ok((res, Origin::Search))
    }

    /// Same as [`resolve_latest`](Self::resolve_latest) with an explicit estimate.
    pub async fn resolve_near(&self, estimate: u32) -> Result<Resolution> {
        if let Some(cached) = self.cached() {
            return Ok(cached);
        }
        self.search(estimate).await
    }

    /// Re-run the search regardless of the cache and overwrite the entry.
    pub async fn refresh(&self) -> Result<Resolution> {
        self.search(self.estimator.estimate_now()).await
    }

    pub fn cached(&self) -> Option<Resolution> {
        self.cache.get(&LATEST_ROUND_CACHE_KEY.to_string())
    }

    async fn search(&self, estimate: u32) -> Result<Resolution> {
        let estimate = estimate.max(1);
        let mut tally = Tally::default();

        let floor = estimate.saturating_sub(probe::ESTIMATE_OFFSET).max(1);
        let (low, downward) = self.probe_downward(floor, &mut tally).await;

        let ceiling = estimate.saturating_add(probe::ESTIMATE_OFFSET);
        let (high, upward) = self.probe_upward(ceiling, &mut tally).await;

        let (round, left_confirmed, bisection) = self
            .bisect(low, high, downward == SearchStatus::Converged, &mut tally)
            .await;

        if tally.probes > 0 && tally.failed == tally.probes {
            warn!(estimate, probes = tally.probes, "every latest-round probe errored");
            return Err(AppError::ResolutionFailure { probes: tally.probes });
        }

        let resolution = Resolution {
            round,
            confirmation: if left_confirmed {
                Confirmation::Verified
            } else {
                Confirmation::Unconfirmed
            },
            estimate,
            downward,
            upward,
            bisection,
            probes: tally.probes,
        };

        if resolution.confirmation == Confirmation::Unconfirmed {
            warn!(
                round,
                estimate,
                "latest round unconfirmed: no success found within downward probe bound"
            );
        }
        info!(
            round,
            estimate,
            probes = tally.probes,
            failed = tally.failed,
            confirmation = ?resolution.confirmation,
            "Resolved latest round {round}",
        );

        self.cache
            .set(LATEST_ROUND_CACHE_KEY.to_string(), resolution, self.ttl);
        Ok(resolution)
    }

    async fn check(&self, round: u32, tally: &mut Tally) -> bool {
        tally.probes += 1;
        let outcome = source::probe(self.source.as_ref(), round).await;
        if matches!(outcome, Probe::Failed) {
            tally.failed += 1;
        }
        let found = outcome.is_found();
        debug!(round, found, "latest-round probe");
        found
    }

    /// Walk down one round at a time until a round succeeds.
    async fn probe_downward(&self, start: u32, tally: &mut Tally) -> (u32, SearchStatus) {
        let mut low = start;
        for _ in 0..probe::DOWNWARD_ATTEMPTS {
            if self.check(low, tally).await {
                return (low, SearchStatus::Converged);
            }
            low = low.saturating_sub(1).max(1);
        }
        (low, SearchStatus::Exhausted)
    }

    /// Walk up in fixed steps until a round fails. On exhaustion the returned
    /// round is an unprobed ceiling.
    async fn probe_upward(&self, start: u32, tally: &mut Tally) -> (u32, SearchStatus) {
        let mut high = start;
        for _ in 0..probe::UPWARD_ATTEMPTS {
            if !self.check(high, tally).await {
                return (high, SearchStatus::Converged);
            }
            high = high.saturating_add(probe::UPWARD_STEP);
        }
        (high, SearchStatus::Exhausted)
    }

    /// Narrow `[left, right)` until adjacent. Returns the final left bound and
    /// whether it was ever observed to succeed.
    async fn bisect(
        &self,
        mut left: u32,
        mut right: u32,
        mut left_confirmed: bool,
        tally: &mut Tally,
    ) -> (u32, bool, SearchStatus) {
        for _ in 0..probe::BISECTION_STEPS {
            if left.saturating_add(1) >= right {
                return (left, left_confirmed, SearchStatus::Converged);
            }
            let mid = left + (right - left) / 2;
            if self.check(mid, tally).await {
                left = mid;
                left_confirmed = true;
            } else {
                right = mid;
            }
        }
        let status = if left.saturating_add(1) >= right {
            SearchStatus::Converged
        } else {
            SearchStatus::Exhausted
        };
        (left, left_confirmed, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::ScriptedSource;

    const TTL: Duration = Duration::from_secs(3600);

    fn resolver(source: Arc<ScriptedSource>) -> (LatestRoundResolver, Arc<LatestCache>) {
        let cache = TtlCache::new();
        let r = LatestRoundResolver::new(source, Arc::clone(&cache), TTL, RoundEstimator::default());
        (r, cache)
    }

    #[tokio::test]
    async fn finds_boundary_for_estimate_offsets() {
        for max in [30u32, 150, 1180, 2001] {
            for offset in [-20i64, -5, 0, 5, 20] {
                let estimate = (i64::from(max) + offset) as u32;
                let source = Arc::new(ScriptedSource::new(max));
                let (r, _) = resolver(Arc::clone(&source));
                let res = r.resolve_near(estimate).await.unwrap();
                assert_eq!(res.round, max, "max={max} estimate={estimate}");
                assert!(source.query_count() <= 48);
                assert_eq!(res.probes, source.query_count());
            }
        }
    }

    #[tokio::test]
    async fn estimate_above_latest() {
        let source = Arc::new(ScriptedSource::new(1180));
        let (r, _) = resolver(Arc::clone(&source));
        let res = r.resolve_near(1185).await.unwrap();
        assert_eq!(res.round, 1180);
        assert_eq!(res.confirmation, Confirmation::Verified);
        assert_eq!(source.queried_rounds(), vec![1177, 1193, 1185, 1181, 1179, 1180]);
    }

    #[tokio::test]
    async fn estimate_below_latest_walks_upward() {
        let source = Arc::new(ScriptedSource::new(1180));
        let (r, _) = resolver(Arc::clone(&source));
        let res = r.resolve_near(1160).await.unwrap();
        assert_eq!(res.round, 1180);
        assert_eq!(res.upward, SearchStatus::Converged);
        assert!(source.queried_rounds().contains(&1182));
    }

    #[tokio::test]
    async fn second_call_is_served_from_cache() {
        let source = Arc::new(ScriptedSource::new(1180));
        let (r, cache) = resolver(Arc::clone(&source));

        let first = r.resolve_near(1180).await.unwrap();
        let after_first = source.query_count();
        assert!(after_first > 0);
        assert_eq!(cache.len(), 1);

        let second = r.resolve_near(1180).await.unwrap();
        assert_eq!(second, first);
        assert_eq!(source.query_count(), after_first);
    }

    #[tokio::test]
    async fn refresh_bypasses_cache() {
        let source = Arc::new(ScriptedSource::new(1180));
        let (r, cache) = resolver(Arc::clone(&source));
        cache.set(
            LATEST_ROUND_CACHE_KEY.to_string(),
            Resolution {
                round: 7,
                confirmation: Confirmation::Verified,
                estimate: 7,
                downward: SearchStatus::Converged,
                upward: SearchStatus::Converged,
                bisection: SearchStatus::Converged,
                probes: 0,
            },
            TTL,
        );
        assert_eq!(r.resolve_latest().await.unwrap().round, 7);
        assert_eq!(source.query_count(), 0);

        let (_, origin) = r.resolve_latest_with_origin().await.unwrap();
        assert_eq!(origin, Origin::Cache);

        r.refresh().await.unwrap();
        assert!(source.query_count() > 0);
    }

    #[tokio::test]
    async fn transport_failure_mid_search_settles_lower() {
        // Round 1180 exists but errors; the search treats it as a miss and
        // settles on 1179. This is accepted behaviour.
        let source = Arc::new(ScriptedSource::new(1180).failing([1180]));
        let (r, cache) = resolver(Arc::clone(&source));
        let res = r.resolve_near(1180).await.unwrap();
        assert_eq!(res.round, 1179);
        assert_eq!(res.confirmation, Confirmation::Verified);
        assert_eq!(r.cached().map(|c| c.round), Some(1179));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn exhausted_downward_probe_returns_unconfirmed_floor() {
        let source = Arc::new(ScriptedSource::new(1180));
        let (r, _) = resolver(Arc::clone(&source));
        let res = r.resolve_near(1300).await.unwrap();
        assert_eq!(res.downward, SearchStatus::Exhausted);
        assert_eq!(res.confirmation, Confirmation::Unconfirmed);
        // 1292 down to 1281 all miss, floor ends at 1280 which is never a success.
        assert_eq!(res.round, 1280);
    }

    #[tokio::test]
    async fn exhausted_upward_probe_stops_at_ceiling() {
        // Estimate far below the real latest: upward probe never sees a miss
        // and the search cannot reach the true boundary.
        let source = Arc::new(ScriptedSource::new(5000));
        let (r, _) = resolver(Arc::clone(&source));
        let res = r.resolve_near(1180).await.unwrap();
        assert_eq!(res.upward, SearchStatus::Exhausted);
        assert_eq!(res.round, 1211);
        assert!(res.round < 5000);
    }

    #[tokio::test]
    async fn all_probes_failing_is_resolution_failure() {
        let source = Arc::new(ScriptedSource::new(1180).failing(1..=2000));
        let (r, cache) = resolver(Arc::clone(&source));
        let err = r.resolve_near(1180).await.unwrap_err();
        assert!(matches!(err, AppError::ResolutionFailure { .. }));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn bisection_reports_exhaustion() {
        let source = Arc::new(ScriptedSource::new(1 << 30));
        let (r, _) = resolver(Arc::clone(&source));
        let mut tally = Tally::default();
        let (_, confirmed, status) = r.bisect(1, 1 << 30, true, &mut tally).await;
        assert!(confirmed);
        assert_eq!(status, SearchStatus::Exhausted);
        assert_eq!(tally.probes, probe::BISECTION_STEPS);
    }

    #[tokio::test]
    async fn low_estimate_clamps_floor_to_round_one() {
        let source = Arc::new(ScriptedSource::new(3));
        let (r, _) = resolver(Arc::clone(&source));
        let res = r.resolve_near(1).await.unwrap();
        assert_eq!(res.round, 3);
        assert_eq!(source.queried_rounds()[0], 1);
    }
}
