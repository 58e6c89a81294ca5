//! Shared health state for the /health endpoint.
//! Updated by the API handlers and the background refresher.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::resolver::{Confirmation, Origin, Resolution};

#[derive(Default)]
pub struct HealthState {
    /// Last resolved latest round (0 = never resolved).
    latest_round: AtomicU64,
    /// True when the last resolution could not confirm its round.
    latest_unconfirmed: AtomicBool,
    /// Nanosecond timestamp of the last successful resolution (0 = none).
    last_resolved_at_ns: AtomicU64,
    /// Searches run against the source.
    resolutions: AtomicU64,
    /// Lookups answered from the cache.
    cache_hits: AtomicU64,
    resolution_failures: AtomicU64,
    /// Point queries issued by resolutions (cache hits add 0).
    probes_issued: AtomicU64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    pub latest_round: Option<u64>,
    pub latest_unconfirmed: bool,
    pub last_resolved_at_ns: Option<u64>,
    pub resolutions: u64,
    pub cache_hits: u64,
    pub resolution_failures: u64,
    pub probes_issued: u64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_resolution(&self, res: &Resolution, origin: Origin) {
        self.latest_round.store(u64::from(res.round), Ordering::Relaxed);
        self.latest_unconfirmed.store(
            res.confirmation == Confirmation::Unconfirmed,
            Ordering::Relaxed,
        );
        match origin {
            Origin::Search => {
                self.resolutions.fetch_add(1, Ordering::Relaxed);
                self.probes_issued.fetch_add(u64::from(res.probes), Ordering::Relaxed);
                self.last_resolved_at_ns.store(now_ns(), Ordering::Relaxed);
            }
            Origin::Cache => {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn record_failure(&self) {
        self.resolution_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        let nonzero = |v: u64| (v != 0).then_some(v);
        HealthSnapshot {
            latest_round: nonzero(self.latest_round.load(Ordering::Relaxed)),
            latest_unconfirmed: self.latest_unconfirmed.load(Ordering::Relaxed),
            last_resolved_at_ns: nonzero(self.last_resolved_at_ns.load(Ordering::Relaxed)),
            resolutions: self.resolutions.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            resolution_failures: self.resolution_failures.load(Ordering::Relaxed),
            probes_issued: self.probes_issued.load(Ordering::Relaxed),
        }
    }
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
