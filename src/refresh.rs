use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{error, info};

use crate::api::health::HealthState;
use crate::resolver::{LatestRoundResolver, Origin};

/// Re-resolves the latest round on a fixed interval so request handlers
/// rarely pay for a search.
pub struct LatestRefresher {
    resolver: Arc<LatestRoundResolver>,
    health: Arc<HealthState>,
    every: Duration,
}

impl LatestRefresher {
    pub fn new(resolver: Arc<LatestRoundResolver>, health: Arc<HealthState>, every: Duration) -> Self {
        Self { resolver, health, every }
    }

    pub async fn run(self) {
        let mut ticker = interval(self.every);
        ticker.tick().await; // skip immediate first tick

        loop {
            ticker.tick().await;
            self.refresh_once().await;
        }
    }

    async fn refresh_once(&self) {
        match self.resolver.refresh().await {
            Ok(res) => {
                info!(round = res.round, probes = res.probes, "latest round refreshed");
                self.health.record_resolution(&res, Origin::Search);
            }
            Err(e) => {
                self.health.record_failure();
                error!("Latest round refresh failed: {e}");
            }
        }
    }
}
