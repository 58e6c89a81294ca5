use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::header,
    routing::get,
    Json, Router,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::api::health::{HealthSnapshot, HealthState};
use crate::config::{Config, DEFAULT_RECOMMENDATIONS, HOT_COLD_DISPLAY, MAX_RECOMMENDATIONS};
use crate::error::{AppError, Result};
use crate::fetcher::{fetch_draw, RangeFetcher};
use crate::recommend::RecommendationSampler;
use crate::resolver::{LatestCache, LatestRoundResolver, Resolution, RoundEstimator};
use crate::source::{DrawSource, LatencyStats};
use crate::stats;
use crate::types::{Draw, DrawWindowStats, NumberCount, Recommendation, RoundSelector};

const DRAW_CACHE_CONTROL: &str = "public, max-age=300";

#[derive(Clone)]
pub struct ApiState {
    pub cfg: Arc<Config>,
    pub source: Arc<dyn DrawSource>,
    pub resolver: Arc<LatestRoundResolver>,
    pub fetcher: Arc<RangeFetcher>,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
}

impl ApiState {
    pub fn new(cfg: Config, source: Arc<dyn DrawSource>, latency: Arc<LatencyStats>) -> Self {
        Self::with_estimator(cfg, source, latency, RoundEstimator::default())
    }

    pub fn with_estimator(
        cfg: Config,
        source: Arc<dyn DrawSource>,
        latency: Arc<LatencyStats>,
        estimator: RoundEstimator,
    ) -> Self {
        let cache = LatestCache::new();
        let ttl = Duration::from_secs(cfg.latest_cache_ttl_secs);
        let resolver = LatestRoundResolver::new(Arc::clone(&source), cache, ttl, estimator);
        Self {
            cfg: Arc::new(cfg),
            fetcher: Arc::new(RangeFetcher::new(Arc::clone(&source))),
            source,
            resolver: Arc::new(resolver),
            health: Arc::new(HealthState::new()),
            latency,
        }
    }

    /// Latest round through the cache, with health bookkeeping.
    async fn latest(&self) -> Result<Resolution> {
        match self.resolver.resolve_latest_with_origin().await {
            Ok((res, origin)) => {
                self.health.record_resolution(&res, origin);
                Ok(res)
            }
            Err(e) => {
                self.health.record_failure();
                Err(e)
            }
        }
    }

    fn window_size(&self, requested: Option<u32>) -> Result<u32> {
        let range = requested.unwrap_or(self.cfg.stats_default_range);
        if range == 0 || range > self.cfg.stats_max_range {
            return Err(AppError::InvalidInput(format!(
                "range must be within 1..={}",
                self.cfg.stats_max_range
            )));
        }
        Ok(range)
    }

    async fn window(&self, requested: Option<u32>) -> Result<(u32, u32, Vec<Draw>)> {
        let range = self.window_size(requested)?;
        let latest = self.latest().await?.round;
        let draws = self.fetcher.fetch_window(latest, range).await;
        Ok((latest, range, draws))
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/lotto", get(get_lotto))
        .route("/api/stats", get(get_stats))
        .route("/api/recommendations", get(get_recommendations))
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct LottoQuery {
    #[serde(rename = "drawNo")]
    pub draw_no: Option<String>,
}

// Numeric params stay strings so bad values get the JSON error body.
#[derive(Deserialize)]
pub struct StatsQuery {
    pub range: Option<String>,
}

#[derive(Deserialize)]
pub struct RecommendationsQuery {
    pub range: Option<String>,
    pub count: Option<String>,
}

fn parse_param<T: FromStr>(name: &str, raw: Option<&str>) -> Result<Option<T>> {
    raw.map(|v| {
        v.parse::<T>()
            .map_err(|_| AppError::InvalidInput(format!("{name} must be a non-negative integer, got {v:?}")))
    })
    .transpose()
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub latest_round: u32,
    pub range: u32,
    pub draws_analyzed: usize,
    pub stats: DrawWindowStats,
    pub hot: Vec<NumberCount>,
    pub cold: Vec<NumberCount>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationsResponse {
    pub latest_round: u32,
    pub range: u32,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub cached_round: Option<u32>,
    #[serde(flatten)]
    pub resolver: HealthSnapshot,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyResponse {
    pub samples: u64,
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_lotto(
    State(state): State<ApiState>,
    Query(params): Query<LottoQuery>,
) -> Result<([(header::HeaderName, &'static str); 1], Json<Draw>)> {
    let raw = params
        .draw_no
        .ok_or_else(|| AppError::InvalidInput("drawNo is required".to_string()))?;

    let round = match RoundSelector::parse(&raw)? {
        RoundSelector::Latest => state.latest().await?.round,
        RoundSelector::Round(n) => n,
    };

    let draw = fetch_draw(state.source.as_ref(), round).await?;
    Ok(([(header::CACHE_CONTROL, DRAW_CACHE_CONTROL)], Json(draw)))
}

async fn get_stats(
    State(state): State<ApiState>,
    Query(params): Query<StatsQuery>,
) -> Result<Json<StatsResponse>> {
    let range = parse_param("range", params.range.as_deref())?;
    let (latest_round, range, draws) = state.window(range).await?;
    let window = stats::compute(&draws);
    let (hot, cold) = stats::hot_cold(&window.frequency, HOT_COLD_DISPLAY);

    Ok(Json(StatsResponse {
        latest_round,
        range,
        draws_analyzed: draws.len(),
        stats: window,
        hot,
        cold,
    }))
}

async fn get_recommendations(
    State(state): State<ApiState>,
    Query(params): Query<RecommendationsQuery>,
) -> Result<Json<RecommendationsResponse>> {
    let count = parse_param("count", params.count.as_deref())?
        .unwrap_or(DEFAULT_RECOMMENDATIONS)
        .clamp(1, MAX_RECOMMENDATIONS);
    let range = parse_param("range", params.range.as_deref())?;
    let (latest_round, range, draws) = state.window(range).await?;
    let window = stats::compute(&draws);

    Ok(Json(RecommendationsResponse {
        latest_round,
        range,
        recommendations: recommend_many(&window, count),
    }))
}

/// Kept out of the async handlers: the thread-local rng is not `Send`.
fn recommend_many(window: &DrawWindowStats, count: usize) -> Vec<Recommendation> {
    let mut sampler = RecommendationSampler::new(StdRng::from_rng(&mut rand::rng()));
    (0..count).map(|_| sampler.recommend(window)).collect()
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        cached_round: state.resolver.cached().map(|r| r.round),
        resolver: state.health.snapshot(),
    })
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    let percentiles = state.latency.percentiles_ms();
    Json(LatencyResponse {
        samples: state.latency.len(),
        p50_ms: percentiles.map(|p| p.0),
        p95_ms: percentiles.map(|p| p.1),
        p99_ms: percentiles.map(|p| p.2),
    })
}
