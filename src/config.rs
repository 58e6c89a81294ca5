use crate::error::{AppError, Result};

pub const DRAW_API_URL: &str = "https://www.dhlottery.co.kr/common.do?method=getLottoNumber&drwNo=";

/// Round 1 was drawn at this instant; rounds follow weekly from here.
pub const DRAW_EPOCH_RFC3339: &str = "2002-12-07T20:35:00+09:00";

pub const WEEK_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Smallest and largest ball number.
pub const MIN_NUMBER: u8 = 1;
pub const MAX_NUMBER: u8 = 45;

/// Numbers per draw (bonus excluded).
pub const NUMBERS_PER_DRAW: usize = 6;

/// Numbers `<= LOW_BAND_MAX` count as "low", the rest as "high".
pub const LOW_BAND_MAX: u8 = 22;

/// Latest-round search bounds.
pub mod probe {
    /// The downward probe starts this many rounds below the estimate,
    /// the upward probe this many above it.
    pub const ESTIMATE_OFFSET: u32 = 8;
    pub const DOWNWARD_ATTEMPTS: u32 = 12;
    pub const UPWARD_ATTEMPTS: u32 = 12;
    pub const UPWARD_STEP: u32 = 2;
    pub const BISECTION_STEPS: u32 = 24;
}

/// Rounds queried concurrently per batch when fetching a window.
pub const FETCH_BATCH_SIZE: u32 = 12;

/// Recommendation sampler tuning.
pub mod sampler {
    pub const MAX_ATTEMPTS: u32 = 120;
    pub const HOT_POOL_SIZE: usize = 10;
    pub const COLD_POOL_SIZE: usize = 10;
    /// Largest accepted |odd - even| in a 6-number pick.
    pub const MAX_PARITY_GAP: usize = 2;
}

/// Length of the hot/cold lists returned alongside window stats.
pub const HOT_COLD_DISPLAY: usize = 6;

/// Snapshot crawler stops after this many consecutive misses.
pub const CRAWL_MAX_CONSECUTIVE_MISSES: u32 = 2;

/// Cache key under which the resolved latest round is stored.
pub const LATEST_ROUND_CACHE_KEY: &str = "latest-draw-no";

/// Bounds for the recommendation count query parameter.
pub const DEFAULT_RECOMMENDATIONS: usize = 5;
pub const MAX_RECOMMENDATIONS: usize = 20;

#[derive(Debug, Clone)]
pub struct Config {
    pub draw_api_url: String,
    pub log_level: String,
    pub api_port: u16,
    /// Per-request timeout for the draw source (REQUEST_TIMEOUT_SECS)
    pub request_timeout_secs: u64,
    /// How long a resolved latest round stays fresh (LATEST_CACHE_TTL_SECS)
    pub latest_cache_ttl_secs: u64,
    /// Background re-resolution interval, 0 = disabled (LATEST_REFRESH_SECS)
    pub latest_refresh_secs: u64,
    /// Window size used when a stats request omits `range` (STATS_DEFAULT_RANGE)
    pub stats_default_range: u32,
    /// Largest accepted `range` (STATS_MAX_RANGE)
    pub stats_max_range: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let cfg = Self {
            draw_api_url: std::env::var("DRAW_API_URL")
                .unwrap_or_else(|_| DRAW_API_URL.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse::<u64>()
                .unwrap_or(30),
            latest_cache_ttl_secs: std::env::var("LATEST_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse::<u64>()
                .unwrap_or(3600),
            latest_refresh_secs: std::env::var("LATEST_REFRESH_SECS")
                .unwrap_or_else(|_| "0".to_string())
                .parse::<u64>()
                .unwrap_or(0),
            stats_default_range: std::env::var("STATS_DEFAULT_RANGE")
                .unwrap_or_else(|_| "20".to_string())
                .parse::<u32>()
                .unwrap_or(20),
            stats_max_range: std::env::var("STATS_MAX_RANGE")
                .unwrap_or_else(|_| "200".to_string())
                .parse::<u32>()
                .unwrap_or(200),
        };

        if cfg.stats_default_range == 0 || cfg.stats_default_range > cfg.stats_max_range {
            return Err(AppError::Config(format!(
                "STATS_DEFAULT_RANGE must be within 1..={}",
                cfg.stats_max_range
            )));
        }

        Ok(cfg)
    }
}
