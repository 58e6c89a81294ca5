use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use super::{DrawSource, LatencyStats};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::types::Draw;

/// Raw point-query response. Every field except `returnValue` is absent on a
/// miss, so all of them are optional here and checked in `into_draw`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDraw {
    return_value: Option<String>,
    drw_no: Option<u32>,
    drw_no_date: Option<String>,
    drwt_no1: Option<u8>,
    drwt_no2: Option<u8>,
    drwt_no3: Option<u8>,
    drwt_no4: Option<u8>,
    drwt_no5: Option<u8>,
    drwt_no6: Option<u8>,
    bnus_no: Option<u8>,
    first_winamnt: Option<u64>,
    first_przwner_co: Option<u32>,
    tot_sellamnt: Option<u64>,
}

impl RawDraw {
    fn into_draw(self, requested: u32) -> Result<Draw> {
        if self.return_value.as_deref() != Some("success") {
            return Err(AppError::NotFound(requested));
        }

        let missing = |field: &str| AppError::MalformedDraw {
            round: requested,
            reason: format!("missing {field}"),
        };

        let round = self.drw_no.ok_or_else(|| missing("drwNo"))?;
        if round != requested {
            return Err(AppError::MalformedDraw {
                round: requested,
                reason: format!("source answered round {round}"),
            });
        }

        let date_str = self.drw_no_date.ok_or_else(|| missing("drwNoDate"))?;
        let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
            AppError::MalformedDraw {
                round,
                reason: format!("bad date {date_str:?}: {e}"),
            }
        })?;

        let numbers = [
            self.drwt_no1.ok_or_else(|| missing("drwtNo1"))?,
            self.drwt_no2.ok_or_else(|| missing("drwtNo2"))?,
            self.drwt_no3.ok_or_else(|| missing("drwtNo3"))?,
            self.drwt_no4.ok_or_else(|| missing("drwtNo4"))?,
            self.drwt_no5.ok_or_else(|| missing("drwtNo5"))?,
            self.drwt_no6.ok_or_else(|| missing("drwtNo6"))?,
        ];
        let bonus = self.bnus_no.ok_or_else(|| missing("bnusNo"))?;

        Draw::new(
            round,
            date,
            numbers,
            bonus,
            self.first_winamnt.unwrap_or(0),
            self.first_przwner_co.unwrap_or(0),
            self.tot_sellamnt.unwrap_or(0),
        )
    }
}

/// Parse a point-query response body for `round`.
pub fn parse_draw_response(round: u32, body: &str) -> Result<Draw> {
    let raw: RawDraw = serde_json::from_str(body)?;
    raw.into_draw(round)
}

/// Draw source backed by the public lottery REST endpoint.
pub struct HttpDrawSource {
    client: reqwest::Client,
    base_url: String,
    latency: Arc<LatencyStats>,
}

impl HttpDrawSource {
    pub fn new(cfg: &Config, latency: Arc<LatencyStats>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.draw_api_url.clone(),
            latency,
        })
    }

    async fn fetch_body(&self, round: u32) -> Result<String> {
        let url = format!("{}{}", self.base_url, round);
        let resp = self
            .client
            .get(&url)
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Transport(format!("HTTP {status} for round {round}")));
        }
        Ok(resp.text().await?)
    }
}

#[async_trait]
impl DrawSource for HttpDrawSource {
    async fn query(&self, round: u32) -> Result<Draw> {
        let started = Instant::now();
        let body = self.fetch_body(round).await;
        self.latency.record(started.elapsed());
        debug!(round, elapsed_ms = started.elapsed().as_millis() as u64, "draw query");

        parse_draw_response(round, &body?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUCCESS: &str = r#"{
        "totSellamnt": 111840714000,
        "returnValue": "success",
        "drwNoDate": "2024-01-06",
        "firstWinamnt": 3079725375,
        "drwtNo6": 42,
        "drwtNo4": 28,
        "firstPrzwnerCo": 8,
        "drwtNo5": 38,
        "bnusNo": 5,
        "firstAccumamnt": 24637803000,
        "drwNo": 1101,
        "drwtNo2": 7,
        "drwtNo3": 12,
        "drwtNo1": 1
    }"#;

    #[test]
    fn parses_success_response() {
        let draw = parse_draw_response(1101, SUCCESS).unwrap();
        assert_eq!(draw.round, 1101);
        assert_eq!(draw.date, NaiveDate::from_ymd_opt(2024, 1, 6).unwrap());
        assert_eq!(draw.numbers, [1, 7, 12, 28, 38, 42]);
        assert_eq!(draw.bonus, 5);
        assert_eq!(draw.first_tier_prize, 3_079_725_375);
        assert_eq!(draw.first_tier_winners, 8);
        assert_eq!(draw.total_sales, 111_840_714_000);
    }

    #[test]
    fn fail_return_value_is_not_found() {
        let err = parse_draw_response(99999, r#"{"returnValue":"fail"}"#).unwrap_err();
        assert!(matches!(err, AppError::NotFound(99999)));
    }

    #[test]
    fn garbage_is_transport_family() {
        let err = parse_draw_response(1, "<html>maintenance</html>").unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn missing_number_is_malformed() {
        let body = SUCCESS.replace(r#""drwtNo6": 42,"#, "");
        let err = parse_draw_response(1101, &body).unwrap_err();
        assert!(matches!(err, AppError::MalformedDraw { round: 1101, .. }));
    }

    #[test]
    fn mismatched_round_is_malformed() {
        let err = parse_draw_response(1100, SUCCESS).unwrap_err();
        assert!(matches!(err, AppError::MalformedDraw { round: 1100, .. }));
    }

    #[test]
    fn duplicate_numbers_are_malformed() {
        let body = SUCCESS.replace(r#""drwtNo2": 7"#, r#""drwtNo2": 1"#);
        assert!(parse_draw_response(1101, &body).unwrap_err().is_transport());
    }
}
