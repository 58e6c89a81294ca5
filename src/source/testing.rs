//! Scripted in-memory draw source for tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::DrawSource;
use crate::error::{AppError, Result};
use crate::types::Draw;

/// Rounds `1..=max_round` exist, everything above is not found. Rounds in
/// `failing` answer with a transport error instead.
pub struct ScriptedSource {
    pub max_round: u32,
    failing: HashSet<u32>,
    queries: AtomicU32,
    log: Mutex<Vec<u32>>,
}

impl ScriptedSource {
    pub fn new(max_round: u32) -> Self {
        Self {
            max_round,
            failing: HashSet::new(),
            queries: AtomicU32::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self, rounds: impl IntoIterator<Item = u32>) -> Self {
        self.failing.extend(rounds);
        self
    }

    pub fn query_count(&self) -> u32 {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn queried_rounds(&self) -> Vec<u32> {
        self.log.lock().unwrap().clone()
    }
}

/// Deterministic draw for `round`: six spread-out numbers seeded by the round.
pub fn sample_draw(round: u32) -> Draw {
    let base = (round % 7) as u8;
    let numbers = [1 + base, 8 + base, 15 + base, 22 + base, 29 + base, 36 + base];
    let date = NaiveDate::from_ymd_opt(2002, 12, 7).unwrap() + chrono::Duration::weeks(i64::from(round) - 1);
    Draw::new(round, date, numbers, 44, 2_000_000_000, 10, 100_000_000_000).unwrap()
}

#[async_trait]
impl DrawSource for ScriptedSource {
    async fn query(&self, round: u32) -> Result<Draw> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(round);
        tokio::task::yield_now().await;

        if self.failing.contains(&round) {
            return Err(AppError::Transport(format!("connection reset on round {round}")));
        }
        if round == 0 || round > self.max_round {
            return Err(AppError::NotFound(round));
        }
        Ok(sample_draw(round))
    }
}
