use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::{MAX_NUMBER, MIN_NUMBER, NUMBERS_PER_DRAW};
use crate::error::{AppError, Result};

// ---------------------------------------------------------------------------
// Draw
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draw {
    pub round: u32,
    pub date: NaiveDate,
    /// Six distinct numbers in 1..=45, ascending.
    pub numbers: [u8; NUMBERS_PER_DRAW],
    pub bonus: u8,
    /// First-tier prize per winner, in won.
    pub first_tier_prize: u64,
    pub first_tier_winners: u32,
    /// Total ticket sales, in won.
    pub total_sales: u64,
}

impl Draw {
    /// Build a draw, sorting `numbers` and rejecting anything that breaks the
    /// 6-distinct-in-range invariant.
    pub fn new(
        round: u32,
        date: NaiveDate,
        mut numbers: [u8; NUMBERS_PER_DRAW],
        bonus: u8,
        first_tier_prize: u64,
        first_tier_winners: u32,
        total_sales: u64,
    ) -> Result<Self> {
        let malformed = |reason: String| AppError::MalformedDraw { round, reason };

        if round == 0 {
            return Err(malformed("round must be positive".to_string()));
        }
        numbers.sort_unstable();
        if let Some(n) = numbers.iter().find(|n| !is_valid_number(**n)) {
            return Err(malformed(format!("number {n} out of range")));
        }
        if numbers.windows(2).any(|w| w[0] == w[1]) {
            return Err(malformed(format!("duplicate numbers {numbers:?}")));
        }
        if !is_valid_number(bonus) {
            return Err(malformed(format!("bonus {bonus} out of range")));
        }

        Ok(Self {
            round,
            date,
            numbers,
            bonus,
            first_tier_prize,
            first_tier_winners,
            total_sales,
        })
    }

    pub fn number_sum(&self) -> u32 {
        self.numbers.iter().map(|&n| u32::from(n)).sum()
    }
}

pub fn is_valid_number(n: u8) -> bool {
    (MIN_NUMBER..=MAX_NUMBER).contains(&n)
}

// ---------------------------------------------------------------------------
// Round selector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundSelector {
    Latest,
    Round(u32),
}

impl RoundSelector {
    /// Accepts `"latest"` or a plain positive decimal round number.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw == "latest" {
            return Ok(RoundSelector::Latest);
        }
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AppError::InvalidInput(format!("invalid round selector: {raw:?}")));
        }
        match raw.parse::<u32>() {
            Ok(0) => Err(AppError::InvalidInput("round must be at least 1".to_string())),
            Ok(n) => Ok(RoundSelector::Round(n)),
            Err(_) => Err(AppError::InvalidInput(format!("round out of range: {raw}"))),
        }
    }
}

impl std::fmt::Display for RoundSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoundSelector::Latest => write!(f, "latest"),
            RoundSelector::Round(n) => write!(f, "{n}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Window statistics
// ---------------------------------------------------------------------------

/// Occurrence counts for numbers 1..=45. Slot `i` holds the count of `i + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FrequencyTable(Vec<u32>);

impl FrequencyTable {
    pub fn zeroed() -> Self {
        Self(vec![0; usize::from(MAX_NUMBER)])
    }

    pub fn from_counts(counts: [u32; MAX_NUMBER as usize]) -> Self {
        Self(counts.to_vec())
    }

    /// Count for `number`. Out-of-range numbers read as 0.
    pub fn get(&self, number: u8) -> u32 {
        if !is_valid_number(number) {
            return 0;
        }
        self.0[usize::from(number - MIN_NUMBER)]
    }

    pub fn increment(&mut self, number: u8) {
        if is_valid_number(number) {
            self.0[usize::from(number - MIN_NUMBER)] += 1;
        }
    }

    /// `(number, count)` pairs in ascending number order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u32)> + '_ {
        self.0
            .iter()
            .enumerate()
            .map(|(i, &count)| (i as u8 + MIN_NUMBER, count))
    }

    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawWindowStats {
    pub frequency: FrequencyTable,
    pub draw_count: u32,
    pub total_numbers: u32,
    /// Percentages, rounded half-up to whole numbers.
    pub odd_rate: u32,
    pub even_rate: u32,
    pub low_rate: u32,
    pub high_rate: u32,
    /// Mean of per-draw number sums, rounded half-up.
    pub average_sum: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NumberCount {
    pub number: u8,
    pub count: u32,
}

// ---------------------------------------------------------------------------
// Recommendation
// ---------------------------------------------------------------------------

/// Six distinct numbers in 1..=45, ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Recommendation(pub [u8; NUMBERS_PER_DRAW]);

impl Recommendation {
    pub fn numbers(&self) -> &[u8; NUMBERS_PER_DRAW] {
        &self.0
    }

    pub fn odd_count(&self) -> usize {
        self.0.iter().filter(|&&n| n % 2 == 1).count()
    }
}
