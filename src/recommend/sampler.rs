use std::collections::BTreeSet;

use rand::Rng;

use crate::config::{sampler, MAX_NUMBER, MIN_NUMBER, NUMBERS_PER_DRAW};
use crate::stats::rank_by_frequency;
use crate::types::{DrawWindowStats, Recommendation};

/// How a recommendation was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplePath {
    /// Accepted weighted candidate on the given 1-based attempt.
    Balanced { attempt: u32 },
    /// No candidate passed the parity check; picked uniformly.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub recommendation: Recommendation,
    pub path: SamplePath,
}

/// Linear scan of `weights` against a target in `[0, sum(weights))`.
/// The last element absorbs any floating-point overshoot.
pub fn weighted_pick_at(pool: &[u8], weights: &[f64], target: f64) -> u8 {
    let mut remaining = target;
    for (&item, &w) in pool.iter().zip(weights) {
        remaining -= w;
        if remaining <= 0.0 {
            return item;
        }
    }
    pool.last().copied().unwrap_or(MIN_NUMBER)
}

/// Pick one element of `pool` with probability proportional to its weight.
pub fn weighted_pick<R: Rng + ?Sized>(pool: &[u8], weights: &[f64], rng: &mut R) -> u8 {
    let total: f64 = weights.iter().sum();
    weighted_pick_at(pool, weights, rng.random::<f64>() * total)
}

/// Balanced 6-number picks biased by historical frequency.
///
/// Each candidate is seeded with one hot and one cold number, filled by
/// frequency-weighted picks, and kept only if its odd/even split is at most
/// 4-2 either way.
pub struct RecommendationSampler<R> {
    rng: R,
    max_attempts: u32,
}

impl<R: Rng> RecommendationSampler<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            max_attempts: sampler::MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn recommend(&mut self, stats: &DrawWindowStats) -> Recommendation {
        self.sample(stats).recommendation
    }

    pub fn sample(&mut self, stats: &DrawWindowStats) -> Sample {
        let ranked = rank_by_frequency(&stats.frequency);
        let hot: Vec<u8> = ranked
            .iter()
            .take(sampler::HOT_POOL_SIZE)
            .map(|e| e.number)
            .collect();
        let cold: Vec<u8> = ranked[ranked.len().saturating_sub(sampler::COLD_POOL_SIZE)..]
            .iter()
            .map(|e| e.number)
            .collect();

        let (pool, weights): (Vec<u8>, Vec<f64>) = stats
            .frequency
            .iter()
            .map(|(number, count)| (number, f64::from(count.max(1))))
            .unzip();

        for attempt in 1..=self.max_attempts {
            let mut picked = BTreeSet::new();
            picked.insert(hot[self.rng.random_range(0..hot.len())]);
            picked.insert(cold[self.rng.random_range(0..cold.len())]);
            while picked.len() < NUMBERS_PER_DRAW {
                picked.insert(weighted_pick(&pool, &weights, &mut self.rng));
            }

            let recommendation = to_recommendation(&picked);
            if is_balanced(&recommendation) {
                return Sample {
                    recommendation,
                    path: SamplePath::Balanced { attempt },
                };
            }
        }

        Sample {
            recommendation: self.uniform(),
            path: SamplePath::Fallback,
        }
    }

    /// Six distinct numbers drawn uniformly from 1..=45.
    fn uniform(&mut self) -> Recommendation {
        let picked: BTreeSet<u8> =
            rand::seq::index::sample(&mut self.rng, usize::from(MAX_NUMBER), NUMBERS_PER_DRAW)
                .into_iter()
                .map(|i| i as u8 + MIN_NUMBER)
                .collect();
        to_recommendation(&picked)
    }
}

/// Odd and even counts differ by at most `MAX_PARITY_GAP`.
pub fn is_balanced(rec: &Recommendation) -> bool {
    let odd = rec.odd_count();
    let even = NUMBERS_PER_DRAW - odd;
    odd.abs_diff(even) <= sampler::MAX_PARITY_GAP
}

fn to_recommendation(picked: &BTreeSet<u8>) -> Recommendation {
    let mut numbers = [0u8; NUMBERS_PER_DRAW];
    for (slot, &n) in numbers.iter_mut().zip(picked.iter()) {
        *slot = n;
    }
    Recommendation(numbers)
}
