use crate::config::{LOW_BAND_MAX, NUMBERS_PER_DRAW};
use crate::types::{Draw, DrawWindowStats, FrequencyTable, NumberCount};

/// `round(part / whole * 100)`, half-up, 0 when `whole` is 0.
fn percent(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    let (part, whole) = (u64::from(part), u64::from(whole));
    ((part * 200 + whole) / (whole * 2)) as u32
}

/// `round(total / count)`, half-up, 0 when `count` is 0.
fn rounded_mean(total: u64, count: u64) -> u32 {
    if count == 0 {
        return 0;
    }
    ((total * 2 + count) / (count * 2)) as u32
}

/// Reduce a window of draws to frequency, parity, band and sum statistics.
/// Total: an empty window gives all-zero stats.
pub fn compute<'a, I>(draws: I) -> DrawWindowStats
where
    I: IntoIterator<Item = &'a Draw>,
{
    let mut frequency = FrequencyTable::zeroed();
    let mut draw_count = 0u32;
    let mut odd = 0u32;
    let mut low = 0u32;
    let mut sum_total = 0u64;

    for draw in draws {
        draw_count += 1;
        for &n in &draw.numbers {
            frequency.increment(n);
            if n % 2 == 1 {
                odd += 1;
            }
            if n <= LOW_BAND_MAX {
                low += 1;
            }
        }
        sum_total += u64::from(draw.number_sum());
    }

    let total_numbers = draw_count * NUMBERS_PER_DRAW as u32;
    let even = total_numbers - odd;
    let high = total_numbers - low;

    DrawWindowStats {
        frequency,
        draw_count,
        total_numbers,
        odd_rate: percent(odd, total_numbers),
        even_rate: percent(even, total_numbers),
        low_rate: percent(low, total_numbers),
        high_rate: percent(high, total_numbers),
        average_sum: rounded_mean(sum_total, u64::from(draw_count)),
    }
}

/// All 45 numbers ordered by count, highest first. Equal counts keep
/// ascending number order.
pub fn rank_by_frequency(frequency: &FrequencyTable) -> Vec<NumberCount> {
    let mut entries: Vec<NumberCount> = frequency
        .iter()
        .map(|(number, count)| NumberCount { number, count })
        .collect();
    // Stable sort: ties stay in ascending number order.
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries
}

/// The `n` most frequent numbers, and the `n` least frequent listed
/// least-frequent first.
pub fn hot_cold(frequency: &FrequencyTable, n: usize) -> (Vec<NumberCount>, Vec<NumberCount>) {
    let ranked = rank_by_frequency(frequency);
    let n = n.min(ranked.len());
    let hot = ranked[..n].to_vec();
    let cold = ranked[ranked.len() - n..].iter().rev().copied().collect();
    (hot, cold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::sample_draw;
    use chrono::NaiveDate;

    fn draw(round: u32, numbers: [u8; 6]) -> Draw {
        Draw::new(round, NaiveDate::from_ymd_opt(2024, 1, 6).unwrap(), numbers, 45, 0, 0, 0).unwrap()
    }

    #[test]
    fn empty_window_is_all_zero() {
        let stats = compute(&Vec::<Draw>::new());
        assert_eq!(stats.draw_count, 0);
        assert_eq!(stats.total_numbers, 0);
        assert_eq!(stats.frequency.total(), 0);
        assert_eq!(
            (stats.odd_rate, stats.even_rate, stats.low_rate, stats.high_rate, stats.average_sum),
            (0, 0, 0, 0, 0)
        );
    }

    #[test]
    fn repeated_low_draws() {
        let draws: Vec<Draw> = (1..=10).map(|r| draw(r, [1, 2, 3, 4, 5, 6])).collect();
        let stats = compute(&draws);

        for n in 1..=6 {
            assert_eq!(stats.frequency.get(n), 10);
        }
        for n in 7..=45 {
            assert_eq!(stats.frequency.get(n), 0);
        }
        assert_eq!(stats.average_sum, 21);
        assert_eq!(stats.odd_rate, 50);
        assert_eq!(stats.even_rate, 50);
        assert_eq!(stats.low_rate, 100);
        assert_eq!(stats.high_rate, 0);
    }

    #[test]
    fn invariants_hold_over_varied_windows() {
        for size in 1..=40u32 {
            let draws: Vec<Draw> = (1..=size).map(sample_draw).collect();
            let stats = compute(&draws);
            assert_eq!(stats.frequency.total(), 6 * size);
            assert_eq!(stats.total_numbers, 6 * size);
            let parity = stats.odd_rate + stats.even_rate;
            assert!((99..=101).contains(&parity), "size={size} parity={parity}");
            let band = stats.low_rate + stats.high_rate;
            assert!((99..=101).contains(&band), "size={size} band={band}");
        }
    }

    #[test]
    fn rates_round_half_up() {
        // 1 odd out of 6 → 16.67% → 17; 5 even → 83.33% → 83
        let stats = compute(&[draw(1, [1, 2, 4, 6, 8, 10])]);
        assert_eq!(stats.odd_rate, 17);
        assert_eq!(stats.even_rate, 83);
        // 3 of 6 → exactly 50
        assert_eq!(percent(3, 6), 50);
        // 1 of 8 → 12.5 → 13
        assert_eq!(percent(1, 8), 13);
        // mean 21.5 → 22
        assert_eq!(rounded_mean(43, 2), 22);
    }

    #[test]
    fn band_boundary_is_22() {
        let stats = compute(&[draw(1, [20, 21, 22, 23, 24, 25])]);
        assert_eq!(stats.low_rate, 50);
        assert_eq!(stats.high_rate, 50);
    }

    #[test]
    fn ranking_is_stable_for_ties() {
        let mut counts = [0u32; 45];
        counts[9] = 5; // number 10
        counts[2] = 5; // number 3
        counts[40] = 7; // number 41
        let table = FrequencyTable::from_counts(counts);
        let ranked = rank_by_frequency(&table);
        let top: Vec<u8> = ranked.iter().take(4).map(|e| e.number).collect();
        assert_eq!(top, vec![41, 3, 10, 1]);
        assert_eq!(ranked.last().map(|e| e.number), Some(45));
    }

    #[test]
    fn hot_cold_lists() {
        let mut counts = [1u32; 45];
        counts[0] = 9;
        counts[44] = 0;
        let table = FrequencyTable::from_counts(counts);
        let (hot, cold) = hot_cold(&table, 6);
        assert_eq!(hot.len(), 6);
        assert_eq!(hot[0], NumberCount { number: 1, count: 9 });
        assert_eq!(cold[0], NumberCount { number: 45, count: 0 });
        assert_eq!(cold.len(), 6);
    }
}
