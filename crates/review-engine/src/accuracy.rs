//! Accuracy aggregation, per color.

use crate::classify::Classification;
use crate::evaluation::NormalizedScore;

/// Accuracy of a side that made no moves.
pub const NEUTRAL_ACCURACY: u32 = 50;

/// Average classification points over one side's moves, rounded.
/// A side with no moves scores [`NEUTRAL_ACCURACY`].
pub fn aggregate<I>(classifications: I) -> u32
where
    I: IntoIterator<Item = Classification>,
{
    let (sum, count) = classifications
        .into_iter()
        .fold((0u32, 0u32), |(sum, count), c| (sum + c.points(), count + 1));

    if count == 0 {
        return NEUTRAL_ACCURACY;
    }
    (sum as f64 / count as f64).round() as u32
}

/// Weight of one evaluation swing in the live accuracy score.
fn diff_weight(diff: i32) -> f64 {
    match diff.abs() {
        0..=50 => 1.0,
        51..=100 => 0.8,
        101..=200 => 0.5,
        201..=400 => 0.2,
        _ => 0.0,
    }
}

/// Live accuracy over raw swings: the mean weight as a percentage.
/// No swings at all scores 100.
pub fn accuracy_from_diffs<I>(diffs: I) -> u32
where
    I: IntoIterator<Item = i32>,
{
    let (total, count) = diffs
        .into_iter()
        .fold((0.0, 0u32), |(total, count), d| (total + diff_weight(d), count + 1));

    if count == 0 {
        return 100;
    }
    (total / count as f64 * 100.0).round() as u32
}

/// Live accuracy over a sequence of evaluations, compared pairwise.
/// Fewer than two evaluations scores 100.
pub fn calculate_accuracy(evals: &[NormalizedScore]) -> u32 {
    accuracy_from_diffs(evals.windows(2).map(|w| w[1] - w[0]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_empty_is_neutral() {
        assert_eq!(aggregate(Vec::<Classification>::new()), 50);
    }

    #[test]
    fn test_aggregate_rounds() {
        // (100 + 85 + 40) / 3 = 75.0
        let c = [Classification::Best, Classification::Good, Classification::Mistake];
        assert_eq!(aggregate(c), 75);
        // (95 + 10) / 2 = 52.5
        assert_eq!(aggregate([Classification::Excellent, Classification::Blunder]), 53);
    }

    #[test]
    fn test_single_eval_is_perfect() {
        for x in [-9999, -300, 0, 77, 9999] {
            assert_eq!(calculate_accuracy(&[x]), 100);
        }
        assert_eq!(calculate_accuracy(&[]), 100);
    }

    #[test]
    fn test_unchanged_evals_are_perfect() {
        assert_eq!(calculate_accuracy(&[0, 0, 0]), 100);
    }

    #[test]
    fn test_weighted_buckets() {
        // swings of 80 (0.8) and 300 (0.2)
        assert_eq!(calculate_accuracy(&[0, 80, -220]), 50);
        // one blunder swing
        assert_eq!(calculate_accuracy(&[0, 500]), 0);
        assert_eq!(accuracy_from_diffs([50, -150]), 75);
    }
}
