//! Move classification: pure functions only
//! (No Board/Cache/Engine dependencies)

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::evaluation::{self, Evaluation, NormalizedScore};
use crate::review::PlayerColor;

/// Two-evaluation thresholds (absolute centipawn swing)
const THRESHOLD_EXCELLENT: i32 = 50;
const THRESHOLD_GOOD: i32 = 100;
const THRESHOLD_INACCURACY: i32 = 200;
const THRESHOLD_MISTAKE: i32 = 400;

/// Engine-review thresholds (centipawn loss against the best move)
const LOSS_BEST: i32 = 15;
const LOSS_EXCELLENT: i32 = 25;
const LOSS_GOOD: i32 = 50;
const LOSS_INACCURACY: i32 = 100;
const LOSS_MISTAKE: i32 = 200;

/// A move that gives up more than this and still matches the best line is a sacrifice
const SACRIFICE_GAIN: i32 = -100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Best,
    Excellent,
    Good,
    Book,
    Brilliant,
    Inaccuracy,
    Mistake,
    Blunder,
}

impl Classification {
    pub const ALL: [Classification; 8] = [
        Classification::Best,
        Classification::Excellent,
        Classification::Good,
        Classification::Book,
        Classification::Brilliant,
        Classification::Inaccuracy,
        Classification::Mistake,
        Classification::Blunder,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Best => "best",
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Book => "book",
            Self::Brilliant => "brilliant",
            Self::Inaccuracy => "inaccuracy",
            Self::Mistake => "mistake",
            Self::Blunder => "blunder",
        }
    }

    /// Accuracy points awarded for one move of this kind.
    pub fn points(self) -> u32 {
        match self {
            Self::Best | Self::Brilliant => 100,
            Self::Excellent => 95,
            Self::Book => 90,
            Self::Good => 85,
            Self::Inaccuracy => 70,
            Self::Mistake => 40,
            Self::Blunder => 10,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify by the magnitude of the swing between two scores.
/// Depends only on `|after - before|`.
pub fn classify(before: NormalizedScore, after: NormalizedScore) -> Classification {
    let diff = after.saturating_sub(before).saturating_abs();
    if diff <= THRESHOLD_EXCELLENT {
        Classification::Excellent
    } else if diff <= THRESHOLD_GOOD {
        Classification::Good
    } else if diff <= THRESHOLD_INACCURACY {
        Classification::Inaccuracy
    } else if diff <= THRESHOLD_MISTAKE {
        Classification::Mistake
    } else {
        Classification::Blunder
    }
}

/// Classify one ply from White-relative evaluations of the positions before
/// and after it. `None` when either evaluation is missing.
pub fn classify_ply(
    before: Option<Evaluation>,
    after: Option<Evaluation>,
    mover: PlayerColor,
) -> Option<Classification> {
    let before = evaluation::for_mover(before?.normalized(), mover);
    let after = evaluation::for_mover(after?.normalized(), mover);
    Some(classify(before, after))
}

/// Centipawn loss of the played move against the engine's best move.
pub fn eval_loss(after: NormalizedScore, best: NormalizedScore) -> i32 {
    best.saturating_sub(after).saturating_abs()
}

/// Classify a move from engine scores, all from the mover's side:
/// the position before the move, after the played move, and after the
/// engine's best move.
pub fn classify_detailed(
    before: NormalizedScore,
    after: NormalizedScore,
    best: NormalizedScore,
    is_book: bool,
) -> Classification {
    if is_book {
        return Classification::Book;
    }

    let loss = eval_loss(after, best);
    let gain = after.saturating_sub(before);
    if gain < SACRIFICE_GAIN && loss <= LOSS_BEST {
        return Classification::Brilliant;
    }

    if loss <= LOSS_BEST {
        Classification::Best
    } else if loss <= LOSS_EXCELLENT {
        Classification::Excellent
    } else if loss <= LOSS_GOOD {
        Classification::Good
    } else if loss <= LOSS_INACCURACY {
        Classification::Inaccuracy
    } else if loss <= LOSS_MISTAKE {
        Classification::Mistake
    } else {
        Classification::Blunder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_boundaries() {
        let cases = [
            (0, Classification::Excellent),
            (50, Classification::Excellent),
            (51, Classification::Good),
            (100, Classification::Good),
            (101, Classification::Inaccuracy),
            (200, Classification::Inaccuracy),
            (201, Classification::Mistake),
            (400, Classification::Mistake),
            (401, Classification::Blunder),
        ];
        for (diff, expected) in cases {
            assert_eq!(classify(0, diff), expected, "diff {diff}");
            assert_eq!(classify(300, 300 - diff), expected, "diff -{diff}");
        }
    }

    #[test]
    fn test_classify_is_symmetric() {
        for (a, b) in [(0, 75), (-300, 120), (9999, -9999), (42, 42)] {
            assert_eq!(classify(a, b), classify(b, a));
        }
    }

    #[test]
    fn test_extreme_scores_do_not_overflow() {
        assert_eq!(classify(i32::MIN, i32::MAX), Classification::Blunder);
        assert_eq!(classify(i32::MAX, i32::MIN), Classification::Blunder);
        assert_eq!(eval_loss(i32::MIN, i32::MAX), i32::MAX);
        assert_eq!(
            classify_detailed(i32::MAX, i32::MIN, i32::MAX, false),
            Classification::Blunder
        );
    }

    #[test]
    fn test_classify_ply_missing_eval() {
        assert_eq!(
            classify_ply(None, Some(Evaluation::Centipawns(10)), PlayerColor::White),
            None
        );
        assert_eq!(
            classify_ply(Some(Evaluation::Centipawns(10)), None, PlayerColor::Black),
            None
        );
    }

    #[test]
    fn test_classify_ply_mate_swing() {
        let c = classify_ply(
            Some(Evaluation::Centipawns(30)),
            Some(Evaluation::Mate(-2)),
            PlayerColor::White,
        );
        assert_eq!(c, Some(Classification::Blunder));
    }

    #[test]
    fn test_classify_detailed() {
        assert_eq!(classify_detailed(0, 0, 0, true), Classification::Book);
        assert_eq!(classify_detailed(30, 20, 35, false), Classification::Best);
        assert_eq!(classify_detailed(30, 10, 35, false), Classification::Excellent);
        assert_eq!(classify_detailed(30, -15, 35, false), Classification::Good);
        assert_eq!(classify_detailed(30, -65, 35, false), Classification::Inaccuracy);
        assert_eq!(classify_detailed(30, -165, 35, false), Classification::Mistake);
        assert_eq!(classify_detailed(30, -166, 35, false), Classification::Blunder);
    }

    #[test]
    fn test_sacrifice_matching_best_line_is_brilliant() {
        // Material down on the board but exactly the engine's line
        assert_eq!(classify_detailed(250, 100, 110, false), Classification::Brilliant);
        // Same drop off the best line is just a mistake
        assert_eq!(classify_detailed(250, 100, 250, false), Classification::Mistake);
    }

    #[test]
    fn test_points() {
        let total: u32 = Classification::ALL.iter().map(|c| c.points()).sum();
        assert_eq!(total, 100 + 95 + 85 + 90 + 100 + 70 + 40 + 10);
    }
}
