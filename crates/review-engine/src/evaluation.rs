//! Evaluation normalizer: one comparable centipawn scale for centipawn and
//! forced-mate scores, plus the display label.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::review::PlayerColor;

/// Magnitude a forced mate is clamped to on the normalized scale.
pub const MATE_SCORE: i32 = 9999;

/// Centipawn-equivalent score, positive favours the reporting side.
pub type NormalizedScore = i32;

/// An engine or cloud evaluation. Exactly one kind is present; a missing
/// evaluation is `Option::<Evaluation>::None`.
///
/// Serializes as `{"cp": 35}` or `{"mate": -3}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Evaluation {
    #[serde(rename = "cp")]
    Centipawns(i32),
    /// Mate in N; the sign says which side mates.
    #[serde(rename = "mate")]
    Mate(i32),
}

impl Evaluation {
    /// Build from the optional `cp`/`mate` pair most sources report.
    /// A mate score wins when both are present.
    pub fn from_parts(cp: Option<i32>, mate: Option<i32>) -> Option<Self> {
        match (cp, mate) {
            (_, Some(m)) => Some(Self::Mate(m)),
            (Some(c), None) => Some(Self::Centipawns(c)),
            (None, None) => None,
        }
    }

    pub fn cp(self) -> Option<i32> {
        match self {
            Self::Centipawns(cp) => Some(cp),
            Self::Mate(_) => None,
        }
    }

    pub fn mate(self) -> Option<i32> {
        match self {
            Self::Centipawns(_) => None,
            Self::Mate(m) => Some(m),
        }
    }

    /// Same evaluation seen from the other side.
    pub fn flip(self) -> Self {
        match self {
            Self::Centipawns(cp) => Self::Centipawns(-cp),
            Self::Mate(m) => Self::Mate(-m),
        }
    }

    pub fn normalized(self) -> NormalizedScore {
        match self {
            Self::Centipawns(cp) => cp,
            Self::Mate(m) if m > 0 => MATE_SCORE,
            Self::Mate(_) => -MATE_SCORE,
        }
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mate(m) => write!(f, "M{}", m.unsigned_abs()),
            Self::Centipawns(cp) => write!(f, "{:.1}", *cp as f64 / 100.0),
        }
    }
}

/// Normalize an optional evaluation. Absent evaluations are neutral (0).
pub fn normalize(evaluation: Option<Evaluation>) -> NormalizedScore {
    evaluation.map(Evaluation::normalized).unwrap_or(0)
}

/// Human-readable label: `M3` for mates, pawns to one decimal otherwise.
pub fn label(evaluation: Option<Evaluation>) -> String {
    match evaluation {
        Some(e) => e.to_string(),
        None => Evaluation::Centipawns(0).to_string(),
    }
}

/// Express a White-relative score from `mover`'s point of view.
pub fn for_mover(score: NormalizedScore, mover: PlayerColor) -> NormalizedScore {
    match mover {
        PlayerColor::White => score,
        PlayerColor::Black => score.saturating_neg(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_centipawns_is_identity() {
        for cp in [-1200, -51, 0, 1, 35, 9998, 12000] {
            assert_eq!(normalize(Some(Evaluation::Centipawns(cp))), cp);
        }
    }

    #[test]
    fn test_normalize_mate_is_clamped() {
        assert_eq!(normalize(Some(Evaluation::Mate(1))), MATE_SCORE);
        assert_eq!(normalize(Some(Evaluation::Mate(12))), MATE_SCORE);
        assert_eq!(normalize(Some(Evaluation::Mate(-4))), -MATE_SCORE);
    }

    #[test]
    fn test_normalize_missing_is_neutral() {
        assert_eq!(normalize(None), 0);
    }

    #[test]
    fn test_from_parts_prefers_mate() {
        assert_eq!(Evaluation::from_parts(Some(40), None), Some(Evaluation::Centipawns(40)));
        assert_eq!(Evaluation::from_parts(Some(40), Some(2)), Some(Evaluation::Mate(2)));
        assert_eq!(Evaluation::from_parts(None, None), None);
    }

    #[test]
    fn test_labels() {
        assert_eq!(label(Some(Evaluation::Centipawns(35))), "0.3");
        assert_eq!(label(Some(Evaluation::Centipawns(-150))), "-1.5");
        assert_eq!(label(Some(Evaluation::Mate(-3))), "M3");
        assert_eq!(label(None), "0.0");
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_string(&Evaluation::Centipawns(12)).unwrap();
        assert_eq!(json, r#"{"cp":12}"#);
        let back: Evaluation = serde_json::from_str(r#"{"mate":-2}"#).unwrap();
        assert_eq!(back, Evaluation::Mate(-2));
    }

    #[test]
    fn test_for_mover() {
        assert_eq!(for_mover(120, PlayerColor::White), 120);
        assert_eq!(for_mover(120, PlayerColor::Black), -120);
    }
}
