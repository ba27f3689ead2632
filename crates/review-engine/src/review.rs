//! Review result types shared by every pipeline: per-move classifications,
//! per-color counts and the full-game analysis.

use serde::{Deserialize, Serialize};

use crate::accuracy;
use crate::classify::Classification;
use crate::evaluation::NormalizedScore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerColor {
    White,
    Black,
}

impl PlayerColor {
    /// Side that plays the move with 0-based index `move_index`.
    pub fn of_move(move_index: usize) -> Self {
        if move_index % 2 == 0 {
            Self::White
        } else {
            Self::Black
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }
}

impl From<shakmaty::Color> for PlayerColor {
    fn from(color: shakmaty::Color) -> Self {
        match color {
            shakmaty::Color::White => Self::White,
            shakmaty::Color::Black => Self::Black,
        }
    }
}

/// A value per side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByColor<T> {
    pub white: T,
    pub black: T,
}

impl<T> ByColor<T> {
    pub fn get(&self, color: PlayerColor) -> &T {
        match color {
            PlayerColor::White => &self.white,
            PlayerColor::Black => &self.black,
        }
    }

    pub fn get_mut(&mut self, color: PlayerColor) -> &mut T {
        match color {
            PlayerColor::White => &mut self.white,
            PlayerColor::Black => &mut self.black,
        }
    }
}

/// Count of each classification for one side. All eight labels are always
/// present, zero when unused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationCounts {
    pub best: u32,
    pub excellent: u32,
    pub good: u32,
    pub book: u32,
    pub brilliant: u32,
    pub inaccuracy: u32,
    pub mistake: u32,
    pub blunder: u32,
}

impl ClassificationCounts {
    pub fn record(&mut self, classification: Classification) {
        *self.slot(classification) += 1;
    }

    pub fn get(&self, classification: Classification) -> u32 {
        match classification {
            Classification::Best => self.best,
            Classification::Excellent => self.excellent,
            Classification::Good => self.good,
            Classification::Book => self.book,
            Classification::Brilliant => self.brilliant,
            Classification::Inaccuracy => self.inaccuracy,
            Classification::Mistake => self.mistake,
            Classification::Blunder => self.blunder,
        }
    }

    pub fn total(&self) -> u32 {
        Classification::ALL.iter().map(|c| self.get(*c)).sum()
    }

    fn slot(&mut self, classification: Classification) -> &mut u32 {
        match classification {
            Classification::Best => &mut self.best,
            Classification::Excellent => &mut self.excellent,
            Classification::Good => &mut self.good,
            Classification::Book => &mut self.book,
            Classification::Brilliant => &mut self.brilliant,
            Classification::Inaccuracy => &mut self.inaccuracy,
            Classification::Mistake => &mut self.mistake,
            Classification::Blunder => &mut self.blunder,
        }
    }
}

/// One classified move. Evaluations are centipawns from the mover's side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveClassification {
    pub move_index: usize,
    pub classification: Classification,
    pub eval_before: NormalizedScore,
    pub eval_after: NormalizedScore,
    pub color: PlayerColor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub san: Option<String>,
    /// UCI notation of the played move.
    #[serde(default, rename = "move", skip_serializing_if = "Option::is_none")]
    pub uci: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_move: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_drop: Option<i32>,
}

impl MoveClassification {
    pub fn new(
        move_index: usize,
        classification: Classification,
        eval_before: NormalizedScore,
        eval_after: NormalizedScore,
    ) -> Self {
        Self {
            move_index,
            classification,
            eval_before,
            eval_after,
            color: PlayerColor::of_move(move_index),
            san: None,
            uci: None,
            best_move: None,
            eval_drop: None,
        }
    }
}

/// Full-game review result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameAnalysis {
    pub accuracy: ByColor<u32>,
    pub classifications: ByColor<ClassificationCounts>,
    pub moves: Vec<MoveClassification>,
    pub total_moves: usize,
}

impl GameAnalysis {
    /// Build counts and points-based accuracy from classified moves.
    /// `total_moves` is the game's ply count, which may exceed `moves.len()`
    /// when some plies could not be evaluated.
    pub fn from_moves(moves: Vec<MoveClassification>, total_moves: usize) -> Self {
        let mut classifications = ByColor::<ClassificationCounts>::default();
        for m in &moves {
            classifications.get_mut(m.color).record(m.classification);
        }

        let accuracy = ByColor {
            white: accuracy::aggregate(by_color(&moves, PlayerColor::White)),
            black: accuracy::aggregate(by_color(&moves, PlayerColor::Black)),
        };

        Self {
            accuracy,
            classifications,
            moves,
            total_moves,
        }
    }

    /// Analysis of a game with no moves.
    pub fn empty() -> Self {
        Self::from_moves(Vec::new(), 0)
    }
}

fn by_color(
    moves: &[MoveClassification],
    color: PlayerColor,
) -> impl Iterator<Item = Classification> + '_ {
    moves
        .iter()
        .filter(move |m| m.color == color)
        .map(|m| m.classification)
}
