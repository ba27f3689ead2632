//! Deterministic stand-in review for games the backend could not analyze.
//!
//! The output is seeded from the game's identity fields only, so the same
//! game always gets the same classifications and accuracy.

use chess_core::pgn;

use crate::classify::Classification;
use crate::coordinator::ReviewRequest;
use crate::evaluation::{self, NormalizedScore};
use crate::review::{GameAnalysis, MoveClassification, PlayerColor};

/// Plies eligible for a synthetic book label
const BOOK_PLIES: usize = 8;
const BOOK_CHANCE: f64 = 0.6;

/// White-relative score the synthetic walk starts from
const START_SCORE: NormalizedScore = 20;
/// The walk never leaves this band
const SCORE_LIMIT: NormalizedScore = 1500;

/// Offsets keeping the independent draws of one ply apart
const BOOK_DRAW: u32 = 100;
const DROP_DRAW: u32 = 1000;

/// 32-bit string hash, `h = h * 31 + unit` over UTF-16 code units with
/// wrapping arithmetic.
pub fn string_hash(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as i32))
}

/// Seeded generator: the fractional part of `|sin(seed + i) * 10000|`.
#[derive(Debug, Clone, Copy)]
pub struct SeededRandom {
    seed: f64,
}

impl SeededRandom {
    pub fn new(seed: i32) -> Self {
        Self {
            seed: (seed as f64).abs(),
        }
    }

    pub fn for_request(request: &ReviewRequest) -> Self {
        let key = format!(
            "{}|{}|{}|{}",
            request.pgn, request.white, request.black, request.end_time
        );
        Self::new(string_hash(&key))
    }

    /// Value in `[0, 1)` for draw number `i`.
    pub fn at(&self, i: u32) -> f64 {
        ((self.seed + i as f64).sin() * 10000.0).abs().fract()
    }
}

fn label_for(r: f64) -> Classification {
    match r {
        r if r < 0.03 => Classification::Brilliant,
        r if r < 0.38 => Classification::Best,
        r if r < 0.58 => Classification::Excellent,
        r if r < 0.78 => Classification::Good,
        r if r < 0.89 => Classification::Inaccuracy,
        r if r < 0.96 => Classification::Mistake,
        _ => Classification::Blunder,
    }
}

/// Centipawn drop range, from the mover's side, consistent with a label.
fn drop_range(classification: Classification) -> (i32, i32) {
    match classification {
        Classification::Book | Classification::Brilliant => (0, 10),
        Classification::Best => (0, 15),
        Classification::Excellent => (16, 25),
        Classification::Good => (26, 50),
        Classification::Inaccuracy => (51, 100),
        Classification::Mistake => (101, 200),
        Classification::Blunder => (201, 400),
    }
}

/// Build the synthetic review of `request`'s game.
pub fn synthesize(request: &ReviewRequest) -> GameAnalysis {
    let sans = pgn::extract_moves(&request.pgn);
    let rng = SeededRandom::for_request(request);

    let mut score = START_SCORE;
    let mut moves = Vec::with_capacity(sans.len());

    for (i, san) in sans.iter().enumerate() {
        let draw = i as u32;
        let color = PlayerColor::of_move(i);

        let classification = if i < BOOK_PLIES && rng.at(draw + BOOK_DRAW) < BOOK_CHANCE {
            Classification::Book
        } else {
            label_for(rng.at(draw))
        };

        let (lo, hi) = drop_range(classification);
        let span = (hi - lo + 1) as f64;
        let drop = (lo + (rng.at(draw + DROP_DRAW) * span) as i32).min(hi);

        let before = evaluation::for_mover(score, color);
        score = evaluation::for_mover(before - drop, color).clamp(-SCORE_LIMIT, SCORE_LIMIT);
        let after = evaluation::for_mover(score, color);

        let mut m = MoveClassification::new(i, classification, before, after);
        m.san = Some(san.trim_end_matches(['+', '#']).to_string());
        m.eval_drop = Some(before - after);
        moves.push(m);
    }

    tracing::debug!(
        game = %request.identity,
        plies = moves.len(),
        "Synthesized fallback review"
    );

    let total = moves.len();
    GameAnalysis::from_moves(moves, total)
}
