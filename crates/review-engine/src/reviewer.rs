//! Engine-backed full-game review.
//!
//! Each move is scored three times: the position before it, the position it
//! produced, and the position the engine's best move would have produced.
//! All three are turned to the mover's side before classification.

use std::future::Future;

use chess_core::replay::fen_of;
use chess_core::GameReplay;
use shakmaty::uci::UciMove;
use shakmaty::{Chess, Position};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::book;
use crate::classify::{self, Classification};
use crate::coordinator::{ReviewBackend, ReviewRequest};
use crate::error::ReviewError;
use crate::evaluation::{Evaluation, NormalizedScore};
use crate::review::{GameAnalysis, MoveClassification};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub depth: u32,
    pub movetime_ms: u64,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            depth: 15,
            movetime_ms: 3000,
        }
    }
}

/// Result of a single position search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineEval {
    /// Score from the side to move
    pub evaluation: Option<Evaluation>,
    /// Best move in UCI notation
    pub best_move: Option<String>,
    pub pv: Vec<String>,
    pub depth: u32,
}

/// A UCI-style engine that can score a position.
pub trait Engine: Send {
    fn evaluate(
        &mut self,
        fen: &str,
        limits: SearchLimits,
    ) -> impl Future<Output = Result<EngineEval, ReviewError>> + Send;
}

/// Reviews whole games with one engine. Reviews are serialized on the engine.
pub struct GameReviewer<E> {
    engine: Mutex<E>,
    limits: SearchLimits,
}

impl<E: Engine> GameReviewer<E> {
    pub fn new(engine: E, limits: SearchLimits) -> Self {
        Self {
            engine: Mutex::new(engine),
            limits,
        }
    }

    pub async fn review_pgn(&self, pgn: &str) -> Result<GameAnalysis, ReviewError> {
        let replay = GameReplay::from_pgn(pgn)?;
        self.review_replay(&replay).await
    }

    /// Review every move. Moves whose positions cannot be scored are left out
    /// of the result but still count towards `total_moves`. Errors when the
    /// engine failed and not a single move could be classified.
    pub async fn review_replay(&self, replay: &GameReplay) -> Result<GameAnalysis, ReviewError> {
        let mut engine = self.engine.lock().await;
        let mut moves = Vec::with_capacity(replay.len());
        let mut last_error = None;

        for ply in 0..replay.len() {
            match review_move(&mut *engine, replay, ply, self.limits).await {
                Ok(Some(m)) => moves.push(m),
                Ok(None) => debug!(ply, "No evaluation, skipping move"),
                Err(e) => {
                    warn!(ply, error = %e, "Skipping move that could not be evaluated");
                    last_error = Some(e);
                }
            }
        }

        // An engine that failed on every move has produced no review at all
        if moves.is_empty() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        info!(plies = replay.len(), classified = moves.len(), "Reviewed game");
        Ok(GameAnalysis::from_moves(moves, replay.len()))
    }
}

impl<E: Engine + 'static> ReviewBackend for GameReviewer<E> {
    async fn review(&self, request: &ReviewRequest) -> Result<GameAnalysis, ReviewError> {
        self.review_pgn(&request.pgn).await
    }
}

async fn review_move<E: Engine>(
    engine: &mut E,
    replay: &GameReplay,
    ply: usize,
    limits: SearchLimits,
) -> Result<Option<MoveClassification>, ReviewError> {
    let (Some(before_pos), Some(after_pos)) = (replay.position(ply), replay.position(ply + 1))
    else {
        return Ok(None);
    };

    let before = engine.evaluate(&fen_of(before_pos), limits).await?;
    let Some(before_eval) = before.evaluation else {
        return Ok(None);
    };
    let before_score = before_eval.normalized();

    // The opponent is to move after the played move
    let Some(after_eval) = engine.evaluate(&fen_of(after_pos), limits).await?.evaluation else {
        return Ok(None);
    };
    let after_score = -after_eval.normalized();

    let played = replay.uci_at(ply);
    let best_score = match before.best_move.as_deref() {
        Some(best) if Some(best) == played.as_deref() => after_score,
        Some(best) => match play_uci(before_pos, best) {
            Some(pos) => best_line_score(engine, &pos, limits, before_score).await,
            None => before_score,
        },
        None => before_score,
    };

    let move_number = (ply / 2 + 1) as u32;
    let is_book = book::is_book_position(after_pos, move_number);
    let classification = classify::classify_detailed(before_score, after_score, best_score, is_book);

    let mut m = MoveClassification::new(ply, classification, before_score, after_score);
    m.san = replay.san_moves().get(ply).cloned();
    m.uci = played;
    m.best_move = before.best_move;
    if classification != Classification::Book {
        m.eval_drop = Some(classify::eval_loss(after_score, best_score));
    }
    Ok(Some(m))
}

/// Mover-side score after the best move, or `fallback` if that search fails.
async fn best_line_score<E: Engine>(
    engine: &mut E,
    pos: &Chess,
    limits: SearchLimits,
    fallback: NormalizedScore,
) -> NormalizedScore {
    match engine.evaluate(&fen_of(pos), limits).await {
        Ok(eval) => eval.evaluation.map(|e| -e.normalized()).unwrap_or(fallback),
        Err(e) => {
            warn!(error = %e, "Best-move search failed");
            fallback
        }
    }
}

fn play_uci(pos: &Chess, uci: &str) -> Option<Chess> {
    let uci: UciMove = uci.parse().ok()?;
    let mv = uci.to_move(pos).ok()?;
    let mut next = pos.clone();
    next.play_unchecked(mv);
    Some(next)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[derive(Default)]
    struct ScriptedEngine {
        evals: HashMap<String, EngineEval>,
        failing: Vec<String>,
    }

    impl ScriptedEngine {
        fn score(mut self, fen: String, cp: i32, best: Option<&str>) -> Self {
            self.evals.insert(
                fen,
                EngineEval {
                    evaluation: Some(Evaluation::Centipawns(cp)),
                    best_move: best.map(str::to_string),
                    pv: Vec::new(),
                    depth: 20,
                },
            );
            self
        }
    }

    impl Engine for ScriptedEngine {
        async fn evaluate(&mut self, fen: &str, _limits: SearchLimits) -> Result<EngineEval, ReviewError> {
            if self.failing.iter().any(|f| f == fen) {
                return Err(ReviewError::Stockfish("scripted failure".into()));
            }
            Ok(self.evals.get(fen).cloned().unwrap_or(EngineEval {
                evaluation: Some(Evaluation::Centipawns(0)),
                ..EngineEval::default()
            }))
        }
    }

    fn fen_after(sans: &[&str]) -> String {
        let replay = GameReplay::from_san_moves(sans).unwrap();
        replay.fen_at(sans.len()).unwrap()
    }

    #[tokio::test]
    async fn test_opening_moves_are_book() {
        let reviewer = GameReviewer::new(ScriptedEngine::default(), SearchLimits::default());
        let analysis = reviewer.review_pgn("1. e4 e5 *").await.unwrap();

        assert_eq!(analysis.total_moves, 2);
        assert!(analysis
            .moves
            .iter()
            .all(|m| m.classification == Classification::Book));
        assert_eq!(analysis.accuracy.white, 90);
        assert_eq!(analysis.accuracy.black, 90);
    }

    #[tokio::test]
    async fn test_book_is_judged_on_the_resulting_position() {
        // Played from the start position, which is in the table
        let reviewer = GameReviewer::new(ScriptedEngine::default(), SearchLimits::default());
        let analysis = reviewer.review_pgn("1. a4 *").await.unwrap();

        assert_eq!(analysis.moves.len(), 1);
        assert_ne!(analysis.moves[0].classification, Classification::Book);
        assert!(analysis.moves[0].eval_drop.is_some());
    }

    #[tokio::test]
    async fn test_loss_against_best_move() {
        let engine = ScriptedEngine::default()
            .score(fen_after(&[]), 30, Some("e2e4"))
            .score(fen_after(&["a4"]), 60, None)
            .score(fen_after(&["e4"]), -25, None);
        let reviewer = GameReviewer::new(engine, SearchLimits::default());
        let replay = GameReplay::from_san_moves(&["a4"]).unwrap();
        let analysis = reviewer.review_replay(&replay).await.unwrap();

        let m = &analysis.moves[0];
        assert_eq!(m.eval_before, 30);
        assert_eq!(m.eval_after, -60);
        assert_eq!(m.eval_drop, Some(85));
        assert_eq!(m.classification, Classification::Inaccuracy);
        assert_eq!(m.uci.as_deref(), Some("a2a4"));
        assert_eq!(m.best_move.as_deref(), Some("e2e4"));
    }

    #[tokio::test]
    async fn test_unevaluated_move_is_skipped() {
        let mut engine = ScriptedEngine::default();
        engine.failing.push(fen_after(&["a4", "h5"]));
        let reviewer = GameReviewer::new(engine, SearchLimits::default());
        let replay = GameReplay::from_san_moves(&["a4", "h5"]).unwrap();
        let analysis = reviewer.review_replay(&replay).await.unwrap();

        assert_eq!(analysis.total_moves, 2);
        assert_eq!(analysis.moves.len(), 1);
        assert_eq!(analysis.moves[0].move_index, 0);
        assert_eq!(analysis.accuracy.black, 50);
    }

    #[tokio::test]
    async fn test_engine_down_is_an_error() {
        let replay = GameReplay::from_san_moves(&["a4", "h5"]).unwrap();
        let engine = ScriptedEngine {
            failing: replay.fens(),
            ..ScriptedEngine::default()
        };
        let reviewer = GameReviewer::new(engine, SearchLimits::default());

        let err = reviewer.review_replay(&replay).await.unwrap_err();
        assert!(matches!(err, ReviewError::Stockfish(_)));
    }

    #[tokio::test]
    async fn test_invalid_pgn_is_an_error() {
        let reviewer = GameReviewer::new(ScriptedEngine::default(), SearchLimits::default());
        assert!(reviewer.review_pgn("1. e4 e4").await.is_err());
    }
}
