//! Live per-position review over a cloud evaluation source.
//!
//! Every position of the game, start position included, is looked up once.
//! Consecutive evaluations then classify the move between them.

use chess_core::GameReplay;
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use crate::accuracy;
use crate::classify::{self, Classification};
use crate::evaluation::{self, Evaluation, NormalizedScore};
use crate::review::{ByColor, PlayerColor};
use crate::source::{CloudEval, CloudLookup, EvaluationSource};

/// Lookups issued concurrently
pub const LOOKUP_BATCH: usize = 5;

/// One position of the game. `ply` 0 is the start position; ply `k` is the
/// position after the k-th half-move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LivePly {
    pub ply: usize,
    pub fen: String,
    /// Move that produced this position
    #[serde(skip_serializing_if = "Option::is_none")]
    pub san: Option<String>,
    pub evaluation: Option<Evaluation>,
    /// Engine's preferred move here, UCI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_move: Option<String>,
    /// White-relative normalized score
    pub score: NormalizedScore,
    pub label: String,
    pub classification: Option<Classification>,
}

impl LivePly {
    pub fn mover(&self) -> Option<PlayerColor> {
        self.ply.checked_sub(1).map(PlayerColor::of_move)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveReview {
    pub plies: Vec<LivePly>,
    pub accuracy: ByColor<u32>,
}

impl LiveReview {
    /// Plies that carry a move, i.e. all but the start position.
    pub fn moves(&self) -> impl Iterator<Item = &LivePly> {
        self.plies.iter().skip(1)
    }
}

/// Look up every FEN, [`LOOKUP_BATCH`] at a time. Missing or failed lookups
/// are `None`; the output is aligned with `fens`.
pub async fn evaluate_positions<S: EvaluationSource>(
    source: &S,
    fens: &[String],
) -> Vec<Option<CloudEval>> {
    let mut evaluations = Vec::with_capacity(fens.len());
    for batch in fens.chunks(LOOKUP_BATCH) {
        let results = join_all(batch.iter().map(|fen| lookup(source, fen))).await;
        evaluations.extend(results);
    }
    evaluations
}

async fn lookup<S: EvaluationSource>(source: &S, fen: &str) -> Option<CloudEval> {
    match source.lookup(fen, 1).await {
        Ok(CloudLookup::Found(eval)) => Some(eval),
        Ok(CloudLookup::NotFound) => {
            debug!(fen, "Position not in cloud");
            None
        }
        Err(e) => {
            warn!(fen, error = %e, "Cloud lookup failed");
            None
        }
    }
}

/// Assemble the review from per-position evaluations aligned with the
/// replay's positions.
pub fn build_live_review(replay: &GameReplay, lookups: &[Option<CloudEval>]) -> LiveReview {
    let sans = replay.san_moves();
    let evaluations: Vec<Option<Evaluation>> = lookups
        .iter()
        .map(|l| l.as_ref().and_then(CloudEval::evaluation))
        .collect();
    let mut diffs = ByColor::<Vec<i32>>::default();

    let plies = replay
        .fens()
        .into_iter()
        .enumerate()
        .map(|(ply, fen)| {
            let evaluation = evaluations.get(ply).copied().flatten();
            let classification = ply.checked_sub(1).and_then(|prev| {
                let before = evaluations.get(prev).copied().flatten();
                let mover = PlayerColor::of_move(prev);
                let c = classify::classify_ply(before, evaluation, mover)?;
                if let (Some(b), Some(a)) = (before, evaluation) {
                    diffs.get_mut(mover).push(
                        evaluation::for_mover(a.normalized(), mover)
                            - evaluation::for_mover(b.normalized(), mover),
                    );
                }
                Some(c)
            });

            LivePly {
                ply,
                fen,
                san: ply.checked_sub(1).and_then(|i| sans.get(i).cloned()),
                evaluation,
                best_move: lookups
                    .get(ply)
                    .and_then(Option::as_ref)
                    .and_then(|l| l.best_move())
                    .map(str::to_string),
                score: evaluation::normalize(evaluation),
                label: evaluation::label(evaluation),
                classification,
            }
        })
        .collect();

    let accuracy = ByColor {
        white: accuracy::accuracy_from_diffs(diffs.white),
        black: accuracy::accuracy_from_diffs(diffs.black),
    };

    LiveReview { plies, accuracy }
}

/// Evaluate and classify every position of `replay`.
pub async fn review_live<S: EvaluationSource>(source: &S, replay: &GameReplay) -> LiveReview {
    let fens = replay.fens();
    let lookups = evaluate_positions(source, &fens).await;
    build_live_review(replay, &lookups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::PvLine;

    fn cloud(evaluation: Evaluation) -> Option<CloudEval> {
        let (cp, mate) = (evaluation.cp(), evaluation.mate());
        Some(CloudEval {
            fen: String::new(),
            knodes: 1000,
            depth: 30,
            pvs: vec![PvLine {
                moves: "e2e4 e7e5".into(),
                cp,
                mate,
            }],
        })
    }

    fn replay() -> GameReplay {
        GameReplay::from_san_moves(&["e4", "e5", "Qh5", "Ke7"]).unwrap()
    }

    #[test]
    fn test_first_ply_is_never_classified() {
        let evals = vec![cloud(Evaluation::Centipawns(20)); 5];
        let review = build_live_review(&replay(), &evals);
        assert_eq!(review.plies.len(), 5);
        assert_eq!(review.plies[0].classification, None);
        assert_eq!(review.plies[0].san, None);
        assert_eq!(review.plies[1].san.as_deref(), Some("e4"));
        assert_eq!(review.plies[1].best_move.as_deref(), Some("e2e4"));
        assert!(review.moves().all(|p| p.classification == Some(Classification::Excellent)));
        assert_eq!(review.accuracy, ByColor { white: 100, black: 100 });
    }

    #[test]
    fn test_missing_evaluation_leaves_neighbours_unclassified() {
        let evals = vec![
            cloud(Evaluation::Centipawns(20)),
            cloud(Evaluation::Centipawns(30)),
            None,
            cloud(Evaluation::Centipawns(40)),
            cloud(Evaluation::Centipawns(600)),
        ];
        let review = build_live_review(&replay(), &evals);
        assert_eq!(review.plies[1].classification, Some(Classification::Excellent));
        assert_eq!(review.plies[2].classification, None);
        assert_eq!(review.plies[3].classification, None);
        assert_eq!(review.plies[4].classification, Some(Classification::Blunder));
        assert_eq!(review.plies[2].label, "0.0");
        // White: one clean swing; Black: one blunder swing
        assert_eq!(review.accuracy, ByColor { white: 100, black: 0 });
    }

    #[test]
    fn test_black_moves_are_flipped() {
        let evals = vec![
            cloud(Evaluation::Centipawns(0)),
            cloud(Evaluation::Centipawns(0)),
            // Black's reply hands White a mate
            cloud(Evaluation::Mate(3)),
        ];
        let replay = GameReplay::from_san_moves(&["f3", "e5"]).unwrap();
        let review = build_live_review(&replay, &evals);
        assert_eq!(review.plies[2].classification, Some(Classification::Blunder));
        assert_eq!(review.plies[2].score, 9999);
        assert_eq!(review.plies[2].label, "M3");
        assert_eq!(review.plies[2].mover(), Some(PlayerColor::Black));
    }
}
