//! Cloud evaluation lookups.
//!
//! The wire shape follows the Lichess cloud-eval API: scores are White-relative
//! and each principal variation carries either `cp` or `mate`.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::ReviewError;
use crate::evaluation::Evaluation;

/// One principal variation of a cloud (or engine) evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PvLine {
    /// Space-separated UCI moves
    pub moves: String,
    #[serde(default)]
    pub cp: Option<i32>,
    #[serde(default)]
    pub mate: Option<i32>,
}

impl PvLine {
    pub fn evaluation(&self) -> Option<Evaluation> {
        Evaluation::from_parts(self.cp, self.mate)
    }

    pub fn first_move(&self) -> Option<&str> {
        self.moves.split_whitespace().next()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudEval {
    pub fen: String,
    #[serde(default)]
    pub knodes: u64,
    #[serde(default)]
    pub depth: u32,
    #[serde(default)]
    pub pvs: Vec<PvLine>,
}

impl CloudEval {
    /// Result with no lines, used when nothing could evaluate the position.
    pub fn empty(fen: &str) -> Self {
        Self {
            fen: fen.to_string(),
            knodes: 0,
            depth: 0,
            pvs: Vec::new(),
        }
    }

    /// Evaluation of the principal line.
    pub fn evaluation(&self) -> Option<Evaluation> {
        self.pvs.first().and_then(PvLine::evaluation)
    }

    pub fn best_move(&self) -> Option<&str> {
        self.pvs.first().and_then(PvLine::first_move)
    }

    pub fn has_lines(&self) -> bool {
        !self.pvs.is_empty()
    }
}

/// Outcome of a lookup that reached the source. A position the source has
/// never analyzed is `NotFound`, which is not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloudLookup {
    Found(CloudEval),
    NotFound,
}

impl CloudLookup {
    pub fn evaluation(&self) -> Option<Evaluation> {
        match self {
            Self::Found(eval) => eval.evaluation(),
            Self::NotFound => None,
        }
    }
}

/// Read-only source of position evaluations keyed by FEN.
pub trait EvaluationSource: Send + Sync {
    fn lookup(
        &self,
        fen: &str,
        multi_pv: u32,
    ) -> impl Future<Output = Result<CloudLookup, ReviewError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cloud_eval() {
        let body = r#"{
            "fen": "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1",
            "knodes": 113074,
            "depth": 40,
            "pvs": [
                {"moves": "c7c5 g1f3 d7d6", "cp": 26},
                {"moves": "e7e5 g1f3 b8c6", "cp": 30}
            ]
        }"#;
        let eval: CloudEval = serde_json::from_str(body).unwrap();
        assert_eq!(eval.depth, 40);
        assert_eq!(eval.pvs.len(), 2);
        assert_eq!(eval.evaluation(), Some(Evaluation::Centipawns(26)));
        assert_eq!(eval.best_move(), Some("c7c5"));
    }

    #[test]
    fn test_parse_mate_line() {
        let body = r#"{"fen": "x", "pvs": [{"moves": "d8h4", "mate": 1}]}"#;
        let eval: CloudEval = serde_json::from_str(body).unwrap();
        assert_eq!(eval.evaluation(), Some(Evaluation::Mate(1)));
        assert_eq!(eval.knodes, 0);
    }

    #[test]
    fn test_empty_has_no_evaluation() {
        let eval = CloudEval::empty("8/8/8/8/8/8/8/8 w - - 0 1");
        assert!(!eval.has_lines());
        assert_eq!(eval.evaluation(), None);
        assert_eq!(CloudLookup::NotFound.evaluation(), None);
    }
}
