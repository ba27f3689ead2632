//! Move classification and position evaluation pipeline.
//!
//! Evaluations are normalized to a single centipawn scale, consecutive
//! positions are compared to classify each move, and classifications are
//! reduced to a per-player accuracy. Full-game reviews go through the
//! [`coordinator::AnalysisCoordinator`], which runs at most one backend
//! request per game and always settles, if need be with a synthetic review.

pub mod accuracy;
pub mod book;
pub mod classify;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod evaluation;
pub mod live;
pub mod review;
pub mod reviewer;
pub mod source;
pub mod stockfish;
pub mod synthesis;

pub use classify::Classification;
pub use config::{CoordinatorConfig, EngineConfig};
pub use coordinator::{
    AnalysisCache, AnalysisCoordinator, ReviewBackend, ReviewRequest, ReviewState,
};
pub use error::ReviewError;
pub use evaluation::{Evaluation, NormalizedScore};
pub use review::{ByColor, ClassificationCounts, GameAnalysis, MoveClassification, PlayerColor};
pub use reviewer::{Engine, EngineEval, GameReviewer, SearchLimits};
pub use source::{CloudEval, CloudLookup, EvaluationSource, PvLine};
pub use stockfish::StockfishEngine;
