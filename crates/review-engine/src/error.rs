//! Review engine error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Replay error: {0}")]
    Replay(#[from] chess_core::ReplayError),

    #[error("Stockfish error: {0}")]
    Stockfish(String),

    #[error("Evaluation source error: {0}")]
    Source(String),

    #[error("Review backend error: {0}")]
    Backend(String),

    #[error("Invalid FEN: {0}")]
    InvalidFen(String),
}
