//! Game transcript handling shared by the review engine and the server.
//!
//! Regex-based PGN header/move extraction, Chess.com PGN cleanup, and the
//! replay boundary over `shakmaty` that turns a move list into positions.

pub mod game_data;
pub mod pgn;
pub mod replay;

pub use game_data::{GameData, GameIdentity, GameMetadata};
pub use replay::{GameReplay, ReplayError};
