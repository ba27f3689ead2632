//! Replay boundary over `shakmaty`: a validated move list plus the position
//! after every ply.

use std::ops::ControlFlow;

use pgn_reader::{RawTag, Reader, SanPlus, Visitor};
use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Move, Position};

use crate::pgn;

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("Failed to read PGN: {0}")]
    Io(#[from] std::io::Error),

    #[error("No valid moves found in PGN")]
    NoMoves,

    #[error("Unparseable move at ply {ply}: {san}")]
    InvalidSan { ply: usize, san: String },

    #[error("Illegal move at ply {ply}: {san}")]
    IllegalMove { ply: usize, san: String },
}

/// Collects the mainline SAN tokens of the first game in a PGN.
/// Variations are skipped by the reader's default.
struct MainlineCollector;

impl Visitor for MainlineCollector {
    type Tags = ();
    type Movetext = Vec<String>;
    type Output = Vec<String>;

    fn begin_tags(&mut self) -> ControlFlow<Vec<String>, ()> {
        ControlFlow::Continue(())
    }

    fn tag(&mut self, _tags: &mut (), _name: &[u8], _value: RawTag<'_>) -> ControlFlow<Vec<String>> {
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, _tags: ()) -> ControlFlow<Vec<String>, Vec<String>> {
        ControlFlow::Continue(Vec::new())
    }

    fn san(&mut self, moves: &mut Vec<String>, san_plus: SanPlus) -> ControlFlow<Vec<String>> {
        moves.push(san_plus.san.to_string());
        ControlFlow::Continue(())
    }

    fn end_game(&mut self, moves: Vec<String>) -> Vec<String> {
        moves
    }
}

/// A game replayed from the standard start position.
///
/// `positions[0]` is the start position and `positions[k]` the position after
/// `k` plies, so there is always one more position than moves.
#[derive(Debug, Clone)]
pub struct GameReplay {
    sans: Vec<String>,
    moves: Vec<Move>,
    positions: Vec<Chess>,
}

impl GameReplay {
    /// Parse a PGN transcript and validate every mainline move.
    ///
    /// If the strict reader finds no moves (typical for single-line Chess.com
    /// exports), the transcript is cleaned and read again.
    pub fn from_pgn(pgn_text: &str) -> Result<Self, ReplayError> {
        let mut sans = read_mainline(pgn_text)?;
        if sans.is_empty() {
            tracing::debug!("Direct PGN read found no moves, retrying on cleaned transcript");
            sans = read_mainline(&pgn::clean_pgn(pgn_text))?;
        }
        if sans.is_empty() {
            return Err(ReplayError::NoMoves);
        }
        Self::from_san_moves(&sans)
    }

    /// Replay a list of SAN moves from the standard start position.
    pub fn from_san_moves<S: AsRef<str>>(san_moves: &[S]) -> Result<Self, ReplayError> {
        let mut pos = Chess::default();
        let mut sans = Vec::with_capacity(san_moves.len());
        let mut moves = Vec::with_capacity(san_moves.len());
        let mut positions = Vec::with_capacity(san_moves.len() + 1);
        positions.push(pos.clone());

        for (ply, raw) in san_moves.iter().enumerate() {
            let token = raw
                .as_ref()
                .trim()
                .trim_end_matches(['+', '#', '!', '?']);
            let san: San = token.parse().map_err(|_| ReplayError::InvalidSan {
                ply,
                san: raw.as_ref().to_string(),
            })?;
            let mv = san.to_move(&pos).map_err(|_| ReplayError::IllegalMove {
                ply,
                san: raw.as_ref().to_string(),
            })?;

            sans.push(san.to_string());
            moves.push(mv.clone());
            pos.play_unchecked(mv);
            positions.push(pos.clone());
        }

        Ok(Self {
            sans,
            moves,
            positions,
        })
    }

    /// Number of plies.
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn san_moves(&self) -> &[String] {
        &self.sans
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    /// UCI notation of the move played at `ply`.
    pub fn uci_at(&self, ply: usize) -> Option<String> {
        self.moves
            .get(ply)
            .map(|m| m.to_uci(CastlingMode::Standard).to_string())
    }

    /// Position after `k` plies (`k = 0` is the start position).
    pub fn position(&self, k: usize) -> Option<&Chess> {
        self.positions.get(k)
    }

    /// FEN after `k` plies.
    pub fn fen_at(&self, k: usize) -> Option<String> {
        self.positions.get(k).map(fen_of)
    }

    /// FEN of every position, start position first.
    pub fn fens(&self) -> Vec<String> {
        self.positions.iter().map(fen_of).collect()
    }

    /// Side that played the move at `ply`.
    pub fn mover(&self, ply: usize) -> Color {
        if ply % 2 == 0 {
            Color::White
        } else {
            Color::Black
        }
    }
}

pub fn fen_of(pos: &Chess) -> String {
    Fen::from_position(pos, EnPassantMode::Legal).to_string()
}

fn read_mainline(pgn_text: &str) -> Result<Vec<String>, ReplayError> {
    let mut reader = Reader::new(pgn_text.as_bytes());
    Ok(reader.read_game(&mut MainlineCollector)?.unwrap_or_default())
}
