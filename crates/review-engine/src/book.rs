//! Opening book detection for the engine reviewer.

use std::collections::HashSet;
use std::sync::LazyLock;

use chess_core::replay::fen_of;
use shakmaty::{Bitboard, Chess, Color, Position, Role, Square};

/// Moves past this full-move number are never book
pub const BOOK_MOVE_LIMIT: u32 = 15;

/// Up to this full-move number, sound development also counts as book
const PRINCIPLES_MOVE_LIMIT: u32 = 6;

/// Common opening positions: placement, side to move, castling, en passant.
static OPENING_BOOK: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        // Start position
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -",
        // 1.e4 and replies
        "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq -",
        "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq -",
        "rnbqkbnr/pp1ppppp/8/2p5/4P3/8/PPPP1PPP/RNBQKBNR w KQkq -",
        "rnbqkbnr/pppp1ppp/4p3/8/4P3/8/PPPP1PPP/RNBQKBNR w KQkq -",
        "rnbqkbnr/pp1ppppp/2p5/8/4P3/8/PPPP1PPP/RNBQKBNR w KQkq -",
        // 1.d4 and replies
        "rnbqkbnr/pppppppp/8/8/3P4/8/PPP1PPPP/RNBQKBNR b KQkq -",
        "rnbqkbnr/ppp1pppp/8/3p4/3P4/8/PPP1PPPP/RNBQKBNR w KQkq -",
        "rnbqkb1r/pppppppp/5n2/8/3P4/8/PPP1PPPP/RNBQKBNR w KQkq -",
        "rnbqkbnr/ppppp1pp/8/5p2/3P4/8/PPP1PPPP/RNBQKBNR w KQkq -",
        // 1.Nf3 and replies
        "rnbqkbnr/pppppppp/8/8/8/5N2/PPPPPPPP/RNBQKB1R b KQkq -",
        "rnbqkbnr/ppp1pppp/8/3p4/8/5N2/PPPPPPPP/RNBQKB1R w KQkq -",
        "rnbqkb1r/pppppppp/5n2/8/8/5N2/PPPPPPPP/RNBQKB1R w KQkq -",
        // English
        "rnbqkbnr/pppppppp/8/8/2P5/8/PP1PPPPP/RNBQKBNR b KQkq -",
        "rnbqkbnr/pppp1ppp/8/4p3/2P5/8/PP1PPPPP/RNBQKBNR w KQkq -",
        "rnbqkbnr/pp1ppppp/8/2p5/2P5/8/PP1PPPPP/RNBQKBNR w KQkq -",
        // King's Indian Attack
        "rnbqkb1r/pppppppp/5n2/8/8/5NP1/PPPPPP1P/RNBQKB1R b KQkq -",
        // Italian
        "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R b KQkq -",
        // Ruy Lopez
        "r1bqkbnr/pppp1ppp/2n5/1B2p3/4P3/5N2/PPPP1PPP/RNBQK2R b KQkq -",
        // Queen's Gambit
        "rnbqkbnr/ppp1pppp/8/3p4/2PP4/8/PP2PPPP/RNBQKBNR b KQkq -",
        // Sicilian Dragon setup
        "rnbqkb1r/pp2pppp/3p1n2/2p5/3PP3/2N2N2/PPP2PPP/R1BQKB1R b KQkq -",
    ]
    .into_iter()
    .collect()
});

/// First four FEN fields, without the move counters.
pub fn fen_key(fen: &str) -> String {
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

/// Whether the position reached at `move_number` (1-based full moves) is
/// still opening theory.
pub fn is_book_position(pos: &Chess, move_number: u32) -> bool {
    if move_number > BOOK_MOVE_LIMIT {
        return false;
    }
    if OPENING_BOOK.contains(fen_key(&fen_of(pos)).as_str()) {
        return true;
    }
    move_number <= PRINCIPLES_MOVE_LIMIT && follows_opening_principles(pos)
}

/// Some center pawn or a developed minor piece on the board.
fn follows_opening_principles(pos: &Chess) -> bool {
    let board = pos.board();

    let center = Bitboard::from(Square::E4)
        | Bitboard::from(Square::D4)
        | Bitboard::from(Square::E5)
        | Bitboard::from(Square::D5);
    if !(board.by_role(Role::Pawn) & center).is_empty() {
        return true;
    }

    let minors = board.by_role(Role::Knight) | board.by_role(Role::Bishop);
    minors.into_iter().any(|sq| match board.color_at(sq) {
        Some(Color::White) => {
            ![Square::B1, Square::C1, Square::F1, Square::G1].contains(&sq)
        }
        Some(Color::Black) => {
            ![Square::B8, Square::C8, Square::F8, Square::G8].contains(&sq)
        }
        None => false,
    })
}
