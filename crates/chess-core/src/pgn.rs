//! Lightweight regex-based PGN parsing.

use std::sync::LazyLock;

use regex::Regex;

use crate::game_data::{GameData, GameMetadata};

const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Headers inserted when a transcript arrives as bare movetext.
const MINIMAL_HEADERS: &str = "[Event \"Unknown\"]\n[Site \"Unknown\"]\n[Date \"????.??.??\"]\n[Round \"?\"]\n[White \"?\"]\n[Black \"?\"]\n[Result \"*\"]";

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\[(\w+)\s+"([^"]*)"\]"#).expect("header regex"));
static RAW_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("raw header regex"));
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^}]*\}").expect("comment regex"));
static VARIATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("variation regex"));
static MOVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[KQRBN]?[a-h]?[1-8]?x?[a-h][1-8](?:=[QRBN])?[+#]?|O-O-O|O-O")
        .expect("move regex")
});

/// Parse a PGN string into a GameData struct.
/// Returns None for non-standard start positions or transcripts without moves.
pub fn parse_pgn(pgn: &str) -> Option<GameData> {
    let mut white = "Unknown".to_string();
    let mut black = "Unknown".to_string();
    let mut result = "*".to_string();
    let mut date = None;
    let mut time_control = None;
    let mut eco = None;
    let mut event = None;
    let mut link = None;
    let mut end_date = None;
    let mut end_time = None;
    let mut setup = None;
    let mut fen = None;

    for cap in HEADER_RE.captures_iter(pgn) {
        let key = &cap[1];
        let value = cap[2].to_string();
        match key {
            "White" => white = value,
            "Black" => black = value,
            "Result" => result = value,
            "Date" => date = Some(value),
            "TimeControl" => time_control = Some(value),
            "ECO" => eco = Some(value),
            "Event" => event = Some(value),
            "Link" => link = Some(value),
            "EndDate" => end_date = Some(value),
            "EndTime" => end_time = Some(value),
            "SetUp" => setup = Some(value),
            "FEN" => fen = Some(value),
            _ => {}
        }
    }

    // Filter non-standard positions
    if setup.as_deref() == Some("1") {
        if let Some(ref f) = fen {
            if f != STANDARD_START_FEN {
                return None;
            }
        }
    }

    let moves = extract_moves(pgn);
    if moves.is_empty() {
        return None;
    }

    Some(GameData {
        metadata: GameMetadata {
            white,
            black,
            result,
            date,
            time_control,
            eco,
            event,
            link,
            end_date,
            end_time,
        },
        moves,
        pgn: pgn.to_string(),
    })
}

/// Extract SAN moves from PGN text (after removing headers, comments, variations).
pub fn extract_moves(pgn: &str) -> Vec<String> {
    let no_headers = RAW_HEADER_RE.replace_all(pgn, "");
    let no_comments = COMMENT_RE.replace_all(&no_headers, "");
    let no_variations = VARIATION_RE.replace_all(&no_comments, "");

    MOVE_RE
        .find_iter(&no_variations)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Normalize a Chess.com export so a strict PGN reader accepts it.
///
/// Chess.com transcripts often arrive as a single line with `{[%clk ...]}`
/// annotations after every move. Control characters and comments are
/// stripped, headers are put one per line, and the movetext is collapsed to
/// single spaces. Bare movetext gets a minimal header block. Input with no
/// movetext at all is returned unchanged.
pub fn clean_pgn(pgn: &str) -> String {
    let printable: String = pgn
        .chars()
        .filter(|&c| c as u32 >= 32 || matches!(c, '\n' | '\r' | '\t'))
        .collect();

    let no_comments = COMMENT_RE.replace_all(&printable, "");
    let no_comments = no_comments.replace(['{', '}'], "");

    let headers: Vec<&str> = RAW_HEADER_RE
        .find_iter(&no_comments)
        .map(|m| m.as_str())
        .collect();
    let movetext = RAW_HEADER_RE.replace_all(&no_comments, "");
    let movetext = movetext.split_whitespace().collect::<Vec<_>>().join(" ");

    tracing::debug!(headers = headers.len(), movetext_len = movetext.len(), "Cleaned PGN");

    if movetext.is_empty() {
        return pgn.to_string();
    }

    if headers.is_empty() {
        format!("{MINIMAL_HEADERS}\n\n{movetext}")
    } else {
        format!("{}\n\n{movetext}", headers.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pgn_basic() {
        let pgn = r#"[White "Player1"]
[Black "Player2"]
[Result "1-0"]
[Date "2025.01.15"]
[TimeControl "600"]

1. e4 e5 2. Nf3 Nc6 1-0"#;

        let game = parse_pgn(pgn).unwrap();
        assert_eq!(game.metadata.white, "Player1");
        assert_eq!(game.metadata.black, "Player2");
        assert_eq!(game.metadata.result, "1-0");
        assert_eq!(game.moves.len(), 4);
        assert_eq!(game.moves[0], "e4");
    }

    #[test]
    fn test_parse_pgn_rejects_custom_start() {
        let pgn = r#"[SetUp "1"]
[FEN "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1"]

1. e4 Kd7"#;
        assert!(parse_pgn(pgn).is_none());
    }

    #[test]
    fn test_clean_pgn_chess_com_single_line() {
        let pgn = "[Event \"Live Chess\"] [White \"a\"] [Black \"b\"] 1. e4 {[%clk 0:09:58.1]} 1... e5 {[%clk 0:09:57]} 2. Nf3 1-0";
        let cleaned = clean_pgn(pgn);
        assert!(cleaned.starts_with("[Event \"Live Chess\"]\n[White \"a\"]\n[Black \"b\"]\n\n"));
        assert!(cleaned.ends_with("1. e4 1... e5 2. Nf3 1-0"));
        assert!(!cleaned.contains("clk"));
    }

    #[test]
    fn test_clean_pgn_bare_movetext_gets_headers() {
        let cleaned = clean_pgn("1. d4 d5\u{0007} 2. c4");
        assert!(cleaned.starts_with("[Event \"Unknown\"]"));
        assert!(cleaned.ends_with("1. d4 d5 2. c4"));
    }

    #[test]
    fn test_clean_pgn_without_moves_is_unchanged() {
        let pgn = "[Event \"Empty\"]";
        assert_eq!(clean_pgn(pgn), pgn);
    }
}
