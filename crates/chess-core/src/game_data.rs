use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameMetadata {
    pub white: String,
    pub black: String,
    pub result: String, // "1-0", "0-1", "1/2-1/2"
    pub date: Option<String>,
    pub time_control: Option<String>,
    pub eco: Option<String>,
    pub event: Option<String>,
    pub link: Option<String>,
    pub end_date: Option<String>, // Chess.com "EndDate", e.g. "2025.01.15"
    pub end_time: Option<String>, // Chess.com "EndTime", e.g. "18:22:04"
}

impl GameMetadata {
    /// Unix timestamp (seconds, UTC) of the game end, built from the Chess.com
    /// `EndDate` + `EndTime` headers.
    pub fn end_timestamp(&self) -> Option<i64> {
        let date = self.end_date.as_deref().or(self.date.as_deref())?;
        let time = self.end_time.as_deref()?;
        // Chess.com sometimes appends a zone suffix ("18:22:04 GMT+0000")
        let time = time.split_whitespace().next()?;
        let stamp = format!("{date} {time}");
        NaiveDateTime::parse_from_str(&stamp, "%Y.%m.%d %H:%M:%S")
            .ok()
            .map(|dt| dt.and_utc().timestamp())
    }

    /// Identity of this game for the analysis cache, when the PGN carries
    /// both a link and an end time.
    pub fn identity(&self) -> Option<GameIdentity> {
        let link = self.link.as_deref().filter(|l| !l.is_empty())?;
        Some(GameIdentity::new(link, self.end_timestamp()?))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameData {
    pub metadata: GameMetadata,
    pub moves: Vec<String>, // SAN notation
    pub pgn: String,
}

/// Opaque key for a single game: origin URL + end timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameIdentity(String);

impl GameIdentity {
    pub fn new(url: &str, end_time: i64) -> Self {
        Self(format!("{}@{}", url.trim().trim_end_matches('/'), end_time))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> GameMetadata {
        GameMetadata {
            white: "alice".into(),
            black: "bob".into(),
            result: "1-0".into(),
            date: Some("2025.01.15".into()),
            time_control: Some("600".into()),
            eco: None,
            event: None,
            link: Some("https://www.chess.com/game/live/123456".into()),
            end_date: Some("2025.01.15".into()),
            end_time: Some("18:22:04".into()),
        }
    }

    #[test]
    fn test_end_timestamp() {
        assert_eq!(metadata().end_timestamp(), Some(1736965324));
    }

    #[test]
    fn test_identity_ignores_trailing_slash() {
        let a = GameIdentity::new("https://www.chess.com/game/live/1/", 42);
        let b = GameIdentity::new("https://www.chess.com/game/live/1", 42);
        assert_eq!(a, b);
        assert_ne!(a, GameIdentity::new("https://www.chess.com/game/live/1", 43));
    }

    #[test]
    fn test_identity_from_metadata() {
        let id = metadata().identity().unwrap();
        assert_eq!(id.as_str(), "https://www.chess.com/game/live/123456@1736965324");

        let mut no_link = metadata();
        no_link.link = None;
        assert!(no_link.identity().is_none());
    }
}
