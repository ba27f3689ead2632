use axum::{Extension, Json};
use chess_core::{GameReplay, ReplayError};
use review_engine::live::{self, LiveReview};
use review_engine::Classification;
use serde::{Deserialize, Serialize};

use crate::clients::lichess::LichessClient;
use crate::error::AppError;

#[derive(Deserialize)]
pub struct GameAnalysisRequest {
    pub pgn: Option<String>,
    pub lichess_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MoveAnalysis {
    #[serde(rename = "move")]
    pub san: String,
    /// White-relative evaluation in pawns
    pub eval: f64,
    pub best_move: String,
    /// Absent when either side of the move could not be evaluated
    #[serde(rename = "type")]
    pub kind: Option<Classification>,
}

#[derive(Debug, Serialize)]
pub struct GameAnalysisResponse {
    pub accuracy: f64,
    pub blunders: u32,
    pub mistakes: u32,
    pub inaccuracies: u32,
    pub move_analysis: Vec<MoveAnalysis>,
}

/// POST /games/analyze
pub async fn analyze_game(
    Extension(lichess): Extension<LichessClient>,
    Json(req): Json<GameAnalysisRequest>,
) -> Result<Json<GameAnalysisResponse>, AppError> {
    let pgn = resolve_pgn(&lichess, req).await?;

    let replay = GameReplay::from_pgn(&pgn).map_err(|e| match e {
        ReplayError::NoMoves => AppError::BadRequest(
            "No valid moves found in PGN. Please check the PGN format.".to_string(),
        ),
        other => AppError::BadRequest(other.to_string()),
    })?;

    tracing::info!(plies = replay.len(), "Analyzing game");
    let review = live::review_live(&lichess, &replay).await;

    Ok(Json(summarize(&review)))
}

async fn resolve_pgn(lichess: &LichessClient, req: GameAnalysisRequest) -> Result<String, AppError> {
    let url = req.lichess_url.filter(|u| !u.trim().is_empty());
    let pgn = req.pgn.filter(|p| !p.trim().is_empty());

    match (url, pgn) {
        (Some(url), _) => match lichess.export_game(&url).await {
            Ok(Some(pgn)) if !pgn.is_empty() => Ok(pgn),
            Ok(Some(_)) => Err(AppError::BadRequest("Unable to fetch PGN from Lichess".to_string())),
            Ok(None) => Err(AppError::BadRequest(
                "Lichess game not found. Please check the URL.".to_string(),
            )),
            Err(e) => Err(AppError::BadRequest(format!(
                "Error fetching game from Lichess: {e}"
            ))),
        },
        (None, Some(pgn)) => Ok(pgn),
        (None, None) => Err(AppError::BadRequest("PGN or Lichess URL required".to_string())),
    }
}

fn summarize(review: &LiveReview) -> GameAnalysisResponse {
    let (mut blunders, mut mistakes, mut inaccuracies) = (0, 0, 0);
    let mut move_analysis = Vec::with_capacity(review.plies.len().saturating_sub(1));

    for (prev, ply) in review.plies.iter().zip(review.moves()) {
        match ply.classification {
            Some(Classification::Blunder) => blunders += 1,
            Some(Classification::Mistake) => mistakes += 1,
            Some(Classification::Inaccuracy) => inaccuracies += 1,
            _ => {}
        }
        let san = ply.san.clone().unwrap_or_default();
        move_analysis.push(MoveAnalysis {
            eval: ply.score as f64 / 100.0,
            // The engine's choice in the position the move was played from
            best_move: prev.best_move.clone().unwrap_or_else(|| san.clone()),
            san,
            kind: ply.classification,
        });
    }

    let accuracy = (review.accuracy.white + review.accuracy.black) as f64 / 2.0;

    GameAnalysisResponse {
        accuracy,
        blunders,
        mistakes,
        inaccuracies,
        move_analysis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use review_engine::live::build_live_review;
    use review_engine::{CloudEval, PvLine};

    fn cloud(fen: &str, cp: i32, best: &str) -> Option<CloudEval> {
        Some(CloudEval {
            fen: fen.to_string(),
            knodes: 0,
            depth: 20,
            pvs: vec![PvLine {
                moves: best.to_string(),
                cp: Some(cp),
                mate: None,
            }],
        })
    }

    #[test]
    fn test_summarize_counts_and_best_moves() {
        let replay = GameReplay::from_san_moves(&["e4", "e5", "Qh5"]).unwrap();
        let fens = replay.fens();
        let lookups = vec![
            cloud(&fens[0], 20, "e2e4"),
            cloud(&fens[1], 30, "e7e5"),
            cloud(&fens[2], 25, "g1f3"),
            // White gave away 450
            cloud(&fens[3], -425, "b8c6"),
        ];
        let review = build_live_review(&replay, &lookups);
        let summary = summarize(&review);

        assert_eq!(summary.move_analysis.len(), 3);
        assert_eq!(summary.blunders, 1);
        assert_eq!(summary.move_analysis[2].san, "Qh5");
        assert_eq!(summary.move_analysis[2].best_move, "g1f3");
        assert_eq!(summary.move_analysis[2].kind, Some(Classification::Blunder));
        assert_eq!(summary.move_analysis[2].eval, -4.25);
        let expected = (review.accuracy.white + review.accuracy.black) as f64 / 2.0;
        assert_eq!(summary.accuracy, expected);
    }

    #[test]
    fn test_unevaluated_move_has_no_type() {
        let replay = GameReplay::from_san_moves(&["d4"]).unwrap();
        let review = build_live_review(&replay, &[None, None]);
        let summary = summarize(&review);

        assert_eq!(summary.move_analysis[0].kind, None);
        assert_eq!(summary.move_analysis[0].best_move, "d4");
        assert_eq!(summary.accuracy, 100.0);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["move_analysis"][0]["move"], "d4");
        assert!(json["move_analysis"][0]["type"].is_null());
    }
}
