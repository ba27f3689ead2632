use std::sync::Arc;

use axum::{extract::Query, Extension, Json};
use chess_core::{pgn, GameIdentity};
use review_engine::{GameAnalysis, ReviewRequest};
use serde::{Deserialize, Serialize};

use crate::backend::ReviewCoordinator;
use crate::error::AppError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewBody {
    /// Defaults to the PGN's `Link` header
    pub url: Option<String>,
    /// Defaults to the PGN's `EndDate` and `EndTime` headers
    pub end_time: Option<i64>,
    pub pgn: String,
    pub white: Option<String>,
    pub black: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameQuery {
    pub url: String,
    pub end_time: i64,
}

impl GameQuery {
    fn identity(&self) -> GameIdentity {
        GameIdentity::new(&self.url, self.end_time)
    }
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub state: &'static str,
    pub progress: Option<u8>,
}

/// POST /api/review
///
/// Concurrent requests for the same game share one backend review.
pub async fn request_review(
    Extension(coordinator): Extension<Arc<ReviewCoordinator>>,
    Json(body): Json<ReviewBody>,
) -> Result<Json<GameAnalysis>, AppError> {
    let request = review_request(body)?;
    let analysis = coordinator.get_analysis(request).await;
    Ok(Json(GameAnalysis::clone(&analysis)))
}

/// Fill whatever the body leaves out from the PGN headers.
fn review_request(body: ReviewBody) -> Result<ReviewRequest, AppError> {
    if body.pgn.trim().is_empty() {
        return Err(AppError::BadRequest("PGN required".to_string()));
    }
    let metadata = pgn::parse_pgn(&body.pgn).map(|game| game.metadata);

    let url = body
        .url
        .filter(|u| !u.trim().is_empty())
        .or_else(|| metadata.as_ref().and_then(|m| m.link.clone()))
        .ok_or_else(|| AppError::BadRequest("Game URL required".to_string()))?;
    let end_time = body
        .end_time
        .or_else(|| metadata.as_ref().and_then(|m| m.end_timestamp()))
        .ok_or_else(|| AppError::BadRequest("Game end time required".to_string()))?;

    let (white, black) = match metadata {
        Some(m) => (m.white, m.black),
        None => (String::new(), String::new()),
    };

    Ok(ReviewRequest::new(&url, end_time, body.pgn)
        .with_players(body.white.unwrap_or(white), body.black.unwrap_or(black)))
}

/// GET /api/review
pub async fn get_review(
    Extension(coordinator): Extension<Arc<ReviewCoordinator>>,
    Query(q): Query<GameQuery>,
) -> Result<Json<GameAnalysis>, AppError> {
    coordinator
        .cache()
        .get(&q.identity())
        .map(|analysis| Json(GameAnalysis::clone(&analysis)))
        .ok_or_else(|| AppError::NotFound("Game not reviewed".to_string()))
}

/// GET /api/review/progress
pub async fn review_progress(
    Extension(coordinator): Extension<Arc<ReviewCoordinator>>,
    Query(q): Query<GameQuery>,
) -> Json<ProgressResponse> {
    let state = coordinator.state(&q.identity());
    Json(ProgressResponse {
        state: state.as_str(),
        progress: state.progress(),
    })
}
