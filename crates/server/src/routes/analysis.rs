use std::sync::Arc;

use axum::{Extension, Json};
use review_engine::GameAnalysis;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use crate::analysis_service::EnhancedAnalysisResult;
use crate::backend::{LocalReviewer, PositionAnalysis};
use crate::error::AppError;

const MAX_MULTI_PV: u32 = 5;
const BATCH_DEFAULT_DEPTH: u32 = 12;
const MAX_BATCH: usize = 200;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRequest {
    pub fen: String,
    pub multi_pv: Option<u32>,
    pub depth: Option<u32>,
}

#[derive(Deserialize)]
pub struct BatchRequest {
    pub fens: Vec<String>,
    pub depth: Option<u32>,
}

#[derive(Deserialize)]
pub struct GameReviewRequest {
    pub pgn: String,
}

/// POST /api/analysis/position
pub async fn analyze_position(
    Extension(service): Extension<Arc<PositionAnalysis>>,
    Json(req): Json<PositionRequest>,
) -> Result<Json<EnhancedAnalysisResult>, AppError> {
    let multi_pv = req.multi_pv.unwrap_or(1).clamp(1, MAX_MULTI_PV);
    let depth = req.depth.unwrap_or_else(|| service.default_depth());

    let result = service.analyze_position(req.fen.trim(), multi_pv, depth).await?;
    Ok(Json(result))
}

/// POST /api/analysis/batch
pub async fn analyze_batch(
    Extension(service): Extension<Arc<PositionAnalysis>>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<JsonValue>, AppError> {
    if req.fens.is_empty() {
        return Err(AppError::BadRequest("No positions provided".to_string()));
    }
    if req.fens.len() > MAX_BATCH {
        return Err(AppError::BadRequest(format!(
            "At most {MAX_BATCH} positions per batch"
        )));
    }

    let depth = req.depth.unwrap_or(BATCH_DEFAULT_DEPTH);
    let results = service.analyze_multiple_positions(&req.fens, depth).await;

    Ok(Json(json!({
        "count": results.len(),
        "results": results,
    })))
}

/// POST /api/analysis/game-review
pub async fn game_review(
    Extension(reviewer): Extension<Arc<LocalReviewer>>,
    Json(req): Json<GameReviewRequest>,
) -> Result<Json<GameAnalysis>, AppError> {
    if req.pgn.trim().is_empty() {
        return Err(AppError::BadRequest("PGN required".to_string()));
    }
    let analysis = reviewer.review_pgn(&req.pgn).await?;
    tracing::info!(moves = analysis.total_moves, "Game review complete");
    Ok(Json(analysis))
}
