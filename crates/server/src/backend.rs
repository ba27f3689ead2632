//! Concrete service types shared by the handlers.

use std::sync::Arc;

use review_engine::{
    AnalysisCoordinator, GameAnalysis, GameReviewer, ReviewBackend, ReviewError, ReviewRequest,
    StockfishEngine,
};

use crate::analysis_service::AnalysisService;
use crate::clients::lichess::LichessClient;
use crate::clients::review::ReviewClient;

pub type LocalReviewer = GameReviewer<StockfishEngine>;
pub type PositionAnalysis = AnalysisService<LichessClient, StockfishEngine>;
pub type ReviewCoordinator = AnalysisCoordinator<ReviewService>;

/// Where coordinated full-game reviews run.
pub enum ReviewService {
    /// In-process engine review
    Local(Arc<LocalReviewer>),
    /// Remote analysis service at `REVIEW_BACKEND_URL`
    Remote(ReviewClient),
}

impl ReviewService {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            Self::Remote(_) => "remote",
        }
    }
}

impl ReviewBackend for ReviewService {
    async fn review(&self, request: &ReviewRequest) -> Result<GameAnalysis, ReviewError> {
        match self {
            Self::Local(reviewer) => reviewer.review(request).await,
            Self::Remote(client) => client.review(request).await,
        }
    }
}
