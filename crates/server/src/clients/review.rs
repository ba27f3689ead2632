use std::time::Duration;

use reqwest::Client;
use review_engine::{GameAnalysis, ReviewBackend, ReviewError, ReviewRequest};
use serde_json::json;

/// Full-game reviews from a remote analysis service exposing
/// `POST /api/analysis/game-review`.
pub struct ReviewClient {
    client: Client,
    base_url: String,
}

impl ReviewClient {
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent("ChessReview/1.0")
            .timeout(Duration::from_secs(600))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn game_review(&self, pgn: &str) -> Result<GameAnalysis, String> {
        let url = format!("{}/api/analysis/game-review", self.base_url);

        let resp = self
            .client
            .post(&url)
            .json(&json!({ "pgn": pgn }))
            .send()
            .await
            .map_err(|e| format!("Review request error: {e}"))?;

        if !resp.status().is_success() {
            return Err(format!("Review HTTP {}", resp.status()));
        }

        resp.json()
            .await
            .map_err(|e| format!("Review JSON parse error: {e}"))
    }
}

impl ReviewBackend for ReviewClient {
    async fn review(&self, request: &ReviewRequest) -> Result<GameAnalysis, ReviewError> {
        self.game_review(&request.pgn)
            .await
            .map_err(ReviewError::Backend)
    }
}
