use std::time::Duration;

use reqwest::Client;
use review_engine::{CloudEval, CloudLookup, EvaluationSource, ReviewError};
use serde_json::Value;

use crate::config::Config;

const GAME_EXPORT_URL: &str = "https://lichess.org/game/export";

#[derive(Clone)]
pub struct LichessClient {
    client: Client,
    cloud_eval_url: String,
    token: Option<String>,
}

impl LichessClient {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent("ChessReview/1.0")
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            cloud_eval_url: config.lichess_cloud_eval_url.clone(),
            token: config.lichess_api_token.clone(),
        })
    }

    /// Cloud evaluation of a position. `Ok(None)` when Lichess has no
    /// evaluation for it.
    pub async fn cloud_eval(&self, fen: &str, multi_pv: u32) -> Result<Option<CloudEval>, String> {
        let resp = self
            .client
            .get(&self.cloud_eval_url)
            .query(&[("fen", fen.to_string()), ("multiPv", multi_pv.to_string())])
            .send()
            .await
            .map_err(|e| format!("Cloud eval request error: {e}"))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !resp.status().is_success() {
            return Err(format!("Cloud eval HTTP {}", resp.status()));
        }

        let eval: CloudEval = resp
            .json()
            .await
            .map_err(|e| format!("Cloud eval JSON parse error: {e}"))?;

        Ok(eval.has_lines().then_some(eval))
    }

    /// PGN of a Lichess game by its URL. `Ok(None)` when the game does not
    /// exist.
    pub async fn export_game(&self, url: &str) -> Result<Option<String>, String> {
        let game_id = game_id_from_url(url).ok_or_else(|| format!("Not a Lichess game URL: {url}"))?;

        let mut req = self
            .client
            .get(format!("{GAME_EXPORT_URL}/{game_id}"))
            .query(&[("moves", "true"), ("pgnInJson", "true")])
            .header("Accept", "application/json");
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| format!("Game export request error: {e}"))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !resp.status().is_success() {
            return Err(format!("Game export HTTP {}", resp.status()));
        }

        let data: Value = resp
            .json()
            .await
            .map_err(|e| format!("Game export JSON parse error: {e}"))?;

        Ok(Some(
            data.get("pgn")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
        ))
    }
}

impl EvaluationSource for LichessClient {
    async fn lookup(&self, fen: &str, multi_pv: u32) -> Result<CloudLookup, ReviewError> {
        match self.cloud_eval(fen, multi_pv).await {
            Ok(Some(eval)) => Ok(CloudLookup::Found(eval)),
            Ok(None) => Ok(CloudLookup::NotFound),
            Err(e) => Err(ReviewError::Source(e)),
        }
    }
}

/// Game id is the last path segment: `https://lichess.org/AbCdEfGh/black`
/// style URLs keep the 8-character id before the color.
pub fn game_id_from_url(url: &str) -> Option<&str> {
    let path = url.trim().trim_end_matches('/');
    let mut segments = path.rsplit('/');
    let last = segments.next()?;
    let id = if last == "white" || last == "black" {
        segments.next()?
    } else {
        last
    };
    let id = id.split(['#', '?']).next()?;
    (!id.is_empty() && !id.contains(':') && id.chars().all(|c| c.is_ascii_alphanumeric()))
        .then_some(id)
}
