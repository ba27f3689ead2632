use std::env;
use std::time::Duration;

use review_engine::{CoordinatorConfig, EngineConfig};

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub lichess_api_token: Option<String>,
    pub lichess_cloud_eval_url: String,
    /// When set, full-game reviews are delegated to this analysis service
    pub review_backend_url: Option<String>,
    pub position_cache_ttl: Duration,
    /// Allowed CORS origins; `None` allows any
    pub cors_origins: Option<Vec<String>>,
    pub engine: EngineConfig,
    pub coordinator: CoordinatorConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
            lichess_api_token: env::var("LICHESS_API_TOKEN").ok().filter(|t| !t.is_empty()),
            lichess_cloud_eval_url: env::var("LICHESS_CLOUD_EVAL_URL")
                .unwrap_or_else(|_| "https://lichess.org/api/cloud-eval".to_string()),
            review_backend_url: env::var("REVIEW_BACKEND_URL")
                .ok()
                .filter(|u| !u.is_empty()),
            position_cache_ttl: Duration::from_secs(
                env::var("POSITION_CACHE_TTL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(86400 * 7), // 7 days
            ),
            cors_origins: env::var("CORS_ORIGINS").ok().and_then(|v| parse_origins(&v)),
            engine: EngineConfig::from_env(),
            coordinator: CoordinatorConfig::from_env(),
        }
    }
}

/// Comma-separated origin list; empty or `*` means any origin.
fn parse_origins(value: &str) -> Option<Vec<String>> {
    let origins: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect();
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        None
    } else {
        Some(origins)
    }
}
