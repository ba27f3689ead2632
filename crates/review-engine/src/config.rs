//! Engine and coordinator tunables from environment variables

use std::env;
use std::time::Duration;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Path to Stockfish binary
    pub stockfish_path: String,

    /// Search depth per position
    pub depth: u32,

    /// Upper bound on search time per position
    pub movetime_ms: u64,

    pub threads: u32,

    pub hash_mb: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stockfish_path: "stockfish".to_string(),
            depth: 15,
            movetime_ms: 3000,
            threads: 1,
            hash_mb: 128,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            stockfish_path: env::var("STOCKFISH_PATH").unwrap_or(defaults.stockfish_path),
            depth: env_or("ANALYSIS_DEPTH", defaults.depth),
            movetime_ms: env_or("ANALYSIS_MOVETIME_MS", defaults.movetime_ms),
            threads: env_or("STOCKFISH_THREADS", defaults.threads),
            hash_mb: env_or("STOCKFISH_HASH_MB", defaults.hash_mb),
        }
    }
}

/// Pacing of the progress estimate shown while a review is pending.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub progress_interval: Duration,
    pub progress_step: u8,
    /// Highest value reached before settlement; always below 100
    pub progress_ceiling: u8,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            progress_interval: Duration::from_millis(500),
            progress_step: 5,
            progress_ceiling: 90,
        }
    }
}

impl CoordinatorConfig {
    pub fn new(progress_interval: Duration, progress_step: u8, progress_ceiling: u8) -> Self {
        Self {
            progress_interval: progress_interval.max(Duration::from_millis(1)),
            progress_step: progress_step.max(1),
            progress_ceiling: progress_ceiling.min(99),
        }
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self::new(
            Duration::from_millis(env_or(
                "REVIEW_PROGRESS_INTERVAL_MS",
                defaults.progress_interval.as_millis() as u64,
            )),
            env_or("REVIEW_PROGRESS_STEP", defaults.progress_step),
            env_or("REVIEW_PROGRESS_CEILING", defaults.progress_ceiling),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinator_config_is_clamped() {
        let config = CoordinatorConfig::new(Duration::ZERO, 0, 120);
        assert_eq!(config.progress_step, 1);
        assert_eq!(config.progress_ceiling, 99);
        assert!(config.progress_interval > Duration::ZERO);
    }
}
