//! Stockfish engine wrapper using UCI protocol (async I/O)

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::ReviewError;
use crate::evaluation::Evaluation;
use crate::reviewer::{Engine, EngineEval, SearchLimits};

/// A running Stockfish process
struct Process {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl Process {
    /// Spawn a new Stockfish process and initialize UCI
    async fn spawn(config: &EngineConfig) -> Result<Self, ReviewError> {
        let mut child = Command::new(&config.stockfish_path)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ReviewError::Stockfish(format!("Failed to spawn Stockfish: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ReviewError::Stockfish("Stockfish stdin unavailable".into()))?;
        let stdout = BufReader::new(
            child
                .stdout
                .take()
                .ok_or_else(|| ReviewError::Stockfish("Stockfish stdout unavailable".into()))?,
        );

        let mut process = Self {
            child,
            stdin,
            stdout,
        };

        process.send("uci").await?;
        process.wait_for("uciok").await?;

        process
            .send(&format!("setoption name Threads value {}", config.threads))
            .await?;
        process
            .send(&format!("setoption name Hash value {}", config.hash_mb))
            .await?;
        process.send("isready").await?;
        process.wait_for("readyok").await?;

        Ok(process)
    }

    /// Send a command to Stockfish
    async fn send(&mut self, cmd: &str) -> Result<(), ReviewError> {
        debug!(cmd, "SF <");
        self.stdin
            .write_all(format!("{cmd}\n").as_bytes())
            .await
            .map_err(|e| ReviewError::Stockfish(format!("Failed to write to Stockfish: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| ReviewError::Stockfish(format!("Failed to flush stdin: {e}")))?;
        Ok(())
    }

    async fn read_line(&mut self, line: &mut String) -> Result<(), ReviewError> {
        line.clear();
        let n = self
            .stdout
            .read_line(line)
            .await
            .map_err(|e| ReviewError::Stockfish(format!("Failed to read from Stockfish: {e}")))?;
        if n == 0 {
            return Err(ReviewError::Stockfish("Stockfish closed its output".into()));
        }
        Ok(())
    }

    /// Wait for a specific response line
    async fn wait_for(&mut self, expected: &str) -> Result<(), ReviewError> {
        let mut line = String::new();
        loop {
            self.read_line(&mut line).await?;
            let trimmed = line.trim();
            debug!(line = trimmed, "SF >");
            if trimmed == expected {
                return Ok(());
            }
        }
    }

    /// Search a position and keep the deepest scored info line
    async fn search(&mut self, fen: &str, limits: SearchLimits) -> Result<EngineEval, ReviewError> {
        self.send(&format!("position fen {fen}")).await?;
        self.send(&format!(
            "go depth {} movetime {}",
            limits.depth, limits.movetime_ms
        ))
        .await?;

        let mut result = EngineEval::default();
        let mut line = String::new();
        loop {
            self.read_line(&mut line).await?;
            let trimmed = line.trim();

            if trimmed.starts_with("info") && trimmed.contains(" score ") {
                let depth = parse_depth(trimmed).unwrap_or(0);
                if depth >= result.depth {
                    result.depth = depth;
                    result.evaluation = Evaluation::from_parts(parse_cp(trimmed), parse_mate(trimmed));
                    result.pv = parse_pv(trimmed);
                }
            } else if trimmed.starts_with("bestmove") {
                result.best_move = parse_bestmove(trimmed);
                break;
            }
        }

        Ok(result)
    }
}

/// Stockfish engine instance. The process is started on first use and
/// restarted after any I/O failure.
pub struct StockfishEngine {
    config: EngineConfig,
    process: Option<Process>,
}

impl StockfishEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            process: None,
        }
    }

    pub fn limits(&self) -> SearchLimits {
        SearchLimits {
            depth: self.config.depth,
            movetime_ms: self.config.movetime_ms,
        }
    }

    /// Evaluate a position. Scores are from the side to move.
    pub async fn search(&mut self, fen: &str, limits: SearchLimits) -> Result<EngineEval, ReviewError> {
        if self.process.is_none() {
            info!(path = %self.config.stockfish_path, "Starting Stockfish");
            self.process = Some(Process::spawn(&self.config).await?);
        }
        let Some(process) = self.process.as_mut() else {
            return Err(ReviewError::Stockfish("Stockfish not running".into()));
        };

        match process.search(fen, limits).await {
            Ok(eval) => Ok(eval),
            Err(e) => {
                warn!(error = %e, "Stockfish failed, restarting on next search");
                self.process = None;
                Err(e)
            }
        }
    }

    /// Send quit command and wait for process to exit
    pub async fn quit(&mut self) {
        if let Some(mut process) = self.process.take() {
            let _ = process.send("quit").await;
            let _ = process.child.wait().await;
        }
    }
}

impl Engine for StockfishEngine {
    async fn evaluate(&mut self, fen: &str, limits: SearchLimits) -> Result<EngineEval, ReviewError> {
        self.search(fen, limits).await
    }
}

/// Parse centipawn score from info line
fn parse_cp(line: &str) -> Option<i32> {
    value_after(line, "cp")
}

/// Parse mate score from info line
fn parse_mate(line: &str) -> Option<i32> {
    value_after(line, "mate")
}

fn parse_depth(line: &str) -> Option<u32> {
    value_after(line, "depth")
}

fn value_after<T: std::str::FromStr>(line: &str, key: &str) -> Option<T> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == key && i + 1 < parts.len() {
            return parts[i + 1].parse().ok();
        }
    }
    None
}

/// Parse PV moves from info line
fn parse_pv(line: &str) -> Vec<String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let mut in_pv = false;
    let mut moves = Vec::new();

    for part in parts {
        if part == "pv" {
            in_pv = true;
            continue;
        }
        if in_pv {
            // PV ends at next keyword or end of line
            if part.starts_with("bmc") || part == "string" {
                break;
            }
            moves.push(part.to_string());
        }
    }

    moves
}

/// `bestmove e2e4 ponder e7e5` -> `e2e4`; no move in a finished game
fn parse_bestmove(line: &str) -> Option<String> {
    line.split_whitespace()
        .nth(1)
        .filter(|m| *m != "(none)")
        .map(str::to_string)
}
