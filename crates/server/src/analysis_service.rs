//! Single-position analysis: cache, then Lichess cloud eval, then the local
//! engine.

use std::time::Instant;

use futures::future::join_all;
use review_engine::{
    CloudEval, CloudLookup, Engine, EngineEval, Evaluation, EvaluationSource, PvLine,
    ReviewError, SearchLimits,
};
use serde::Serialize;
use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, Color, Position};
use tokio::sync::Mutex;

use crate::position_cache::PositionCache;

/// Centipawn stand-in for a forced mate in engine fallback results.
pub const ENGINE_MATE_CP: i32 = 30000;

const BATCH_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    Cache,
    Lichess,
    Stockfish,
    None,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedAnalysisResult {
    pub source: AnalysisSource,
    pub fen: String,
    pub evaluation: CloudEval,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    pub time_taken: f64,
}

pub struct AnalysisService<S, E> {
    cache: PositionCache,
    source: S,
    engine: Mutex<E>,
    limits: SearchLimits,
}

impl<S: EvaluationSource, E: Engine> AnalysisService<S, E> {
    pub fn new(cache: PositionCache, source: S, engine: E, limits: SearchLimits) -> Self {
        Self {
            cache,
            source,
            engine: Mutex::new(engine),
            limits,
        }
    }

    pub fn cache(&self) -> &PositionCache {
        &self.cache
    }

    pub fn default_depth(&self) -> u32 {
        self.limits.depth
    }

    pub async fn analyze_position(
        &self,
        fen: &str,
        multi_pv: u32,
        depth: u32,
    ) -> Result<EnhancedAnalysisResult, ReviewError> {
        let started = Instant::now();
        let side_to_move = validate_fen(fen)?;
        let result = |source, evaluation, depth| EnhancedAnalysisResult {
            source,
            fen: fen.to_string(),
            evaluation,
            depth,
            time_taken: started.elapsed().as_secs_f64(),
        };

        if let Some(cached) = self.cache.get(fen, multi_pv) {
            tracing::debug!(fen, "Position cache hit");
            return Ok(result(AnalysisSource::Cache, cached, None));
        }

        match self.source.lookup(fen, multi_pv).await {
            Ok(CloudLookup::Found(eval)) if eval.has_lines() => {
                self.cache.insert(fen, multi_pv, eval.clone());
                let depth = Some(eval.depth);
                return Ok(result(AnalysisSource::Lichess, eval, depth));
            }
            Ok(_) => tracing::debug!(fen, "No cloud evaluation"),
            Err(e) => tracing::warn!(fen, "Cloud evaluation failed: {e}"),
        }

        let limits = SearchLimits {
            depth,
            movetime_ms: self.limits.movetime_ms,
        };
        let searched = self.engine.lock().await.evaluate(fen, limits).await;
        match searched {
            Ok(engine_eval) => {
                if let Some(eval) = engine_result(fen, side_to_move, &engine_eval) {
                    self.cache.insert(fen, multi_pv, eval.clone());
                    return Ok(result(AnalysisSource::Stockfish, eval, Some(depth)));
                }
                tracing::warn!(fen, "Engine returned no usable line");
            }
            Err(e) => tracing::error!(fen, "Engine analysis failed: {e}"),
        }

        tracing::error!(fen, "All analysis sources failed");
        Ok(result(AnalysisSource::None, CloudEval::empty(fen), None))
    }

    /// Analyzes `fens` in batches of five. Positions that fail validation
    /// are left out of the result.
    pub async fn analyze_multiple_positions(
        &self,
        fens: &[String],
        depth: u32,
    ) -> Vec<EnhancedAnalysisResult> {
        tracing::info!(count = fens.len(), "Analyzing positions");
        let mut results = Vec::with_capacity(fens.len());
        for batch in fens.chunks(BATCH_SIZE) {
            let settled = join_all(batch.iter().map(|fen| self.analyze_position(fen, 1, depth))).await;
            for outcome in settled {
                match outcome {
                    Ok(r) => results.push(r),
                    Err(e) => tracing::error!("Batch analysis error: {e}"),
                }
            }
        }
        results
    }
}

/// Parses `fen` as a legal standard position and returns the side to move.
pub fn validate_fen(fen: &str) -> Result<Color, ReviewError> {
    let parsed: Fen = fen
        .trim()
        .parse()
        .map_err(|e| ReviewError::InvalidFen(format!("{fen}: {e}")))?;
    let pos: Chess = parsed
        .into_position(CastlingMode::Standard)
        .map_err(|e| ReviewError::InvalidFen(format!("{fen}: {e}")))?;
    Ok(pos.turn())
}

/// Engine output as a one-line cloud-eval shaped result from White's view.
/// Mates become `±ENGINE_MATE_CP` centipawns.
fn engine_result(fen: &str, side_to_move: Color, engine_eval: &EngineEval) -> Option<CloudEval> {
    let best_move = engine_eval.best_move.as_deref()?;
    let evaluation = engine_eval.evaluation?;
    let evaluation = match side_to_move {
        Color::White => evaluation,
        Color::Black => evaluation.flip(),
    };
    let cp = match evaluation {
        Evaluation::Centipawns(cp) => cp,
        Evaluation::Mate(n) if n > 0 => ENGINE_MATE_CP,
        Evaluation::Mate(_) => -ENGINE_MATE_CP,
    };
    let moves = if engine_eval.pv.is_empty() {
        best_move.to_string()
    } else {
        engine_eval.pv.join(" ")
    };
    Some(CloudEval {
        fen: fen.to_string(),
        knodes: 0,
        depth: engine_eval.depth,
        pvs: vec![PvLine {
            moves,
            cp: Some(cp),
            mate: None,
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
    const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";

    #[derive(Default)]
    struct ScriptedSource {
        evals: HashMap<String, CloudEval>,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    impl EvaluationSource for ScriptedSource {
        async fn lookup(&self, fen: &str, _multi_pv: u32) -> Result<CloudLookup, ReviewError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ReviewError::Source("offline".into()));
            }
            Ok(self
                .evals
                .get(fen)
                .cloned()
                .map_or(CloudLookup::NotFound, CloudLookup::Found))
        }
    }

    struct ScriptedEngine {
        reply: Option<EngineEval>,
    }

    impl Engine for ScriptedEngine {
        async fn evaluate(&mut self, _fen: &str, _limits: SearchLimits) -> Result<EngineEval, ReviewError> {
            self.reply
                .clone()
                .ok_or_else(|| ReviewError::Stockfish("not running".into()))
        }
    }

    fn engine_eval(evaluation: Evaluation) -> EngineEval {
        EngineEval {
            evaluation: Some(evaluation),
            best_move: Some("e7e5".into()),
            pv: vec!["e7e5".into(), "g1f3".into()],
            depth: 12,
        }
    }

    fn service(source: ScriptedSource, reply: Option<EngineEval>) -> AnalysisService<ScriptedSource, ScriptedEngine> {
        AnalysisService::new(
            PositionCache::new(Duration::from_secs(60)),
            source,
            ScriptedEngine { reply },
            SearchLimits::default(),
        )
    }

    #[tokio::test]
    async fn test_cloud_result_is_cached() {
        let cloud = CloudEval {
            fen: START.into(),
            knodes: 1000,
            depth: 40,
            pvs: vec![PvLine { moves: "e2e4 e7e5".into(), cp: Some(20), mate: None }],
        };
        let calls = Arc::new(AtomicUsize::new(0));
        let source = ScriptedSource {
            evals: HashMap::from([(START.to_string(), cloud.clone())]),
            calls: calls.clone(),
            ..Default::default()
        };
        let service = service(source, None);

        let first = service.analyze_position(START, 1, 15).await.unwrap();
        assert_eq!(first.source, AnalysisSource::Lichess);
        assert_eq!(first.depth, Some(40));
        assert_eq!(first.evaluation, cloud);

        let second = service.analyze_position(START, 1, 15).await.unwrap();
        assert_eq!(second.source, AnalysisSource::Cache);
        assert_eq!(second.evaluation, cloud);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_engine_fallback_is_white_relative() {
        // Black to move and Black is better by 35
        let service = service(
            ScriptedSource { fail: true, ..Default::default() },
            Some(engine_eval(Evaluation::Centipawns(35))),
        );
        let result = service.analyze_position(AFTER_E4, 1, 12).await.unwrap();
        assert_eq!(result.source, AnalysisSource::Stockfish);
        assert_eq!(result.depth, Some(12));
        assert_eq!(result.evaluation.pvs[0].cp, Some(-35));
        assert_eq!(result.evaluation.pvs[0].moves, "e7e5 g1f3");
    }

    #[tokio::test]
    async fn test_engine_mate_becomes_large_score() {
        let service = service(ScriptedSource::default(), Some(engine_eval(Evaluation::Mate(3))));
        let result = service.analyze_position(START, 1, 12).await.unwrap();
        assert_eq!(result.evaluation.pvs[0].cp, Some(ENGINE_MATE_CP));
        assert_eq!(result.evaluation.pvs[0].mate, None);
    }

    #[tokio::test]
    async fn test_all_sources_failing_gives_empty_result() {
        let service = service(ScriptedSource { fail: true, ..Default::default() }, None);
        let result = service.analyze_position(START, 1, 12).await.unwrap();
        assert_eq!(result.source, AnalysisSource::None);
        assert!(result.evaluation.pvs.is_empty());
        assert_eq!(result.depth, None);
    }

    #[tokio::test]
    async fn test_invalid_fen_is_rejected() {
        let service = service(ScriptedSource::default(), None);
        let err = service.analyze_position("not a fen", 1, 12).await.unwrap_err();
        assert!(matches!(err, ReviewError::InvalidFen(_)));
    }

    #[tokio::test]
    async fn test_batch_drops_invalid_positions() {
        let service = service(ScriptedSource::default(), Some(engine_eval(Evaluation::Centipawns(10))));
        let fens: Vec<String> = [START, "garbage", AFTER_E4, START, START, AFTER_E4, START]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let results = service.analyze_multiple_positions(&fens, 10).await;
        assert_eq!(results.len(), 6);
        assert_eq!(results[1].fen, AFTER_E4);
    }

    #[test]
    fn test_serialized_shape() {
        let result = EnhancedAnalysisResult {
            source: AnalysisSource::None,
            fen: START.into(),
            evaluation: CloudEval::empty(START),
            depth: None,
            time_taken: 0.5,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["source"], "none");
        assert_eq!(json["timeTaken"], 0.5);
        assert!(json.get("depth").is_none());
    }
}
