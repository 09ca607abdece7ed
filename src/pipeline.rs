use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::analysis::AnalysisRunner;
use crate::error::{InsightsError, Result};
use crate::heuristics::HeuristicsConfig;
use crate::models::NormalizedInsights;
use crate::stages::{execute_stage1, execute_stage2, segment_transcript};
use crate::store::{CacheLookup, InsightsCache, ResolvedRecord};

pub const DEFAULT_LEGACY_TRANSCRIPT: &str = "transcription.json";

/// Call key the legacy flow runs under
pub const LEGACY_CALL_KEY: &str = "legacy";

/// Configuration for the identifier-less legacy flow
#[derive(Debug, Clone)]
pub struct LegacyConfig {
    /// Fixed transcript the legacy flow analyzes
    pub transcript_path: PathBuf,
}

impl Default for LegacyConfig {
    fn default() -> Self {
        Self {
            transcript_path: PathBuf::from(DEFAULT_LEGACY_TRANSCRIPT),
        }
    }
}

impl LegacyConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        std::env::var("INSIGHTS_LEGACY_TRANSCRIPT")
            .map(|path| Self {
                transcript_path: PathBuf::from(path),
            })
            .unwrap_or_default()
    }
}

/// States of one insights request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CacheCheck,
    FetchTranscript,
    Segment,
    Invoke,
    Normalize,
    CacheWrite,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::CacheCheck => "cache_check",
            Stage::FetchTranscript => "fetch_transcript",
            Stage::Segment => "segment",
            Stage::Invoke => "invoke",
            Stage::Normalize => "normalize",
            Stage::CacheWrite => "cache_write",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Orchestrates cache check, segmentation, analysis, normalization and caching
pub struct InsightsPipeline {
    cache: InsightsCache,
    runner: Arc<dyn AnalysisRunner>,
    heuristics: HeuristicsConfig,
    legacy: LegacyConfig,
}

impl InsightsPipeline {
    pub fn new(cache: InsightsCache, runner: Arc<dyn AnalysisRunner>) -> Self {
        Self {
            cache,
            runner,
            heuristics: HeuristicsConfig::default(),
            legacy: LegacyConfig::default(),
        }
    }

    pub fn with_heuristics(mut self, heuristics: HeuristicsConfig) -> Self {
        self.heuristics = heuristics;
        self
    }

    pub fn with_legacy(mut self, legacy: LegacyConfig) -> Self {
        self.legacy = legacy;
        self
    }

    /// Insights for `call_id`, served from the cache when present
    pub async fn get_insights(&self, call_id: &str) -> Result<NormalizedInsights> {
        debug!(call_id, stage = %Stage::CacheCheck, "insights requested");
        match self.cache.get(call_id).await? {
            CacheLookup::Hit(insights) => {
                debug!(call_id, stage = %Stage::Done, "served from cache");
                Ok(insights)
            }
            CacheLookup::Miss(resolved) => self.compute(call_id, &resolved).await,
        }
    }

    /// Recompute insights for `call_id`, replacing whatever is cached
    pub async fn reprocess(&self, call_id: &str) -> Result<NormalizedInsights> {
        info!("Reprocessing call {}", call_id);
        let resolved = self.cache.resolve(call_id).await?;
        self.compute(call_id, &resolved).await
    }

    /// Insights for the fixed legacy transcript. Never reads or writes the record store.
    pub async fn get_legacy_insights(&self) -> Result<NormalizedInsights> {
        let path = &self.legacy.transcript_path;
        debug!(stage = %Stage::FetchTranscript, "reading legacy transcript {:?}", path);
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            InsightsError::Config(format!("cannot read legacy transcript {:?}: {}", path, e))
        })?;

        let segments = segment_transcript(&raw);
        if segments.is_empty() {
            return Err(InsightsError::NoTranscription {
                call_id: LEGACY_CALL_KEY.to_string(),
            });
        }

        let report = execute_stage1(self.runner.as_ref(), LEGACY_CALL_KEY, &segments).await?;
        Ok(execute_stage2(report, &self.heuristics))
    }

    async fn compute(&self, call_id: &str, resolved: &ResolvedRecord) -> Result<NormalizedInsights> {
        let started = Instant::now();

        debug!(call_id, stage = %Stage::FetchTranscript, "using record {}", resolved.key);
        let transcript = resolved
            .record
            .transcript_text()
            .ok_or_else(|| InsightsError::NoTranscription {
                call_id: call_id.to_string(),
            })?;

        debug!(call_id, stage = %Stage::Segment, "segmenting transcript");
        let segments = segment_transcript(transcript);
        if segments.is_empty() {
            return Err(InsightsError::NoTranscription {
                call_id: call_id.to_string(),
            });
        }

        debug!(call_id, stage = %Stage::Invoke, segments = segments.len(), "running analysis");
        let report = execute_stage1(self.runner.as_ref(), call_id, &segments).await?;

        debug!(call_id, stage = %Stage::Normalize, "normalizing report");
        let insights = execute_stage2(report, &self.heuristics);

        debug!(call_id, stage = %Stage::CacheWrite, "caching insights");
        if !self.cache.put(resolved, &insights).await {
            warn!("Returning uncached insights for call {}", call_id);
        }

        info!(
            "Insights for call {} ready in {:.1}s",
            call_id,
            started.elapsed().as_secs_f64()
        );
        Ok(insights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use crate::models::{CallRecord, RawAnalysisReport, TranscriptSegment};
    use crate::store::MemoryStore;

    /// Returns a fixed report and counts invocations
    struct CountingRunner {
        report: serde_json::Value,
        calls: AtomicUsize,
        segments_seen: AtomicUsize,
    }

    impl CountingRunner {
        fn new(report: serde_json::Value) -> Self {
            Self {
                report,
                calls: AtomicUsize::new(0),
                segments_seen: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AnalysisRunner for CountingRunner {
        async fn run(&self, _call_key: &str, segments: &[TranscriptSegment]) -> Result<RawAnalysisReport> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.segments_seen.store(segments.len(), Ordering::SeqCst);
            Ok(RawAnalysisReport::new(self.report.clone()))
        }
    }

    struct FailingRunner;

    #[async_trait]
    impl AnalysisRunner for FailingRunner {
        async fn run(&self, _call_key: &str, _segments: &[TranscriptSegment]) -> Result<RawAnalysisReport> {
            Err(InsightsError::AnalysisProcess("exit status: 1".to_string()))
        }
    }

    fn sample_report() -> serde_json::Value {
        json!({
            "call_summary": {"output": "{\"summary\": \"Discussed pricing and a demo\", \"rating\": 82, \"strengths\": \"\\n• Clear agenda\\n• Good rapport\"}"},
            "buyer_intent": {"output": "{\"nlp\": \"Positive\"}"},
            "profanity_check": {"output": "{\"severity level\": \"Clean ✅\"}"}
        })
    }

    fn record(id: i64, call_id: Option<&str>, transcription: Option<&str>) -> CallRecord {
        CallRecord {
            id: Some(id),
            call_id: call_id.map(str::to_string),
            transcription: transcription.map(str::to_string),
            ..Default::default()
        }
    }

    fn pipeline(store: Arc<MemoryStore>, runner: Arc<dyn AnalysisRunner>) -> InsightsPipeline {
        InsightsPipeline::new(InsightsCache::new(store), runner)
    }

    #[tokio::test]
    async fn test_get_insights_is_idempotent() {
        let store = Arc::new(MemoryStore::with_records(vec![record(
            1,
            Some("CA1"),
            Some("Agent: Hello\n\nCustomer: What does it cost?"),
        )]));
        let runner = Arc::new(CountingRunner::new(sample_report()));
        let pipeline = pipeline(store.clone(), runner.clone());

        let first = pipeline.get_insights("CA1").await.unwrap();
        let second = pipeline.get_insights("CA1").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(runner.calls(), 1);
        assert_eq!(runner.segments_seen.load(Ordering::SeqCst), 2);
        assert_eq!(store.write_count(), 1);

        assert_eq!(first.summary, "Discussed pricing and a demo");
        assert_eq!(first.rating, 82);
        assert_eq!(first.strengths, vec!["Clear agenda", "Good rapport"]);
        assert_eq!(first.buyer_intent, "Positive");
        assert_eq!(first.topics, vec!["Pricing", "Demo"]);
    }

    #[tokio::test]
    async fn test_missing_transcription() {
        let store = Arc::new(MemoryStore::with_records(vec![record(7, None, None)]));
        let runner = Arc::new(CountingRunner::new(sample_report()));
        let pipeline = pipeline(store, runner.clone());

        match pipeline.get_insights("7").await {
            Err(InsightsError::NoTranscription { call_id }) => assert_eq!(call_id, "7"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(runner.calls(), 0);
    }

    #[tokio::test]
    async fn test_blank_transcription_is_missing() {
        let store = Arc::new(MemoryStore::with_records(vec![record(7, None, Some("  \n\n "))]));
        let pipeline = pipeline(store, Arc::new(CountingRunner::new(sample_report())));

        assert!(matches!(
            pipeline.get_insights("7").await,
            Err(InsightsError::NoTranscription { .. })
        ));
    }

    #[tokio::test]
    async fn test_cached_insights_without_transcription() {
        let cached = NormalizedInsights::fallback(RawAnalysisReport::default());
        let mut stored = record(3, None, None);
        stored.insights = Some(serde_json::to_value(&cached).unwrap());
        let store = Arc::new(MemoryStore::with_records(vec![stored]));
        let runner = Arc::new(CountingRunner::new(sample_report()));
        let pipeline = pipeline(store, runner.clone());

        assert_eq!(pipeline.get_insights("3").await.unwrap(), cached);
        assert_eq!(runner.calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_call() {
        let pipeline = pipeline(
            Arc::new(MemoryStore::new()),
            Arc::new(CountingRunner::new(sample_report())),
        );

        assert!(matches!(
            pipeline.get_insights("CA404").await,
            Err(InsightsError::CallNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_legacy_numeric_id_lookup() {
        let store = Arc::new(MemoryStore::with_records(vec![record(
            76569,
            None,
            Some("Speaker 1: Hi"),
        )]));
        let pipeline = pipeline(store.clone(), Arc::new(CountingRunner::new(sample_report())));

        pipeline.get_insights("76569").await.unwrap();

        let stored = store.records().await.remove(0);
        assert!(stored.cached_insights().is_some());
        assert!(stored.processed_at.is_some());
    }

    #[tokio::test]
    async fn test_cache_write_failure_still_returns_insights() {
        let store = Arc::new(MemoryStore::with_records(vec![record(
            1,
            Some("CA1"),
            Some("Agent: Hello"),
        )]));
        store.set_fail_writes(true);
        let runner = Arc::new(CountingRunner::new(sample_report()));
        let pipeline = pipeline(store.clone(), runner.clone());

        let insights = pipeline.get_insights("CA1").await.unwrap();
        assert_eq!(insights.rating, 82);
        assert_eq!(store.write_count(), 0);

        // Nothing was cached, so the next request recomputes
        pipeline.get_insights("CA1").await.unwrap();
        assert_eq!(runner.calls(), 2);
    }

    #[tokio::test]
    async fn test_reprocess_skips_cache() {
        let store = Arc::new(MemoryStore::with_records(vec![record(
            1,
            Some("CA1"),
            Some("Agent: Hello"),
        )]));
        let runner = Arc::new(CountingRunner::new(sample_report()));
        let pipeline = pipeline(store.clone(), runner.clone());

        pipeline.get_insights("CA1").await.unwrap();
        pipeline.reprocess("CA1").await.unwrap();

        assert_eq!(runner.calls(), 2);
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_process_failure_propagates() {
        let store = Arc::new(MemoryStore::with_records(vec![record(
            1,
            Some("CA1"),
            Some("Agent: Hello"),
        )]));
        let pipeline = pipeline(store.clone(), Arc::new(FailingRunner));

        let err = pipeline.get_insights("CA1").await.unwrap_err();
        assert!(matches!(err, InsightsError::AnalysisProcess(_)));
        assert!(err.is_retryable());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_reported_error_is_process_failure() {
        let store = Arc::new(MemoryStore::with_records(vec![record(
            1,
            Some("CA1"),
            Some("Agent: Hello"),
        )]));
        let runner = Arc::new(CountingRunner::new(json!({"error": "model unavailable"})));
        let pipeline = pipeline(store, runner);

        assert!(matches!(
            pipeline.get_insights("CA1").await,
            Err(InsightsError::AnalysisProcess(_))
        ));
    }

    #[tokio::test]
    async fn test_legacy_flow_ignores_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcription.json");
        std::fs::write(
            &path,
            r#"{"transcript": [{"speaker": "Agent", "text": "Our pricing starts low"}]}"#,
        )
        .unwrap();

        let store = Arc::new(MemoryStore::new());
        store.set_fail_reads(true);
        store.set_fail_writes(true);
        let runner = Arc::new(CountingRunner::new(sample_report()));
        let pipeline = pipeline(store, runner.clone()).with_legacy(LegacyConfig {
            transcript_path: path,
        });

        let insights = pipeline.get_legacy_insights().await.unwrap();
        assert_eq!(insights.buyer_intent, "Positive");
        assert_eq!(runner.calls(), 1);
        assert_eq!(runner.segments_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_legacy_flow_missing_file() {
        let pipeline = pipeline(
            Arc::new(MemoryStore::new()),
            Arc::new(CountingRunner::new(sample_report())),
        )
        .with_legacy(LegacyConfig {
            transcript_path: PathBuf::from("/nonexistent/transcription.json"),
        });

        assert!(matches!(
            pipeline.get_legacy_insights().await,
            Err(InsightsError::Config(_))
        ));
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::CacheCheck.to_string(), "cache_check");
        assert_eq!(Stage::CacheWrite.to_string(), "cache_write");
    }
}
