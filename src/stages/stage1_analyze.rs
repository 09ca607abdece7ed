use std::time::Instant;

use tracing::{info, warn};

use crate::analysis::AnalysisRunner;
use crate::error::{InsightsError, Result};
use crate::models::{RawAnalysisReport, TranscriptSegment};

/// Execute Stage 1: hand the segments to the analysis routine
///
/// Blocks until the routine finishes. A report that consists only of the
/// routine's own `{"error": ...}` is treated as a failed run.
pub async fn execute_stage1(
    runner: &dyn AnalysisRunner,
    call_key: &str,
    segments: &[TranscriptSegment],
) -> Result<RawAnalysisReport> {
    info!(
        "Stage 1: Analyzing {} segments for {}",
        segments.len(),
        call_key
    );
    let started = Instant::now();

    let report = runner.run(call_key, segments).await.inspect_err(|e| {
        warn!("Stage 1: analysis for {} failed: {}", call_key, e);
    })?;

    if let Some(message) = report.reported_error() {
        warn!("Stage 1: analysis for {} reported an error: {}", call_key, message);
        return Err(InsightsError::AnalysisProcess(format!(
            "analysis routine reported: {}",
            message
        )));
    }

    info!(
        "Stage 1: analysis for {} finished in {:.1}s",
        call_key,
        started.elapsed().as_secs_f64()
    );
    Ok(report)
}
