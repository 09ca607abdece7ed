use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::info;

use crate::io::{HumanReport, write_insights_json};
use crate::models::NormalizedInsights;

/// Result of Stage 3 rendering
#[derive(Debug)]
pub struct Stage3Result {
    /// Path to the JSON insights (if generated)
    pub machine_path: Option<PathBuf>,
    /// Path to the text report (if generated)
    pub human_path: Option<PathBuf>,
}

/// Execute Stage 3: Rendering
///
/// Produces two output views:
/// 1. Machine view: the normalized insights as JSON
/// 2. Human view: a plain-text report
///
/// A view is written only when its path is given.
pub fn execute_stage3(
    insights: &NormalizedInsights,
    machine_output: Option<&Path>,
    human_output: Option<&Path>,
) -> Result<Stage3Result> {
    let mut result = Stage3Result {
        machine_path: None,
        human_path: None,
    };

    if let Some(path) = machine_output {
        info!("Writing insights JSON to {:?}", path);
        write_insights_json(insights, path)?;
        result.machine_path = Some(path.to_path_buf());
    }

    if let Some(path) = human_output {
        info!("Writing insights report to {:?}", path);
        HumanReport::new(insights).write_file(path)?;
        result.human_path = Some(path.to_path_buf());
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawAnalysisReport;

    #[test]
    fn test_stage3_writes_both_views() {
        let dir = tempfile::tempdir().unwrap();
        let machine = dir.path().join("insights.json");
        let human = dir.path().join("insights.txt");
        let insights = NormalizedInsights::fallback(RawAnalysisReport::default());

        let result = execute_stage3(&insights, Some(&machine), Some(&human)).unwrap();

        assert_eq!(result.machine_path.as_deref(), Some(machine.as_path()));
        assert_eq!(result.human_path.as_deref(), Some(human.as_path()));
        assert!(std::fs::read_to_string(&human).unwrap().contains("Call Insights"));
    }

    #[test]
    fn test_stage3_writes_only_requested_views() {
        let dir = tempfile::tempdir().unwrap();
        let machine = dir.path().join("insights.json");
        let insights = NormalizedInsights::fallback(RawAnalysisReport::default());

        let result = execute_stage3(&insights, Some(&machine), None).unwrap();

        assert_eq!(result.machine_path.as_deref(), Some(machine.as_path()));
        assert!(result.human_path.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
