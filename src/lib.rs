pub mod analysis;
pub mod config;
pub mod error;
pub mod heuristics;
pub mod io;
pub mod models;
pub mod pipeline;
pub mod server;
pub mod stages;
pub mod store;

pub use analysis::{AnalysisConfig, AnalysisRunner, ProcessRunner};
pub use config::AppConfig;
pub use error::{InsightsError, Result};
pub use heuristics::HeuristicsConfig;
pub use io::{HumanReport, read_report_file, read_transcript_file, write_insights_json};
pub use models::{
    CallRecord, LookupStrategy, NormalizedInsights, RawAnalysisReport, TranscriptSegment,
};
pub use pipeline::{InsightsPipeline, LegacyConfig, Stage};
pub use stages::{execute_stage1, execute_stage2, execute_stage3, segment_transcript};
pub use store::{InsightsCache, MemoryStore, RecordStore, StoreConfig, SupabaseStore};
