use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use call_insights::{
    AppConfig, HeuristicsConfig, InsightsCache, InsightsPipeline, NormalizedInsights,
    ProcessRunner, SupabaseStore, execute_stage2, execute_stage3,
    read_report_file, read_transcript_file,
    analysis::parse_command,
    config::parse_bind,
    server::{self, AppState},
};

#[derive(Parser)]
#[command(name = "call-insights")]
#[command(author, version, about = "Sales call insights pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Clone)]
struct AnalysisArgs {
    /// Analysis command line (overrides INSIGHTS_COMMAND)
    #[arg(long)]
    command: Option<String>,

    /// Analysis timeout in seconds (overrides INSIGHTS_TIMEOUT_SECS)
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the insights HTTP service
    Serve {
        /// Address to listen on (overrides INSIGHTS_BIND)
        #[arg(short, long)]
        bind: Option<String>,

        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Compute insights for one call record
    Process {
        /// Call identifier (call_id or numeric id)
        #[arg(short, long)]
        call_id: String,

        /// Recompute even if insights are cached
        #[arg(long)]
        refresh: bool,

        /// Output file for machine-readable insights (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output file for human-readable report (text)
        #[arg(long)]
        human_readable: Option<PathBuf>,

        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run the legacy flow on the fixed transcript and print the insights
    Legacy {
        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Normalize a saved raw analysis report without running the analysis
    Normalize {
        /// Raw report file (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for machine-readable insights (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output file for human-readable report (text)
        #[arg(long)]
        human_readable: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Split a transcript into speaker segments and print them as JSON
    Segment {
        /// Transcript file (text or JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            analysis,
            verbose,
        } => {
            setup_logging(verbose);
            let mut config = load_config(&analysis)?;
            if let Some(bind) = bind {
                config.bind = parse_bind(&bind)?;
            }
            let addr = config.bind;
            server::serve(AppState::new(build_pipeline(config)), addr).await
        }
        Commands::Process {
            call_id,
            refresh,
            output,
            human_readable,
            analysis,
            verbose,
        } => {
            setup_logging(verbose);
            let pipeline = build_pipeline(load_config(&analysis)?);
            let insights = if refresh {
                pipeline.reprocess(&call_id).await?
            } else {
                pipeline.get_insights(&call_id).await?
            };
            emit(&insights, output.as_deref(), human_readable.as_deref())
        }
        Commands::Legacy { analysis, verbose } => {
            setup_logging(verbose);
            let pipeline = build_pipeline(load_config(&analysis)?);
            let insights = pipeline.get_legacy_insights().await?;
            emit(&insights, None, None)
        }
        Commands::Normalize {
            input,
            output,
            human_readable,
            verbose,
        } => {
            setup_logging(verbose);
            info!("Loading raw report from {:?}", input);
            let raw = read_report_file(&input).context("Failed to load raw report")?;
            let insights = execute_stage2(raw, &HeuristicsConfig::default());
            emit(&insights, output.as_deref(), human_readable.as_deref())
        }
        Commands::Segment { input, verbose } => {
            setup_logging(verbose);
            let segments = read_transcript_file(&input).context("Failed to load transcript")?;
            info!("Found {} segments", segments.len());
            println!("{}", serde_json::to_string_pretty(&segments)?);
            Ok(())
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn load_config(args: &AnalysisArgs) -> Result<AppConfig> {
    let mut config = AppConfig::from_env()?;
    if let Some(command) = &args.command {
        let (program, program_args) = parse_command(command)?;
        config.analysis.program = program;
        config.analysis.args = program_args;
    }
    if let Some(secs) = args.timeout_secs {
        config.analysis.timeout = Duration::from_secs(secs);
    }
    Ok(config)
}

fn build_pipeline(config: AppConfig) -> InsightsPipeline {
    let missing = config.store.missing();
    let store = SupabaseStore::new(config.store);
    if !store.is_configured() {
        warn!(
            "Only the legacy flow will work without {}",
            missing.join(" and ")
        );
    }

    let runner = ProcessRunner::new(config.analysis);
    InsightsPipeline::new(InsightsCache::new(Arc::new(store)), Arc::new(runner))
        .with_legacy(config.legacy)
}

/// Print the insights and write any requested report files
fn emit(
    insights: &NormalizedInsights,
    output: Option<&Path>,
    human_readable: Option<&Path>,
) -> Result<()> {
    if output.is_some() || human_readable.is_some() {
        let result = execute_stage3(insights, output, human_readable)?;
        if let Some(path) = result.machine_path {
            info!("Insights written to {:?}", path);
        }
        if let Some(path) = result.human_path {
            info!("Report written to {:?}", path);
        }
    } else {
        println!("{}", serde_json::to_string_pretty(insights)?);
    }
    Ok(())
}
