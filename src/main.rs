use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use logsentinel::config::AnalyzerConfig;
use logsentinel::index::{IndexClient, TimeRange};
use logsentinel::pipeline::{self, Analysis, FetchRequest};
use logsentinel::{parser, report, system};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "logsentinel",
    about = "Security log analyzer with statistical and ML anomaly detection",
    version,
    long_about = None
)]
struct Cli {
    /// TOML configuration file (overrides LOGSENTINEL_CONFIG and /etc)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct OutputArgs {
    /// Directory for the HTML report
    #[arg(long, short, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Skip HTML report generation
    #[arg(long)]
    no_report: bool,

    /// Print the annotated table and summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one or more log files
    Analyze {
        /// Log files, concatenated in the given order
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Analyze logs pulled from an Elasticsearch-compatible index
    Fetch {
        /// Index pattern to search
        #[arg(long, value_name = "PATTERN")]
        index: Option<String>,

        /// Maximum number of documents
        #[arg(long)]
        size: Option<usize>,

        /// Lower time bound: `24h`, `7d`, or a date
        #[arg(long, value_name = "RANGE")]
        since: Option<String>,

        /// Custom query clause as JSON (replaces match_all)
        #[arg(long, value_name = "JSON")]
        query: Option<String>,

        /// Write annotated documents back (to INDEX or the configured results index)
        #[arg(long, num_args = 0..=1, value_name = "INDEX")]
        write_back: Option<Option<String>>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Print the detected format of a single log line
    Detect {
        /// Raw log line
        line: String,
    },

    /// List common log directories for this operating system
    LogDirs,
}

fn init_tracing(config: &AnalyzerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn finish(analysis: &Analysis, output: &OutputArgs, config: &AnalyzerConfig) -> Result<()> {
    let report_path = if output.no_report || !config.report.html {
        None
    } else {
        let dir = output
            .output
            .clone()
            .unwrap_or_else(|| config.report.output_dir.clone());
        Some(
            report::write_report(analysis, &dir, config.report.top_anomalies)
                .context("failed to generate HTML report")?,
        )
    };

    if output.json {
        println!("{}", serde_json::to_string_pretty(analysis)?);
    } else {
        println!();
        print!(
            "{}",
            report::console_summary(&analysis.summary, report_path.as_deref())
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AnalyzerConfig::resolve(cli.config.as_deref())?;
    init_tracing(&config);

    match cli.command {
        Commands::Analyze { files, output } => {
            tracing::info!(files = files.len(), "Analyzing log files");
            let analysis = pipeline::analyze_files(&files, &config)
                .await
                .context("log file analysis failed")?;
            finish(&analysis, &output, &config)?;
        }
        Commands::Fetch {
            index,
            size,
            since,
            query,
            write_back,
            output,
        } => {
            let mut request = FetchRequest::from_config(&config);
            if let Some(index) = index {
                request.index_pattern = index;
            }
            if let Some(size) = size {
                request.size = size;
            }
            request.time_range = since.as_deref().map(TimeRange::since);
            request.query = query
                .as_deref()
                .map(serde_json::from_str::<serde_json::Value>)
                .transpose()
                .context("--query is not valid JSON")?;

            let client = IndexClient::connect(&config.index)
                .await
                .context("search index unavailable")?;
            tracing::info!(index = %request.index_pattern, size = request.size, "Fetching logs");
            let analysis = pipeline::analyze_index(&client, &request, &config)
                .await
                .context("index analysis failed")?;

            if let Some(target) = write_back {
                let target = target.unwrap_or_else(|| config.index.results_index.clone());
                let outcome = client
                    .write_analysis_results(&analysis.records, &target)
                    .await
                    .with_context(|| format!("failed to write results to {target}"))?;
                eprintln!(
                    "Indexed {} documents to {} ({} failed)",
                    outcome.indexed, target, outcome.failed
                );
            }
            finish(&analysis, &output, &config)?;
        }
        Commands::Detect { line } => {
            println!("{}", parser::detect_log_type(&line));
        }
        Commands::LogDirs => {
            println!("Common log directories on {}:", system::os_name());
            for dir in system::log_directories() {
                println!("  {}", dir.display());
            }
        }
    }

    Ok(())
}
