//! The `stockharvest run` command.

use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use stockharvest_core::{inputs, Config, HarvestStats, Harvester, Progress};

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Directory receiving the cropped images and the metadata file
    #[arg(short, long)]
    pub root_dir: PathBuf,

    /// Newline-delimited keyword file
    #[arg(short, long)]
    pub keywords: PathBuf,

    /// JSON array of {"username", "password"} catalog credentials
    #[arg(short, long)]
    pub credentials: PathBuf,

    /// Number of download workers (default: CPU count × multiplier)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Metadata output format
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,
}

/// Metadata file formats selectable on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Comma-separated values with a header row
    Csv,
    /// One JSON object per line
    Jsonl,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}

/// Execute the run command.
pub async fn execute(args: RunArgs, config: Config) -> anyhow::Result<()> {
    let config = apply_overrides(config, &args)?;

    let root_dir = Config::expand_path(&args.root_dir);
    let keywords = inputs::load_keywords(&Config::expand_path(&args.keywords))?;
    let credentials = inputs::load_credentials(&Config::expand_path(&args.credentials))?;
    if keywords.is_empty() {
        tracing::warn!("No keywords found in {:?}", args.keywords);
    }
    tracing::info!(
        "Loaded {} keyword(s) and {} credential(s)",
        keywords.len(),
        credentials.len()
    );

    let harvester = Harvester::new(config);
    let output_path = harvester.output_path(&root_dir)?;

    let cancel = harvester.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing in-flight work (Ctrl-C again to abort)");
            cancel.cancel();
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        }
    });

    let spinner = create_spinner();
    let ticker = tokio::spawn(track_progress(spinner.clone(), harvester.progress()));

    let result = harvester.run(keywords, credentials, &root_dir).await;

    ticker.abort();
    interrupt.abort();
    spinner.finish_and_clear();

    let stats = result?;
    print_summary(&stats, &output_path);
    println!("{}", output_path.display());
    Ok(())
}

/// Fold command-line overrides into the loaded config and re-validate.
fn apply_overrides(mut config: Config, args: &RunArgs) -> anyhow::Result<Config> {
    if let Some(workers) = args.workers {
        config.download.workers = Some(workers);
    }
    if let Some(format) = args.format {
        config.output.format = format.to_string();
    }
    config.validate()?;
    Ok(config)
}

/// Create the live spinner shown while the pipeline runs.
fn create_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message("starting...");
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Refresh the spinner message from the live counters until aborted.
async fn track_progress(pb: ProgressBar, progress: Arc<Progress>) {
    let mut interval = tokio::time::interval(Duration::from_millis(250));
    loop {
        interval.tick().await;
        pb.set_message(progress_message(&progress.snapshot(pb.elapsed())));
    }
}

fn progress_message(stats: &HarvestStats) -> String {
    let mut msg = format!(
        "{} keywords | {} jobs | {} saved | {} rows",
        stats.keywords_searched, stats.jobs_produced, stats.records_produced, stats.rows_written
    );
    if stats.jobs_failed > 0 {
        msg.push_str(&format!(" | {} failed", stats.jobs_failed));
    }
    msg
}

/// Print a formatted summary table after the harvest.
fn print_summary(stats: &HarvestStats, output_path: &Path) {
    let secs = stats.elapsed.as_secs_f64();
    let rate = if secs > 0.0 {
        stats.rows_written as f64 / secs
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Keywords:     {:>8}", stats.keywords_searched);
    if stats.keywords_abandoned > 0 {
        eprintln!("    Abandoned:    {:>8}", stats.keywords_abandoned);
    }
    eprintln!("    Jobs:         {:>8}", stats.jobs_produced);
    eprintln!("    Saved:        {:>8}", stats.records_produced);
    if stats.jobs_failed > 0 {
        eprintln!("    Failed:       {:>8}", stats.jobs_failed);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Rows:         {:>8}", stats.rows_written);
    if stats.rows_failed > 0 {
        eprintln!("    Rows dropped: {:>8}", stats.rows_failed);
    }
    eprintln!("    Duration:     {:>7.1}s", secs);
    eprintln!("    Rate:         {:>7.1} img/sec", rate);
    eprintln!("  ====================================");
    eprintln!("    Output: {}", output_path.display());
}
