//! CLI binary for postsift.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use postsift::{
    Clock, Harvester, ManualClock, PassthroughSummarizer, ReplaySource, RunReport, SiftConfig,
    SiftError, SummaryStatus, SystemClock,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Postsift: paced keyword acquisition and relevance filtering for social posts.
#[derive(Parser)]
#[command(name = "postsift", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Seed for reproducible pacing.
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Rate-limited attempts before a query is abandoned.
    #[arg(long, global = true)]
    max_retries: Option<u32>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Acquire posts into the raw capture file.
    Acquire {
        /// Comma-separated keywords, replacing the configured list.
        #[arg(long, value_delimiter = ',')]
        keywords: Vec<String>,

        /// Fetch one user's timeline instead of searching keywords.
        #[arg(long)]
        user: Option<String>,

        /// Serve queries from a captured JSONL file instead of the network.
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Raw capture output path.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Passes over the keyword list (0 = until interrupted).
        #[arg(long)]
        passes: Option<u32>,

        /// Stop after this many sessions.
        #[arg(long)]
        max_sessions: Option<u32>,

        /// Compute and log pacing without actually waiting.
        #[arg(long)]
        instant: bool,
    },

    /// Deduplicate, score and rank a raw capture.
    Filter {
        /// Raw capture to read (defaults to the configured raw path).
        input: Option<PathBuf>,

        /// Filtered output path.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Minimum score a post needs to be kept.
        #[arg(long, allow_hyphen_values = true)]
        min_score: Option<i32>,

        /// How many top posts to print.
        #[arg(long, default_value_t = 5)]
        top: usize,
    },

    /// Build the summarizer hand-off text from the filtered output.
    Digest {
        /// Filtered input path.
        #[arg(long = "in")]
        input: Option<PathBuf>,

        /// Summary output path.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Show or initialise configuration.
    Config {
        /// Print the effective configuration as TOML.
        #[arg(long)]
        print: bool,

        /// Write the effective configuration to the config path.
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    postsift::logging::init(cli.verbose);

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(SiftConfig::default_config_path);
    let mut config = SiftConfig::load_or_default(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    if let Some(seed) = cli.seed {
        config.acquisition.seed = Some(seed);
    }
    if let Some(max_retries) = cli.max_retries {
        config.retry.max_retries = max_retries;
    }

    match cli.command {
        Command::Acquire {
            keywords,
            user,
            replay,
            out,
            passes,
            max_sessions,
            instant,
        } => {
            if !keywords.is_empty() {
                config.acquisition.keywords = keywords;
            }
            if let Some(out) = out {
                config.output.raw_path = out;
            }
            if let Some(passes) = passes {
                config.acquisition.passes = passes;
            }
            if max_sessions.is_some() {
                config.acquisition.max_sessions = max_sessions;
            }
            let replay = replay.ok_or_else(|| {
                SiftError::Precondition(
                    "no query capability available: pass --replay <capture.jsonl>".into(),
                )
            })?;
            let source = ReplaySource::from_file(&replay)?;

            let report = if instant {
                acquire(source, ManualClock::default(), config.clone(), user).await?
            } else {
                acquire(source, SystemClock, config.clone(), user).await?
            };
            print_run_report(&report, &config.output.raw_path);
        }

        Command::Filter {
            input,
            out,
            min_score,
            top,
        } => {
            if let Some(min_score) = min_score {
                config.filter.min_score = min_score;
            }
            let input = input.unwrap_or_else(|| config.output.raw_path.clone());
            let out = out.unwrap_or_else(|| config.output.filtered_path.clone());

            let pass = postsift::filter_file(&input, &out, &config.filter)?;
            let report = &pass.report;
            println!(
                "Read {} posts from {} ({} malformed lines skipped)",
                report.total_seen,
                input.display(),
                pass.malformed_lines
            );
            println!(
                "Kept {} of {} (duplicates {}, empty {}, disqualified {}, below threshold {})",
                report.kept.len(),
                report.total_seen,
                report.duplicates_dropped,
                report.empty_dropped,
                report.disqualified,
                report.below_threshold
            );
            if !report.kept.is_empty() {
                println!("Top {}:", top.min(report.kept.len()));
                for scored in report.top(top) {
                    println!(
                        "  [{:>3}] {}",
                        scored.score,
                        preview(scored.record.body(), 100)
                    );
                }
            }
            println!("Wrote {}", out.display());
        }

        Command::Digest { input, out } => {
            let input = input.unwrap_or_else(|| config.output.filtered_path.clone());
            let out = out.unwrap_or_else(|| config.output.summary_path.clone());
            let status = postsift::summarize_file(&input, &out, &PassthroughSummarizer).await?;
            match status {
                SummaryStatus::Summarized { records } => {
                    println!("Digest of {records} posts written to {}", out.display());
                }
                SummaryStatus::MissingInput => {
                    println!(
                        "No filtered file at {}; wrote placeholder to {}",
                        input.display(),
                        out.display()
                    );
                }
                SummaryStatus::NoPosts => {
                    println!(
                        "No posts in {}; wrote placeholder to {}",
                        input.display(),
                        out.display()
                    );
                }
                SummaryStatus::Failed(e) => {
                    println!(
                        "Summarizer failed ({e}); wrote error note to {}",
                        out.display()
                    );
                }
            }
        }

        Command::Config { print, init } => {
            config.validate()?;
            if init {
                config.save_to_file(&config_path)?;
                println!("Wrote {}", config_path.display());
            }
            if print || !init {
                print!("{}", config.to_toml()?);
            }
        }
    }

    Ok(())
}

async fn acquire<C: Clock>(
    source: ReplaySource,
    clock: C,
    config: SiftConfig,
    user: Option<String>,
) -> anyhow::Result<RunReport> {
    let cancel = CancellationToken::new();
    let mut harvester = Harvester::new(source, clock, config)?.with_cancel_token(cancel.clone());

    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, stopping after the current step...");
            cancel_clone.cancel();
        }
    });

    let report = match user {
        Some(user_id) => harvester.collect_user_timeline(&user_id).await?,
        None => harvester.run().await?,
    };
    Ok(report)
}

fn print_run_report(report: &RunReport, raw_path: &Path) {
    println!(
        "Queries: {} attempted, {} succeeded, {} abandoned after rate limiting, {} failed",
        report.queries_attempted,
        report.queries_succeeded,
        report.queries_abandoned,
        report.queries_failed
    );
    println!(
        "Saved {} posts to {} over {} session(s); stopped: {}",
        report.records_written,
        raw_path.display(),
        report.sessions_started,
        report.stop_reason
    );
}

fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{cut}…")
    }
}
