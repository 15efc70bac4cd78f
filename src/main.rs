use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use podget::batch::{BatchSummary, FeedOutcome, FeedReport, Pipeline, RunMode};
use podget::config::Config;
use podget::episode::{DownloadOutcome, OverwritePolicy};
use podget::serverlist;

/// Get the config directory path (~/.config/podget/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let config_dir = PathBuf::from(home).join(".config").join("podget");
    Ok(config_dir)
}

/// An explicit path wins; the config directory is only consulted without one.
fn path_or_default(
    explicit: Option<PathBuf>,
    name: &str,
    config_dir: impl FnOnce() -> Result<PathBuf>,
) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => Ok(config_dir()?.join(name)),
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "podget",
    version,
    about = "Download the latest episode of each configured podcast"
)]
struct Args {
    /// Config file (default: ~/.config/podget/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Feed list, one "<url> <nickname>" per line (default: ~/.config/podget/serverlist)
    #[arg(long, value_name = "FILE")]
    serverlist: Option<PathBuf>,

    /// Output root directory (overrides output_root in the config file)
    #[arg(long, short, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Number of feeds processed at once
    #[arg(long, short, value_name = "N")]
    jobs: Option<usize>,

    /// What to do when the episode file already exists
    #[arg(long, value_enum, value_name = "POLICY")]
    overwrite: Option<OverwritePolicy>,

    /// Inspect feeds and print target paths without downloading
    #[arg(long)]
    dry_run: bool,
}

fn print_report(report: &FeedReport) {
    match &report.result {
        Ok(FeedOutcome::Downloaded(DownloadOutcome::Written { path, bytes })) => {
            println!("{}: saved {} ({} bytes)", report.nickname, path.display(), bytes);
        }
        Ok(FeedOutcome::Downloaded(DownloadOutcome::Skipped { path })) => {
            println!("{}: already have {}", report.nickname, path.display());
        }
        Ok(FeedOutcome::Planned {
            target,
            content_url,
        }) => {
            println!(
                "{}: would save {} to {}",
                report.nickname,
                content_url,
                target.full_path.display()
            );
        }
        Err(e) => {
            println!("{}: FAILED [{}] {}", report.nickname, e.kind(), e);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the per-feed report
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("podget=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = path_or_default(args.config.clone(), "config.toml", get_config_dir)?;
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    if let Some(jobs) = args.jobs {
        config.concurrency = jobs;
    }
    if let Some(policy) = args.overwrite {
        config.overwrite = policy;
    }

    // OUTPUT_ROOT is resolved exactly once, here
    let output_root = match &args.output {
        Some(dir) => dir.clone(),
        None => config
            .resolve_output_root()
            .context("Failed to resolve output_root")?,
    };

    let mode = if args.dry_run {
        RunMode::DryRun
    } else {
        RunMode::Download
    };

    if mode == RunMode::Download {
        std::fs::create_dir_all(&output_root).with_context(|| {
            format!(
                "Failed to create output directory '{}': check permissions",
                output_root.display()
            )
        })?;
    }

    let serverlist_path =
        path_or_default(args.serverlist.clone(), "serverlist", get_config_dir)?;
    if !serverlist_path.exists() {
        eprintln!("Error: No serverlist found at {}", serverlist_path.display());
        eprintln!();
        eprintln!("Create it with one feed per line:");
        eprintln!("  <feed url> <nickname>");
        std::process::exit(1);
    }

    let endpoints = serverlist::load(&serverlist_path)?;
    if endpoints.is_empty() {
        eprintln!("Warning: No valid feeds found in {}", serverlist_path.display());
        return Ok(());
    }

    let pipeline =
        Pipeline::from_config(&config, output_root).context("Failed to build HTTP client")?;
    let reports = pipeline
        .run_all(endpoints, config.effective_concurrency(), mode)
        .await;

    for report in &reports {
        print_report(report);
    }

    let summary = BatchSummary::from_reports(&reports);
    println!(
        "{} saved, {} skipped, {} planned, {} failed",
        summary.written, summary.skipped, summary.planned, summary.failed
    );

    if summary.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
