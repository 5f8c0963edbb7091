//! `plagcheck`: check text files against each other.
//!
//! Files are submitted in order as one assignment; every file is compared
//! with the ones before it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use plagiarism::{CheckRequest, EngineConfig, JobStatus, PlagiarismEngine, PlagiarismResult, Scope};
use tracing_subscriber::EnvFilter;

/// Check text files for plagiarism against each other.
#[derive(Parser, Debug)]
#[command(name = "plagcheck", version, about)]
struct Cli {
    /// Engine configuration (YAML). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print full JSON reports instead of one summary line per file.
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON.
    #[arg(long)]
    log_json: bool,

    /// Course the files are submitted to.
    #[arg(long, default_value = "course")]
    course: String,

    /// Assignment the files are submitted to.
    #[arg(long, default_value = "assignment")]
    assignment: String,

    /// Text files, checked in the order given.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn submission_id(path: &Path, position: usize) -> String {
    match path.file_name() {
        Some(name) => format!("{position:03}-{}", name.to_string_lossy()),
        None => format!("{position:03}"),
    }
}

fn summary_line(path: &Path, report: &PlagiarismResult) -> String {
    let best = report
        .matched_sources
        .first()
        .map(|s| format!(", best match {}", s.source_id))
        .unwrap_or_default();
    format!(
        "{}: {:.2}% similar ({} sources{best}), {} patterns, {} words, readability {:.1}",
        path.display(),
        report.similarity_score,
        report.matched_sources.len(),
        report.suspicious_patterns.len(),
        report.analysis_results.word_count,
        report.analysis_results.readability_score,
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = EngineConfig::load(cli.config.as_deref()).context("loading configuration")?;
    init_tracing(&config.log_level, cli.log_json);

    let wait = config.jobs.timeout() + Duration::from_secs(1);
    let engine = PlagiarismEngine::new(config)?;
    let scope = Scope::new(cli.course.as_str(), cli.assignment.as_str());
    let mut reports = Vec::with_capacity(cli.files.len());

    for (position, path) in cli.files.iter().enumerate() {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let id = submission_id(path, position + 1);
        let request = CheckRequest::new(id.as_str(), "cli", scope.clone(), text);
        engine.request_check(request).await?;

        let check = engine
            .wait_for_terminal(&id, wait)
            .await
            .with_context(|| format!("check for {id} disappeared"))?;
        match (check.status, check.result) {
            (JobStatus::Completed, Some(report)) => {
                if !cli.json {
                    println!("{}", summary_line(path, &report));
                }
                reports.push(report);
            }
            (status, _) => {
                let reason = check
                    .error
                    .map(|e| format!("{}: {}", e.code, e.message))
                    .unwrap_or_else(|| format!("still {status}"));
                bail!("check of {} failed ({reason})", path.display());
            }
        }
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }
    engine.shutdown().await;
    Ok(())
}
