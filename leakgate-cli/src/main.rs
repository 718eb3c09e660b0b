//! Command-line interface entry point for `leakgate`.
//!
//! Exit codes: 0 for a passing run, 1 when the verdict is fail, 2 for
//! configuration or engine errors (nothing was gated).

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::io::Read as _;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use leakgate::{
    CancelToken, Confidence, Finding, RuleSource, RunStatus, ScanRequest, ScanResult,
    SuppressionSource, Verdict,
};

/// Command line interface configuration using `clap`.
/// This struct defines the arguments and flags accepted by the program.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "leakgate - Fast, deterministic secret scanning for trees and staged diffs",
    long_about = None
)]
struct Cli {
    /// Directory tree to scan.
    /// Ignored when --diff is given.
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Scan the added lines of a unified diff read from this file
    /// instead of walking a tree. Use `-` to read the diff from stdin.
    #[arg(long)]
    diff: Option<PathBuf>,

    /// TOML rule file merged after the built-in detectors.
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Drop the built-in detectors and use only --rules.
    #[arg(long, requires = "rules")]
    no_builtin: bool,

    /// TOML allowlist/baseline file.
    /// Inline markers work without one.
    #[arg(long)]
    suppressions: Option<PathBuf>,

    /// Minimum confidence at which a finding fails the run
    /// (low, medium, high, critical).
    #[arg(long, default_value = "high")]
    min_confidence: Confidence,

    /// Glob of paths to scan; repeatable. Empty means every walked file.
    #[arg(long)]
    include: Vec<String>,

    /// Glob of paths to skip; repeatable, applied after --include.
    #[arg(long)]
    exclude: Vec<String>,

    /// Worker thread count. Defaults to available parallelism.
    #[arg(long)]
    workers: Option<usize>,

    /// Overall run deadline in seconds. An expired run reports what it
    /// confirmed and is marked cancelled.
    #[arg(long)]
    timeout: Option<u64>,

    /// Skip files larger than this many bytes.
    #[arg(long, default_value_t = 5 * 1024 * 1024)]
    max_file_size: u64,

    /// Output the full result as JSON.
    #[arg(long)]
    json: bool,

    /// Suppress the human-readable report; the exit code carries the verdict.
    #[arg(short, long, conflicts_with = "json")]
    quiet: bool,
}

fn main() -> ExitCode {
    // Avoid std::process::exit() so destructors (and profile flushes) run.
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let cancel = CancelToken::new();
    let interrupt = cancel.clone();
    ctrlc::set_handler(move || interrupt.cancel())
        .context("cannot install interrupt handler")?;

    let request = build_request(&cli)?;
    let result = leakgate::run(&request, &cancel)?;

    if cli.json {
        println!("{}", result.to_json()?);
    } else if !cli.quiet {
        print_report(&result);
    }

    Ok(match result.verdict {
        Verdict::Pass => ExitCode::SUCCESS,
        Verdict::Fail => ExitCode::from(1),
    })
}

fn build_request(cli: &Cli) -> Result<ScanRequest> {
    let mut request = match &cli.diff {
        Some(path) => ScanRequest::diff(read_diff(path)?),
        None => ScanRequest::tree(cli.path.clone()),
    };

    if let Some(rules) = &cli.rules {
        request = request.with_rules(RuleSource::Path(rules.clone()));
    }
    request = request.with_builtin(!cli.no_builtin);
    if let Some(suppressions) = &cli.suppressions {
        request = request.with_suppressions(SuppressionSource::Path(suppressions.clone()));
    }
    request = request
        .with_min_confidence(cli.min_confidence)
        .with_include(cli.include.clone())
        .with_exclude(cli.exclude.clone())
        .with_max_file_size(cli.max_file_size);
    if let Some(workers) = cli.workers {
        request = request.with_workers(workers);
    }
    if let Some(seconds) = cli.timeout {
        request = request.with_timeout(Duration::from_secs(seconds));
    }
    Ok(request)
}

fn read_diff(path: &PathBuf) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("cannot read diff from stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("cannot read diff file `{}`", path.display()))
    }
}

fn print_report(result: &ScanResult) {
    for finding in &result.findings {
        println!("{}", format_finding(finding));
    }
    if !result.findings.is_empty() {
        println!();
    }

    fn pill(label: &str, count: usize) -> String {
        if count == 0 {
            format!("{}: {}", label, count.to_string().green())
        } else {
            format!("{}: {}", label, count.to_string().red().bold())
        }
    }

    println!(
        "{}  {}  {}  {}",
        pill("Findings", result.counts.total()),
        format!("Suppressed: {}", result.suppressed).dimmed(),
        format!("Known: {}", result.known_suppressed).dimmed(),
        format!("Skipped: {}", result.skipped.len()).dimmed(),
    );
    println!(
        "{}",
        format!("Scanned {} targets", result.scanned.to_string().bold()).dimmed()
    );

    for skipped in &result.skipped {
        eprintln!(
            "{}",
            format!("skipped {} ({})", skipped.file, skipped.reason).dimmed()
        );
    }

    if result.status == RunStatus::Cancelled {
        eprintln!("{}", "Run cancelled before completion; partial result.".yellow());
    }

    match result.verdict {
        Verdict::Pass => println!("{}", "PASS".green().bold()),
        Verdict::Fail => println!("{}", "FAIL".red().bold()),
    }
}

fn format_finding(finding: &Finding) -> String {
    let location = format!("{}:{}:{}", finding.file, finding.line, finding.column);
    let confidence = match finding.confidence {
        Confidence::Critical => "critical".red().bold(),
        Confidence::High => "high".red(),
        Confidence::Medium => "medium".yellow(),
        Confidence::Low => "low".dimmed(),
    };
    format!(
        "{} {} [{}] {}",
        location.bold(),
        finding.detector,
        confidence,
        finding.fragment.dimmed()
    )
}
