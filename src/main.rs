// src/main.rs

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Result, eyre};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::info;
use url::Url;

use apisentry::core::catalog;
use apisentry::core::models::{ScanConfig, ScanReport, Severity};
use apisentry::core::orchestrator::{CancelFlag, run_scan};
use apisentry::logging::initialize_logging;

/// apisentry - OWASP API Security Top 10 scanner
#[derive(Parser)]
#[command(name = "apisentry")]
#[command(version)]
#[command(about = "Scan an API for the OWASP API Security Top 10", long_about = None)]
struct Cli {
    /// Target API URL (scheme defaults to https:// when omitted)
    target: String,

    /// Custom header in `Key: Value` form (repeatable), e.g. Authorization
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Comma-separated test ids to run (default: all). See --list-tests
    #[arg(short, long)]
    tests: Option<String>,

    /// List available tests and exit
    #[arg(long)]
    list_tests: bool,

    /// Requests fired by the rate-limit burst
    #[arg(long, default_value_t = 15)]
    burst_size: usize,

    /// Maximum probes running in parallel
    #[arg(long, default_value_t = 4)]
    concurrency: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 10)]
    request_timeout: u64,

    /// Overall scan deadline in seconds (unset: no deadline)
    #[arg(long)]
    scan_timeout: Option<u64>,

    /// Accept invalid TLS certificates (lab targets only)
    #[arg(long)]
    insecure: bool,

    /// Report output path (default: security_report_<scan_id>.json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Exit non-zero when a finding at or above this severity exists
    #[arg(long, value_enum, default_value = "critical")]
    fail_on: FailOn,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FailOn {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl From<FailOn> for Severity {
    fn from(value: FailOn) -> Self {
        match value {
            FailOn::Info => Severity::Info,
            FailOn::Low => Severity::Low,
            FailOn::Medium => Severity::Medium,
            FailOn::High => Severity::High,
            FailOn::Critical => Severity::Critical,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    initialize_logging()?;

    let cli = Cli::parse();

    if cli.list_tests {
        print_catalog();
        return Ok(());
    }

    let config = build_config(&cli)?;

    let cancel = CancelFlag::new();
    let ctrl_c_flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\ninterrupt received; finishing in-flight probes...");
            ctrl_c_flag.cancel();
        }
    });

    println!("Scanning {} ({} tests selected)", config.target, config.selected_test_ids.len());
    let report = run_scan(&config, &cancel).await?;

    print_summary(&report);

    let output_path = cli
        .output
        .unwrap_or_else(|| PathBuf::from(format!("security_report_{}.json", report.scan_id)));
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(&output_path, json)?;
    println!("\nReport written to {}", output_path.display());
    info!(path = %output_path.display(), "report written");

    let threshold: Severity = cli.fail_on.into();
    let gating = report
        .findings
        .iter()
        .filter(|f| f.severity >= threshold)
        .count();
    if gating > 0 {
        eprintln!(
            "{} finding(s) at or above {} severity",
            gating,
            threshold.to_string().to_lowercase()
        );
        std::process::exit(2);
    }

    Ok(())
}

fn print_catalog() {
    println!("Available tests:");
    for def in catalog::definitions() {
        println!(
            "  {:<22} [{}] {:<9} {}",
            def.id,
            def.category.code(),
            def.severity.to_string(),
            def.title
        );
    }
}

fn build_config(cli: &Cli) -> Result<ScanConfig> {
    let raw = cli.target.trim();
    let with_scheme = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };
    let target = Url::parse(&with_scheme)
        .map_err(|e| eyre!("invalid target URL `{}`: {}", cli.target, e))?;

    let mut headers = HashMap::new();
    for raw_header in &cli.headers {
        let (name, value) = raw_header
            .split_once(':')
            .ok_or_else(|| eyre!("invalid header `{}`; expected `Key: Value`", raw_header))?;
        headers.insert(name.trim().to_string(), value.trim().to_string());
    }

    let selected: Vec<String> = match cli.tests.as_deref() {
        None => catalog::definitions().iter().map(|d| d.id.to_string()).collect(),
        Some(list) if list.eq_ignore_ascii_case("all") => {
            catalog::definitions().iter().map(|d| d.id.to_string()).collect()
        }
        Some(list) => list.split(',').map(|id| id.trim().to_string()).collect(),
    };

    let mut config = ScanConfig::new(target, headers, selected);
    config.tuning.burst_size = cli.burst_size;
    config.tuning.request_timeout = std::time::Duration::from_secs(cli.request_timeout);
    config.concurrency = cli.concurrency;
    config.scan_timeout = cli.scan_timeout.map(std::time::Duration::from_secs);
    config.insecure_tls = cli.insecure;
    Ok(config)
}

fn print_summary(report: &ScanReport) {
    println!("\n=== Scan {} ===", report.scan_id);
    println!("Target:          {}", report.target);
    println!(
        "Duration:        {:.2}s{}",
        (report.finished_at - report.started_at).num_milliseconds() as f64 / 1000.0,
        if report.partial { " (partial scan)" } else { "" }
    );
    println!("Tests run:       {}", report.tests_run.len());
    println!("Findings:        {}", report.findings.len());
    println!(
        "Risk:            {}/100 ({})",
        report.summary.risk_score, report.summary.risk_level
    );

    if !report.findings.is_empty() {
        println!("\nFindings by severity:");
        for (severity, count) in report.summary.by_severity.iter().rev() {
            if *count > 0 {
                println!("  {:<9} {}", severity.to_string(), count);
            }
        }
        println!("\nDetails:");
        for (idx, finding) in report.findings.iter().enumerate() {
            println!(
                "  #{} [{}] {} - {}",
                idx + 1,
                finding.severity,
                finding.category.code(),
                finding.title
            );
            println!("     endpoint:  {} {}", finding.endpoint.method, finding.endpoint.url);
            println!("     evidence:  {}", finding.evidence);
            println!("     fix:       {}", finding.recommendation);
        }
    }

    if !report.failures.is_empty() {
        println!("\nTests that could not complete:");
        for failure in &report.failures {
            println!("  {:<22} {}", failure.test_id, failure.reason);
        }
    }
}
