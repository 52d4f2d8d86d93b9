//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `seo_audit` library that handles:
//! - Command-line argument parsing
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use seo_audit::initialization::init_logger_with;
use seo_audit::{run_audit, Config, RunStatus, Severity};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments into Config
    let config = Config::parse();

    // Initialize logger based on config
    let log_level = config.log_level.clone();
    let log_format = config.log_format.clone();
    init_logger_with(log_level, log_format).context("Failed to initialize logger")?;

    match run_audit(config).await {
        Ok(result) => {
            let meta = &result.metadata;
            let status_note = match meta.status {
                RunStatus::Complete => "",
                RunStatus::Partial => " (partial: budget reached)",
            };
            println!(
                "Audited {} in {:.1}s{}: {} page{} fetched, {} failed",
                meta.root_url,
                meta.elapsed_seconds,
                status_note,
                meta.pages_succeeded,
                if meta.pages_succeeded == 1 { "" } else { "s" },
                meta.pages_failed,
            );

            for warning in &meta.policy_warnings {
                println!("  note: {warning}");
            }

            let critical = result
                .findings
                .iter()
                .filter(|f| f.severity == Severity::Critical)
                .count();
            println!(
                "{} finding{} ({} critical):",
                result.findings.len(),
                if result.findings.len() == 1 { "" } else { "s" },
                critical
            );
            for finding in &result.findings {
                let url = finding.urls.first().map(String::as_str).unwrap_or("-");
                println!(
                    "  [{:?}/{:?}] {} - {}",
                    finding.severity, finding.category, url, finding.detail
                );
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("seo_audit error: {:#}", e);
            process::exit(1);
        }
    }
}
