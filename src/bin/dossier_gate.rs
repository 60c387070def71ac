//! Dossier Gate CLI
//!
//! Replays the validation gate over a stored run bundle (parser facts plus
//! chapter compositions) and prints the decision.
//!
//! Usage:
//!   cargo run --features cli --bin dossier_gate -- bundle.json
//!   cargo run --features cli --bin dossier_gate -- bundle.json --config config/governance.yaml
//!   cargo run --features cli --bin dossier_gate -- bundle.json --json
//!
//! Exit codes: 0 when the gate passes, 1 when it fails, 2 on input errors.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use dossier::config::GovernanceConfig;
use dossier::gate::{GateResult, RunBundle};
use dossier::ownership::OwnershipResolver;
use dossier::Violation;

/// Replay the validation gate over a run bundle
#[derive(Parser, Debug)]
#[command(name = "dossier_gate")]
#[command(about = "Validate chapter compositions against a locked fact registry")]
struct Args {
    /// Run bundle (JSON with `facts` and `compositions`)
    bundle: PathBuf,

    /// Governance config; falls back to DOSSIER_CONFIG, then built-in defaults
    #[arg(long, short = 'c', env = "DOSSIER_CONFIG")]
    config: Option<PathBuf>,

    /// Print the gate result as JSON instead of a listing
    #[arg(long)]
    json: bool,

    /// Hide warnings in the listing
    #[arg(long, short = 'q')]
    quiet: bool,
}

fn main() -> ExitCode {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(result) if result.passed => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(err) => {
            eprintln!("{} {:#}", "ERROR:".red().bold(), err);
            ExitCode::from(2)
        }
    }
}

fn run(args: &Args) -> Result<GateResult> {
    let config = match &args.config {
        Some(path) => GovernanceConfig::load(path)?,
        None => GovernanceConfig::from_env()?,
    };
    let resolver = OwnershipResolver::from_config(&config.chapters)?;

    let raw = std::fs::read_to_string(&args.bundle)
        .with_context(|| format!("Failed to read {}", args.bundle.display()))?;
    let bundle: RunBundle = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", args.bundle.display()))?;

    let result = bundle
        .evaluate(&config, &resolver)
        .context("Registry rejected the bundle's facts")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_listing(&bundle, &result, args.quiet);
    }
    Ok(result)
}

fn print_listing(bundle: &RunBundle, result: &GateResult, quiet: bool) {
    println!(
        "{} {} chapter(s), {} fact(s)",
        "Bundle:".bold(),
        bundle.compositions.len(),
        bundle.facts.len()
    );

    for violation in &result.fatal_violations {
        print_violation(violation);
    }
    if !quiet {
        for violation in &result.warnings {
            print_violation(violation);
        }
    }

    println!();
    if result.passed {
        println!("{} {}", "✓".green().bold(), result.summary().green());
    } else {
        println!("{} {}", "✗".red().bold(), result.summary().red());
    }
}

fn print_violation(violation: &Violation) {
    let tag = if violation.is_fatal() {
        "FATAL".red().bold()
    } else {
        "WARN ".yellow().bold()
    };
    println!(
        "  {} {} {} {}",
        tag,
        format!("[{}/{}]", violation.chapter_id, violation.container).dimmed(),
        violation.code().cyan(),
        violation.message
    );
}
