//! CropWatch - per-field crop stress analysis dashboard core
//!
//! A CLI front end over the session core: loads field definitions,
//! runs stress analysis per field against a remote analysis service,
//! and renders Markdown/JSON stress reports.
//!
//! Exit codes:
//!   0 - Success (no field at or above --fail-on risk, or no --fail-on set)
//!   1 - Runtime error (connection, config, field file failure, etc.)
//!   2 - A field's forecast risk met the --fail-on threshold

mod analysis;
mod cli;
mod config;
mod models;
mod registry;
mod report;
mod service;
mod session;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, FailOnRisk, OutputFormat};
use config::Config;
use indicatif::{ProgressBar, ProgressStyle};
use models::{Field, RiskLevel};
use registry::FieldRegistry;
use service::HttpAnalysisService;
use session::Session;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("CropWatch v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_workflow(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Analysis run failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .cropwatch.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(".cropwatch.toml");

    if path.exists() {
        eprintln!("⚠️  .cropwatch.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .cropwatch.toml")?;

    println!("✅ Created .cropwatch.toml with default settings.");
    println!("   Edit it to customize the service URL, timeout and report layout.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete analysis workflow. Returns exit code (0 or 2).
async fn run_workflow(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    // Step 1: Load field definitions into the registry
    let fields_path = args
        .fields
        .as_ref()
        .context("No field definitions file given")?;
    let registry = load_registry(fields_path)?;
    info!("Loaded {} fields from {}", registry.len(), fields_path.display());

    // Step 2: Build the session and selection
    let mut session = Session::new();
    session.set_overlay_visible(config.general.overlay_visible);
    session.set_analysis_type(args.analysis_type);

    match args.select {
        Some(ref ids) => {
            for id in ids {
                session.select(id.trim());
            }
        }
        None => {
            for field in registry.fields() {
                session.select(field.id.clone());
            }
        }
    }

    if session.selection().is_empty() {
        anyhow::bail!("No fields selected for analysis");
    }

    // Handle --dry-run: list fields and exit
    if args.dry_run {
        return handle_dry_run(&registry, &session);
    }

    // Step 3: Run the analyses
    println!("🛰️  Running stress analysis...");
    println!("   Service: {}", config.service.url);
    println!("   Model type: {}", args.analysis_type);
    println!("   Fields: {}", session.selection().len());

    let analysis_service =
        HttpAnalysisService::new(config.service.url.clone(), config.service.timeout_seconds);

    let progress = spinner(!args.quiet, session.selection().len());
    let outcomes = session::run_selection(&mut session, &registry, &analysis_service).await;
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    // Step 4: Print per-field outcomes
    let mut analyzed = 0usize;
    let mut failed = 0usize;
    println!();
    for (field_id, outcome) in &outcomes {
        let name = registry
            .find(field_id)
            .map(|f| f.name.as_str())
            .unwrap_or(field_id.as_str());
        match outcome {
            Ok(result) => {
                analyzed += 1;
                let fraction = result.summary.stress_fraction();
                let risk = result
                    .prediction
                    .as_ref()
                    .map(|p| format!(" | risk {} {}", p.risk_level.emoji(), p.risk_level))
                    .unwrap_or_default();
                println!(
                    "   ✅ {}: combined stress {:.1}% (healthy {:.1}%){}",
                    name, result.summary.combined_stress, fraction.healthy, risk
                );
            }
            Err(e) => {
                failed += 1;
                println!("   ❌ {}: {}", name, e);
            }
        }
    }

    // Step 5: Build and write the report
    let duration = start_time.elapsed().as_secs_f64();
    let snapshots: Vec<_> = session
        .selection()
        .iter()
        .filter_map(|id| session.export_snapshot(&registry, id))
        .collect();

    let history = if config.report.include_history {
        session.history.entries().cloned().collect()
    } else {
        Vec::new()
    };

    let stress_report = report::Report {
        metadata: report::ReportMetadata {
            service_url: config.service.url.clone(),
            generated_at: Utc::now(),
            analysis_type: args.analysis_type.to_string(),
            fields_analyzed: analyzed,
            fields_failed: failed,
            duration_seconds: duration,
        },
        snapshots,
        history,
    };

    let comparisons = if config.report.include_comparison {
        analysis::compare(&session.store, session.selection())
    } else {
        Vec::new()
    };

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&stress_report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&stress_report, &comparisons),
    };

    let output_path = Path::new(&config.general.output);
    std::fs::write(output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    // Print summary
    println!("\n📊 Analysis Summary:");
    println!("   Fields analyzed: {} | failed: {}", analyzed, failed);
    if let Some(risk) = analysis::highest_risk(&session.store, session.selection()) {
        println!("   Highest forecast risk: {} {}", risk.emoji(), risk);
    }
    println!("   Duration: {:.1}s", duration);
    println!("\n✅ Report saved to: {}", output_path.display());

    // Check --fail-on threshold
    if let Some(fail_level) = args.fail_on {
        let threshold = fail_on_to_risk(fail_level);
        let at_or_above = analysis::highest_risk(&session.store, session.selection())
            .map(|risk| risk >= threshold)
            .unwrap_or(false);

        if at_or_above {
            eprintln!(
                "\n⛔ Forecast risk at or above {:?}. Failing (exit code 2).",
                fail_level
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Handle --dry-run: list fields that would be analyzed, exit.
fn handle_dry_run(registry: &FieldRegistry, session: &Session) -> Result<i32> {
    println!("\n🔍 Dry run: listing fields (no service call)...\n");

    for field_id in session.selection() {
        match registry.find(field_id) {
            Some(field) => println!(
                "   🌾 {} ({}) — {} vertices",
                field.name,
                field.id,
                field.geometry.ring.len()
            ),
            None => println!("   ⚠️  {} — not in field definitions", field_id),
        }
    }

    println!("\n✅ Dry run complete. No service calls were made.");
    Ok(0)
}

/// Spinner shown while analyses are in flight.
fn spinner(show: bool, field_count: usize) -> Option<ProgressBar> {
    if !show {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!("Analyzing {} field(s)...", field_count));
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// Convert FailOnRisk to RiskLevel for comparison.
fn fail_on_to_risk(level: FailOnRisk) -> RiskLevel {
    match level {
        FailOnRisk::Low => RiskLevel::Low,
        FailOnRisk::Moderate => RiskLevel::Moderate,
        FailOnRisk::High => RiskLevel::High,
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .cropwatch.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => Err(e).context("Failed to load .cropwatch.toml"),
    }
}

/// Load field definitions into a registry.
fn load_registry(path: &Path) -> Result<FieldRegistry> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read field definitions: {}", path.display()))?;

    let fields: Vec<Field> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse field definitions: {}", path.display()))?;

    let mut registry = FieldRegistry::new();
    for field in fields {
        let id = field.id.clone();
        registry
            .add_field(field)
            .with_context(|| format!("Invalid field definition '{}'", id))?;
    }

    Ok(registry)
}
