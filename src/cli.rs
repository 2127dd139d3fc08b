//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::AnalysisType;
use clap::Parser;
use std::path::PathBuf;

/// CropWatch - per-field crop stress analysis from remote-sensing data
///
/// Runs stress analysis for drawn fields against a remote analysis
/// service and renders Markdown/JSON stress reports with per-field
/// comparison.
///
/// Examples:
///   cropwatch --fields fields.json
///   cropwatch --fields fields.json --select north-40,south-12
///   cropwatch --fields fields.json --format json --output report.json
///   cropwatch --fields fields.json --dry-run
///   cropwatch --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to the field definitions file
    ///
    /// A JSON array of fields: `[{"id", "name", "geometry": {"ring": [[lng, lat], ...]}}]`.
    /// Not required when using --init-config.
    #[arg(short, long, value_name = "FILE", required_unless_present = "init_config")]
    pub fields: Option<PathBuf>,

    /// Field ids to analyze (comma-separated)
    ///
    /// Defaults to every field in the definitions file, in file order.
    #[arg(short, long, value_name = "IDS", value_delimiter = ',')]
    pub select: Option<Vec<String>>,

    /// Analysis service base URL
    ///
    /// Can also be set via CROPWATCH_SERVICE_URL or .cropwatch.toml.
    #[arg(long, value_name = "URL", env = "CROPWATCH_SERVICE_URL")]
    pub service_url: Option<String>,

    /// Analysis model type
    #[arg(long, value_enum, default_value = "combined")]
    pub analysis_type: AnalysisType,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .cropwatch.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Hide the heatmap overlay in the session
    #[arg(long)]
    pub no_overlay: bool,

    /// Fail if any analyzed field's forecast risk is at or above this level
    ///
    /// Useful for alerting pipelines. Exit code 2 when the threshold is met.
    /// Values: low, moderate, high
    #[arg(long, value_name = "LEVEL")]
    pub fail_on: Option<FailOnRisk>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: load and list fields without calling the service
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .cropwatch.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Risk level threshold for --fail-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum FailOnRisk {
    Low,
    Moderate,
    High,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref fields) = self.fields {
            if !fields.exists() {
                return Err(format!(
                    "Field definitions file does not exist: {}",
                    fields.display()
                ));
            }
        }

        // Validate service URL format (not needed for dry-run)
        if !self.dry_run {
            if let Some(ref url) = self.service_url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err("Service URL must start with 'http://' or 'https://'".to_string());
                }
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref select) = self.select {
            if select.iter().any(|id| id.trim().is_empty()) {
                return Err("--select contains an empty field id".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            fields: None,
            select: None,
            service_url: Some("http://localhost:8000".to_string()),
            analysis_type: AnalysisType::Combined,
            output: None,
            format: OutputFormat::Markdown,
            config: None,
            timeout: None,
            no_overlay: false,
            fail_on: None,
            verbose: false,
            quiet: false,
            dry_run: false,
            init_config: false,
        }
    }

    #[test]
    fn test_validation_invalid_service_url() {
        let mut args = make_args();
        args.service_url = Some("localhost:8000".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_timeout() {
        let mut args = make_args();
        args.timeout = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_empty_selection_id() {
        let mut args = make_args();
        args.select = Some(vec!["north-40".to_string(), " ".to_string()]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_init_config_skips_validation() {
        let mut args = make_args();
        args.init_config = true;
        args.service_url = Some("not-a-url".to_string());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_fail_on_risk_ordering() {
        assert!(FailOnRisk::Low < FailOnRisk::Moderate);
        assert!(FailOnRisk::Moderate < FailOnRisk::High);
    }
}
