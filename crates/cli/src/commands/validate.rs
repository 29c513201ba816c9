//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::SessionConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// `--json` output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    calibration_addr: String,
    event_addr: String,
    play_addr: Option<String>,
    calibration_steps: usize,
    batch_size: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        let error = format!("File not found: {config_path}");
        return ValidationResult::invalid(config_path, error);
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => ValidationResult::valid(config_path, &config),
        Err(e) => ValidationResult::invalid(config_path, e.to_string()),
    }
}

impl ValidationResult {
    fn valid(config_path: String, config: &SessionConfig) -> Self {
        let warnings = collect_warnings(config);
        Self {
            valid: true,
            config_path,
            error: None,
            warnings: (!warnings.is_empty()).then_some(warnings),
            summary: Some(ConfigSummary::from(config)),
        }
    }

    fn invalid(config_path: String, error: String) -> Self {
        Self {
            valid: false,
            config_path,
            error: Some(error),
            warnings: None,
            summary: None,
        }
    }
}

impl From<&SessionConfig> for ConfigSummary {
    fn from(config: &SessionConfig) -> Self {
        Self {
            version: format!("{:?}", config.version),
            calibration_addr: config.host.calibration_addr(),
            event_addr: config.host.event_addr(),
            play_addr: config.host.play_addr(),
            calibration_steps: config.calibration.steps,
            batch_size: config.streaming.batch_size,
        }
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &SessionConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let cal = &config.calibration;

    if cal.warmup_discard >= cal.steps {
        warnings.push(format!(
            "calibration.warmup_discard ({}) >= steps ({}) - mse uses only the last retained step",
            cal.warmup_discard, cal.steps
        ));
    }

    if cal.steps < 10 {
        warnings.push(format!(
            "calibration.steps is {} - the offset fit has little data to converge",
            cal.steps
        ));
    }

    if config.network.io_timeout_ms == 0 {
        warnings.push("network.io_timeout_ms is 0 - a hung host stalls calibration".to_string());
    }

    if config.host.play_port.is_none() && config.streaming.play_delay_ms != 1000 {
        warnings.push("streaming.play_delay_ms is set but no host.play_port".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Calibration: {}", summary.calibration_addr);
            println!("  Events: {}", summary.event_addr);
            if let Some(ref play) = summary.play_addr {
                println!("  Play: {}", play);
            }
            println!("  Calibration steps: {}", summary.calibration_steps);
            println!("  Batch size: {}", summary.batch_size);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args_for(content: &str) -> (tempfile::NamedTempFile, ValidateArgs) {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        };
        (file, args)
    }

    #[test]
    fn test_valid_config_summary() {
        let (_file, args) = args_for(
            r#"
[host]
address = "192.168.1.100"
play_port = 10002
"#,
        );
        let result = validate_config(&args);
        assert!(result.valid);
        let summary = result.summary.unwrap();
        assert_eq!(summary.event_addr, "192.168.1.100:10001");
        assert_eq!(summary.play_addr.as_deref(), Some("192.168.1.100:10002"));
        assert!(result.warnings.is_none());
    }

    #[test]
    fn test_short_calibration_warns() {
        let (_file, args) = args_for(
            r#"
[host]
address = "192.168.1.100"

[calibration]
steps = 5
"#,
        );
        let result = validate_config(&args);
        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("warmup_discard"));
    }

    #[test]
    fn test_invalid_config_reports_error() {
        let (_file, args) = args_for(
            r#"
[host]
address = "192.168.1.100"

[streaming]
batch_size = 0
"#,
        );
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("batch_size"));
    }

    #[test]
    fn test_missing_file() {
        let args = ValidateArgs {
            config: "/nonexistent/accel-sync.toml".into(),
            json: false,
        };
        assert!(!validate_config(&args).valid);
    }
}
