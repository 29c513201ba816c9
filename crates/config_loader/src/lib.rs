//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Produce a `SessionConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("accel-sync.toml")).unwrap();
//! println!("Host: {}", config.host.address);
//! ```

mod parser;
mod validator;

pub use contracts::SessionConfig;
pub use parser::ConfigFormat;
pub use validator::validate;

use contracts::ContractError;
use std::path::Path;

/// Session configuration loader
///
/// File format follows the extension: `.toml` or `.json`. Every load path
/// validates before returning, so a returned [`SessionConfig`] is usable as is.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Read, parse and validate a config file
    ///
    /// # Errors
    /// - Unknown or missing extension ([`ContractError::ConfigParse`])
    /// - Read failure ([`ContractError::Io`])
    /// - Parse or validation failure
    pub fn load_from_path(path: &Path) -> Result<SessionConfig, ContractError> {
        let format = format_of(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Parse and validate config text
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<SessionConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }

    /// Validate and write `config` to `path` in the format of its extension
    pub fn save_to_path(config: &SessionConfig, path: &Path) -> Result<(), ContractError> {
        let format = format_of(path)?;
        validator::validate(config)?;
        std::fs::write(path, Self::render(config, format)?)?;
        Ok(())
    }

    pub fn render(config: &SessionConfig, format: ConfigFormat) -> Result<String, ContractError> {
        match format {
            ConfigFormat::Toml => toml::to_string_pretty(config)
                .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}"))),
            ConfigFormat::Json => serde_json::to_string_pretty(config)
                .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}"))),
        }
    }

    pub fn to_toml(config: &SessionConfig) -> Result<String, ContractError> {
        Self::render(config, ConfigFormat::Toml)
    }

    pub fn to_json(config: &SessionConfig) -> Result<String, ContractError> {
        Self::render(config, ConfigFormat::Json)
    }
}

fn format_of(path: &Path) -> Result<ConfigFormat, ContractError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ContractError::config_parse("cannot determine file format from extension"))?;

    ConfigFormat::from_extension(ext)
        .ok_or_else(|| ContractError::config_parse(format!("unsupported config format: .{ext}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FULL_TOML: &str = r#"
[host]
address = "192.168.1.100"
calibration_port = 10000
event_port = 10001
play_port = 10002

[calibration]
steps = 100
probe_packet_size = 16
outlier_coefficient = 1.0
alpha_initial = 1.0
alpha_floor = 0.01
alpha_decay = 0.1
warmup_discard = 10

[streaming]
batch_size = 10
play_delay_ms = 1000

[network]
connect_timeout_ms = 5000
io_timeout_ms = 2000
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(FULL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.host.address, "192.168.1.100");
        assert_eq!(config.host.play_port, Some(10002));
        assert_eq!(config.calibration.steps, 100);
    }

    #[test]
    fn test_round_trip_toml() {
        let config = ConfigLoader::load_from_str(FULL_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&config).unwrap();
        let config2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(config.host.address, config2.host.address);
        assert_eq!(config.host.play_port, config2.host.play_port);
        assert_eq!(config.streaming.batch_size, config2.streaming.batch_size);
    }

    #[test]
    fn test_round_trip_json() {
        let config = ConfigLoader::load_from_str(FULL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&config).unwrap();
        let config2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(config.calibration.alpha_floor, config2.calibration.alpha_floor);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[host]
address = "10.0.0.1"
calibration_port = 10000
event_port = 10000
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("distinct"));
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(FULL_TOML.as_bytes()).unwrap();

        let config = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(config.network.io_timeout_ms, 2000);
    }

    #[test]
    fn test_load_from_path_rejects_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = ConfigLoader::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn test_save_then_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let mut config = SessionConfig::for_host("172.16.0.9");
        config.host.play_port = Some(10002);
        config.streaming.batch_size = 25;

        ConfigLoader::save_to_path(&config, &path).unwrap();
        let loaded = ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(loaded.host.address, "172.16.0.9");
        assert_eq!(loaded.host.play_addr().as_deref(), Some("172.16.0.9:10002"));
        assert_eq!(loaded.streaming.batch_size, 25);
    }

    #[test]
    fn test_save_refuses_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");
        let mut config = SessionConfig::for_host("172.16.0.9");
        config.streaming.batch_size = 0;

        assert!(matches!(
            ConfigLoader::save_to_path(&config, &path),
            Err(ContractError::ConfigValidation { .. })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigLoader::load_from_path(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ContractError::Io(_)));
    }
}
