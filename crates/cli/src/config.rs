//! Session configuration resolution: file, then CLI / env overrides.

use contracts::SessionConfig;
use tracing::info;

use crate::cli::SessionArgs;
use crate::error::{CliError, Result};

/// Build the session config from `--config` plus overrides
///
/// Without a config file the host comes from `--host`, or from
/// `fallback_host` for commands that do not need a remote peer.
pub fn resolve(args: &SessionArgs, fallback_host: Option<&str>) -> Result<SessionConfig> {
    let mut config = match (&args.config, &args.host, fallback_host) {
        (Some(path), _, _) => {
            info!(config = %path.display(), "Loading configuration");
            config_loader::ConfigLoader::load_from_path(path).map_err(|source| {
                CliError::ConfigLoad {
                    path: path.display().to_string(),
                    source,
                }
            })?
        }
        (None, Some(host), _) => SessionConfig::for_host(host.clone()),
        (None, None, Some(host)) => SessionConfig::for_host(host),
        (None, None, None) => return Err(CliError::MissingHost),
    };

    if let Some(ref host) = args.host {
        info!(host = %host, "Overriding host from CLI");
        config.host.address = host.clone();
    }
    if let Some(port) = args.calibration_port {
        config.host.calibration_port = port;
    }
    if let Some(port) = args.event_port {
        config.host.event_port = port;
    }
    if let Some(port) = args.play_port {
        config.host.play_port = Some(port);
    }

    config_loader::validate(&config).map_err(CliError::ConfigValidation)?;
    Ok(config)
}
