//! Config file loading and environment overrides.
//!
//! Resolution order (later overrides earlier):
//! 1. TOML config file (explicit `--config` path, or `./vigil.toml`)
//! 2. `VIGIL_*` environment variables

use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};
use crate::types::{AgentConfig, SinkKind};

/// Default config filename, looked up in the working directory.
const PROJECT_CONFIG_FILE: &str = "vigil.toml";

/// Environment variables recognized as overrides.
const ENV_API_URL: &str = "VIGIL_API_URL";
const ENV_TOKEN: &str = "VIGIL_TOKEN";
const ENV_TOKEN_FILE: &str = "VIGIL_TOKEN_FILE";
const ENV_INSECURE_TLS: &str = "VIGIL_INSECURE_TLS";
const ENV_SINK_URL: &str = "VIGIL_SINK_URL";
const ENV_SINK_TAG: &str = "VIGIL_SINK_TAG";

/// Load configuration from a file (if any) and the environment.
///
/// With an explicit `path` the file must exist and parse; without one,
/// `./vigil.toml` is used when present and skipped silently otherwise.
pub fn load_config(path: Option<&Path>) -> Result<AgentConfig> {
    let mut config = match path {
        Some(path) => load_config_file(path)?,
        None => {
            let default = Path::new(PROJECT_CONFIG_FILE);
            if default.is_file() {
                load_config_file(default)?
            } else {
                AgentConfig::default()
            }
        }
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

/// Load config from a specific file path.
pub fn load_config_file(path: &Path) -> Result<AgentConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(toml::from_str(&contents)?)
}

/// Apply environment overrides through an injectable lookup.
///
/// Setting `VIGIL_SINK_URL` also selects the remote sink; the other
/// variables override their corresponding file settings only.
pub fn apply_env_overrides(config: &mut AgentConfig, get: impl Fn(&str) -> Option<String>) {
    if let Some(url) = get(ENV_API_URL) {
        config.watch.api_url = Some(url);
    }
    if let Some(token) = get(ENV_TOKEN) {
        config.watch.token = Some(token);
    }
    if let Some(path) = get(ENV_TOKEN_FILE) {
        config.watch.token_file = Some(PathBuf::from(path));
    }
    if let Some(value) = get(ENV_INSECURE_TLS) {
        config.watch.insecure_tls = parse_bool(&value);
    }
    if let Some(url) = get(ENV_SINK_URL) {
        config.sink.kind = SinkKind::Remote;
        config.sink.url = Some(url);
    }
    if let Some(tag) = get(ENV_SINK_TAG) {
        config.sink.tag = Some(tag);
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
