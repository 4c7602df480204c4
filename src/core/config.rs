//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.pocket/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::message::SessionId;
use crate::core::params::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, GenerationParams};

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PocketConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    pub api_base: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GenerationConfig {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub file: Option<String>,
    pub level: Option<String>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";
pub const DEFAULT_LOG_FILE: &str = "pocket.log";
pub const DEFAULT_LOG_LEVEL: &str = "info";

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub api_base: String,
    pub params: GenerationParams,
    pub log_file: PathBuf,
    pub log_level: String,
    /// Session to resume instead of starting a fresh one.
    pub initial_session: Option<SessionId>,
}

/// Values given on the command line. `None` means not specified.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub api_base: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub session: Option<SessionId>,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.pocket/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".pocket").join("config.toml"))
}

/// Load config from `~/.pocket/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `PocketConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<PocketConfig, ConfigError> {
    let Some(path) = config_path() else {
        warn!("Could not determine home directory, using default config");
        return Ok(PocketConfig::default());
    };
    load_config_from(&path)
}

/// Like [`load_config`], but a broken file degrades to defaults instead of
/// stopping startup. The error is handed back so it can be logged once the
/// logger (configured from this very file) is up.
pub fn load_config_or_default() -> (PocketConfig, Option<ConfigError>) {
    or_default(load_config())
}

pub fn load_config_or_default_from(path: &Path) -> (PocketConfig, Option<ConfigError>) {
    or_default(load_config_from(path))
}

fn or_default(loaded: Result<PocketConfig, ConfigError>) -> (PocketConfig, Option<ConfigError>) {
    match loaded {
        Ok(config) => (config, None),
        Err(e) => (PocketConfig::default(), Some(e)),
    }
}

pub fn load_config_from(path: &Path) -> Result<PocketConfig, ConfigError> {
    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(path);
        return Ok(PocketConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: PocketConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

fn generate_default_config(path: &Path) {
    let default_content = r#"# Pocket Configuration
# All settings are optional. Defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [server]
# api_base = "http://localhost:8000"   # Or set POCKET_API_BASE

# [generation]
# max_tokens = 100                     # Or set POCKET_MAX_TOKENS (server caps at 200)
# temperature = 0.7                    # Or set POCKET_TEMPERATURE (server clamps to 0.0-1.0)

# [logging]
# file = "pocket.log"
# level = "info"                       # "error", "warn", "info", "debug", "trace"
"#;

    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &PocketConfig, cli: &CliOverrides) -> ResolvedConfig {
    resolve_with_env(config, cli, |key| std::env::var(key).ok())
}

/// Same as [`resolve`], reading environment variables through `env`.
pub fn resolve_with_env(
    config: &PocketConfig,
    cli: &CliOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> ResolvedConfig {
    let api_base = cli
        .api_base
        .clone()
        .or_else(|| env("POCKET_API_BASE"))
        .or_else(|| config.server.api_base.clone())
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

    let max_tokens = cli
        .max_tokens
        .or_else(|| parse_env(&env, "POCKET_MAX_TOKENS"))
        .or(config.generation.max_tokens)
        .unwrap_or(DEFAULT_MAX_TOKENS);

    let temperature = cli
        .temperature
        .or_else(|| parse_env(&env, "POCKET_TEMPERATURE"))
        .or(config.generation.temperature)
        .unwrap_or(DEFAULT_TEMPERATURE);

    let params = match GenerationParams::new(max_tokens, temperature) {
        Ok(params) => params,
        Err(e) => {
            warn!("Invalid generation settings ({}), using defaults", e);
            GenerationParams::default()
        }
    };

    let (log_file, log_level) = log_settings(config);
    ResolvedConfig {
        api_base: api_base.trim_end_matches('/').to_string(),
        params,
        log_file,
        log_level,
        initial_session: cli.session.clone(),
    }
}

/// Log file and level. These come from the file alone, so the logger can be
/// installed before the rest of the config is resolved.
pub fn log_settings(config: &PocketConfig) -> (PathBuf, String) {
    let file = config
        .logging
        .file
        .clone()
        .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string());
    let level = config
        .logging
        .level
        .clone()
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
    (PathBuf::from(file), level)
}

fn parse_env<T: std::str::FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = env(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring unparseable {}={:?}", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_resolve_uses_defaults_when_empty() {
        let resolved = resolve_with_env(&PocketConfig::default(), &CliOverrides::default(), no_env);
        assert_eq!(resolved.api_base, DEFAULT_API_BASE);
        assert_eq!(resolved.params, GenerationParams::default());
        assert_eq!(resolved.log_file, PathBuf::from("pocket.log"));
        assert_eq!(resolved.log_level, "info");
        assert!(resolved.initial_session.is_none());
    }

    #[test]
    fn test_sparse_toml_parses() {
        let toml_str = r#"
[generation]
temperature = 0.2
"#;
        let config: PocketConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.generation.temperature, Some(0.2));
        assert!(config.generation.max_tokens.is_none());
        assert!(config.server.api_base.is_none());
    }

    #[test]
    fn test_override_order() {
        let config: PocketConfig = toml::from_str(
            r#"
[server]
api_base = "http://file:1"

[generation]
max_tokens = 50
temperature = 0.3
"#,
        )
        .unwrap();
        let env: HashMap<&str, &str> = [
            ("POCKET_API_BASE", "http://env:2/"),
            ("POCKET_MAX_TOKENS", "80"),
        ]
        .into_iter()
        .collect();
        let lookup = |key: &str| env.get(key).map(|v| v.to_string());

        let resolved = resolve_with_env(&config, &CliOverrides::default(), lookup);
        assert_eq!(resolved.api_base, "http://env:2");
        assert_eq!(resolved.params.max_tokens, 80);
        assert_eq!(resolved.params.temperature, 0.3);

        let cli = CliOverrides {
            api_base: Some("http://cli:3".to_string()),
            max_tokens: Some(10),
            session: Some("session-1".to_string()),
            ..Default::default()
        };
        let resolved = resolve_with_env(&config, &cli, lookup);
        assert_eq!(resolved.api_base, "http://cli:3");
        assert_eq!(resolved.params.max_tokens, 10);
        assert_eq!(resolved.initial_session.as_deref(), Some("session-1"));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let lookup = |key: &str| (key == "POCKET_TEMPERATURE").then(|| "warm".to_string());
        let cli = CliOverrides {
            max_tokens: Some(0),
            ..Default::default()
        };
        let resolved = resolve_with_env(&PocketConfig::default(), &cli, lookup);
        assert_eq!(resolved.params, GenerationParams::default());
    }

    #[test]
    fn test_missing_file_generates_default() {
        let dir = std::env::temp_dir().join(format!("pocket-config-{}", std::process::id()));
        let path = dir.join("config.toml");
        let _ = fs::remove_file(&path);

        let config = load_config_from(&path).unwrap();
        assert!(config.server.api_base.is_none());
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("# [server]"));
        // The generated file is all comments, so it parses back to defaults
        assert!(load_config_from(&path).unwrap().generation.max_tokens.is_none());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let dir = std::env::temp_dir().join(format!("pocket-bad-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        fs::write(&path, "[generation\nmax_tokens = ").unwrap();
        assert!(matches!(load_config_from(&path), Err(ConfigError::Parse(_))));

        // Startup carries on with defaults and keeps the error for the log
        let (config, error) = load_config_or_default_from(&path);
        assert!(matches!(error, Some(ConfigError::Parse(_))));
        let resolved = resolve_with_env(&config, &CliOverrides::default(), no_env);
        assert_eq!(resolved.api_base, DEFAULT_API_BASE);
        assert_eq!(resolved.params, GenerationParams::default());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_valid_file_loads_without_error() {
        let dir = std::env::temp_dir().join(format!("pocket-good-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        fs::write(&path, "[logging]\nfile = \"/tmp/p.log\"\nlevel = \"debug\"\n").unwrap();

        let (config, error) = load_config_or_default_from(&path);
        assert!(error.is_none());
        assert_eq!(
            log_settings(&config),
            (PathBuf::from("/tmp/p.log"), "debug".to_string())
        );
        let _ = fs::remove_dir_all(&dir);
    }
}
