//! Configuration management for system-api.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat};
use crate::demo::DemoSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

// Default configuration constants
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_ENVIRONMENT: &str = "development";
pub const DEFAULT_PROC_ROOT: &str = "/proc";
pub const DEFAULT_PM2_BINARY: &str = "pm2";
pub const DEFAULT_PM2_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_DEMO_LOG_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_DEMO_ALERT_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_DEMO_ALERT_PROBABILITY: f64 = 0.2;

const DEFAULT_CONFIG_PATHS: [&str; 7] = [
    "/etc/system-api/config.yaml",
    "/etc/system-api/config.yml",
    "/etc/system-api/config.json",
    "./system-api.yaml",
    "./system-api.yml",
    "./system-api.json",
    "./system-api.toml",
];

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("{0}")]
    Invalid(String),
}

/// Service configuration. Every field is optional so files can be partial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub port: Option<u16>,
    pub bind: Option<String>,
    #[serde(alias = "api-secret-key")]
    pub api_secret_key: Option<String>,
    pub environment: Option<String>,

    // Host sampling
    #[serde(alias = "proc-root")]
    pub proc_root: Option<PathBuf>,
    #[serde(alias = "max-processes")]
    pub max_processes: Option<usize>,

    // Process manager
    #[serde(alias = "enable-process-manager")]
    pub enable_process_manager: Option<bool>,
    #[serde(alias = "pm2-binary")]
    pub pm2_binary: Option<PathBuf>,
    #[serde(alias = "pm2-timeout-secs")]
    pub pm2_timeout_secs: Option<u64>,

    // Event log
    #[serde(alias = "log-capacity")]
    pub log_capacity: Option<usize>,
    #[serde(alias = "alert-capacity")]
    pub alert_capacity: Option<usize>,

    // Demo feed
    #[serde(alias = "enable-demo-feed")]
    pub enable_demo_feed: Option<bool>,
    #[serde(alias = "demo-log-interval-secs")]
    pub demo_log_interval_secs: Option<u64>,
    #[serde(alias = "demo-alert-interval-secs")]
    pub demo_alert_interval_secs: Option<u64>,
    #[serde(alias = "demo-alert-probability")]
    pub demo_alert_probability: Option<f64>,

    // TLS/SSL Configuration
    #[serde(alias = "enable-tls")]
    pub enable_tls: Option<bool>,
    #[serde(alias = "tls-cert-path")]
    pub tls_cert_path: Option<String>,
    #[serde(alias = "tls-key-path")]
    pub tls_key_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: Some(DEFAULT_PORT),
            bind: Some(DEFAULT_BIND_ADDR.to_string()),
            api_secret_key: None,
            environment: Some(DEFAULT_ENVIRONMENT.to_string()),
            proc_root: Some(PathBuf::from(DEFAULT_PROC_ROOT)),
            max_processes: None,
            enable_process_manager: Some(true),
            pm2_binary: Some(PathBuf::from(DEFAULT_PM2_BINARY)),
            pm2_timeout_secs: Some(DEFAULT_PM2_TIMEOUT_SECS),
            log_capacity: Some(crate::events::DEFAULT_LOG_CAPACITY),
            alert_capacity: Some(crate::events::DEFAULT_ALERT_CAPACITY),
            enable_demo_feed: Some(true),
            demo_log_interval_secs: Some(DEFAULT_DEMO_LOG_INTERVAL_SECS),
            demo_alert_interval_secs: Some(DEFAULT_DEMO_ALERT_INTERVAL_SECS),
            demo_alert_probability: Some(DEFAULT_DEMO_ALERT_PROBABILITY),
            enable_tls: Some(false),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl Config {
    /// The bearer secret, if authentication is enabled.
    pub fn api_secret(&self) -> Option<&str> {
        self.api_secret_key
            .as_deref()
            .filter(|secret| !secret.is_empty())
    }

    pub fn environment(&self) -> &str {
        self.environment.as_deref().unwrap_or(DEFAULT_ENVIRONMENT)
    }

    pub fn proc_root(&self) -> &Path {
        self.proc_root
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_PROC_ROOT))
    }

    pub fn pm2_timeout(&self) -> Duration {
        Duration::from_secs(self.pm2_timeout_secs.unwrap_or(DEFAULT_PM2_TIMEOUT_SECS))
    }

    pub fn demo_settings(&self) -> DemoSettings {
        DemoSettings {
            log_interval: Duration::from_secs(
                self.demo_log_interval_secs
                    .unwrap_or(DEFAULT_DEMO_LOG_INTERVAL_SECS),
            ),
            alert_interval: Duration::from_secs(
                self.demo_alert_interval_secs
                    .unwrap_or(DEFAULT_DEMO_ALERT_INTERVAL_SECS),
            ),
            alert_probability: self
                .demo_alert_probability
                .unwrap_or(DEFAULT_DEMO_ALERT_PROBABILITY),
        }
    }

    /// Copy safe to print: the API secret is masked.
    pub fn redacted(&self) -> Config {
        let mut config = self.clone();
        if config.api_secret().is_some() {
            config.api_secret_key = Some("********".to_string());
        }
        config
    }
}

fn check_tls_file(kind: &str, path: &str) -> Result<(), ConfigError> {
    match fs::metadata(path) {
        Ok(meta) if meta.len() == 0 => Err(ConfigError::Invalid(format!(
            "TLS {} file is empty: {}",
            kind, path
        ))),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ConfigError::Invalid(
            format!("TLS {} file not found: {}", kind, path),
        )),
        Err(e) => Err(ConfigError::Invalid(format!(
            "TLS {} file is not readable: {} ({})",
            kind, path, e
        ))),
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(bind) = cfg.bind.as_deref() {
        bind.parse::<std::net::IpAddr>()
            .map_err(|_| ConfigError::Invalid(format!("Invalid bind address '{}'", bind)))?;
    }

    if let Some(probability) = cfg.demo_alert_probability {
        if !(0.0..=1.0).contains(&probability) {
            return Err(ConfigError::Invalid(format!(
                "demo_alert_probability must be between 0 and 1, got {}",
                probability
            )));
        }
    }

    for (name, value) in [
        ("demo_log_interval_secs", cfg.demo_log_interval_secs),
        ("demo_alert_interval_secs", cfg.demo_alert_interval_secs),
        ("pm2_timeout_secs", cfg.pm2_timeout_secs),
    ] {
        if value == Some(0) {
            return Err(ConfigError::Invalid(format!("{} must be at least 1", name)));
        }
    }

    for (name, value) in [
        ("log_capacity", cfg.log_capacity),
        ("alert_capacity", cfg.alert_capacity),
        ("max_processes", cfg.max_processes),
    ] {
        if value == Some(0) {
            return Err(ConfigError::Invalid(format!("{} must be at least 1", name)));
        }
    }

    // TLS validation
    if cfg.enable_tls.unwrap_or(false) {
        match (cfg.tls_cert_path.as_deref(), cfg.tls_key_path.as_deref()) {
            (None, None) => {
                return Err(ConfigError::Invalid(
                    "TLS is enabled but neither tls_cert_path nor tls_key_path are set".into(),
                ));
            }
            (Some(_), None) => {
                return Err(ConfigError::Invalid(
                    "TLS is enabled but tls_key_path is not set".into(),
                ));
            }
            (None, Some(_)) => {
                return Err(ConfigError::Invalid(
                    "TLS is enabled but tls_cert_path is not set".into(),
                ));
            }
            (Some(cert), Some(key)) => {
                check_tls_file("certificate", cert)?;
                check_tls_file("private key", key)?;
            }
        }
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI/env (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, ConfigError> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    // Server
    if let Some(bind_ip) = args.bind {
        config.bind = Some(bind_ip.to_string());
    }
    if let Some(cli_port) = args.port {
        config.port = Some(cli_port);
    }
    if let Some(secret) = &args.api_secret_key {
        config.api_secret_key = Some(secret.clone());
    }
    if let Some(environment) = args.environment.as_ref().or(args.node_env.as_ref()) {
        config.environment = Some(environment.clone());
    }

    // Sampling
    if let Some(root) = &args.proc_root {
        config.proc_root = Some(root.clone());
    }
    if let Some(max) = args.max_processes {
        config.max_processes = Some(max);
    }

    // Feature flags
    if args.disable_demo_feed {
        config.enable_demo_feed = Some(false);
    }
    if args.disable_process_manager {
        config.enable_process_manager = Some(false);
    }
    if let Some(bin) = &args.pm2_bin {
        config.pm2_binary = Some(bin.clone());
    }
    if let Some(secs) = args.pm2_timeout_secs {
        config.pm2_timeout_secs = Some(secs);
    }

    // TLS configuration: CLI wins if provided
    if args.enable_tls {
        config.enable_tls = Some(true);
    }
    if let Some(cert_path) = &args.tls_cert {
        config.tls_cert_path = Some(cert_path.to_string_lossy().to_string());
    }
    if let Some(key_path) = &args.tls_key {
        config.tls_key_path = Some(key_path.to_string_lossy().to_string());
    }

    Ok(config)
}

/// Loads a config file, falling back to the default locations and then to
/// built-in defaults. Fields missing from the file keep their defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match DEFAULT_CONFIG_PATHS
            .iter()
            .map(Path::new)
            .find(|p| p.exists())
        {
            Some(p) => p.to_path_buf(),
            None => return Ok(Config::default()),
        },
    };

    let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;

    let parse_err = |reason: String| ConfigError::Parse {
        path: path.clone(),
        reason,
    };

    let file_config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
        Some("toml") => toml::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
        // Default to YAML
        _ => serde_yaml::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
    };

    info!("Loaded configuration from: {}", path.display());
    Ok(merge_with_defaults(file_config))
}

/// Fills fields the file left unset with the built-in defaults.
fn merge_with_defaults(file: Config) -> Config {
    let d = Config::default();
    Config {
        port: file.port.or(d.port),
        bind: file.bind.or(d.bind),
        api_secret_key: file.api_secret_key.or(d.api_secret_key),
        environment: file.environment.or(d.environment),
        proc_root: file.proc_root.or(d.proc_root),
        max_processes: file.max_processes.or(d.max_processes),
        enable_process_manager: file.enable_process_manager.or(d.enable_process_manager),
        pm2_binary: file.pm2_binary.or(d.pm2_binary),
        pm2_timeout_secs: file.pm2_timeout_secs.or(d.pm2_timeout_secs),
        log_capacity: file.log_capacity.or(d.log_capacity),
        alert_capacity: file.alert_capacity.or(d.alert_capacity),
        enable_demo_feed: file.enable_demo_feed.or(d.enable_demo_feed),
        demo_log_interval_secs: file.demo_log_interval_secs.or(d.demo_log_interval_secs),
        demo_alert_interval_secs: file.demo_alert_interval_secs.or(d.demo_alert_interval_secs),
        demo_alert_probability: file.demo_alert_probability.or(d.demo_alert_probability),
        enable_tls: file.enable_tls.or(d.enable_tls),
        tls_cert_path: file.tls_cert_path.or(d.tls_cert_path),
        tls_key_path: file.tls_key_path.or(d.tls_key_path),
    }
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> anyhow::Result<()> {
    let config = config.redacted();
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(&config)?,
        ConfigFormat::Toml => toml::to_string_pretty(&config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(&config)?,
    };

    println!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::tempdir;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["system-api", "--no-config"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, Some(3001));
        assert_eq!(config.environment(), "development");
        assert_eq!(config.api_secret(), None);
        assert_eq!(config.demo_settings(), DemoSettings::default());
        assert!(validate_effective_config(&config).is_ok());
    }

    #[test]
    fn test_empty_secret_disables_auth() {
        let config = Config {
            api_secret_key: Some(String::new()),
            ..Config::default()
        };
        assert_eq!(config.api_secret(), None);
    }

    #[test]
    fn test_cli_overrides() {
        let config = resolve_config(&args(&[
            "--port",
            "4000",
            "--api-secret-key",
            "s3cret",
            "--environment",
            "production",
            "--disable-demo-feed",
            "--disable-process-manager",
        ]))
        .unwrap();

        assert_eq!(config.port, Some(4000));
        assert_eq!(config.api_secret(), Some("s3cret"));
        assert_eq!(config.environment(), "production");
        assert_eq!(config.enable_demo_feed, Some(false));
        assert_eq!(config.enable_process_manager, Some(false));
    }

    #[test]
    fn test_node_env_fallback() {
        let config = resolve_config(&args(&["--node-env", "production"])).unwrap();
        assert_eq!(config.environment(), "production");

        let config = resolve_config(&args(&[
            "--node-env",
            "production",
            "--environment",
            "staging",
        ]))
        .unwrap();
        assert_eq!(config.environment(), "staging");
    }

    #[test]
    fn test_load_yaml_keeps_defaults_for_missing_fields() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("config.yaml");
        fs::write(&path, "port: 9000\ndemo-alert-probability: 0.5\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.port, Some(9000));
        assert_eq!(config.demo_alert_probability, Some(0.5));
        assert_eq!(config.bind.as_deref(), Some(DEFAULT_BIND_ADDR));
        assert_eq!(config.log_capacity, Some(100));
    }

    #[test]
    fn test_load_json_and_toml() {
        let dir = tempdir().expect("Failed to create temp dir");

        let json = dir.path().join("config.json");
        fs::write(&json, r#"{"environment": "staging"}"#).unwrap();
        assert_eq!(load_config(Some(&json)).unwrap().environment(), "staging");

        let toml_path = dir.path().join("config.toml");
        fs::write(&toml_path, "max_processes = 500\n").unwrap();
        assert_eq!(load_config(Some(&toml_path)).unwrap().max_processes, Some(500));
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            load_config(Some(&dir.path().join("missing.yaml"))),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_validate_probability_and_intervals() {
        let config = Config {
            demo_alert_probability: Some(1.5),
            ..Config::default()
        };
        assert!(validate_effective_config(&config).is_err());

        let config = Config {
            demo_log_interval_secs: Some(0),
            ..Config::default()
        };
        assert!(validate_effective_config(&config).is_err());

        let config = Config {
            bind: Some("not-an-ip".into()),
            ..Config::default()
        };
        assert!(validate_effective_config(&config).is_err());
    }

    #[test]
    fn test_validate_tls() {
        let config = Config {
            enable_tls: Some(true),
            ..Config::default()
        };
        assert!(validate_effective_config(&config).is_err());

        let dir = tempdir().expect("Failed to create temp dir");
        let cert = dir.path().join("cert.pem");
        let key = dir.path().join("key.pem");
        fs::write(&cert, "CERT").unwrap();
        fs::write(&key, "").unwrap();

        let config = Config {
            enable_tls: Some(true),
            tls_cert_path: Some(cert.to_string_lossy().to_string()),
            tls_key_path: Some(key.to_string_lossy().to_string()),
            ..Config::default()
        };
        let err = validate_effective_config(&config).unwrap_err();
        assert!(err.to_string().contains("empty"));

        fs::write(&key, "KEY").unwrap();
        assert!(validate_effective_config(&config).is_ok());
    }

    #[test]
    fn test_redacted_masks_secret() {
        let config = Config {
            api_secret_key: Some("topsecret".into()),
            ..Config::default()
        };
        let shown = serde_yaml::to_string(&config.redacted()).unwrap();
        assert!(!shown.contains("topsecret"));
    }
}
