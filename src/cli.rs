//! CLI arguments and subcommands for system-api.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, environment variables, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "system-api",
    about = "Host metrics API for the operations dashboard",
    long_about = "Host metrics API for the operations dashboard.\n\n\
                  Samples CPU, memory, disk, network, uptime, the process table and \
                  PM2-managed services, and serves them as JSON together with a small \
                  in-memory log and alert feed.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// HTTP listen port
    #[arg(short = 'p', long, env = "PORT")]
    pub port: Option<u16>,

    /// Bind to specific interface/IP
    #[arg(long, env = "BIND_ADDR")]
    pub bind: Option<IpAddr>,

    /// Shared secret required as `Authorization: Bearer <key>` (empty disables auth)
    #[arg(long, env = "API_SECRET_KEY", hide_env_values = true)]
    pub api_secret_key: Option<String>,

    /// Deployment environment reported by /health
    #[arg(long, env = "ENVIRONMENT")]
    pub environment: Option<String>,

    /// Node-style environment name, used when `--environment` is unset
    #[arg(long, env = "NODE_ENV", hide = true)]
    pub node_env: Option<String>,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Root of the procfs mount to sample
    #[arg(long)]
    pub proc_root: Option<PathBuf>,

    /// Keep only the N busiest processes from each scan
    #[arg(long)]
    pub max_processes: Option<usize>,

    /// Do not generate demo log lines and alerts
    #[arg(long)]
    pub disable_demo_feed: bool,

    /// Do not query PM2 (services are always empty)
    #[arg(long)]
    pub disable_process_manager: bool,

    /// Path or name of the pm2 executable
    #[arg(long)]
    pub pm2_bin: Option<PathBuf>,

    /// Seconds to wait for `pm2 jlist`
    #[arg(long)]
    pub pm2_timeout_secs: Option<u64>,

    /// Enable TLS/SSL for HTTPS
    #[arg(long)]
    pub enable_tls: bool,

    /// Path to TLS certificate file (PEM format)
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// Path to TLS private key file (PEM format)
    #[arg(long)]
    pub tls_key: Option<PathBuf>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect snapshots and print them as JSON, then exit
    Sample {
        /// Number of snapshots to collect
        #[arg(short = 'n', long, default_value_t = 1)]
        iterations: usize,

        /// Delay between snapshots in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Print one JSON document per line
        #[arg(long)]
        compact: bool,
    },
}
