//! system-api
//!
//! Host metrics API with tracing logging.
//! This is the main entry point that initializes the server and handles subcommands.

use anyhow::Context;
use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::{net::TcpListener, signal};
use tracing::{error, info, level_filters::LevelFilter};

use system_api::app::{build_collector, build_router, record_startup};
use system_api::cli::{Args, Commands, LogLevel};
use system_api::commands::command_sample;
use system_api::config::{
    resolve_config, show_config, validate_effective_config, Config, DEFAULT_BIND_ADDR,
    DEFAULT_PORT,
};
use system_api::demo::DemoFeed;
use system_api::events::EventLog;
use system_api::startup_checks;
use system_api::state::AppState;

/// Initializes tracing logging subsystem with configured log level.
///
/// `to_stderr` keeps stdout clean for commands that print JSON.
fn setup_logging(args: &Args, to_stderr: bool) {
    let log_level = match args.log_level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    };

    let builder = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    let installed = if to_stderr {
        tracing::subscriber::set_global_default(builder.with_writer(std::io::stderr).finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };

    if let Err(e) = installed {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return;
    }

    info!("Logging initialized with level: {:?}", args.log_level);
}

/// Resolves and validates configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> anyhow::Result<Config> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Completes on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// Main application entry point.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format);
    }

    // Handle subcommands
    if let Some(command) = &args.command {
        let config = load_validated_config(&args)?;
        setup_logging(&args, true);

        return match command {
            Commands::Sample {
                iterations,
                interval_ms,
                compact,
            } => {
                let collector = build_collector(&config);
                let mut stdout = std::io::stdout().lock();
                command_sample(
                    &collector,
                    *iterations,
                    Duration::from_millis(*interval_ms),
                    *compact,
                    &mut stdout,
                )
                .await
            }
        };
    }

    // Load configuration for main server mode
    let config = load_validated_config(&args)?;
    setup_logging(&args, false);

    info!(
        "Starting system-api {} ({})",
        env!("CARGO_PKG_VERSION"),
        config.environment()
    );

    let pm2_binary = if config.enable_process_manager.unwrap_or(true) {
        config.pm2_binary.as_deref()
    } else {
        None
    };
    if let Err(e) = startup_checks::validate_requirements(config.proc_root(), pm2_binary) {
        error!("Startup validation failed: {}", e);
        error!("The API will start but /metrics will answer 500 until this is fixed");
    }

    let bind_ip_str = config.bind.as_deref().unwrap_or(DEFAULT_BIND_ADDR).to_string();
    let port = config.port.unwrap_or(DEFAULT_PORT);
    let addr: SocketAddr = format!("{}:{}", bind_ip_str, port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", bind_ip_str, port))?;

    if config.api_secret().is_some() {
        info!("Bearer authentication enabled for /metrics, /logs and /alerts");
    } else {
        info!("API_SECRET_KEY not set - all routes are unauthenticated");
    }

    let event_log = Arc::new(EventLog::with_capacity(
        config
            .log_capacity
            .unwrap_or(system_api::events::DEFAULT_LOG_CAPACITY),
        config
            .alert_capacity
            .unwrap_or(system_api::events::DEFAULT_ALERT_CAPACITY),
    ));

    let demo_feed = if config.enable_demo_feed.unwrap_or(true) {
        Some(DemoFeed::spawn(Arc::clone(&event_log), config.demo_settings()))
    } else {
        info!("Demo event feed disabled");
        None
    };

    let enable_tls = config.enable_tls.unwrap_or(false);
    let tls_paths = (config.tls_cert_path.clone(), config.tls_key_path.clone());

    let collector = build_collector(&config);
    let state = Arc::new(AppState::new(config, collector, Arc::clone(&event_log)));
    let app = build_router(state);

    let served: anyhow::Result<()> = if enable_tls {
        // Both paths exist: validate_effective_config() checked them
        let (Some(cert_path), Some(key_path)) = tls_paths else {
            anyhow::bail!("TLS enabled without certificate and key paths");
        };

        info!("Loading TLS certificate from: {}", cert_path);
        info!("Loading TLS private key from: {}", key_path);

        let tls_config = RustlsConfig::from_pem_file(&cert_path, &key_path)
            .await
            .context("failed to load TLS configuration")?;

        let server = axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service());
        info!("system-api listening on https://{}:{}", bind_ip_str, port);
        record_startup(&event_log, port);

        tokio::select! {
            result = server => result.context("server error"),
            _ = shutdown_signal() => Ok(()),
        }
    } else {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        info!("system-api listening on http://{}:{}", bind_ip_str, port);
        record_startup(&event_log, port);

        tokio::select! {
            result = axum::serve(listener, app) => result.context("server error"),
            _ = shutdown_signal() => Ok(()),
        }
    };

    if let Some(feed) = demo_feed {
        feed.shutdown().await;
    }

    match &served {
        Ok(()) => info!("system-api stopped gracefully"),
        Err(e) => error!("Server error: {:#}", e),
    }
    served
}
