//! Kjeller - price-aware heating controller for deCONZ thermostats.
//!
//! ```text
//! main() -> Config::load -> init_tracing() -> Daemon::run(shutdown)
//!                                                  |
//!                                                  v
//!                           cycle: prices -> decide -> thermostats
//! ```

use std::{
    fs::{self, File, OpenOptions},
    io::{self, stderr},
    path::{Path, PathBuf},
    sync::Mutex,
};
#[cfg(not(unix))]
use std::future::pending;

#[cfg(not(unix))]
use tokio::signal::ctrl_c;

use anyhow::{Context, Result, bail};
use clap::Parser;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use kjeller_config::{Config, DEFAULT_CONFIG_FILE};
use kjeller_engine::{Daemon, SystemClock};

const DEFAULT_LOG_FILE: &str = "heat.log";

#[derive(Debug, Parser)]
#[command(
    name = "kjeller",
    version,
    about = "Price-aware heating controller for deCONZ thermostats"
)]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(long, env = "KJELLER_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Append logs to this file. Use `-` for stderr.
    #[arg(long, env = "KJELLER_LOG", default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Run a single control cycle and exit.
    #[arg(long)]
    once: bool,

    /// Allow running as root.
    #[arg(long)]
    allow_root: bool,
}

fn init_tracing(log_file: &Path, debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if log_file.as_os_str() == "-" {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(stderr))
            .with(env_filter)
            .init();
        return;
    }

    match open_log_file(log_file) {
        Ok(file) => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .with(env_filter)
                .init();
            tracing::info!(path = %log_file.display(), "Logging initialized");
        }
        Err(e) => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(stderr))
                .with(env_filter)
                .init();
            tracing::warn!("Failed to open log file {}: {e}", log_file.display());
        }
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(unix)]
fn running_as_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
fn running_as_root() -> bool {
    false
}

/// Install the stop-signal handlers and return a future resolving on the
/// first of them.
///
/// Handlers are registered here, before any cycle runs, so a signal that
/// arrives mid-cycle is held until the cycle is finished.
#[cfg(unix)]
fn shutdown_signal() -> io::Result<impl Future<Output = ()>> {
    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    Ok(async move {
        tokio::select! {
            _ = terminate.recv() => tracing::info!("Received SIGTERM"),
            _ = interrupt.recv() => tracing::info!("Received SIGINT"),
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> io::Result<impl Future<Output = ()>> {
    Ok(async {
        if let Err(e) = ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            pending::<()>().await;
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if running_as_root() && !args.allow_root {
        bail!("refusing to run as root; use a dedicated user or pass --allow-root");
    }

    // The log level is taken from the configuration once, at startup.
    let config = Config::load(&args.config);
    init_tracing(&args.log_file, config.as_ref().is_ok_and(|c| c.global.debug));

    let context = || {
        format!(
            "failed to start with configuration {}",
            args.config.display()
        )
    };
    let config = config
        .inspect_err(|e| tracing::error!("{e}"))
        .with_context(context)?;
    let mut daemon = Daemon::from_config(&args.config, config, SystemClock)
        .with_context(context)?;

    if args.once {
        let report = daemon.run_once().await;
        tracing::info!(
            rooms = report.rooms.len(),
            written = report.written(),
            failed = report.failed(),
            "Cycle complete"
        );
        return Ok(());
    }

    let shutdown = shutdown_signal().context("failed to install signal handlers")?;
    tracing::info!("Starting heating control");
    daemon.run(shutdown).await;
    Ok(())
}
