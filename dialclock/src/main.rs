/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use dialclock::app::AppContext;
use dialclock::config::AppConfig;
use dialclock::hal::host::host_hal;

/// Longest single sleep; keeps the console shell responsive even when the
/// next timer deadline is far away.
const MAX_SLEEP_MS: u32 = 100;

// ── CLI argument definition ───────────────────────────────────────────────────

/// Dial clock appliance firmware (host build).
///
/// Example:
///   dialclock -c demos/dialclock.yaml --auto-shutdown 0
#[derive(Debug, Parser)]
#[command(
    name = "dialclock",
    about = "Motor-driven analog dial clock firmware – host build",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML application configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Backing file of the key/value store (overrides the config file).
    #[arg(short = 'd', long = "db")]
    db: Option<PathBuf>,

    /// Auto-shutdown budget in seconds, 0 disables (overrides the config file).
    #[arg(short = 'a', long = "auto-shutdown")]
    auto_shutdown: Option<u32>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Initialise structured logging.
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("dialclock starting up...");

    let cli = Cli::parse();

    // ── Load configuration ────────────────────────────────────────────────────
    let mut config = match AppConfig::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            process::exit(1);
        }
    };
    if let Some(db) = cli.db {
        config.kvdb_path = db;
    }
    if let Some(seconds) = cli.auto_shutdown {
        config.auto_shutdown_s = seconds;
    }

    info!(
        kvdb_path = %config.kvdb_path.display(),
        clock_period_ms = config.clock_period_ms,
        watchdog_timeout_s = config.watchdog_timeout_s,
        auto_shutdown_s = config.auto_shutdown_s,
        "Configuration"
    );

    // ── Assemble and run ──────────────────────────────────────────────────────
    let (hal, power_flag) = host_hal();
    let mut app = match AppContext::new(hal, &config, power_flag) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to assemble the node topology: {e}");
            process::exit(1);
        }
    };

    while !app.powered_off() {
        let idle_ms = app.run_loop_execute().min(MAX_SLEEP_MS);
        std::thread::sleep(Duration::from_millis(u64::from(idle_ms)));
    }

    app.shutdown();
    info!("dialclock stopped");
}
