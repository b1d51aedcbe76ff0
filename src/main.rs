// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use appsinstalled_loader::config::{load_config_with_env, LoaderConfig, LoggingConfig};
use appsinstalled_loader::{Loader, LoggerActor};

/// Load gzipped app-install logs into per-device-type memcached stores
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to an optional YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Glob of input files (required here or in the config file)
    #[arg(long)]
    pattern: Option<String>,

    /// Number of file workers
    #[arg(long)]
    workers: Option<usize>,

    /// memcached address for idfa devices
    #[arg(long)]
    idfa: Option<String>,

    /// memcached address for gaid devices
    #[arg(long)]
    gaid: Option<String>,

    /// memcached address for adid devices
    #[arg(long)]
    adid: Option<String>,

    /// memcached address for dvid devices
    #[arg(long)]
    dvid: Option<String>,

    /// Log writes instead of performing them
    #[arg(long)]
    dry: bool,

    /// Write diagnostics to this file
    #[arg(long)]
    log: Option<PathBuf>,

    /// trace, debug, info, warn or error
    #[arg(long)]
    log_level: Option<String>,

    /// Error rate at or above which a file load is reported as failed
    #[arg(long)]
    error_threshold: Option<f64>,

    /// Do not count failed writes toward a file's error rate
    #[arg(long)]
    no_result_reporting: bool,
}

impl Args {
    fn apply(self, config: &mut LoaderConfig) {
        if let Some(pattern) = self.pattern {
            config.loader.pattern = pattern;
        }
        if let Some(workers) = self.workers {
            config.loader.workers = workers;
        }
        if let Some(threshold) = self.error_threshold {
            config.loader.error_threshold = threshold;
        }
        if self.dry {
            config.loader.dry_run = true;
        }
        if self.no_result_reporting {
            config.storage.report_write_results = false;
        }

        for (device_type, addr) in [
            ("idfa", self.idfa),
            ("gaid", self.gaid),
            ("adid", self.adid),
            ("dvid", self.dvid),
        ] {
            if let Some(addr) = addr {
                config
                    .storage
                    .destinations
                    .insert(device_type.to_string(), addr);
            }
        }

        if let Some(log) = self.log {
            config.logging.file = Some(log.to_string_lossy().into_owned());
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
    }
}

fn init_tracing(logging: &LoggingConfig, dry_run: bool) -> Result<()> {
    let log_level = match logging.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    // Dry runs report every write at debug level
    let log_level = if dry_run { log_level.max(Level::DEBUG) } else { log_level };

    let builder = FmtSubscriber::builder().with_max_level(log_level);
    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path))?;
            let subscriber = builder.with_ansi(false).with_writer(Mutex::new(file)).finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            tracing::subscriber::set_global_default(builder.finish())?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration, then apply CLI overrides
    let mut config = load_config_with_env(args.config.as_ref())?;
    args.apply(&mut config);

    init_tracing(&config.logging, config.loader.dry_run)?;

    info!("Starting appsinstalled loader");
    info!("Pattern: {}", config.loader.pattern);
    info!(
        "Workers: {}, error threshold: {}, dry run: {}",
        config.loader.workers, config.loader.error_threshold, config.loader.dry_run
    );

    let logger_actor = LoggerActor::spawn();
    let result = Loader::new(config, logger_actor.logger()).run().await;

    // Stopped last so that failures during store drain are still written
    logger_actor.shutdown().await;

    let summary = result?;
    info!(
        "Loader shut down successfully ({} of {} files loaded)",
        summary.files_loaded, summary.files_found
    );

    Ok(())
}
