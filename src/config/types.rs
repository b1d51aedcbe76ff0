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

// Configuration types for appsinstalled-loader

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoaderConfig {
    #[serde(default)]
    pub loader: LoaderSettings,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Input discovery and worker pool settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoaderSettings {
    /// Glob of input files, e.g. `/data/appsinstalled/*.tsv.gz`
    #[serde(default)]
    pub pattern: String,

    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Files whose error rate is not strictly below this are reported as failed loads
    #[serde(default = "default_error_threshold")]
    pub error_threshold: f64,

    /// Log what would be written instead of contacting the stores
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            pattern: String::new(),
            workers: default_workers(),
            error_threshold: default_error_threshold(),
            dry_run: false,
        }
    }
}

/// Store destinations and client behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Device type -> memcached `host:port`
    #[serde(default = "default_destinations")]
    pub destinations: BTreeMap<String, String>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Count failed writes toward each file's error rate
    #[serde(default = "default_report_write_results")]
    pub report_write_results: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            destinations: default_destinations(),
            timeout_ms: default_timeout_ms(),
            queue_capacity: default_queue_capacity(),
            max_attempts: default_max_attempts(),
            report_write_results: default_report_write_results(),
        }
    }
}

impl StorageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"

    /// Write diagnostics to this file instead of stdout
    #[serde(default)]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

// Default value functions
fn default_workers() -> usize { 4 }
fn default_error_threshold() -> f64 { 0.01 }
fn default_timeout_ms() -> u64 { 2000 }
fn default_queue_capacity() -> usize { 64 }
fn default_max_attempts() -> u32 { 3 }
fn default_report_write_results() -> bool { true }
fn default_log_level() -> String { "info".to_string() }

fn default_destinations() -> BTreeMap<String, String> {
    [
        ("idfa", "127.0.0.1:33013"),
        ("gaid", "127.0.0.1:33014"),
        ("adid", "127.0.0.1:33015"),
        ("dvid", "127.0.0.1:33016"),
    ]
    .into_iter()
    .map(|(device_type, addr)| (device_type.to_string(), addr.to_string()))
    .collect()
}
