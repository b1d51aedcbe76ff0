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

// Ingestion coordinator: stores -> pool -> ordered shutdown

use anyhow::{Context, Result};
use glob::MatchOptions;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{ConfigLoader, LoaderConfig};
use crate::logger::Logger;
use crate::pool::{FileWorkerPool, PoolStats};
use crate::storage::StoreRegistry;
use crate::worker::{WorkerContext, WorkerSettings};

/// Totals for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub files_found: u64,
    pub files_loaded: u64,
    pub files_rejected: u64,
    pub files_failed: u64,
}

impl LoadSummary {
    fn from_stats(files_found: u64, stats: &PoolStats) -> Self {
        Self {
            files_found,
            files_loaded: stats.loaded(),
            files_rejected: stats.rejected(),
            files_failed: stats.failed(),
        }
    }
}

pub struct Loader {
    config: LoaderConfig,
    logger: Logger,
}

impl Loader {
    pub fn new(config: LoaderConfig, logger: Logger) -> Self {
        Self { config, logger }
    }

    /// Run one load over every file matching the configured pattern.
    ///
    /// Only configuration problems (invalid settings, bad pattern,
    /// unreachable store) are returned as errors; per-file and per-line
    /// failures are logged and counted.
    pub async fn run(&self) -> Result<LoadSummary> {
        ConfigLoader::validate(&self.config)?;
        let files = matching_files(&self.config.loader.pattern, &self.logger)?;

        let registry = Arc::new(
            StoreRegistry::connect(
                &self.config.storage,
                self.config.loader.dry_run,
                &self.logger,
            )
            .await?,
        );

        let mut device_types: Vec<&str> = registry.device_types().collect();
        device_types.sort_unstable();
        self.logger.info(format!(
            "{} stores ready for device types: {}",
            device_types.len(),
            device_types.join(", ")
        ));

        let context = WorkerContext {
            registry: registry.clone(),
            logger: self.logger.clone(),
            settings: WorkerSettings {
                error_threshold: self.config.loader.error_threshold,
                report_results: self.config.storage.report_write_results,
            },
            stats: PoolStats::default(),
        };

        if files.is_empty() {
            self.logger.warn(format!(
                "No files match pattern '{}'",
                self.config.loader.pattern
            ));
        }

        let pool = FileWorkerPool::new(self.config.loader.workers, context);
        for path in &files {
            pool.add_file(path.clone());
        }

        // Shutdown order: workers first, then the stores they write to
        let stats = pool.stop_and_wait().await;
        registry.close_all().await;

        let summary = LoadSummary::from_stats(files.len() as u64, &stats);
        self.logger.info(format!(
            "Finished: {} files found, {} loaded ({} with high error rate), {} failed",
            summary.files_found, summary.files_loaded, summary.files_rejected, summary.files_failed
        ));

        Ok(summary)
    }
}

/// Regular files matching `pattern`, sorted by path.
///
/// Wildcards do not match a leading `.`, so files already renamed as
/// processed are left out of later runs over the same pattern.
pub fn matching_files(pattern: &str, logger: &Logger) -> Result<Vec<PathBuf>> {
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };

    let mut files = Vec::new();
    let entries =
        glob::glob_with(pattern, options).with_context(|| format!("Invalid pattern '{}'", pattern))?;
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => logger.warn(format!(
                "Skipping unreadable path {}: {}",
                e.path().display(),
                e
            )),
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::LoggerActor;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_matching_files_sorted_and_filtered() {
        let logs = LoggerActor::spawn();
        let dir = TempDir::new().unwrap();
        for name in ["b.tsv.gz", "a.tsv.gz", ".c.tsv.gz", "d.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("e.tsv.gz")).unwrap();

        let pattern = format!("{}/*.tsv.gz", dir.path().display());
        let files = matching_files(&pattern, &logs.logger()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.tsv.gz", "b.tsv.gz"]);
        logs.shutdown().await;
    }

    #[tokio::test]
    async fn test_invalid_pattern() {
        let logs = LoggerActor::spawn();
        assert!(matching_files("[", &logs.logger()).is_err());
        logs.shutdown().await;
    }
}
