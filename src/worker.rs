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

// Processing of a single input file on a file worker thread

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::codec;
use crate::logger::Logger;
use crate::pool::PoolStats;
use crate::protocol::{result_channel, FileOutcome, LoadVerdict, ResultReceiver, ResultSender, WriteRequest};
use crate::storage::StoreRegistry;

/// Upper bound on write outcomes awaited at once per file
const RESULT_BATCH: usize = 1024;

#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub error_threshold: f64,
    /// Wait for each write's outcome and count failures as line errors
    pub report_results: bool,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            error_threshold: 0.01,
            report_results: true,
        }
    }
}

/// Everything a worker needs, shared read-only by all workers
pub struct WorkerContext {
    pub registry: Arc<StoreRegistry>,
    pub logger: Logger,
    pub settings: WorkerSettings,
    pub stats: PoolStats,
}

/// Process one file end to end and mark it as done.
///
/// Never fails: every problem is logged and the worker moves on.
pub fn handle_file(path: &Path, ctx: &WorkerContext) {
    ctx.logger.info(format!("Processing {}", path.display()));

    match process_file(path, ctx) {
        Ok(outcome) => {
            ctx.stats.record_loaded(outcome.verdict(ctx.settings.error_threshold));
            rename_processed(path, &ctx.logger);
        }
        Err(e) => {
            ctx.stats.record_failed();
            ctx.logger
                .error(format!("Processing {}. {:#}", path.display(), e));
        }
    }
}

/// Stream every line of `path` to its store and log the acceptance verdict.
///
/// Returns an error when the file cannot be opened or decompressed. If
/// decompression breaks after some lines were read, the verdict for those
/// lines is still logged before the error is returned.
pub fn process_file(path: &Path, ctx: &WorkerContext) -> Result<FileOutcome> {
    let file = File::open(path).context("Failed to open file")?;
    let mut reader = BufReader::new(MultiGzDecoder::new(file));

    let mut outcome = FileOutcome::default();
    let mut results = ResultTracker::new();
    let mut buf = Vec::new();
    let mut stream_error = None;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                stream_error = Some(e);
                break;
            }
        }

        outcome.lines_processed += 1;
        let text = String::from_utf8_lossy(&buf);
        if !dispatch_line(text.trim(), path, ctx, &mut results) {
            outcome.error_count += 1;
        }

        if ctx.settings.report_results && results.pending() >= RESULT_BATCH {
            outcome.error_count += results.collect();
        }
    }
    outcome.error_count += results.collect();

    if let Some(e) = stream_error {
        if outcome.lines_processed == 0 {
            return Err(e).context("Failed to open gzip stream");
        }
        log_verdict(path, &outcome, ctx);
        return Err(e).context(format!(
            "Decompression failed after {} lines",
            outcome.lines_processed
        ));
    }

    log_verdict(path, &outcome, ctx);
    Ok(outcome)
}

/// Parse, route and submit one line; false means the line counts as an error
fn dispatch_line(line: &str, path: &Path, ctx: &WorkerContext, results: &mut ResultTracker) -> bool {
    let record = match codec::parse_line(line) {
        Ok(record) => record,
        Err(e) => {
            ctx.logger
                .warn(format!("Processing {}. Parsing error: {}", path.display(), e));
            return false;
        }
    };

    let Some(client) = ctx.registry.get(&record.device_type) else {
        ctx.logger.error(format!(
            "Processing {}. Unknown device type: {}",
            path.display(),
            record.device_type
        ));
        return false;
    };

    let payload = match codec::serialize(&record) {
        Ok(payload) => payload,
        Err(e) => {
            ctx.logger
                .error(format!("Processing {}. {}", path.display(), e));
            return false;
        }
    };

    let mut request = WriteRequest::new(record.store_key(), payload);
    if ctx.settings.report_results {
        request = request.with_reply(results.track());
    }
    let tracked = request.wants_reply();

    match client.submit_blocking(request) {
        Ok(()) => true,
        Err(e) => {
            if tracked {
                results.untrack();
            }
            ctx.logger
                .error(format!("Processing {}. {}", path.display(), e));
            false
        }
    }
}

fn log_verdict(path: &Path, outcome: &FileOutcome, ctx: &WorkerContext) {
    let rate = outcome.error_rate();
    let threshold = ctx.settings.error_threshold;
    match outcome.verdict(threshold) {
        LoadVerdict::Accepted => ctx.logger.info(format!(
            "Processing {}. Acceptable error rate ({}). Successful load ({} lines, {} errors)",
            path.display(),
            rate,
            outcome.lines_processed,
            outcome.error_count
        )),
        LoadVerdict::Rejected => ctx.logger.error(format!(
            "Processing {}. High error rate ({} >= {}). Failed load ({} lines, {} errors)",
            path.display(),
            rate,
            threshold,
            outcome.lines_processed,
            outcome.error_count
        )),
    }
}

/// `dir/name` -> `dir/.name`
pub fn processed_path(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?;
    let mut hidden = std::ffi::OsString::from(".");
    hidden.push(name);
    Some(path.with_file_name(hidden))
}

fn rename_processed(path: &Path, logger: &Logger) {
    let Some(target) = processed_path(path) else {
        logger.error(format!("Cannot mark {} as processed: no file name", path.display()));
        return;
    };

    if let Err(e) = std::fs::rename(path, &target) {
        logger.error(format!(
            "Failed to rename {} to {}: {}",
            path.display(),
            target.display(),
            e
        ));
    }
}

/// Outcomes of writes submitted for the current file
#[derive(Default)]
struct ResultTracker {
    pending: Vec<ResultReceiver>,
}

impl ResultTracker {
    fn new() -> Self {
        Self::default()
    }

    /// Reply channel for one more write
    fn track(&mut self) -> ResultSender {
        let (tx, rx) = result_channel();
        self.pending.push(rx);
        tx
    }

    /// Forget the latest reply channel; its request never reached a store
    fn untrack(&mut self) {
        self.pending.pop();
    }

    fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Block until every pending write reported back; returns the failures.
    ///
    /// A request dropped without a reply (its store client died) is a failure.
    fn collect(&mut self) -> u64 {
        self.pending
            .drain(..)
            .map(|rx| match rx.blocking_recv() {
                Ok(true) => 0,
                Ok(false) | Err(_) => 1,
            })
            .sum()
    }
}
