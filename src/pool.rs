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

use crossbeam::channel::{self, Receiver, Sender};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::logger::Logger;
use crate::protocol::LoadVerdict;
use crate::worker::{handle_file, WorkerContext};

/// Per-run file counters shared by all workers
#[derive(Clone, Default)]
pub struct PoolStats {
    inner: Arc<PoolStatsInner>,
}

#[derive(Default)]
struct PoolStatsInner {
    loaded: AtomicU64,
    rejected: AtomicU64,
    failed: AtomicU64,
}

impl PoolStats {
    pub(crate) fn record_loaded(&self, verdict: LoadVerdict) {
        self.inner.loaded.fetch_add(1, Ordering::Relaxed);
        if verdict == LoadVerdict::Rejected {
            self.inner.rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_failed(&self) {
        self.inner.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Files read to the end (renamed as processed)
    pub fn loaded(&self) -> u64 {
        self.inner.loaded.load(Ordering::Relaxed)
    }

    /// Loaded files whose error rate was too high
    pub fn rejected(&self) -> u64 {
        self.inner.rejected.load(Ordering::Relaxed)
    }

    /// Files that could not be opened or decompressed
    pub fn failed(&self) -> u64 {
        self.inner.failed.load(Ordering::Relaxed)
    }
}

/// Fixed set of file workers sharing one queue of paths
///
/// Workers are blocking threads: decompression and the bounded submits to
/// the store clients both block.
pub struct FileWorkerPool {
    tx: Sender<PathBuf>,
    workers: Vec<JoinHandle<()>>,
    stats: PoolStats,
    logger: Logger,
}

impl FileWorkerPool {
    /// Start `num_workers` workers. Must be called from within a tokio runtime.
    pub fn new(num_workers: usize, context: WorkerContext) -> Self {
        let (tx, rx) = channel::unbounded::<PathBuf>();
        let stats = context.stats.clone();
        let logger = context.logger.clone();
        let context = Arc::new(context);

        let workers = (0..num_workers.max(1))
            .map(|id| {
                let rx = rx.clone();
                let context = context.clone();
                tokio::task::spawn_blocking(move || worker_loop(id, rx, &context))
            })
            .collect();

        Self {
            tx,
            workers,
            stats,
            logger,
        }
    }

    pub fn add_file(&self, path: impl Into<PathBuf>) {
        // Receivers live until stop_and_wait, so the queue is never disconnected here
        let _ = self.tx.send(path.into());
    }

    pub fn stats(&self) -> PoolStats {
        self.stats.clone()
    }

    /// Close the queue and wait until every worker finished its last file
    pub async fn stop_and_wait(self) -> PoolStats {
        drop(self.tx);

        for (id, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.await {
                self.logger
                    .error(format!("File worker {} terminated abnormally: {}", id, e));
            }
        }

        self.stats
    }
}

fn worker_loop(id: usize, rx: Receiver<PathBuf>, context: &WorkerContext) {
    context.logger.debug(format!("File worker {} started", id));

    // recv fails only once the queue is closed and empty
    while let Ok(path) = rx.recv() {
        handle_file(&path, context);
    }

    context.logger.debug(format!("File worker {} exiting", id));
}
