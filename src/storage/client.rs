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

// Per-destination write actor
//
// Each `StoreClient` owns one `KeyValueStore` inside a background task and
// feeds it through a bounded queue. Producers suspend once the queue is full;
// that is the only backpressure between the file workers and a store.

use super::backend::KeyValueStore;
use crate::logger::Logger;
use crate::protocol::WriteRequest;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

/// Returned when a request is submitted after the client was closed
#[derive(Debug, Error)]
#[error("store client for '{device_type}' is closed")]
pub struct StoreClosed {
    pub device_type: String,
    pub request: WriteRequest,
}

#[derive(Debug, Clone, Copy)]
pub struct ClientOptions {
    pub queue_capacity: usize,
    pub op_timeout: Duration,
    pub max_attempts: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            op_timeout: Duration::from_secs(2),
            max_attempts: 3,
        }
    }
}

enum StoreCommand {
    Write(WriteRequest),
    Close,
}

/// Handle to a store write actor
pub struct StoreClient {
    device_type: String,
    address: String,
    tx: mpsc::Sender<StoreCommand>,
    /// Flips to `true` once the consumer has drained and closed the store
    done: watch::Receiver<bool>,
}

impl StoreClient {
    /// Start the consumer task that owns `store`
    pub fn spawn(
        device_type: impl Into<String>,
        store: Box<dyn KeyValueStore>,
        options: ClientOptions,
        logger: Logger,
    ) -> Self {
        let device_type = device_type.into();
        let address = store.address().to_string();
        let (tx, rx) = mpsc::channel(options.queue_capacity);
        let (done_tx, done) = watch::channel(false);

        let consumer = StoreConsumer {
            device_type: device_type.clone(),
            store,
            options,
            logger,
            done: done_tx,
        };
        tokio::spawn(consumer.run(rx));

        Self {
            device_type,
            address,
            tx,
            done,
        }
    }

    pub fn device_type(&self) -> &str {
        &self.device_type
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Enqueue a write, waiting while the queue is full
    pub async fn submit(&self, request: WriteRequest) -> Result<(), StoreClosed> {
        self.tx
            .send(StoreCommand::Write(request))
            .await
            .map_err(|e| self.closed(e.0))
    }

    /// Blocking variant of [`submit`](Self::submit) for file worker threads.
    ///
    /// Must not be called from inside an async context.
    pub fn submit_blocking(&self, request: WriteRequest) -> Result<(), StoreClosed> {
        self.tx
            .blocking_send(StoreCommand::Write(request))
            .map_err(|e| self.closed(e.0))
    }

    fn closed(&self, command: StoreCommand) -> StoreClosed {
        match command {
            StoreCommand::Write(request) => StoreClosed {
                device_type: self.device_type.clone(),
                request,
            },
            StoreCommand::Close => unreachable!("close commands are never handed back"),
        }
    }

    /// Stop intake, drain queued writes and close the connection.
    ///
    /// Resolves once the consumer has finished, for every caller; calling it
    /// again is harmless.
    pub async fn close(&self) {
        // Fails when intake is already closed; the drain may still be running
        let _ = self.tx.send(StoreCommand::Close).await;

        let mut done = self.done.clone();
        // An error means the consumer died without finishing; nothing to wait for
        let _ = done.wait_for(|finished| *finished).await;
    }
}

struct StoreConsumer {
    device_type: String,
    store: Box<dyn KeyValueStore>,
    options: ClientOptions,
    logger: Logger,
    done: watch::Sender<bool>,
}

impl StoreConsumer {
    async fn run(mut self, mut rx: mpsc::Receiver<StoreCommand>) {
        while let Some(command) = rx.recv().await {
            match command {
                StoreCommand::Write(request) => {
                    let stored = self.write(&request).await;
                    request.reply(stored);
                }
                StoreCommand::Close => {
                    // Anything already queued is still delivered before recv returns None
                    rx.close();
                }
            }
        }

        if let Err(e) = self.store.close().await {
            self.logger.warn(format!(
                "Error closing {} store at {}: {:#}",
                self.device_type,
                self.store.address(),
                e
            ));
        }
        self.logger.debug(format!(
            "Store client for '{}' ({}) drained and closed",
            self.device_type,
            self.store.address()
        ));

        self.done.send_replace(true);
    }

    /// Attempt the write up to `max_attempts` times back to back
    async fn write(&mut self, request: &WriteRequest) -> bool {
        let key = request.key().as_str();
        let mut last_error = String::new();

        for attempt in 1..=self.options.max_attempts {
            match timeout(
                self.options.op_timeout,
                self.store.set(key, request.payload()),
            )
            .await
            {
                Ok(Ok(())) => return true,
                Ok(Err(e)) => last_error = format!("{:#}", e),
                Err(_) => {
                    last_error = format!("timed out after {:?}", self.options.op_timeout)
                }
            }
            self.logger.debug(format!(
                "Write of '{}' to {} failed (attempt {}/{}): {}",
                key,
                self.store.address(),
                attempt,
                self.options.max_attempts,
                last_error
            ));
        }

        self.logger.error(format!(
            "Failed to write '{}' to {} after {} attempts: {}",
            key,
            self.store.address(),
            self.options.max_attempts,
            last_error
        ));
        false
    }
}
