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

// Single-writer logging actor
//
// Every component logs through a cloned `Logger` handle. Records travel over
// one unbounded queue to a single consumer, so the sink sees them in the
// exact order they were enqueued, whichever thread or task produced them.

use std::fmt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
}

/// Destination the consumer writes records to
pub trait LogSink: Send + 'static {
    fn write(&mut self, record: &LogRecord);
}

/// Forwards records to the global `tracing` subscriber
#[derive(Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&mut self, record: &LogRecord) {
        match record.level {
            LogLevel::Debug => debug!(target: "loader", "{}", record.message),
            LogLevel::Info => info!(target: "loader", "{}", record.message),
            LogLevel::Warn => warn!(target: "loader", "{}", record.message),
            LogLevel::Error => error!(target: "loader", "{}", record.message),
        }
    }
}

enum LogCommand {
    Record(LogRecord),
    Shutdown,
}

/// Cloneable handle used by producers
#[derive(Clone)]
pub struct Logger {
    tx: mpsc::UnboundedSender<LogCommand>,
}

impl Logger {
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let record = LogRecord {
            level,
            message: message.into(),
        };
        // Intake is closed only after shutdown; late records are discarded
        let _ = self.tx.send(LogCommand::Record(record));
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }
}

/// Owner of the consumer task
pub struct LoggerActor {
    logger: Logger,
    handle: JoinHandle<()>,
}

impl LoggerActor {
    /// Start a logger that writes to `tracing`
    pub fn spawn() -> Self {
        Self::spawn_with_sink(TracingSink)
    }

    pub fn spawn_with_sink<S: LogSink>(mut sink: S) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                match command {
                    LogCommand::Record(record) => sink.write(&record),
                    // Stop intake; recv keeps yielding what is already queued
                    LogCommand::Shutdown => rx.close(),
                }
            }
        });

        Self {
            logger: Logger { tx },
            handle,
        }
    }

    pub fn logger(&self) -> Logger {
        self.logger.clone()
    }

    /// Close intake, drain queued records and wait for the consumer to exit
    pub async fn shutdown(self) {
        let _ = self.logger.tx.send(LogCommand::Shutdown);
        if let Err(e) = self.handle.await {
            error!("Logger task terminated abnormally: {}", e);
        }
    }
}
