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

//! Fakes shared by the integration tests

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufStream};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Notify, Semaphore};

use appsinstalled_loader::logger::{LogLevel, LogRecord, LogSink};
use appsinstalled_loader::storage::KeyValueStore;

/// Observable state behind a [`FakeStore`]
#[derive(Default)]
pub struct FakeState {
    pub writes: Mutex<Vec<(String, Vec<u8>)>>,
    pub attempts: AtomicUsize,
    pub failures_left: AtomicUsize,
    pub always_fail: bool,
    pub delay: Option<Duration>,
    pub close_delay: Option<Duration>,
    pub panics: bool,
    pub gate: Option<Arc<Semaphore>>,
    pub entered: Notify,
    pub closed: AtomicUsize,
}

impl FakeState {
    pub fn keys(&self) -> Vec<String> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

/// In-memory store with injectable failures, delays and a gate
pub struct FakeStore {
    state: Arc<FakeState>,
}

impl FakeStore {
    fn with_state(state: FakeState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    pub fn healthy() -> Self {
        Self::with_state(FakeState::default())
    }

    pub fn always_failing() -> Self {
        Self::with_state(FakeState {
            always_fail: true,
            ..Default::default()
        })
    }

    pub fn failing_first(failures: usize) -> Self {
        Self::with_state(FakeState {
            failures_left: AtomicUsize::new(failures),
            ..Default::default()
        })
    }

    pub fn slow(delay: Duration) -> Self {
        Self::with_state(FakeState {
            delay: Some(delay),
            ..Default::default()
        })
    }

    /// `close` takes `delay` before it completes
    pub fn slow_close(delay: Duration) -> Self {
        Self::with_state(FakeState {
            close_delay: Some(delay),
            ..Default::default()
        })
    }

    /// Every `set` panics, taking the owning consumer task down with it
    pub fn panicking() -> Self {
        Self::with_state(FakeState {
            panics: true,
            ..Default::default()
        })
    }

    /// Every `set` waits for a permit on `gate`
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self::with_state(FakeState {
            gate: Some(gate),
            ..Default::default()
        })
    }

    pub fn state(&self) -> Arc<FakeState> {
        self.state.clone()
    }
}

#[async_trait]
impl KeyValueStore for FakeStore {
    async fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.state.attempts.fetch_add(1, Ordering::SeqCst);
        if self.state.panics {
            panic!("store crashed while writing {}", key);
        }

        if let Some(gate) = &self.state.gate {
            self.state.entered.notify_one();
            gate.acquire().await?.forget();
        }
        if let Some(delay) = self.state.delay {
            tokio::time::sleep(delay).await;
        }
        if self.state.always_fail {
            bail!("injected failure");
        }
        let remaining = self.state.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.state.failures_left.store(remaining - 1, Ordering::SeqCst);
            bail!("injected failure ({} left)", remaining - 1);
        }

        self.state
            .writes
            .lock()
            .unwrap()
            .push((key.to_string(), value.to_vec()));
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(delay) = self.state.close_delay {
            tokio::time::sleep(delay).await;
        }
        self.state.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn address(&self) -> &str {
        "fake:0"
    }

    fn backend_type(&self) -> &str {
        "fake"
    }
}

/// Log sink keeping every record in memory
#[derive(Clone, Default)]
pub struct CaptureSink {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl CaptureSink {
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.records
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.level == level && r.message.contains(needle))
    }

    pub fn count(&self, needle: &str) -> usize {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.message.contains(needle))
            .count()
    }
}

impl LogSink for CaptureSink {
    fn write(&mut self, record: &LogRecord) {
        self.records.lock().unwrap().push(record.clone());
    }
}

/// Write `lines` as a gzip file, one per line
pub fn write_gz(path: &Path, lines: &[String]) {
    let file = std::fs::File::create(path).unwrap();
    let mut encoder = GzEncoder::new(file, Compression::default());
    for line in lines {
        writeln!(encoder, "{}", line).unwrap();
    }
    encoder.finish().unwrap();
}

pub fn device_line(device_type: &str, device_id: &str) -> String {
    format!("{}\t{}\t55.55\t42.42\t1423,43,567", device_type, device_id)
}

/// Minimal memcached answering every `set` with a fixed reply
pub struct FakeMemcached {
    pub addr: String,
    pub items: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl FakeMemcached {
    pub async fn start() -> Self {
        Self::start_with_reply("STORED").await
    }

    pub async fn start_with_reply(reply: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let items: Arc<Mutex<HashMap<String, Vec<u8>>>> = Arc::default();

        let server_items = items.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let items = server_items.clone();
                tokio::spawn(async move {
                    let _ = serve(socket, items, reply).await;
                });
            }
        });

        Self { addr, items }
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.items.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }
}

async fn serve(
    socket: TcpStream,
    items: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    reply: &'static str,
) -> std::io::Result<()> {
    let mut stream = BufStream::new(socket);
    loop {
        let mut line = String::new();
        if stream.read_line(&mut line).await? == 0 {
            return Ok(());
        }

        // set <key> <flags> <exptime> <bytes>
        let parts: Vec<&str> = line.trim_end().split(' ').collect();
        if parts.len() != 5 || parts[0] != "set" {
            stream.write_all(b"ERROR\r\n").await?;
            stream.flush().await?;
            continue;
        }
        let len: usize = parts[4].parse().unwrap();
        let mut data = vec![0u8; len + 2];
        stream.read_exact(&mut data).await?;
        data.truncate(len);

        if reply == "STORED" {
            items.lock().unwrap().insert(parts[1].to_string(), data);
        }
        stream.write_all(format!("{}\r\n", reply).as_bytes()).await?;
        stream.flush().await?;
    }
}
