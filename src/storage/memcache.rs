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

// Memcached backend speaking the text protocol

use super::backend::KeyValueStore;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

const MAX_KEY_LEN: usize = 250;

/// Single memcached connection
///
/// The stream is taken out of `self` for the duration of a command and only
/// put back once the reply was read, so a cancelled or failed command never
/// leaves a half-written request on a connection that gets reused.
pub struct MemcacheStore {
    addr: String,
    connect_timeout: Duration,
    stream: Option<BufStream<TcpStream>>,
}

impl MemcacheStore {
    /// Dial `addr`; an unreachable server is reported here, at startup
    pub async fn connect(addr: &str, connect_timeout: Duration) -> Result<Self> {
        let stream = Self::dial(addr, connect_timeout).await?;
        debug!("Connected to memcached at {}", addr);

        Ok(Self {
            addr: addr.to_string(),
            connect_timeout,
            stream: Some(stream),
        })
    }

    async fn dial(addr: &str, connect_timeout: Duration) -> Result<BufStream<TcpStream>> {
        let stream = timeout(connect_timeout, TcpStream::connect(addr))
            .await
            .with_context(|| format!("Timed out connecting to memcached at {}", addr))?
            .with_context(|| format!("Failed to connect to memcached at {}", addr))?;
        stream.set_nodelay(true)?;

        Ok(BufStream::new(stream))
    }

    fn validate_key(key: &str) -> Result<()> {
        if key.is_empty() || key.len() > MAX_KEY_LEN {
            bail!("memcached key must be 1-{} bytes, got {}", MAX_KEY_LEN, key.len());
        }
        if key.bytes().any(|b| b <= b' ' || b == 0x7f) {
            bail!("memcached key contains whitespace or control bytes: {:?}", key);
        }
        Ok(())
    }

    /// Build a `set` command with no flags and no expiry
    pub fn encode_set(key: &str, value: &[u8]) -> Vec<u8> {
        let header = format!("set {} 0 0 {}\r\n", key, value.len());
        let mut cmd = Vec::with_capacity(header.len() + value.len() + 2);
        cmd.extend_from_slice(header.as_bytes());
        cmd.extend_from_slice(value);
        cmd.extend_from_slice(b"\r\n");
        cmd
    }
}

#[async_trait]
impl KeyValueStore for MemcacheStore {
    async fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        Self::validate_key(key)?;

        let mut stream = match self.stream.take() {
            Some(stream) => stream,
            None => {
                debug!("Reconnecting to memcached at {}", self.addr);
                Self::dial(&self.addr, self.connect_timeout).await?
            }
        };

        stream
            .write_all(&Self::encode_set(key, value))
            .await
            .context("Failed to send set command")?;
        stream.flush().await.context("Failed to flush set command")?;

        let mut reply = String::new();
        let read = stream
            .read_line(&mut reply)
            .await
            .context("Failed to read set reply")?;
        if read == 0 {
            bail!("memcached at {} closed the connection", self.addr);
        }

        // A complete reply line means the connection is still in sync
        self.stream = Some(stream);

        match reply.trim_end() {
            "STORED" => Ok(()),
            other => bail!("memcached at {} rejected set: {}", self.addr, other),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            stream
                .shutdown()
                .await
                .context("Failed to shut down memcached connection")?;
        }
        Ok(())
    }

    fn address(&self) -> &str {
        &self.addr
    }

    fn backend_type(&self) -> &str {
        "memcached"
    }
}
