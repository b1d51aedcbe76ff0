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

use bytes::Bytes;
use std::fmt;
use tokio::sync::oneshot;

/// Wire message stored as the value of every key.
///
/// Mirrors the proto2 schema consumers already decode:
///
/// ```text
/// message UserApps {
///     repeated uint32 apps = 1;
///     optional double lat = 2;
///     optional double lon = 3;
/// }
/// ```
#[derive(Clone, PartialEq, prost::Message)]
pub struct UserApps {
    #[prost(uint32, repeated, packed = "false", tag = "1")]
    pub apps: Vec<u32>,
    #[prost(double, optional, tag = "2")]
    pub lat: Option<f64>,
    #[prost(double, optional, tag = "3")]
    pub lon: Option<f64>,
}

/// One parsed input line
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub device_type: String,
    pub device_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub app_ids: Vec<u32>,
}

impl DeviceRecord {
    pub fn store_key(&self) -> StoreKey {
        StoreKey::new(&self.device_type, &self.device_id)
    }
}

/// Key a record is stored under: `<device_type>:<device_id>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey(String);

impl StoreKey {
    pub fn new(device_type: &str, device_id: &str) -> Self {
        Self(format!("{}:{}", device_type, device_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One-shot outcome of a single write (`true` = stored).
///
/// A receiver whose sender was dropped unanswered sees a `RecvError`.
pub type ResultSender = oneshot::Sender<bool>;
pub type ResultReceiver = oneshot::Receiver<bool>;

pub fn result_channel() -> (ResultSender, ResultReceiver) {
    oneshot::channel()
}

/// A single write handed to a store client.
///
/// Fields are fixed at construction; the client only reads them.
#[derive(Debug)]
pub struct WriteRequest {
    key: StoreKey,
    payload: Bytes,
    reply: Option<ResultSender>,
}

impl WriteRequest {
    pub fn new(key: StoreKey, payload: Bytes) -> Self {
        Self {
            key,
            payload,
            reply: None,
        }
    }

    /// Attach a channel that receives the final outcome of this write
    pub fn with_reply(mut self, reply: ResultSender) -> Self {
        self.reply = Some(reply);
        self
    }

    pub fn key(&self) -> &StoreKey {
        &self.key
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn wants_reply(&self) -> bool {
        self.reply.is_some()
    }

    pub(crate) fn reply(self, stored: bool) {
        if let Some(reply) = self.reply {
            // The submitting worker may have given up on the file already
            let _ = reply.send(stored);
        }
    }
}

/// Per-file line counters, owned by the worker processing that file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileOutcome {
    pub lines_processed: u64,
    pub error_count: u64,
}

impl FileOutcome {
    pub fn error_rate(&self) -> f64 {
        if self.lines_processed == 0 {
            return 0.0;
        }
        self.error_count as f64 / self.lines_processed as f64
    }

    /// Acceptance gate: a file passes only when its rate is strictly below `threshold`
    pub fn verdict(&self, threshold: f64) -> LoadVerdict {
        if self.error_rate() < threshold {
            LoadVerdict::Accepted
        } else {
            LoadVerdict::Rejected
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadVerdict {
    Accepted,
    Rejected,
}
