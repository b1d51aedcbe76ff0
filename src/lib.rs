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

// Concurrent loader of app-install logs into memcached
//
// This loader:
// - Expands a glob of gzipped, tab-separated device logs
// - Processes files on a fixed pool of workers
// - Encodes each line as a protobuf UserApps message
// - Writes it to the memcached instance of the line's device type,
//   through one bounded, retrying write actor per destination
// - Reports a per-file error-rate verdict and marks files as processed

pub mod codec;
pub mod config;
pub mod loader;
pub mod logger;
pub mod pool;
pub mod protocol;
pub mod storage;
pub mod worker;

// Re-export main types
pub use codec::{parse_line, serialize, ParseError, SerializeError};
pub use config::{load_config, load_config_with_env, LoaderConfig};
pub use loader::{LoadSummary, Loader};
pub use logger::{Logger, LoggerActor};
pub use pool::{FileWorkerPool, PoolStats};
pub use protocol::{DeviceRecord, FileOutcome, LoadVerdict, StoreKey, UserApps, WriteRequest};
pub use storage::{KeyValueStore, MemcacheStore, StoreClient, StoreRegistry};
