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

// Key-value store trait for write-only loading

use anyhow::Result;
use async_trait::async_trait;

/// Connection to one key-value store
///
/// A store is owned by exactly one `StoreClient` consumer task, so methods
/// take `&mut self` and implementations need no internal locking.
///
/// Implementations must tolerate a `set` future being dropped mid-flight
/// (the client enforces its per-operation timeout that way).
#[async_trait]
pub trait KeyValueStore: Send {
    /// Store `value` under `key`
    async fn set(&mut self, key: &str, value: &[u8]) -> Result<()>;

    /// Release the underlying connection
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }

    /// Address the store talks to, for log messages
    fn address(&self) -> &str;

    /// Get backend type identifier
    fn backend_type(&self) -> &str;
}
