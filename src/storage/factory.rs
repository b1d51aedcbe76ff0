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

// Backend factory for creating key-value stores from configuration

use super::backend::KeyValueStore;
use super::dry_run::DryRunStore;
use super::memcache::MemcacheStore;
use crate::logger::Logger;
use anyhow::Result;
use std::time::Duration;

pub struct StoreFactory;

impl StoreFactory {
    /// Create the store for one destination address
    pub async fn create(
        addr: &str,
        timeout: Duration,
        dry_run: bool,
        logger: &Logger,
    ) -> Result<Box<dyn KeyValueStore>> {
        if dry_run {
            return Ok(Box::new(DryRunStore::new(addr, logger.clone())));
        }

        let store = MemcacheStore::connect(addr, timeout).await?;
        Ok(Box::new(store))
    }
}
