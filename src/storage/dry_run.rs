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

// Dry-run backend: logs each write instead of performing it

use super::backend::KeyValueStore;
use crate::codec;
use crate::logger::Logger;
use anyhow::Result;
use async_trait::async_trait;

pub struct DryRunStore {
    addr: String,
    logger: Logger,
}

impl DryRunStore {
    pub fn new(addr: &str, logger: Logger) -> Self {
        Self {
            addr: addr.to_string(),
            logger,
        }
    }
}

#[async_trait]
impl KeyValueStore for DryRunStore {
    async fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        let rendered = match codec::deserialize(value) {
            Ok(apps) => format!(
                "lat={:?} lon={:?} apps={:?}",
                apps.lat, apps.lon, apps.apps
            ),
            Err(e) => format!("<{} undecodable bytes: {}>", value.len(), e),
        };
        self.logger
            .debug(format!("{} - {} -> {}", self.addr, key, rendered));
        Ok(())
    }

    fn address(&self) -> &str {
        &self.addr
    }

    fn backend_type(&self) -> &str {
        "dry-run"
    }
}
