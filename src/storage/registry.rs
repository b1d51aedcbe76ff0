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

// Device type -> store client lookup, frozen before any worker starts

use super::client::{ClientOptions, StoreClient};
use super::factory::StoreFactory;
use crate::config::StorageConfig;
use crate::logger::Logger;
use anyhow::{bail, Result};
use std::collections::HashMap;

pub struct StoreRegistry {
    clients: HashMap<String, StoreClient>,
}

impl StoreRegistry {
    pub fn from_clients(clients: impl IntoIterator<Item = StoreClient>) -> Result<Self> {
        let mut map = HashMap::new();
        for client in clients {
            let device_type = client.device_type().to_string();
            if map.insert(device_type.clone(), client).is_some() {
                bail!("duplicate store client for device type '{}'", device_type);
            }
        }
        Ok(Self { clients: map })
    }

    /// Connect one client per configured destination.
    ///
    /// Any unreachable destination fails the whole build; clients already
    /// started are closed before the error is returned.
    pub async fn connect(config: &StorageConfig, dry_run: bool, logger: &Logger) -> Result<Self> {
        let options = ClientOptions {
            queue_capacity: config.queue_capacity,
            op_timeout: config.timeout(),
            max_attempts: config.max_attempts,
        };

        let mut clients = Vec::with_capacity(config.destinations.len());
        for (device_type, addr) in &config.destinations {
            match StoreFactory::create(addr, config.timeout(), dry_run, logger).await {
                Ok(store) => {
                    let backend = store.backend_type().to_string();
                    let client =
                        StoreClient::spawn(device_type.clone(), store, options, logger.clone());
                    logger.info(format!(
                        "Using {} store at {} for '{}'",
                        backend,
                        client.address(),
                        device_type
                    ));
                    clients.push(client);
                }
                Err(e) => {
                    for client in &clients {
                        client.close().await;
                    }
                    return Err(e.context(format!("store for '{}' is unreachable", device_type)));
                }
            }
        }

        Self::from_clients(clients)
    }

    pub fn get(&self, device_type: &str) -> Option<&StoreClient> {
        self.clients.get(device_type)
    }

    pub fn device_types(&self) -> impl Iterator<Item = &str> {
        self.clients.keys().map(String::as_str)
    }

    /// Drain and close every client
    pub async fn close_all(&self) {
        for client in self.clients.values() {
            client.close().await;
        }
    }
}
