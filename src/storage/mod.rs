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

// Storage module
//
// Provides a trait-based abstraction over key-value stores plus the
// per-device-type write actors built on top of it.
//
// This module focuses on WRITE-ONLY operations.

pub mod backend;
pub mod client;
pub mod dry_run;
pub mod factory;
pub mod memcache;
pub mod registry;

pub use backend::KeyValueStore;
pub use client::{ClientOptions, StoreClient, StoreClosed};
pub use dry_run::DryRunStore;
pub use factory::StoreFactory;
pub use memcache::MemcacheStore;
pub use registry::StoreRegistry;
