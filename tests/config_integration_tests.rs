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

// Configuration system integration tests

use appsinstalled_loader::config::{load_config, ConfigLoader, LoaderConfig};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_load_default_config() {
    let config_path = PathBuf::from("config/default.yaml");

    if config_path.exists() {
        let result = load_config(&config_path);
        assert!(result.is_ok(), "Failed to load default config: {:?}", result.err());

        let config = result.unwrap();

        assert_eq!(config.loader.workers, 4);
        assert_eq!(config.loader.error_threshold, 0.01);
        assert_eq!(config.storage.destinations.len(), 4);
        assert_eq!(config.storage.timeout_ms, 2000);
        assert_eq!(config.storage.max_attempts, 3);
        assert_eq!(config.logging.level, "info");
        assert!(ConfigLoader::validate(&config).is_ok());
    }
}

#[test]
fn test_config_with_env_vars() {
    let temp_config = r#"
loader:
  pattern: ${CFG_IT_PATTERN:-/tmp/in/*.tsv.gz}
  workers: 2

storage:
  destinations:
    idfa: ${CFG_IT_IDFA:-127.0.0.1:33013}
    gaid: ${CFG_IT_GAID:-127.0.0.1:33014}
  timeout_ms: 750

logging:
  level: debug
"#;

    std::env::set_var("CFG_IT_IDFA", "memc-idfa:11211");
    std::env::remove_var("CFG_IT_GAID");
    std::env::remove_var("CFG_IT_PATTERN");

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("loader.yaml");
    fs::write(&path, temp_config).unwrap();

    let config = load_config(&path).unwrap();
    std::env::remove_var("CFG_IT_IDFA");

    assert_eq!(config.loader.pattern, "/tmp/in/*.tsv.gz");
    assert_eq!(config.loader.workers, 2);
    assert_eq!(config.storage.destinations["idfa"], "memc-idfa:11211");
    assert_eq!(config.storage.destinations["gaid"], "127.0.0.1:33014");
    // A destinations map in the file replaces the defaults entirely
    assert!(!config.storage.destinations.contains_key("adid"));
    assert_eq!(config.storage.timeout().as_millis(), 750);
    assert_eq!(config.logging.level, "debug");

    // Omitted fields fall back to defaults
    assert_eq!(config.loader.error_threshold, 0.01);
    assert_eq!(config.storage.queue_capacity, 64);
    assert!(config.storage.report_write_results);
}

#[test]
fn test_partial_config_uses_defaults() {
    let config = ConfigLoader::parse("loader:\n  pattern: \"*.gz\"\n").unwrap();
    let defaults = LoaderConfig::default();

    assert_eq!(config.loader.pattern, "*.gz");
    assert_eq!(config.loader.workers, defaults.loader.workers);
    assert_eq!(config.storage.destinations, defaults.storage.destinations);
    assert_eq!(config.storage.destinations["dvid"], "127.0.0.1:33016");
    assert!(!config.loader.dry_run);
}

#[test]
fn test_invalid_yaml() {
    let result = ConfigLoader::parse("loader: [unclosed");
    assert!(result.is_err());
}

#[test]
fn test_wrong_type_is_rejected() {
    let result = ConfigLoader::parse("loader:\n  workers: many\n");
    assert!(result.is_err());
}

#[test]
fn test_missing_file() {
    let result = load_config("/nonexistent/loader.yaml");
    assert!(result.is_err());
}

#[test]
fn test_validation_failures() {
    let valid = {
        let mut config = LoaderConfig::default();
        config.loader.pattern = "/data/*.tsv.gz".to_string();
        config
    };
    assert!(ConfigLoader::validate(&valid).is_ok());

    let mut config = valid.clone();
    config.loader.pattern = "  ".to_string();
    assert!(ConfigLoader::validate(&config).is_err());

    let mut config = valid.clone();
    config.loader.workers = 0;
    assert!(ConfigLoader::validate(&config).is_err());

    let mut config = valid.clone();
    config.loader.error_threshold = 0.0;
    assert!(ConfigLoader::validate(&config).is_err());

    let mut config = valid.clone();
    config.loader.error_threshold = 1.5;
    assert!(ConfigLoader::validate(&config).is_err());

    let mut config = valid.clone();
    config.storage.destinations.clear();
    assert!(ConfigLoader::validate(&config).is_err());

    let mut config = valid.clone();
    config
        .storage
        .destinations
        .insert("idfa".to_string(), "no-port".to_string());
    assert!(ConfigLoader::validate(&config).is_err());

    let mut config = valid.clone();
    config.storage.max_attempts = 0;
    assert!(ConfigLoader::validate(&config).is_err());

    let mut config = valid;
    config.storage.queue_capacity = 0;
    assert!(ConfigLoader::validate(&config).is_err());
}
