//! Configuration loading, parsing, and validation for Waypost.
//!
//! This module handles all aspects of configuration:
//! - Schema definitions in [`schema`]
//! - File discovery and loading in [`loader`]
//! - Deep merging in [`merger`]
//! - Compilation of configured flows in [`compile`]
//! - Validation in [`validator`]
//!
//! # Example
//!
//! ```
//! use waypost::config::{load_merged_config, validate};
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! let dir = temp.path().join(".waypost");
//! fs::create_dir_all(&dir).unwrap();
//! fs::write(dir.join("config.yml"), "app_name: test").unwrap();
//!
//! let config = load_merged_config(temp.path()).unwrap();
//! validate(&config).unwrap();
//! assert_eq!(config.app_name, Some("test".to_string()));
//! ```
//!
//! # Configuration File Locations
//!
//! Waypost discovers and merges configuration in this order:
//! 1. Project config (`.waypost/config.yml`)
//! 2. Local overrides (`.waypost/config.local.yml`)

pub mod compile;
pub mod loader;
pub mod merger;
pub mod schema;
pub mod validator;

pub use compile::compile_flow;
pub use schema::{
    BackendConfig, BranchConfig, DemoSettings, FieldConfig, FieldType, FlowConfig, OutputMode,
    Settings, StepConfig, WaypostConfig,
};
pub use loader::{
    find_project_root, load_config, load_config_file, load_config_or_default,
    load_config_value, load_merged_config, parse_config, ConfigPaths, CONFIG_DIR,
};
pub use merger::{deep_merge, merge_configs, merge_into};
pub use validator::{validate, validate_config, ValidationError};

/// JSON Schema for the configuration file, as pretty-printed JSON.
pub fn json_schema() -> serde_json::Result<String> {
    serde_json::to_string_pretty(&schemars::schema_for!(WaypostConfig))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_schema_is_valid_json() {
        let text = json_schema().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["title"], "WaypostConfig");
    }
}
