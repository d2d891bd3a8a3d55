//! Built-in flows embedded at compile time.

use crate::config::FlowConfig;
use crate::error::{Result, WaypostError};
use include_dir::{include_dir, Dir};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Embedded flows directory.
static FLOWS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/flows");

/// One embedded flow file: a name plus an ordinary flow definition.
#[derive(Debug, Clone, Deserialize)]
pub struct BuiltinFlow {
    pub name: String,
    #[serde(flatten)]
    pub config: FlowConfig,
}

/// Load all built-in flow definitions, keyed by name.
pub fn load_builtin_flows() -> Result<BTreeMap<String, FlowConfig>> {
    let mut flows = BTreeMap::new();

    for file in FLOWS_DIR.files() {
        let is_yaml = file
            .path()
            .extension()
            .is_some_and(|ext| ext == "yml" || ext == "yaml");
        if !is_yaml {
            continue;
        }

        let content = file
            .contents_utf8()
            .ok_or_else(|| WaypostError::ConfigParseError {
                path: file.path().to_path_buf(),
                message: "Invalid UTF-8".to_string(),
            })?;

        let flow: BuiltinFlow =
            serde_yaml::from_str(content).map_err(|e| WaypostError::ConfigParseError {
                path: file.path().to_path_buf(),
                message: e.to_string(),
            })?;
        flows.insert(flow.name, flow.config);
    }

    Ok(flows)
}

/// Names of the built-in flows.
pub fn builtin_names() -> Vec<String> {
    load_builtin_flows()
        .map(|flows| flows.into_keys().collect())
        .unwrap_or_default()
}
