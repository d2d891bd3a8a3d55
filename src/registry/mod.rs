//! Flow registry for Waypost.
//!
//! Flows come from two places:
//! - Built-in flows (embedded in the binary)
//! - Project flows (`flows:` in `.waypost/config.yml`)
//!
//! A project flow replaces a built-in flow of the same name. Every flow is
//! compiled when the registry is built, so a misconfigured flow is reported
//! before anyone starts it.
//!
//! # Example
//!
//! ```
//! use waypost::registry::FlowRegistry;
//!
//! let registry = FlowRegistry::builtin().unwrap();
//! let flow = registry.get("password_reset").unwrap();
//! assert_eq!(flow.schema.entry().as_str(), "email");
//! ```

pub mod builtin;

pub use builtin::{builtin_names, load_builtin_flows, BuiltinFlow};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::config::{compile_flow, FlowConfig, WaypostConfig};
use crate::error::{Result, WaypostError};
use crate::flow::FlowSchema;

/// Where a flow was defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowSource {
    Builtin,
    Project,
}

impl fmt::Display for FlowSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin => write!(f, "built-in"),
            Self::Project => write!(f, "project"),
        }
    }
}

/// A compiled flow and its origin.
#[derive(Debug, Clone)]
pub struct RegisteredFlow {
    pub schema: Arc<FlowSchema>,
    pub source: FlowSource,
}

/// All flows available to a project.
#[derive(Debug, Clone, Default)]
pub struct FlowRegistry {
    flows: BTreeMap<String, RegisteredFlow>,
}

impl FlowRegistry {
    /// Registry with the built-in flows only.
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::default();
        registry.add_all(&load_builtin_flows()?, FlowSource::Builtin)?;
        Ok(registry)
    }

    /// Built-in flows overlaid with the project's flows.
    pub fn load(config: &WaypostConfig) -> Result<Self> {
        let mut registry = Self::builtin()?;
        registry.add_all(&config.flows, FlowSource::Project)?;
        Ok(registry)
    }

    fn add_all(&mut self, flows: &BTreeMap<String, FlowConfig>, source: FlowSource) -> Result<()> {
        for (name, config) in flows {
            let schema = compile_flow(name, config).map_err(|err| WaypostError::Schema {
                flow: name.clone(),
                source: err,
            })?;
            if self.flows.contains_key(name) {
                tracing::debug!("Project flow '{}' replaces the built-in flow", name);
            }
            self.flows.insert(
                name.clone(),
                RegisteredFlow {
                    schema: Arc::new(schema),
                    source,
                },
            );
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredFlow> {
        self.flows.get(name)
    }

    /// Look up a flow, failing with `UnknownFlow`.
    pub fn require(&self, name: &str) -> Result<&RegisteredFlow> {
        self.get(name).ok_or_else(|| WaypostError::UnknownFlow {
            name: name.to_string(),
        })
    }

    /// Flows sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RegisteredFlow)> {
        self.flows.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// Every side effect bound by any registered flow.
    pub fn effects(&self) -> BTreeSet<&str> {
        self.flows
            .values()
            .flat_map(|f| f.schema.effects().map(|(_, e)| e))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_compile() {
        let registry = FlowRegistry::builtin().unwrap();
        assert_eq!(registry.len(), 3);
        assert!(registry
            .iter()
            .all(|(_, f)| f.source == FlowSource::Builtin));
    }

    #[test]
    fn project_flow_replaces_builtin() {
        let config: WaypostConfig = serde_yaml::from_str(
            r#"
flows:
  password_reset:
    description: Simplified reset
    steps:
      - id: only
        next: $end
"#,
        )
        .unwrap();
        let registry = FlowRegistry::load(&config).unwrap();
        let flow = registry.get("password_reset").unwrap();
        assert_eq!(flow.source, FlowSource::Project);
        assert_eq!(flow.schema.steps().len(), 1);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn broken_project_flow_names_the_flow() {
        let config: WaypostConfig =
            serde_yaml::from_str("flows:\n  broken:\n    steps: []\n").unwrap();
        let err = FlowRegistry::load(&config).unwrap_err();
        assert!(matches!(err, WaypostError::Schema { ref flow, .. } if flow == "broken"));
    }

    #[test]
    fn require_reports_unknown_flow() {
        let registry = FlowRegistry::builtin().unwrap();
        assert!(matches!(
            registry.require("missing"),
            Err(WaypostError::UnknownFlow { .. })
        ));
    }

    #[test]
    fn effects_cover_builtin_flows() {
        let registry = FlowRegistry::builtin().unwrap();
        let effects = registry.effects();
        assert!(effects.contains("verify_code"));
        assert!(effects.contains("create_record"));
        assert!(effects.contains("submit_signature_request"));
    }
}
