//! Configuration schema definitions for Waypost.
//!
//! This module contains all the struct definitions that map to
//! the YAML configuration file format.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::flow::{Condition, TerminalOutcome};

/// Root configuration structure for `.waypost/config.yml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WaypostConfig {
    /// Application name (for display purposes)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,

    /// Global settings
    pub settings: Settings,

    /// Project flow definitions, keyed by flow name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub flows: BTreeMap<String, FlowConfig>,
}

/// Global settings that apply to every flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Settings {
    /// Default output mode: verbose, quiet, silent
    pub default_output: OutputMode,

    /// Seconds to wait for a side effect before giving up
    pub dispatch_timeout: u64,

    /// Attempts per step before an interactive run gives up
    pub max_attempts: u32,

    /// Where side effects are sent
    pub backend: BackendConfig,

    /// Placeholder answers used by the demo backend
    pub demo: DemoSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_output: OutputMode::default(),
            dispatch_timeout: default_dispatch_timeout(),
            max_attempts: default_max_attempts(),
            backend: BackendConfig::default(),
            demo: DemoSettings::default(),
        }
    }
}

fn default_dispatch_timeout() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_http_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn is_true(v: &bool) -> bool {
    *v
}

fn is_false(v: &bool) -> bool {
    !v
}

/// Output verbosity mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Verbose,
    #[default]
    Normal,
    Quiet,
    Silent,
}

/// Backend that performs side effects
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    /// In-process stand-in, for demos and local testing
    #[default]
    Demo,

    /// A remote service reached over HTTP
    Http {
        /// Base URL; effects are posted to `<url>/<effect>`
        url: String,

        /// Client timeout in seconds
        #[serde(default = "default_http_timeout")]
        timeout: u64,

        /// Environment variable holding a bearer token
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token_env: Option<String>,
    },
}

/// Demo backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DemoSettings {
    /// Verification code the demo backend accepts
    pub verification_code: String,

    /// Security answer the demo backend accepts (case-insensitive)
    pub security_answer: String,

    /// Simulated latency per call, in milliseconds
    pub latency_ms: u64,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            verification_code: crate::dispatch::demo::DEFAULT_VERIFICATION_CODE.to_string(),
            security_answer: crate::dispatch::demo::DEFAULT_SECURITY_ANSWER.to_string(),
            latency_ms: 0,
        }
    }
}

/// A flow definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct FlowConfig {
    /// Shown by `waypost list`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Entry step id (defaults to the first step)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,

    /// Steps in declaration order
    pub steps: Vec<StepConfig>,
}

/// A single step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct StepConfig {
    /// Unique step id (`$end` is reserved)
    pub id: String,

    /// Step title (for display)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Step description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Input fields
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldConfig>,

    /// Side effect dispatched when the step is submitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,

    /// Default next step, or `$end`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,

    /// Conditional transitions, first match wins
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<BranchConfig>,

    /// Marks the step as terminal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal: Option<TerminalOutcome>,
}

/// An input field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldConfig {
    /// Key in captured data
    pub name: String,

    /// Prompt label (defaults to the name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Input kind
    #[serde(rename = "type", default)]
    pub kind: FieldType,

    /// Whether a value must be supplied
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub required: bool,

    /// Hide the value when prompting and reporting
    #[serde(default, skip_serializing_if = "is_false")]
    pub secret: bool,

    /// Value offered when prompting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// Minimum length for text fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    /// Exact length for digits fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,

    /// Allowed values for choice fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,

    /// Regular expression for pattern fields (matched against the whole value)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl FieldConfig {
    /// A required text field with nothing else set.
    pub fn new(name: impl Into<String>, kind: FieldType) -> Self {
        Self {
            name: name.into(),
            label: None,
            kind,
            required: true,
            secret: false,
            default: None,
            min_length: None,
            length: None,
            options: Vec::new(),
            pattern: None,
        }
    }
}

/// Field input kinds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Email,
    Digits,
    Choice,
    Pattern,
    Boolean,
}

/// A conditional transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BranchConfig {
    /// Condition over captured data and the side-effect outcome
    pub when: Condition,

    /// Target step id, or `$end`
    pub to: String,
}
