//! Flow instance identity and state.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::error::ExternalError;

/// Reserved target that finishes a flow without a named terminal step.
pub const END_MARKER: &str = "$end";

/// Identifier of a step within a flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(String);

impl StepId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The step a flow sits on after following the terminal marker.
    pub fn end() -> Self {
        Self(END_MARKER.to_string())
    }

    pub fn is_end(&self) -> bool {
        self.0 == END_MARKER
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StepId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StepId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for StepId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for StepId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for StepId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

static FLOW_SEQ: AtomicU64 = AtomicU64::new(0);

/// A unique flow-instance identifier.
///
/// Format: `flow_{timestamp_ms}_{hex}`. Results tagged with a stale id are
/// dropped by the presentation binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlowId {
    started: DateTime<Utc>,
    suffix: [u8; 6],
}

impl FlowId {
    /// Generate a new flow id.
    pub fn new() -> Self {
        let now = Utc::now();
        let started = DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now);

        let mut hasher = Sha256::new();
        hasher.update(now.timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
        hasher.update(FLOW_SEQ.fetch_add(1, Ordering::Relaxed).to_le_bytes());
        hasher.update(std::process::id().to_le_bytes());
        let digest = hasher.finalize();

        let mut suffix = [0u8; 6];
        suffix.copy_from_slice(&digest[..6]);

        Self { started, suffix }
    }

    /// When the flow was started.
    pub fn started(&self) -> DateTime<Utc> {
        self.started
    }
}

impl Default for FlowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "flow_{}_{}",
            self.started.timestamp_millis(),
            hex::encode(self.suffix)
        )
    }
}

/// Field values accumulated across steps.
pub type CapturedData = BTreeMap<String, Value>;

/// How a finished flow ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TerminalOutcome {
    /// The happy path.
    Completed,
    /// An alternate terminal branch (e.g. "contact an administrator").
    Failed,
}

/// Lifecycle of a flow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStatus {
    Active,
    Finished(TerminalOutcome),
    Cancelled,
}

/// State of one in-progress wizard.
///
/// Only the transition engine mutates it; everything else reads a clone.
#[derive(Debug, Clone)]
pub struct FlowState {
    id: FlowId,
    current: StepId,
    history: Vec<StepId>,
    captured: CapturedData,
    last_error: Option<ExternalError>,
    status: FlowStatus,
}

impl FlowState {
    pub(crate) fn new(entry: StepId) -> Self {
        Self {
            id: FlowId::new(),
            current: entry,
            history: Vec::new(),
            captured: CapturedData::new(),
            last_error: None,
            status: FlowStatus::Active,
        }
    }

    pub fn id(&self) -> &FlowId {
        &self.id
    }

    pub fn current_step(&self) -> &StepId {
        &self.current
    }

    /// Steps visited before the current one, oldest first.
    pub fn history(&self) -> &[StepId] {
        &self.history
    }

    pub fn captured(&self) -> &CapturedData {
        &self.captured
    }

    pub fn last_error(&self) -> Option<&ExternalError> {
        self.last_error.as_ref()
    }

    pub fn status(&self) -> FlowStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == FlowStatus::Active
    }

    /// Captured data with the named fields masked.
    pub fn redacted<'a>(&self, secret_fields: impl IntoIterator<Item = &'a str>) -> CapturedData {
        let mut data = self.captured.clone();
        for name in secret_fields {
            if let Some(v) = data.get_mut(name) {
                *v = Value::String("[REDACTED]".to_string());
            }
        }
        data
    }

    pub(crate) fn move_to(&mut self, target: StepId, captured: CapturedData) {
        let previous = std::mem::replace(&mut self.current, target);
        self.history.push(previous);
        self.captured = captured;
        self.last_error = None;
    }

    /// Pop one history entry. Returns false when already at the entry step.
    pub(crate) fn step_back(&mut self) -> bool {
        match self.history.pop() {
            Some(previous) => {
                self.current = previous;
                self.last_error = None;
                true
            }
            None => false,
        }
    }

    pub(crate) fn record_failure(&mut self, captured: CapturedData, error: ExternalError) {
        self.captured = captured;
        self.last_error = Some(error);
    }

    pub(crate) fn finish(&mut self, outcome: TerminalOutcome) {
        self.status = FlowStatus::Finished(outcome);
    }

    pub(crate) fn cancel(&mut self) {
        if self.status == FlowStatus::Active {
            self.status = FlowStatus::Cancelled;
        }
    }
}
