//! Declarative branching.
//!
//! Branch rules are data: a [`Condition`] over captured data and the
//! side-effect outcome, plus a target. Rules are evaluated in declaration
//! order and the first match wins.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::state::{CapturedData, StepId, END_MARKER};

/// Where a transition leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A declared step.
    Step(StepId),
    /// The reserved terminal marker.
    End,
}

impl Target {
    /// Parse a target as written in configuration; `$end` is the terminal marker.
    pub fn parse(s: &str) -> Self {
        if s == END_MARKER {
            Self::End
        } else {
            Self::Step(StepId::new(s))
        }
    }

    pub fn step(id: impl Into<StepId>) -> Self {
        Self::Step(id.into())
    }

    /// The step id a flow sits on after following this target.
    pub fn as_step_id(&self) -> StepId {
        match self {
            Self::Step(id) => id.clone(),
            Self::End => StepId::end(),
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Step(id) => write!(f, "{}", id),
            Self::End => f.write_str(END_MARKER),
        }
    }
}

/// Successful result of a side effect.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    /// Structured payload returned by the backend.
    pub payload: serde_json::Map<String, Value>,
}

/// A predicate used by branch rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Captured field equals a value exactly.
    Equals {
        /// Field name
        field: String,
        /// Expected value
        value: Value,
    },

    /// Captured string field equals a value, ignoring case and surrounding whitespace.
    EqualsIgnoreCase {
        /// Field name
        field: String,
        /// Expected text
        value: String,
    },

    /// Captured field is present and not blank.
    Present {
        /// Field name
        field: String,
    },

    /// Side-effect payload key equals a value.
    PayloadEquals {
        /// Payload key
        key: String,
        /// Expected value
        value: Value,
    },

    /// All nested conditions hold.
    All {
        /// Conditions that must all hold
        conditions: Vec<Condition>,
    },

    /// At least one nested condition holds.
    Any {
        /// Conditions where at least one must hold
        conditions: Vec<Condition>,
    },

    /// The nested condition does not hold.
    Not {
        /// Condition to negate
        condition: Box<Condition>,
    },
}

impl Condition {
    /// Evaluate against captured data and an optional side-effect outcome.
    pub fn holds(&self, captured: &CapturedData, outcome: Option<&Outcome>) -> bool {
        match self {
            Self::Equals { field, value } => captured.get(field) == Some(value),
            Self::EqualsIgnoreCase { field, value } => captured
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| s.trim().to_lowercase() == value.trim().to_lowercase()),
            Self::Present { field } => captured
                .get(field)
                .is_some_and(|v| !super::field::is_blank(v)),
            Self::PayloadEquals { key, value } => {
                outcome.and_then(|o| o.payload.get(key)) == Some(value)
            }
            Self::All { conditions } => conditions.iter().all(|c| c.holds(captured, outcome)),
            Self::Any { conditions } => conditions.iter().any(|c| c.holds(captured, outcome)),
            Self::Not { condition } => !condition.holds(captured, outcome),
        }
    }

    /// Field names this condition reads, for registration-time checks.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::Equals { field, .. }
            | Self::EqualsIgnoreCase { field, .. }
            | Self::Present { field } => vec![field.as_str()],
            Self::PayloadEquals { .. } => Vec::new(),
            Self::All { conditions } | Self::Any { conditions } => {
                conditions.iter().flat_map(|c| c.fields()).collect()
            }
            Self::Not { condition } => condition.fields(),
        }
    }

    /// Whether the condition reads a side-effect outcome anywhere.
    pub fn reads_outcome(&self) -> bool {
        match self {
            Self::PayloadEquals { .. } => true,
            Self::All { conditions } | Self::Any { conditions } => {
                conditions.iter().any(Condition::reads_outcome)
            }
            Self::Not { condition } => condition.reads_outcome(),
            _ => false,
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let join = |conditions: &[Condition], sep: &str| {
            conditions
                .iter()
                .map(|c| format!("({})", c))
                .collect::<Vec<_>>()
                .join(sep)
        };
        match self {
            Self::Equals { field, value } => write!(f, "{} == {}", field, value),
            Self::EqualsIgnoreCase { field, value } => write!(f, "{} ~= {:?}", field, value),
            Self::Present { field } => write!(f, "{} is present", field),
            Self::PayloadEquals { key, value } => write!(f, "payload.{} == {}", key, value),
            Self::All { conditions } => f.write_str(&join(conditions, " and ")),
            Self::Any { conditions } => f.write_str(&join(conditions, " or ")),
            Self::Not { condition } => write!(f, "not ({})", condition),
        }
    }
}

/// A conditional deviation from a step's default `next`.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchRule {
    pub condition: Condition,
    pub target: Target,
}

impl BranchRule {
    pub fn new(condition: Condition, target: Target) -> Self {
        Self { condition, target }
    }
}

/// Pick the first matching rule's target, or the fallback.
pub fn resolve<'a>(
    rules: &'a [BranchRule],
    fallback: &'a Target,
    captured: &CapturedData,
    outcome: Option<&Outcome>,
) -> &'a Target {
    rules
        .iter()
        .find(|r| r.condition.holds(captured, outcome))
        .map(|r| &r.target)
        .unwrap_or(fallback)
}
