//! Error taxonomy for the flow engine.
//!
//! - [`SchemaError`] is raised while a flow is registered and is always fatal.
//! - [`ValidationError`] describes one invalid field and stays with the step.
//! - [`ExternalError`] comes back from a side effect; the flow stays put.
//! - [`FlowError`] is what `advance`/`retreat` return to the caller.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Misconfiguration detected when a flow is registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The flow declares no steps.
    #[error("flow declares no steps")]
    Empty,

    /// Two steps share an id.
    #[error("step '{step}' is declared more than once")]
    DuplicateStep { step: String },

    /// A step uses the reserved terminal marker as its id.
    #[error("step id '{step}' is reserved")]
    ReservedStepId { step: String },

    /// The entry step is not declared.
    #[error("entry step '{step}' is not declared")]
    UnknownEntry { step: String },

    /// The entry step is terminal, so the flow could never be advanced.
    #[error("entry step '{step}' is terminal")]
    TerminalEntry { step: String },

    /// A `next` or branch target does not resolve.
    #[error("step '{step}' targets '{target}' which is not declared")]
    UnknownTarget { step: String, target: String },

    /// A non-terminal step has no default transition.
    #[error("step '{step}' has no default 'next'")]
    MissingNext { step: String },

    /// A terminal step declares fields, transitions or a side effect.
    #[error("terminal step '{step}' must not declare {what}")]
    TerminalWithTransitions { step: String, what: &'static str },

    /// Two fields in the same step share a name.
    #[error("step '{step}' declares field '{field}' more than once")]
    DuplicateField { step: String, field: String },

    /// A branch condition reads a field no step declares.
    #[error("step '{step}' branches on unknown field '{field}'")]
    UnknownField { step: String, field: String },

    /// A branch condition reads a side-effect outcome on a step without one.
    #[error("step '{step}' branches on an outcome but binds no side effect")]
    OutcomeWithoutEffect { step: String },

    /// A field declaration cannot be turned into a validator.
    #[error("step '{step}' field '{field}': {message}")]
    InvalidField {
        step: String,
        field: String,
        message: String,
    },

    /// A step binds a side effect the dispatcher cannot serve.
    #[error("step '{step}' binds side effect '{effect}' which has no backend")]
    UnboundEffect { step: String, effect: String },
}

impl SchemaError {
    /// Stable rule identifier, used when linting configuration.
    pub fn rule(&self) -> &'static str {
        match self {
            Self::Empty => "empty-flow",
            Self::DuplicateStep { .. } => "duplicate-step",
            Self::ReservedStepId { .. } => "reserved-step-id",
            Self::UnknownEntry { .. } => "unknown-entry",
            Self::TerminalEntry { .. } => "terminal-entry",
            Self::UnknownTarget { .. } => "unknown-target",
            Self::MissingNext { .. } => "missing-next",
            Self::TerminalWithTransitions { .. } => "terminal-with-transitions",
            Self::DuplicateField { .. } => "duplicate-field",
            Self::UnknownField { .. } => "unknown-field",
            Self::OutcomeWithoutEffect { .. } => "outcome-without-effect",
            Self::InvalidField { .. } => "invalid-field",
            Self::UnboundEffect { .. } => "unbound-effect",
        }
    }

    /// The step the error is attached to, if any.
    pub fn step(&self) -> Option<&str> {
        match self {
            Self::Empty => None,
            Self::DuplicateStep { step }
            | Self::ReservedStepId { step }
            | Self::UnknownEntry { step }
            | Self::TerminalEntry { step }
            | Self::UnknownTarget { step, .. }
            | Self::MissingNext { step }
            | Self::TerminalWithTransitions { step, .. }
            | Self::DuplicateField { step, .. }
            | Self::UnknownField { step, .. }
            | Self::OutcomeWithoutEffect { step }
            | Self::InvalidField { step, .. }
            | Self::UnboundEffect { step, .. } => Some(step),
        }
    }
}

/// Why a single field was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldErrorKind {
    /// Required and missing (or blank).
    Required,
    /// Shorter than the declared minimum.
    TooShort { min: usize },
    /// Not exactly the declared length.
    WrongLength { expected: usize },
    /// Not one of the declared options.
    NotAllowed { allowed: Vec<String> },
    /// Failed a format check; `expected` names the format.
    Invalid { expected: String },
}

impl fmt::Display for FieldErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "is required"),
            Self::TooShort { min } => write!(f, "must be at least {} characters", min),
            Self::WrongLength { expected } => write!(f, "must be exactly {} characters", expected),
            Self::NotAllowed { allowed } => write!(f, "must be one of: {}", allowed.join(", ")),
            Self::Invalid { expected } => write!(f, "must be {}", expected),
        }
    }
}

/// One invalid field, as surfaced to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} {kind}")]
pub struct ValidationError {
    /// Field name.
    pub field: String,
    /// What went wrong.
    pub kind: FieldErrorKind,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, kind: FieldErrorKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }
}

/// Failure reported by (or on the way to) the backend collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExternalError {
    /// The backend answered and refused the request.
    #[error("rejected ({code}){}", .message.as_deref().map(|m| format!(": {}", m)).unwrap_or_default())]
    Rejected {
        code: String,
        message: Option<String>,
    },

    /// No answer within the dispatch deadline.
    #[error("timed out after {}s", .after.as_secs_f64())]
    Timeout { after: Duration },

    /// The request never completed (connection, protocol, decoding).
    #[error("network error: {message}")]
    Network { message: String },
}

impl ExternalError {
    /// Short machine-readable code for display and branching.
    pub fn code(&self) -> &str {
        match self {
            Self::Rejected { code, .. } => code,
            Self::Timeout { .. } => "timeout",
            Self::Network { .. } => "network",
        }
    }
}

/// Why an `advance` or `retreat` did not happen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// One or more fields failed validation; the state is unchanged.
    #[error("{} field(s) failed validation", .0.len())]
    Validation(Vec<ValidationError>),

    /// The side effect failed; the error is also kept as `last_error`.
    #[error("side effect failed: {0}")]
    External(ExternalError),

    /// A dispatch is already in flight for this flow.
    #[error("flow is busy")]
    Busy,

    /// The operation is not valid in the flow's current status.
    #[error("invalid state: {0}")]
    InvalidState(InvalidState),
}

/// Detail for [`FlowError::InvalidState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidState {
    /// The flow already reached a terminal step.
    Finished,
    /// The flow was cancelled.
    Cancelled,
}

impl fmt::Display for InvalidState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finished => write!(f, "flow already finished"),
            Self::Cancelled => write!(f, "flow was cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_displays_step_and_target() {
        let err = SchemaError::UnknownTarget {
            step: "email".into(),
            target: "nowhere".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("email"));
        assert!(msg.contains("nowhere"));
        assert_eq!(err.rule(), "unknown-target");
        assert_eq!(err.step(), Some("email"));
    }

    #[test]
    fn empty_flow_has_no_step() {
        assert_eq!(SchemaError::Empty.step(), None);
        assert_eq!(SchemaError::Empty.rule(), "empty-flow");
    }

    #[test]
    fn validation_error_reads_naturally() {
        let err = ValidationError::new("email", FieldErrorKind::Required);
        assert_eq!(err.to_string(), "email is required");

        let err = ValidationError::new(
            "format",
            FieldErrorKind::NotAllowed {
                allowed: vec!["online".into(), "in_person".into()],
            },
        );
        assert_eq!(err.to_string(), "format must be one of: online, in_person");
    }

    #[test]
    fn rejected_error_includes_message_when_present() {
        let err = ExternalError::Rejected {
            code: "invalid_code".into(),
            message: Some("code does not match".into()),
        };
        assert_eq!(err.to_string(), "rejected (invalid_code): code does not match");
        assert_eq!(err.code(), "invalid_code");

        let bare = ExternalError::Rejected {
            code: "invalid_code".into(),
            message: None,
        };
        assert_eq!(bare.to_string(), "rejected (invalid_code)");
    }

    #[test]
    fn timeout_and_network_codes() {
        let timeout = ExternalError::Timeout {
            after: Duration::from_secs(30),
        };
        assert_eq!(timeout.code(), "timeout");
        assert!(timeout.to_string().contains("30"));

        let network = ExternalError::Network {
            message: "connection refused".into(),
        };
        assert_eq!(network.code(), "network");
        assert!(network.to_string().contains("connection refused"));
    }

    #[test]
    fn flow_error_counts_validation_failures() {
        let err = FlowError::Validation(vec![
            ValidationError::new("a", FieldErrorKind::Required),
            ValidationError::new("b", FieldErrorKind::Required),
        ]);
        assert_eq!(err.to_string(), "2 field(s) failed validation");
        assert_eq!(
            FlowError::InvalidState(InvalidState::Finished).to_string(),
            "invalid state: flow already finished"
        );
    }
}
