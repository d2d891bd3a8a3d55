//! Presentation binding.
//!
//! The contract between a running [`Flow`] and whatever renders it. A
//! renderer reads a [`StepView`] after every change and sends back an
//! [`Action`]. Results are tagged with the flow id they were produced for;
//! a result for a flow that is no longer the active one is dropped.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::flow::{
    Flow, FlowError, FlowId, FlowStatus, InvalidState, RawInput, StepId, TerminalOutcome,
    Transition, ValidationError,
};

/// What a renderer sends back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Advance {
        #[serde(default, rename = "rawInput")]
        raw_input: RawInput,
    },
    Retreat,
    Cancel,
}

/// One field as the renderer should show it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldView {
    pub name: String,
    pub label: String,
    pub kind: &'static str,
    pub required: bool,
    pub secret: bool,
    /// Previously captured value, never set for secret fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// An inline error attached to the current step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorView {
    /// Field the error belongs to; `None` for side-effect failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepView {
    pub flow_id: String,
    pub current_step: StepId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<FieldView>,
    pub errors: Vec<ErrorView>,
    pub is_busy: bool,
    pub can_retreat: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished: Option<TerminalOutcome>,
    pub cancelled: bool,
}

impl StepView {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// What the renderer should do after an action.
#[derive(Debug, Clone, PartialEq)]
pub enum Reaction {
    /// State or errors changed; render the current view again.
    Render,
    /// The flow reached a terminal step.
    Finished(TerminalOutcome),
    /// The flow was abandoned.
    Cancelled,
    /// Stale or duplicate; nothing to do.
    Ignored,
    /// The action is not valid any more.
    Rejected(InvalidState),
}

/// Couples one active flow to a renderer.
#[derive(Debug)]
pub struct Binding {
    flow: Arc<Flow>,
    errors: Vec<ValidationError>,
}

impl Binding {
    pub fn new(flow: Arc<Flow>) -> Self {
        Self {
            flow,
            errors: Vec::new(),
        }
    }

    pub fn flow(&self) -> &Arc<Flow> {
        &self.flow
    }

    /// Switch to a new flow instance. Results for the old one become stale.
    pub fn replace(&mut self, flow: Arc<Flow>) {
        self.flow = flow;
        self.errors.clear();
    }

    /// Whether a result tagged with `flow_id` belongs to the active flow.
    pub fn is_current(&self, flow_id: &FlowId) -> bool {
        self.flow.id() == *flow_id
    }

    /// Build the view for the current state.
    pub fn view(&self) -> StepView {
        let state = self.flow.snapshot();
        let schema = self.flow.schema();
        let current = state.current_step().clone();
        let step = schema.step(current.as_str());

        let fields = step
            .map(|s| {
                s.fields
                    .iter()
                    .map(|f| FieldView {
                        name: f.name.clone(),
                        label: f.label.clone(),
                        kind: f.validator.kind(),
                        required: f.required,
                        secret: f.secret,
                        value: if f.secret {
                            None
                        } else {
                            state.captured().get(&f.name).cloned()
                        },
                        default: f.default.clone(),
                        options: f.validator.options().to_vec(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut errors: Vec<ErrorView> = self
            .errors
            .iter()
            .map(|e| ErrorView {
                field: Some(e.field.clone()),
                message: e.to_string(),
                code: None,
            })
            .collect();
        if let Some(err) = state.last_error() {
            errors.push(ErrorView {
                field: None,
                message: err.to_string(),
                code: Some(err.code().to_string()),
            });
        }

        let is_busy = self.flow.is_busy();
        let (finished, cancelled) = match state.status() {
            FlowStatus::Active => (None, false),
            FlowStatus::Finished(outcome) => (Some(outcome), false),
            FlowStatus::Cancelled => (None, true),
        };

        StepView {
            flow_id: state.id().to_string(),
            title: step
                .map(|s| s.display_title().to_string())
                .unwrap_or_else(|| current.to_string()),
            description: step.and_then(|s| s.description.clone()),
            current_step: current,
            fields,
            errors,
            is_busy,
            can_retreat: state.is_active() && !is_busy && !state.history().is_empty(),
            finished,
            cancelled,
        }
    }

    /// Run an action against the active flow and apply its result.
    pub async fn perform(&mut self, action: Action) -> Reaction {
        let flow = Arc::clone(&self.flow);
        let flow_id = flow.id();
        let result = match action {
            Action::Advance { raw_input } => flow.advance(raw_input).await.map(Some),
            Action::Retreat => flow.retreat().map(|_| None),
            Action::Cancel => {
                flow.cancel();
                return if self.is_current(&flow_id) {
                    self.errors.clear();
                    Reaction::Cancelled
                } else {
                    Reaction::Ignored
                };
            }
        };
        self.apply(&flow_id, result)
    }

    /// Apply a result produced for `flow_id`.
    ///
    /// Results for any flow other than the active one are ignored.
    pub fn apply(
        &mut self,
        flow_id: &FlowId,
        result: Result<Option<Transition>, FlowError>,
    ) -> Reaction {
        if !self.is_current(flow_id) {
            tracing::debug!("Ignoring stale result for flow {}", flow_id);
            return Reaction::Ignored;
        }

        match result {
            Ok(transition) => {
                self.errors.clear();
                match transition.and_then(|t| t.finished) {
                    Some(outcome) => Reaction::Finished(outcome),
                    None => Reaction::Render,
                }
            }
            Err(FlowError::Validation(errors)) => {
                self.errors = errors;
                Reaction::Render
            }
            Err(FlowError::External(_)) => {
                self.errors.clear();
                Reaction::Render
            }
            Err(FlowError::Busy) => Reaction::Ignored,
            Err(FlowError::InvalidState(InvalidState::Cancelled)) => Reaction::Cancelled,
            Err(FlowError::InvalidState(state)) => Reaction::Rejected(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{DemoBackend, Dispatcher};
    use crate::flow::{FieldSpec, FlowSchema, StepDefinition, Target};
    use serde_json::json;

    fn flow() -> Arc<Flow> {
        let schema = FlowSchema::builder("signup")
            .step(
                StepDefinition::new("account")
                    .title("Your account")
                    .field(FieldSpec::email("email").with_label("Email"))
                    .field(FieldSpec::text("password").secret())
                    .then("plan"),
            )
            .step(
                StepDefinition::new("plan")
                    .field(FieldSpec::choice("plan", ["free", "pro"]))
                    .effect("create_record")
                    .next(Target::End),
            )
            .build()
            .unwrap();
        let dispatcher =
            Dispatcher::new().register("create_record", Arc::new(DemoBackend::default()));
        Arc::new(Flow::start(Arc::new(schema), Arc::new(dispatcher)).unwrap())
    }

    fn advance(pairs: &[(&str, Value)]) -> Action {
        Action::Advance {
            raw_input: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    #[test]
    fn initial_view() {
        let binding = Binding::new(flow());
        let view = binding.view();
        assert_eq!(view.current_step, "account");
        assert_eq!(view.title, "Your account");
        assert_eq!(view.fields.len(), 2);
        assert_eq!(view.fields[0].kind, "email");
        assert!(!view.can_retreat);
        assert!(!view.is_busy);
        assert!(!view.has_errors());
    }

    #[tokio::test]
    async fn validation_errors_show_inline_and_clear() {
        let mut binding = Binding::new(flow());
        let reaction = binding.perform(advance(&[("email", json!("bad"))])).await;
        assert_eq!(reaction, Reaction::Render);
        let view = binding.view();
        assert_eq!(view.errors.len(), 2);
        assert_eq!(view.errors[0].field.as_deref(), Some("email"));

        binding
            .perform(advance(&[
                ("email", json!("a@b.org")),
                ("password", json!("hunter2")),
            ]))
            .await;
        let view = binding.view();
        assert!(!view.has_errors());
        assert_eq!(view.current_step, "plan");
        assert_eq!(view.fields[0].options, vec!["free", "pro"]);
        assert!(view.can_retreat);
    }

    #[tokio::test]
    async fn secret_values_are_not_echoed() {
        let mut binding = Binding::new(flow());
        binding
            .perform(advance(&[
                ("email", json!("a@b.org")),
                ("password", json!("hunter2")),
            ]))
            .await;
        binding.perform(Action::Retreat).await;
        let view = binding.view();
        assert_eq!(view.fields[0].value, Some(json!("a@b.org")));
        assert_eq!(view.fields[1].value, None);
    }

    #[tokio::test]
    async fn finishing_reports_outcome() {
        let mut binding = Binding::new(flow());
        binding
            .perform(advance(&[
                ("email", json!("a@b.org")),
                ("password", json!("pw")),
            ]))
            .await;
        let reaction = binding.perform(advance(&[("plan", json!("pro"))])).await;
        assert_eq!(reaction, Reaction::Finished(TerminalOutcome::Completed));
        assert_eq!(
            binding.perform(advance(&[])).await,
            Reaction::Rejected(InvalidState::Finished)
        );
    }

    #[tokio::test]
    async fn stale_results_are_ignored() {
        let mut binding = Binding::new(flow());
        let old_id = binding.flow().id();
        binding.perform(Action::Cancel).await;
        binding.replace(flow());

        let reaction = binding.apply(&old_id, Err(FlowError::Validation(Vec::new())));
        assert_eq!(reaction, Reaction::Ignored);
        assert!(!binding.is_current(&old_id));
    }

    #[test]
    fn action_deserializes_from_json() {
        let action: Action =
            serde_json::from_str(r#"{"action":"advance","rawInput":{"email":"a@b.org"}}"#)
                .unwrap();
        assert!(matches!(action, Action::Advance { ref raw_input } if raw_input.len() == 1));
        let back: Action = serde_json::from_str(r#"{"action":"retreat"}"#).unwrap();
        assert_eq!(back, Action::Retreat);
    }

    #[test]
    fn view_serializes_camel_case() {
        let value = serde_json::to_value(Binding::new(flow()).view()).unwrap();
        assert_eq!(value["currentStep"], json!("account"));
        assert_eq!(value["isBusy"], json!(false));
    }
}
