//! The transition engine.
//!
//! A [`Flow`] is one running instance of a [`FlowSchema`]. It owns the
//! [`FlowState`] and is the only thing that mutates it. Operations are
//! serialized by a busy flag: while a side effect is in flight, `advance`
//! and `retreat` fail fast with [`FlowError::Busy`]. The state lock is never
//! held across the dispatch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::branch::{resolve, Outcome, Target};
use super::error::{FlowError, InvalidState, SchemaError};
use super::schema::FlowSchema;
use super::state::{FlowId, FlowState, FlowStatus, StepId, TerminalOutcome};
use super::validator::{validate, RawInput};
use crate::dispatch::Dispatcher;

/// Result of a successful `advance`.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub flow_id: FlowId,
    pub from: StepId,
    pub to: StepId,
    /// Set when the transition reached a terminal step or the end marker.
    pub finished: Option<TerminalOutcome>,
    /// Outcome of the step's side effect, if it has one.
    pub outcome: Option<Outcome>,
}

/// A running flow instance.
pub struct Flow {
    schema: Arc<FlowSchema>,
    dispatcher: Arc<Dispatcher>,
    state: Mutex<FlowState>,
    busy: AtomicBool,
}

impl std::fmt::Debug for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flow")
            .field("schema", &self.schema.name())
            .field("state", &*self.lock())
            .field("busy", &self.is_busy())
            .finish()
    }
}

/// Clears the busy flag when dropped, including on early return.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn invalid_state(status: FlowStatus) -> InvalidState {
    match status {
        FlowStatus::Cancelled => InvalidState::Cancelled,
        _ => InvalidState::Finished,
    }
}

impl Flow {
    /// Start a flow on the schema's entry step.
    ///
    /// # Errors
    ///
    /// [`SchemaError::UnboundEffect`] if a step binds a side effect the
    /// dispatcher has no backend for.
    pub fn start(schema: Arc<FlowSchema>, dispatcher: Arc<Dispatcher>) -> Result<Self, SchemaError> {
        if let Some((step, effect)) = schema.effects().find(|(_, e)| !dispatcher.has(e)) {
            return Err(SchemaError::UnboundEffect {
                step: step.to_string(),
                effect: effect.to_string(),
            });
        }

        let state = FlowState::new(schema.entry().clone());
        tracing::info!(
            "Started flow '{}' ({}) at step '{}'",
            schema.name(),
            state.id(),
            state.current_step()
        );

        Ok(Self {
            schema,
            dispatcher,
            state: Mutex::new(state),
            busy: AtomicBool::new(false),
        })
    }

    fn lock(&self) -> MutexGuard<'_, FlowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn schema(&self) -> &FlowSchema {
        &self.schema
    }

    pub fn id(&self) -> FlowId {
        self.lock().id().clone()
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> FlowState {
        self.lock().clone()
    }

    pub fn current_step(&self) -> StepId {
        self.lock().current_step().clone()
    }

    pub fn status(&self) -> FlowStatus {
        self.lock().status()
    }

    /// Whether a side effect is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Submit input for the current step.
    ///
    /// Validates, dispatches the step's side effect if it has one, resolves
    /// the next step and moves there. Nothing changes on validation failure.
    /// On side-effect failure the flow stays put, keeps the submitted values
    /// and records the error as `last_error`.
    ///
    /// # Errors
    ///
    /// - [`FlowError::Busy`] if another advance is dispatching.
    /// - [`FlowError::InvalidState`] if the flow is finished or cancelled.
    /// - [`FlowError::Validation`] with every invalid field.
    /// - [`FlowError::External`] if the side effect failed.
    pub async fn advance(&self, raw: RawInput) -> Result<Transition, FlowError> {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            tracing::warn!("Ignoring advance on busy flow '{}'", self.schema.name());
            return Err(FlowError::Busy);
        };

        let (flow_id, from, merged) = {
            let state = self.lock();
            if !state.is_active() {
                tracing::error!(
                    "advance called on flow {} with status {:?}",
                    state.id(),
                    state.status()
                );
                return Err(FlowError::InvalidState(invalid_state(state.status())));
            }

            let from = state.current_step().clone();
            let step = self
                .schema
                .step(from.as_str())
                .ok_or(FlowError::InvalidState(InvalidState::Finished))?;

            let validated = validate(step, &raw).map_err(FlowError::Validation)?;
            let mut merged = state.captured().clone();
            merged.extend(validated);
            (state.id().clone(), from, merged)
        };

        let step = self
            .schema
            .step(from.as_str())
            .ok_or(FlowError::InvalidState(InvalidState::Finished))?;

        let outcome = match &step.effect {
            Some(effect) => match self.dispatcher.dispatch(effect, &from, &merged).await {
                Ok(outcome) => Some(outcome),
                Err(err) => {
                    let mut state = self.lock();
                    if !state.is_active() {
                        return Err(FlowError::InvalidState(invalid_state(state.status())));
                    }
                    tracing::warn!("Step '{}' side effect '{}' failed: {}", from, effect, err);
                    state.record_failure(merged, err.clone());
                    return Err(FlowError::External(err));
                }
            },
            None => None,
        };

        // Registration guarantees non-terminal steps have a default.
        let fallback = step.next.clone().unwrap_or(Target::End);
        let target = resolve(&step.branches, &fallback, &merged, outcome.as_ref()).clone();

        let finished = match &target {
            Target::End => Some(TerminalOutcome::Completed),
            Target::Step(id) => self.schema.step(id.as_str()).and_then(|s| s.terminal),
        };

        let mut state = self.lock();
        if !state.is_active() {
            tracing::debug!("Dropping result for step '{}': flow no longer active", from);
            return Err(FlowError::InvalidState(invalid_state(state.status())));
        }

        let to = target.as_step_id();
        state.move_to(to.clone(), merged);
        tracing::debug!("Flow {} moved '{}' -> '{}'", flow_id, from, to);

        if let Some(result) = finished {
            state.finish(result);
            tracing::info!(
                "Flow '{}' ({}) finished at '{}': {:?}",
                self.schema.name(),
                flow_id,
                to,
                result
            );
        }

        Ok(Transition {
            flow_id,
            from,
            to,
            finished,
            outcome,
        })
    }

    /// Go back one step. A no-op on the entry step.
    ///
    /// Never validates and never dispatches. Clears `last_error`.
    ///
    /// # Errors
    ///
    /// [`FlowError::Busy`] while dispatching, [`FlowError::InvalidState`]
    /// once the flow is finished or cancelled.
    pub fn retreat(&self) -> Result<StepId, FlowError> {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            return Err(FlowError::Busy);
        };
        let mut state = self.lock();
        if !state.is_active() {
            tracing::error!("retreat called on flow {} with status {:?}", state.id(), state.status());
            return Err(FlowError::InvalidState(invalid_state(state.status())));
        }
        if state.step_back() {
            tracing::debug!("Flow {} retreated to '{}'", state.id(), state.current_step());
        }
        Ok(state.current_step().clone())
    }

    /// Abandon the flow. A pending dispatch will not be applied.
    pub fn cancel(&self) {
        let mut state = self.lock();
        if state.is_active() {
            state.cancel();
            tracing::info!("Flow '{}' ({}) cancelled", self.schema.name(), state.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DemoBackend;
    use crate::flow::{FieldSpec, StepDefinition};
    use serde_json::json;

    fn schema() -> Arc<FlowSchema> {
        Arc::new(
            FlowSchema::builder("greeting")
                .step(
                    StepDefinition::new("name")
                        .field(FieldSpec::text("name"))
                        .then("confirm"),
                )
                .step(
                    StepDefinition::new("confirm")
                        .field(FieldSpec::new("ok", crate::flow::Validator::Boolean))
                        .effect("create_record")
                        .then("done"),
                )
                .step(StepDefinition::terminal("done", TerminalOutcome::Completed))
                .build()
                .unwrap(),
        )
    }

    fn dispatcher() -> Arc<Dispatcher> {
        Arc::new(Dispatcher::new().register("create_record", Arc::new(DemoBackend::default())))
    }

    fn input(pairs: &[(&str, serde_json::Value)]) -> RawInput {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn start_rejects_unbound_effect() {
        let err = Flow::start(schema(), Arc::new(Dispatcher::new())).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnboundEffect {
                step: "confirm".into(),
                effect: "create_record".into()
            }
        );
    }

    #[tokio::test]
    async fn advances_to_terminal() {
        let flow = Flow::start(schema(), dispatcher()).unwrap();
        let t = flow.advance(input(&[("name", json!("Ada"))])).await.unwrap();
        assert_eq!(t.from, "name");
        assert_eq!(t.to, "confirm");
        assert!(t.finished.is_none());

        let t = flow.advance(input(&[("ok", json!("yes"))])).await.unwrap();
        assert_eq!(t.to, "done");
        assert_eq!(t.finished, Some(TerminalOutcome::Completed));
        assert!(t.outcome.unwrap().payload.contains_key("recordId"));
        assert_eq!(flow.status(), FlowStatus::Finished(TerminalOutcome::Completed));
        assert!(!flow.is_busy());
    }

    #[tokio::test]
    async fn invalid_input_leaves_state_untouched() {
        let flow = Flow::start(schema(), dispatcher()).unwrap();
        let before = flow.snapshot();
        let err = flow.advance(RawInput::new()).await.unwrap_err();
        assert!(matches!(err, FlowError::Validation(ref errs) if errs.len() == 1));
        let after = flow.snapshot();
        assert_eq!(after.current_step(), before.current_step());
        assert_eq!(after.captured(), before.captured());
        assert!(after.history().is_empty());
    }

    #[tokio::test]
    async fn retreat_keeps_captured_data() {
        let flow = Flow::start(schema(), dispatcher()).unwrap();
        flow.advance(input(&[("name", json!("Ada"))])).await.unwrap();
        assert_eq!(flow.retreat().unwrap(), "name");
        assert_eq!(flow.snapshot().captured()["name"], json!("Ada"));
        assert_eq!(flow.retreat().unwrap(), "name");
    }

    #[tokio::test]
    async fn end_marker_completes_flow() {
        let schema = Arc::new(
            FlowSchema::builder("short")
                .step(StepDefinition::new("only").next(Target::End))
                .build()
                .unwrap(),
        );
        let flow = Flow::start(schema, Arc::new(Dispatcher::new())).unwrap();
        let t = flow.advance(RawInput::new()).await.unwrap();
        assert!(t.to.is_end());
        assert_eq!(t.finished, Some(TerminalOutcome::Completed));
    }

    #[tokio::test]
    async fn cancelled_flow_rejects_operations() {
        let flow = Flow::start(schema(), dispatcher()).unwrap();
        flow.cancel();
        assert_eq!(flow.status(), FlowStatus::Cancelled);
        assert_eq!(
            flow.advance(input(&[("name", json!("Ada"))])).await.unwrap_err(),
            FlowError::InvalidState(InvalidState::Cancelled)
        );
        assert_eq!(
            flow.retreat().unwrap_err(),
            FlowError::InvalidState(InvalidState::Cancelled)
        );
    }

    #[tokio::test]
    async fn retreat_is_refused_while_busy_and_releases_the_flag() {
        let flow = Flow::start(schema(), dispatcher()).unwrap();
        flow.advance(input(&[("name", json!("Ada"))])).await.unwrap();

        {
            let _held = BusyGuard::acquire(&flow.busy).unwrap();
            assert_eq!(flow.retreat().unwrap_err(), FlowError::Busy);
            assert_eq!(flow.current_step(), StepId::new("confirm"));
        }

        assert_eq!(flow.retreat().unwrap(), StepId::new("name"));
        assert!(!flow.is_busy());
        flow.advance(input(&[("name", json!("Ada"))])).await.unwrap();
        assert_eq!(flow.current_step(), StepId::new("confirm"));
    }

    #[test]
    fn flow_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Flow>();
    }
}
