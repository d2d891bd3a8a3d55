//! Terminal wizard driving one flow.
//!
//! [`WizardRunner`] renders the [`StepView`] of a running flow through a
//! [`UserInterface`], collects answers for each field and sends them back
//! through the [`Binding`]. Interactive runs re-prompt after errors up to a
//! limit; non-interactive runs abort on the first error.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::binding::{Action, Binding, FieldView, Reaction, StepView};
use crate::error::{Result, WaypostError};
use crate::flow::{CapturedData, Flow, FlowError, RawInput, StepId, TerminalOutcome};
use crate::ui::{Prompt, PromptOption, PromptResult, PromptType, UserInterface};

/// Prompt key for the Continue / Back / Cancel choice.
pub const NAVIGATION_KEY: &str = "_navigation";

/// Options for one wizard run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Pre-supplied answers, by field name.
    pub answers: BTreeMap<String, String>,
    /// Failed submissions allowed per step before giving up.
    pub max_attempts: u32,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            answers: BTreeMap::new(),
            max_attempts: 3,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Reached a terminal step or the end marker.
    Finished(TerminalOutcome),
    /// The user cancelled.
    Cancelled,
    /// The run gave up on a step.
    Aborted { step: StepId, reason: String },
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub flow: String,
    pub flow_id: String,
    pub outcome: RunOutcome,
    /// Step the flow stopped on.
    pub final_step: StepId,
    /// Title of the final step, for display.
    pub final_title: String,
    /// Captured data with secret fields masked.
    pub captured: CapturedData,
    pub duration: Duration,
}

impl RunReport {
    /// Whether the flow reached a completed terminal.
    pub fn success(&self) -> bool {
        self.outcome == RunOutcome::Finished(TerminalOutcome::Completed)
    }
}

enum Navigation {
    Continue,
    Back,
    Cancel,
}

/// Drives a flow to a terminal state through a [`UserInterface`].
pub struct WizardRunner {
    binding: Binding,
    options: RunOptions,
}

impl WizardRunner {
    pub fn new(flow: Arc<Flow>, options: RunOptions) -> Self {
        Self {
            binding: Binding::new(flow),
            options,
        }
    }

    pub fn flow(&self) -> &Arc<Flow> {
        self.binding.flow()
    }

    /// Run until the flow finishes, is cancelled, or a step is abandoned.
    ///
    /// # Errors
    ///
    /// Prompt failures (including a non-interactive run with no answer for a
    /// required field) and actions the flow rejects.
    pub async fn run(&mut self, ui: &mut dyn UserInterface) -> Result<RunReport> {
        let start = Instant::now();
        let flow = Arc::clone(self.binding.flow());
        let schema = flow.schema();
        let total_steps = schema.steps().iter().filter(|s| !s.is_terminal()).count();
        let interactive = ui.is_interactive();

        ui.show_header(schema.description().unwrap_or(schema.name()));
        tracing::debug!(
            "Running flow '{}' ({}), interactive: {}",
            schema.name(),
            flow.id(),
            interactive
        );

        let mut shown_step: Option<StepId> = None;
        let mut attempts: u32 = 0;
        let mut previous = RawInput::new();

        loop {
            let view = self.binding.view();

            if let Some(outcome) = view.finished {
                return Ok(self.report(&view, RunOutcome::Finished(outcome), start));
            }
            if view.cancelled {
                return Ok(self.report(&view, RunOutcome::Cancelled, start));
            }

            if shown_step.as_ref() != Some(&view.current_step) {
                attempts = 0;
                previous.clear();
                let position = flow.snapshot().history().len() + 1;
                ui.show_step(position, total_steps.max(position), &view.title);
                if let Some(description) = &view.description {
                    ui.message(description);
                }
                shown_step = Some(view.current_step.clone());
            }

            if view.has_errors() {
                for error in &view.errors {
                    ui.error(&error.message);
                }
                attempts += 1;
                let limit_hit = attempts >= self.options.max_attempts;
                if !interactive || limit_hit {
                    let reason = if limit_hit && interactive {
                        format!("{} failed attempts", attempts)
                    } else {
                        view.errors
                            .iter()
                            .map(|e| e.message.as_str())
                            .collect::<Vec<_>>()
                            .join("; ")
                    };
                    tracing::warn!("Abandoning step '{}': {}", view.current_step, reason);
                    self.binding.perform(Action::Cancel).await;
                    let step = view.current_step.clone();
                    return Ok(self.report(&view, RunOutcome::Aborted { step, reason }, start));
                }
            }

            let raw = self.collect_input(&view, &previous, interactive, ui)?;

            let navigation = if interactive {
                ask_navigation(&view, ui)?
            } else {
                Navigation::Continue
            };

            let reaction = match navigation {
                Navigation::Continue => {
                    previous = raw.clone();
                    self.submit(&view, raw, ui).await
                }
                Navigation::Back => self.binding.perform(Action::Retreat).await,
                Navigation::Cancel => self.binding.perform(Action::Cancel).await,
            };

            match reaction {
                Reaction::Render
                | Reaction::Finished(_)
                | Reaction::Cancelled
                | Reaction::Ignored => {}
                Reaction::Rejected(state) => {
                    return Err(WaypostError::Flow(FlowError::InvalidState(state)));
                }
            }
        }
    }

    /// Advance with a spinner around the side effect, if the step has one.
    async fn submit(&mut self, view: &StepView, raw: RawInput, ui: &mut dyn UserInterface) -> Reaction {
        let effect = self
            .binding
            .flow()
            .schema()
            .step(view.current_step.as_str())
            .and_then(|s| s.effect.clone());

        let Some(effect) = effect else {
            return self.binding.perform(Action::Advance { raw_input: raw }).await;
        };

        let label = effect.replace('_', " ");
        let mut spinner = ui.start_spinner(&format!("Running {}...", label));
        let reaction = self.binding.perform(Action::Advance { raw_input: raw }).await;

        let after = self.binding.view();
        let failed = after.current_step == view.current_step && after.has_errors();
        if failed {
            spinner.finish_clear();
        } else {
            spinner.finish_success(&format!("Finished {}", label));
        }
        reaction
    }

    /// Answers for the current step.
    ///
    /// After a validation error only the rejected fields are asked again;
    /// after a side-effect error every field is. Pre-supplied answers are
    /// used on the first attempt only.
    fn collect_input(
        &self,
        view: &StepView,
        previous: &RawInput,
        interactive: bool,
        ui: &mut dyn UserInterface,
    ) -> Result<RawInput> {
        let retrying = view.has_errors();
        let rejected: BTreeSet<&str> = view
            .errors
            .iter()
            .filter_map(|e| e.field.as_deref())
            .collect();

        let mut raw = RawInput::new();
        for field in &view.fields {
            if retrying && !rejected.is_empty() && !rejected.contains(field.name.as_str()) {
                if let Some(value) = previous.get(&field.name) {
                    raw.insert(field.name.clone(), value.clone());
                    continue;
                }
            }
            if !retrying {
                if let Some(answer) = self.options.answers.get(&field.name) {
                    raw.insert(field.name.clone(), Value::String(answer.clone()));
                    continue;
                }
            }
            let value = ask_field(view, field, interactive, ui)?;
            raw.insert(field.name.clone(), value);
        }
        Ok(raw)
    }

    fn report(&self, view: &StepView, outcome: RunOutcome, start: Instant) -> RunReport {
        let flow = self.binding.flow();
        let schema = flow.schema();
        RunReport {
            flow: schema.name().to_string(),
            flow_id: view.flow_id.clone(),
            outcome,
            final_step: view.current_step.clone(),
            final_title: view.title.clone(),
            captured: flow.snapshot().redacted(schema.secret_fields()),
            duration: start.elapsed(),
        }
    }
}

/// Prompt for one field.
fn ask_field(
    view: &StepView,
    field: &FieldView,
    interactive: bool,
    ui: &mut dyn UserInterface,
) -> Result<Value> {
    let prompt_type = if field.secret {
        PromptType::Secret
    } else {
        match field.kind {
            "boolean" => PromptType::Confirm,
            "choice" => PromptType::Select {
                options: field.options.iter().map(PromptOption::plain).collect(),
            },
            _ => PromptType::Input,
        }
    };

    let question = if field.required {
        field.label.clone()
    } else {
        format!("{} (optional)", field.label)
    };

    let mut prompt = Prompt::new(
        format!("{}_{}", view.current_step, field.name),
        question,
        prompt_type,
    );
    prompt.default = field
        .value
        .as_ref()
        .map(value_text)
        .or_else(|| field.default.clone());
    if prompt.default.is_none() && !field.required && !interactive {
        prompt.default = Some(String::new());
    }

    // --set takes field names, so report the field rather than the prompt key.
    let answer = ui.prompt(&prompt).map_err(|err| match err {
        WaypostError::MissingInput { .. } => WaypostError::MissingInput {
            field: field.name.clone(),
        },
        other => other,
    })?;

    Ok(match answer {
        PromptResult::Bool(b) => Value::Bool(b),
        PromptResult::String(s) => Value::String(s),
    })
}

fn ask_navigation(view: &StepView, ui: &mut dyn UserInterface) -> Result<Navigation> {
    let mut options = vec![PromptOption {
        label: "Continue".to_string(),
        value: "continue".to_string(),
    }];
    if view.can_retreat {
        options.push(PromptOption {
            label: "Back".to_string(),
            value: "back".to_string(),
        });
    }
    options.push(PromptOption {
        label: "Cancel".to_string(),
        value: "cancel".to_string(),
    });

    let prompt = Prompt::new(NAVIGATION_KEY, "Next", PromptType::Select { options })
        .with_default("continue");
    Ok(match ui.prompt(&prompt)?.as_string().as_str() {
        "back" if view.can_retreat => Navigation::Back,
        "cancel" => Navigation::Cancel,
        _ => Navigation::Continue,
    })
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
