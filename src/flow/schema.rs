//! Static flow definitions.
//!
//! A [`FlowSchema`] is an ordered list of [`StepDefinition`]s plus an entry
//! step. Every structural problem is caught by [`FlowSchemaBuilder::build`],
//! so nothing about the shape of a flow can fail while a user is in it.

use std::collections::HashSet;

use super::branch::{BranchRule, Condition, Target};
use super::error::SchemaError;
use super::field::FieldSpec;
use super::state::{StepId, TerminalOutcome, END_MARKER};

/// One stage of a flow.
#[derive(Debug, Clone)]
pub struct StepDefinition {
    pub id: StepId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub fields: Vec<FieldSpec>,
    /// Name of the side effect dispatched when the step is submitted.
    pub effect: Option<String>,
    /// Default transition when no branch matches.
    pub next: Option<Target>,
    pub branches: Vec<BranchRule>,
    /// Set on steps that end the flow.
    pub terminal: Option<TerminalOutcome>,
}

impl StepDefinition {
    /// An input step with no fields yet.
    pub fn new(id: impl Into<StepId>) -> Self {
        Self {
            id: id.into(),
            title: None,
            description: None,
            fields: Vec::new(),
            effect: None,
            next: None,
            branches: Vec::new(),
            terminal: None,
        }
    }

    /// A step that ends the flow with the given outcome.
    pub fn terminal(id: impl Into<StepId>, outcome: TerminalOutcome) -> Self {
        Self {
            terminal: Some(outcome),
            ..Self::new(id)
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn effect(mut self, effect: impl Into<String>) -> Self {
        self.effect = Some(effect.into());
        self
    }

    pub fn next(mut self, target: Target) -> Self {
        self.next = Some(target);
        self
    }

    /// Shorthand for `next(Target::step(id))`.
    pub fn then(self, id: impl Into<StepId>) -> Self {
        self.next(Target::Step(id.into()))
    }

    pub fn branch(mut self, condition: Condition, target: Target) -> Self {
        self.branches.push(BranchRule::new(condition, target));
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    pub fn has_required_fields(&self) -> bool {
        self.fields.iter().any(|f| f.required)
    }

    /// Display title, falling back to the id.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(self.id.as_str())
    }

    /// Every target this step can reach, default first.
    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.next
            .iter()
            .chain(self.branches.iter().map(|b| &b.target))
    }
}

/// A validated, immutable flow definition.
#[derive(Debug, Clone)]
pub struct FlowSchema {
    name: String,
    description: Option<String>,
    entry: StepId,
    steps: Vec<StepDefinition>,
}

impl FlowSchema {
    pub fn builder(name: impl Into<String>) -> FlowSchemaBuilder {
        FlowSchemaBuilder {
            name: name.into(),
            description: None,
            entry: None,
            steps: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn entry(&self) -> &StepId {
        &self.entry
    }

    /// Steps in declaration order.
    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn step(&self, id: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.id == *id)
    }

    /// Side effects bound anywhere in the flow, with the step that binds them.
    pub fn effects(&self) -> impl Iterator<Item = (&StepId, &str)> {
        self.steps
            .iter()
            .filter_map(|s| s.effect.as_deref().map(|e| (&s.id, e)))
    }

    /// Names of fields marked secret, across all steps.
    pub fn secret_fields(&self) -> impl Iterator<Item = &str> {
        self.steps
            .iter()
            .flat_map(|s| s.fields.iter())
            .filter(|f| f.secret)
            .map(|f| f.name.as_str())
    }
}

/// Collects steps and checks them on [`build`](Self::build).
#[derive(Debug)]
pub struct FlowSchemaBuilder {
    name: String,
    description: Option<String>,
    entry: Option<StepId>,
    steps: Vec<StepDefinition>,
}

impl FlowSchemaBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Override the entry step (defaults to the first declared step).
    pub fn entry(mut self, id: impl Into<StepId>) -> Self {
        self.entry = Some(id.into());
        self
    }

    pub fn step(mut self, step: StepDefinition) -> Self {
        self.steps.push(step);
        self
    }

    /// Check the definition and freeze it.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaError`] found, in declaration order.
    pub fn build(self) -> Result<FlowSchema, SchemaError> {
        let first = self.steps.first().ok_or(SchemaError::Empty)?;
        let entry = self.entry.clone().unwrap_or_else(|| first.id.clone());

        let mut ids: HashSet<&str> = HashSet::new();
        for step in &self.steps {
            if step.id.is_end() {
                return Err(SchemaError::ReservedStepId {
                    step: END_MARKER.to_string(),
                });
            }
            if !ids.insert(step.id.as_str()) {
                return Err(SchemaError::DuplicateStep {
                    step: step.id.to_string(),
                });
            }
        }

        let entry_step = self
            .steps
            .iter()
            .find(|s| s.id == entry)
            .ok_or_else(|| SchemaError::UnknownEntry {
                step: entry.to_string(),
            })?;
        if entry_step.is_terminal() {
            return Err(SchemaError::TerminalEntry {
                step: entry.to_string(),
            });
        }

        let all_fields: HashSet<&str> = self
            .steps
            .iter()
            .flat_map(|s| s.fields.iter().map(|f| f.name.as_str()))
            .collect();

        for step in &self.steps {
            check_step(step, &ids, &all_fields)?;
        }

        tracing::debug!(
            "Registered flow '{}' with {} steps (entry: {})",
            self.name,
            self.steps.len(),
            entry
        );

        Ok(FlowSchema {
            name: self.name,
            description: self.description,
            entry,
            steps: self.steps,
        })
    }
}

fn check_step(
    step: &StepDefinition,
    ids: &HashSet<&str>,
    all_fields: &HashSet<&str>,
) -> Result<(), SchemaError> {
    let name = step.id.to_string();

    if step.is_terminal() {
        let what = if !step.fields.is_empty() {
            Some("fields")
        } else if step.next.is_some() || !step.branches.is_empty() {
            Some("transitions")
        } else if step.effect.is_some() {
            Some("a side effect")
        } else {
            None
        };
        return match what {
            Some(what) => Err(SchemaError::TerminalWithTransitions { step: name, what }),
            None => Ok(()),
        };
    }

    if step.next.is_none() {
        return Err(SchemaError::MissingNext { step: name });
    }

    let mut seen = HashSet::new();
    for field in &step.fields {
        if !seen.insert(field.name.as_str()) {
            return Err(SchemaError::DuplicateField {
                step: name,
                field: field.name.clone(),
            });
        }
    }

    for target in step.targets() {
        if let Target::Step(id) = target {
            if !ids.contains(id.as_str()) {
                return Err(SchemaError::UnknownTarget {
                    step: name,
                    target: id.to_string(),
                });
            }
        }
    }

    for rule in &step.branches {
        if let Some(field) = rule
            .condition
            .fields()
            .into_iter()
            .find(|f| !all_fields.contains(f))
        {
            return Err(SchemaError::UnknownField {
                step: name,
                field: field.to_string(),
            });
        }
        if rule.condition.reads_outcome() && step.effect.is_none() {
            return Err(SchemaError::OutcomeWithoutEffect { step: name });
        }
    }

    Ok(())
}
