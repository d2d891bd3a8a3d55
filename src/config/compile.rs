//! Turning flow configuration into checked [`FlowSchema`]s.

use crate::config::schema::{FieldConfig, FieldType, FlowConfig, StepConfig};
use crate::flow::{
    FieldSpec, FlowSchema, SchemaError, StepDefinition, StepId, Target, Validator,
};

/// Compile a configured flow.
///
/// # Errors
///
/// Returns the first [`SchemaError`] found.
pub fn compile_flow(name: &str, config: &FlowConfig) -> Result<FlowSchema, SchemaError> {
    let mut builder = FlowSchema::builder(name);
    if let Some(description) = &config.description {
        builder = builder.description(description);
    }
    if let Some(entry) = &config.entry {
        builder = builder.entry(entry.as_str());
    }
    for step in &config.steps {
        builder = builder.step(compile_step(step)?);
    }
    builder.build()
}

fn compile_step(config: &StepConfig) -> Result<StepDefinition, SchemaError> {
    let mut step = StepDefinition::new(StepId::new(config.id.as_str()));
    step.title = config.title.clone();
    step.description = config.description.clone();
    step.effect = config.effect.clone();
    step.next = config.next.as_deref().map(Target::parse);
    step.terminal = config.terminal;

    for field in &config.fields {
        step.fields.push(compile_field(&config.id, field)?);
    }
    for branch in &config.branches {
        step = step.branch(branch.when.clone(), Target::parse(&branch.to));
    }
    Ok(step)
}

fn compile_field(step: &str, config: &FieldConfig) -> Result<FieldSpec, SchemaError> {
    let invalid = |message: String| SchemaError::InvalidField {
        step: step.to_string(),
        field: config.name.clone(),
        message,
    };

    let validator = match config.kind {
        FieldType::Text => Validator::Text {
            min_length: config.min_length,
        },
        FieldType::Email => Validator::Email,
        FieldType::Digits => Validator::Digits {
            length: config.length,
        },
        FieldType::Choice => {
            if config.options.is_empty() {
                return Err(invalid("choice fields need at least one option".to_string()));
            }
            Validator::Choice {
                options: config.options.clone(),
            }
        }
        FieldType::Pattern => {
            let pattern = config
                .pattern
                .as_deref()
                .ok_or_else(|| invalid("pattern fields need a 'pattern'".to_string()))?;
            Validator::pattern(pattern).map_err(|e| invalid(format!("invalid pattern: {}", e)))?
        }
        FieldType::Boolean => Validator::Boolean,
    };

    let mut field = FieldSpec::new(config.name.as_str(), validator);
    if let Some(label) = &config.label {
        field = field.with_label(label);
    }
    if !config.required {
        field = field.optional();
    }
    if config.secret {
        field = field.secret();
    }
    if let Some(default) = &config.default {
        field = field.with_default(default);
    }
    Ok(field)
}
