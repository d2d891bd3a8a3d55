//! Step input validation.
//!
//! [`validate`] checks raw input against a step's fields and collects every
//! problem at once rather than stopping at the first.

use serde_json::{Map, Value};

use super::error::{FieldErrorKind, ValidationError};
use super::field::is_blank;
use super::schema::StepDefinition;
use super::state::CapturedData;

/// Raw form input keyed by field name.
pub type RawInput = Map<String, Value>;

/// Validate raw input for one step.
///
/// Missing or blank optional fields are skipped. Keys the step does not
/// declare are ignored. A step without required fields accepts empty input.
///
/// # Errors
///
/// Returns one [`ValidationError`] per invalid field, in declaration order.
pub fn validate(
    step: &StepDefinition,
    raw: &RawInput,
) -> std::result::Result<CapturedData, Vec<ValidationError>> {
    let mut values = CapturedData::new();
    let mut errors = Vec::new();

    for field in &step.fields {
        let supplied = raw.get(&field.name).filter(|v| !is_blank(v));

        match supplied {
            None if field.required => {
                errors.push(ValidationError::new(&field.name, FieldErrorKind::Required));
            }
            None => {}
            Some(value) => match field.validator.apply(value) {
                Ok(clean) => {
                    values.insert(field.name.clone(), clean);
                }
                Err(kind) => errors.push(ValidationError::new(&field.name, kind)),
            },
        }
    }

    if errors.is_empty() {
        Ok(values)
    } else {
        tracing::debug!(
            "Step '{}' rejected input: {} invalid field(s)",
            step.id,
            errors.len()
        );
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::branch::Target;
    use crate::flow::field::FieldSpec;
    use serde_json::json;

    fn input(pairs: &[(&str, Value)]) -> RawInput {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn signup_step() -> StepDefinition {
        StepDefinition::new("signup")
            .field(FieldSpec::email("email"))
            .field(FieldSpec::digits("code", 6))
            .field(FieldSpec::text("note").optional())
            .next(Target::End)
    }

    #[test]
    fn valid_input_is_normalised() {
        let data = validate(
            &signup_step(),
            &input(&[("email", json!("A@B.org")), ("code", json!("123456"))]),
        )
        .unwrap();
        assert_eq!(data["email"], json!("a@b.org"));
        assert_eq!(data["code"], json!("123456"));
        assert!(!data.contains_key("note"));
    }

    #[test]
    fn collects_all_errors() {
        let errors = validate(
            &signup_step(),
            &input(&[("email", json!("nope")), ("note", json!("  "))]),
        )
        .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "email");
        assert!(matches!(errors[0].kind, FieldErrorKind::Invalid { .. }));
        assert_eq!(errors[1].field, "code");
        assert_eq!(errors[1].kind, FieldErrorKind::Required);
    }

    #[test]
    fn blank_required_is_missing() {
        let errors = validate(
            &signup_step(),
            &input(&[("email", json!("   ")), ("code", json!("123456"))]),
        )
        .unwrap_err();
        assert_eq!(errors, vec![ValidationError::new("email", FieldErrorKind::Required)]);
    }

    #[test]
    fn invalid_optional_value_is_reported() {
        let step = StepDefinition::new("s")
            .field(FieldSpec::email("cc").optional())
            .next(Target::End);
        let errors = validate(&step, &input(&[("cc", json!("not-an-email"))])).unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn step_without_required_fields_accepts_empty_input() {
        let optional_only = StepDefinition::new("s")
            .field(FieldSpec::text("note").optional())
            .next(Target::End);
        assert!(validate(&optional_only, &RawInput::new()).unwrap().is_empty());

        let no_fields = StepDefinition::new("info").next(Target::End);
        assert!(validate(&no_fields, &input(&[("anything", json!(1))])).is_ok());
    }

    #[test]
    fn undeclared_keys_are_ignored() {
        let data = validate(
            &signup_step(),
            &input(&[
                ("email", json!("a@b.org")),
                ("code", json!("000000")),
                ("admin", json!(true)),
            ]),
        )
        .unwrap();
        assert!(!data.contains_key("admin"));
    }
}
