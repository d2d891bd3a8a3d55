//! Field contracts and their validators.
//!
//! Validators are pure: they take the raw value a user supplied and return
//! either the normalised value to capture or a [`FieldErrorKind`].

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use super::error::FieldErrorKind;

/// Signature of a programmatic validator.
pub type ValidatorFn = Arc<dyn Fn(&Value) -> Result<Value, FieldErrorKind> + Send + Sync>;

/// How a field's raw value is checked and normalised.
#[derive(Clone)]
pub enum Validator {
    /// Free text, optionally with a minimum length.
    Text { min_length: Option<usize> },
    /// An email address, lower-cased.
    Email,
    /// Decimal digits only, optionally of an exact length.
    Digits { length: Option<usize> },
    /// One of a fixed set of values.
    Choice { options: Vec<String> },
    /// The whole value must match the expression.
    ///
    /// Build with [`Validator::pattern`], which anchors `source` into `regex`.
    Pattern { source: String, regex: Regex },
    /// A yes/no answer.
    Boolean,
    /// Caller-provided check.
    Custom(ValidatorFn),
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text { min_length } => f
                .debug_struct("Text")
                .field("min_length", min_length)
                .finish(),
            Self::Email => write!(f, "Email"),
            Self::Digits { length } => f.debug_struct("Digits").field("length", length).finish(),
            Self::Choice { options } => f.debug_struct("Choice").field("options", options).finish(),
            Self::Pattern { source, .. } => f
                .debug_struct("Pattern")
                .field("source", source)
                .finish(),
            Self::Boolean => write!(f, "Boolean"),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl Validator {
    /// A pattern validator matching the whole value against `source`.
    ///
    /// # Errors
    ///
    /// Returns the regex error if `source` does not compile.
    pub fn pattern(source: &str) -> Result<Self, regex::Error> {
        Ok(Self::Pattern {
            source: source.to_string(),
            regex: Regex::new(&format!("^(?:{})$", source))?,
        })
    }

    /// Short name of the input kind, for presentation.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Email => "email",
            Self::Digits { .. } => "digits",
            Self::Choice { .. } => "choice",
            Self::Pattern { .. } => "pattern",
            Self::Boolean => "boolean",
            Self::Custom(_) => "custom",
        }
    }

    /// Allowed values for choice fields, empty otherwise.
    pub fn options(&self) -> &[String] {
        match self {
            Self::Choice { options } => options,
            _ => &[],
        }
    }

    /// Apply the validator to a value already known to be present.
    pub fn apply(&self, raw: &Value) -> Result<Value, FieldErrorKind> {
        match self {
            Self::Text { min_length } => {
                let text = as_text(raw);
                if let Some(min) = min_length {
                    if text.chars().count() < *min {
                        return Err(FieldErrorKind::TooShort { min: *min });
                    }
                }
                Ok(Value::String(text))
            }
            Self::Email => {
                let text = as_text(raw).to_lowercase();
                if is_email(&text) {
                    Ok(Value::String(text))
                } else {
                    Err(FieldErrorKind::Invalid {
                        expected: "an email address".to_string(),
                    })
                }
            }
            Self::Digits { length } => {
                let text = as_text(raw);
                if !text.chars().all(|c| c.is_ascii_digit()) {
                    return Err(FieldErrorKind::Invalid {
                        expected: "digits only".to_string(),
                    });
                }
                if let Some(expected) = length {
                    if text.len() != *expected {
                        return Err(FieldErrorKind::WrongLength {
                            expected: *expected,
                        });
                    }
                }
                Ok(Value::String(text))
            }
            Self::Choice { options } => {
                let text = as_text(raw);
                if options.iter().any(|o| *o == text) {
                    Ok(Value::String(text))
                } else {
                    Err(FieldErrorKind::NotAllowed {
                        allowed: options.clone(),
                    })
                }
            }
            Self::Pattern { source, regex } => {
                let text = as_text(raw);
                if regex.is_match(&text) {
                    Ok(Value::String(text))
                } else {
                    Err(FieldErrorKind::Invalid {
                        expected: format!("in the format {}", source),
                    })
                }
            }
            Self::Boolean => match raw {
                Value::Bool(b) => Ok(Value::Bool(*b)),
                other => parse_bool(&as_text(other))
                    .map(Value::Bool)
                    .ok_or_else(|| FieldErrorKind::Invalid {
                        expected: "yes or no".to_string(),
                    }),
            },
            Self::Custom(f) => f(raw),
        }
    }
}

/// Interpret a typed answer as yes/no.
///
/// Shared by the boolean validator and the prompts, so every input path
/// accepts the same spellings.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "y" | "yes" | "1" => Some(true),
        "false" | "n" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Stringify a raw value the way a form would have typed it.
fn as_text(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn is_email(text: &str) -> bool {
    let Some((local, domain)) = text.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !text.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

/// True when a raw value should be treated as "not supplied".
pub fn is_blank(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// A single input on a step.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Key used in raw input and captured data.
    pub name: String,
    /// Label shown by the presentation layer.
    pub label: String,
    /// Whether a value must be supplied.
    pub required: bool,
    /// Hide the value when prompting, logging and reporting.
    pub secret: bool,
    /// Value offered when nothing has been captured yet.
    pub default: Option<String>,
    /// The check applied to supplied values.
    pub validator: Validator,
}

impl FieldSpec {
    /// A required field with the given validator; the label defaults to the name.
    pub fn new(name: impl Into<String>, validator: Validator) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            required: true,
            secret: false,
            default: None,
            validator,
        }
    }

    /// Required free-text field.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, Validator::Text { min_length: None })
    }

    /// Required email field.
    pub fn email(name: impl Into<String>) -> Self {
        Self::new(name, Validator::Email)
    }

    /// Required digits field with an exact length.
    pub fn digits(name: impl Into<String>, length: usize) -> Self {
        Self::new(
            name,
            Validator::Digits {
                length: Some(length),
            },
        )
    }

    /// Required choice field.
    pub fn choice<I, S>(name: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            Validator::Choice {
                options: options.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}
