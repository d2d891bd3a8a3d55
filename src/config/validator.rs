//! Configuration validation rules.
//!
//! This module validates configuration for correctness:
//! - Settings must be usable (positive timeouts, a reachable backend)
//! - Every flow must compile into a [`FlowSchema`](crate::flow::FlowSchema)
//! - Side effects must be ones the configured backend can serve

use crate::config::compile::compile_flow;
use crate::config::schema::{BackendConfig, WaypostConfig};
use crate::dispatch::demo::DEMO_EFFECTS;
use crate::error::{Result, WaypostError};
use serde::Serialize;

/// Validation error with context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Rule identifier
    pub rule: String,
    /// Human-readable error message
    pub message: String,
    /// Flow name if error is flow-specific
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,
    /// Step id if error is step-specific
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
}

impl ValidationError {
    fn settings(rule: &str, message: impl Into<String>) -> Self {
        Self {
            rule: rule.to_string(),
            message: message.into(),
            flow: None,
            step: None,
        }
    }
}

/// Validate a configuration and return all errors.
///
/// This function collects all validation errors rather than stopping
/// at the first one, allowing users to fix multiple issues at once.
pub fn validate_config(config: &WaypostConfig) -> Vec<ValidationError> {
    let mut errors = validate_settings(config);
    errors.extend(validate_flows(config));
    errors
}

fn validate_settings(config: &WaypostConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let settings = &config.settings;

    if settings.dispatch_timeout == 0 {
        errors.push(ValidationError::settings(
            "zero-timeout",
            "settings.dispatch_timeout must be at least 1 second",
        ));
    }

    if settings.max_attempts == 0 {
        errors.push(ValidationError::settings(
            "zero-attempts",
            "settings.max_attempts must be at least 1",
        ));
    }

    if let BackendConfig::Http {
        url,
        timeout,
        token_env,
    } = &settings.backend
    {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ValidationError::settings(
                "invalid-backend-url",
                format!("Backend url '{}' must start with http:// or https://", url),
            ));
        }
        if *timeout == 0 {
            errors.push(ValidationError::settings(
                "zero-timeout",
                "settings.backend.timeout must be at least 1 second",
            ));
        }
        if token_env.as_deref().is_some_and(|v| v.trim().is_empty()) {
            errors.push(ValidationError::settings(
                "empty-token-env",
                "settings.backend.token_env must name an environment variable",
            ));
        }
    }

    errors
}

fn validate_flows(config: &WaypostConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let demo = config.settings.backend == BackendConfig::Demo;

    for (name, flow) in &config.flows {
        match compile_flow(name, flow) {
            Ok(schema) => {
                if !demo {
                    continue;
                }
                for (step, effect) in schema.effects() {
                    if !DEMO_EFFECTS.contains(&effect) {
                        errors.push(ValidationError {
                            rule: "unbound-effect".to_string(),
                            message: format!(
                                "Flow '{}' step '{}' uses effect '{}' which the demo backend does not provide",
                                name, step, effect
                            ),
                            flow: Some(name.clone()),
                            step: Some(step.to_string()),
                        });
                    }
                }
            }
            Err(err) => errors.push(ValidationError {
                rule: err.rule().to_string(),
                message: format!("Flow '{}': {}", name, err),
                flow: Some(name.clone()),
                step: err.step().map(String::from),
            }),
        }
    }

    errors
}

/// Validate and return Result (for convenience).
///
/// # Errors
///
/// Returns `ConfigValidationError` if any validation rules fail.
pub fn validate(config: &WaypostConfig) -> Result<()> {
    let errors = validate_config(config);

    if errors.is_empty() {
        Ok(())
    } else {
        let messages: Vec<_> = errors.iter().map(|e| e.message.clone()).collect();
        Err(WaypostError::ConfigValidationError {
            message: messages.join("; "),
        })
    }
}
