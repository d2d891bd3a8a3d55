//! Side-effect dispatch.
//!
//! The [`Dispatcher`] is the only place the flow engine talks to the outside
//! world. It routes a named side effect to its [`Backend`], bounds the call
//! with a timeout and turns the answer into an [`Outcome`] or an
//! [`ExternalError`]. It never retries.

pub mod backend;
pub mod demo;
pub mod http;

pub use backend::{Backend, BackendRequest, BackendResponse};
pub use demo::DemoBackend;
pub use http::HttpBackend;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::config::{BackendConfig, Settings};
use crate::flow::{CapturedData, ExternalError, Outcome, StepId};

/// Default bound on a single side effect.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Routes side effects to backends.
#[derive(Clone)]
pub struct Dispatcher {
    backends: HashMap<String, Arc<dyn Backend>>,
    timeout: Duration,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut effects: Vec<_> = self.backends.keys().collect();
        effects.sort();
        f.debug_struct("Dispatcher")
            .field("effects", &effects)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Bind one effect to a backend, replacing any previous binding.
    pub fn register(mut self, effect: impl Into<String>, backend: Arc<dyn Backend>) -> Self {
        self.backends.insert(effect.into(), backend);
        self
    }

    /// Bind several effects to the same backend.
    pub fn register_all<I, S>(mut self, effects: I, backend: Arc<dyn Backend>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for effect in effects {
            self.backends.insert(effect.into(), Arc::clone(&backend));
        }
        self
    }

    pub fn has(&self, effect: &str) -> bool {
        self.backends.contains_key(effect)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Perform one side effect for a step.
    ///
    /// # Errors
    ///
    /// [`ExternalError::Timeout`] when the backend does not answer in time,
    /// [`ExternalError::Rejected`] when it refuses, and whatever transport
    /// error the backend reports otherwise.
    pub async fn dispatch(
        &self,
        effect: &str,
        step_id: &StepId,
        captured: &CapturedData,
    ) -> Result<Outcome, ExternalError> {
        let Some(backend) = self.backends.get(effect) else {
            return Err(ExternalError::Rejected {
                code: "unbound_effect".to_string(),
                message: Some(format!("no backend for '{}'", effect)),
            });
        };

        let request = BackendRequest {
            effect: effect.to_string(),
            step_id: step_id.clone(),
            captured_data: captured.clone(),
        };

        tracing::debug!(
            "Dispatching '{}' for step '{}' via {} backend",
            effect,
            step_id,
            backend.name()
        );

        let answer = match tokio::time::timeout(self.timeout, backend.call(&request)).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!("Side effect '{}' timed out after {:?}", effect, self.timeout);
                return Err(ExternalError::Timeout {
                    after: self.timeout,
                });
            }
        };

        answer.into_outcome()
    }

    /// Build a dispatcher from configured settings.
    ///
    /// The demo backend serves the effects it knows. The HTTP backend serves
    /// every effect in `effects`.
    pub fn from_settings<'a>(
        settings: &Settings,
        effects: impl IntoIterator<Item = &'a str>,
    ) -> anyhow::Result<Self> {
        let dispatcher = Self::new().with_timeout(Duration::from_secs(settings.dispatch_timeout));

        match &settings.backend {
            BackendConfig::Demo => {
                let demo = &settings.demo;
                let backend = DemoBackend::new(&demo.verification_code, &demo.security_answer)
                    .with_latency(Duration::from_millis(demo.latency_ms));
                Ok(dispatcher.register_all(demo::DEMO_EFFECTS.iter().copied(), Arc::new(backend)))
            }
            BackendConfig::Http {
                url,
                timeout,
                token_env,
            } => {
                let mut backend = HttpBackend::with_timeout(url, Duration::from_secs(*timeout))?;
                if let Some(var) = token_env {
                    let token = std::env::var(var)
                        .with_context(|| format!("Backend token variable {} is not set", var))?;
                    backend = backend.with_token(token);
                }
                Ok(dispatcher.register_all(effects, Arc::new(backend)))
            }
        }
    }
}
