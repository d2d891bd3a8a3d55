//! In-memory backend for demos and tests.
//!
//! Stands in for the identity provider and record services. The accepted
//! verification code and security answer are placeholders taken from
//! configuration; real deployments use [`HttpBackend`](super::HttpBackend).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use super::backend::{Backend, BackendRequest, BackendResponse};
use crate::flow::ExternalError;

pub const DEFAULT_VERIFICATION_CODE: &str = "123456";
pub const DEFAULT_SECURITY_ANSWER: &str = "fluffy";

/// Effects the demo backend understands.
pub const DEMO_EFFECTS: &[&str] = &[
    "send_verification_code",
    "verify_code",
    "verify_security_answer",
    "create_record",
    "submit_signature_request",
];

#[derive(Debug)]
pub struct DemoBackend {
    verification_code: String,
    security_answer: String,
    latency: Duration,
    calls: AtomicU64,
}

impl Default for DemoBackend {
    fn default() -> Self {
        Self::new(DEFAULT_VERIFICATION_CODE, DEFAULT_SECURITY_ANSWER)
    }
}

impl DemoBackend {
    pub fn new(verification_code: impl Into<String>, security_answer: impl Into<String>) -> Self {
        Self {
            verification_code: verification_code.into(),
            security_answer: security_answer.into(),
            latency: Duration::ZERO,
            calls: AtomicU64::new(0),
        }
    }

    /// Simulate network latency on every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of calls served so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer(&self, request: &BackendRequest) -> BackendResponse {
        let field = |name: &str| {
            request
                .captured_data
                .get(name)
                .and_then(Value::as_str)
                .map(str::trim)
        };

        match request.effect.as_str() {
            "send_verification_code" => match field("email") {
                Some(email) => BackendResponse::ok(payload(json!({ "sentTo": email }))),
                None => BackendResponse::rejected("missing_email", "no email address captured"),
            },
            "verify_code" => {
                if field("code") == Some(self.verification_code.as_str()) {
                    BackendResponse::ok(payload(json!({ "verified": true })))
                } else {
                    BackendResponse::rejected("invalid_code", "verification code does not match")
                }
            }
            "verify_security_answer" => {
                let matched = field("answer")
                    .is_some_and(|a| a.eq_ignore_ascii_case(self.security_answer.trim()));
                BackendResponse::ok(payload(json!({ "matched": matched })))
            }
            "create_record" => BackendResponse::ok(payload(json!({
                "recordId": reference("rec", request),
            }))),
            "submit_signature_request" => BackendResponse::ok(payload(json!({
                "requestId": reference("sig", request),
                "status": "sent",
            }))),
            other => BackendResponse::rejected(
                "unsupported_effect",
                format!("demo backend does not implement '{}'", other),
            ),
        }
    }
}

fn payload(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Stable reference derived from the submitted data.
fn reference(prefix: &str, request: &BackendRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(request.effect.as_bytes());
    hasher.update(serde_json::to_vec(&request.captured_data).unwrap_or_default());
    format!("{}_{}", prefix, &hex::encode(hasher.finalize())[..12])
}

#[async_trait]
impl Backend for DemoBackend {
    async fn call(&self, request: &BackendRequest) -> Result<BackendResponse, ExternalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(self.answer(request))
    }

    fn name(&self) -> &str {
        "demo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{CapturedData, StepId};

    fn request(effect: &str, pairs: &[(&str, &str)]) -> BackendRequest {
        let mut captured = CapturedData::new();
        for (k, v) in pairs {
            captured.insert(k.to_string(), json!(v));
        }
        BackendRequest {
            effect: effect.into(),
            step_id: StepId::new("step"),
            captured_data: captured,
        }
    }

    #[tokio::test]
    async fn verify_code_accepts_configured_code() {
        let backend = DemoBackend::default();
        let ok = backend
            .call(&request("verify_code", &[("code", "123456")]))
            .await
            .unwrap();
        assert!(ok.success);

        let bad = backend
            .call(&request("verify_code", &[("code", "000000")]))
            .await
            .unwrap();
        assert!(!bad.success);
        assert_eq!(bad.error_code.as_deref(), Some("invalid_code"));
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn security_answer_is_case_insensitive() {
        let backend = DemoBackend::new("1", "Fluffy");
        let yes = backend
            .call(&request("verify_security_answer", &[("answer", " FLUFFY ")]))
            .await
            .unwrap();
        assert_eq!(yes.payload["matched"], json!(true));

        let no = backend
            .call(&request("verify_security_answer", &[("answer", "rex")]))
            .await
            .unwrap();
        assert!(no.success);
        assert_eq!(no.payload["matched"], json!(false));
    }

    #[tokio::test]
    async fn record_references_are_stable() {
        let backend = DemoBackend::default();
        let req = request("create_record", &[("title", "Intro to grants")]);
        let a = backend.call(&req).await.unwrap();
        let b = backend.call(&req).await.unwrap();
        assert_eq!(a.payload["recordId"], b.payload["recordId"]);
        assert!(a.payload["recordId"].as_str().unwrap().starts_with("rec_"));
    }

    #[tokio::test]
    async fn unknown_effect_is_rejected() {
        let backend = DemoBackend::default();
        let response = backend.call(&request("launch_rocket", &[])).await.unwrap();
        assert_eq!(response.error_code.as_deref(), Some("unsupported_effect"));
    }

    #[test]
    fn lists_supported_effects() {
        assert!(DEMO_EFFECTS.contains(&"verify_code"));
        assert_eq!(DEMO_EFFECTS.len(), 5);
    }
}
