//! Waypost - guided multi-step flows.
//!
//! Waypost runs wizards declared as ordered steps: each step collects a few
//! validated fields, may trigger one side effect against a backend, and
//! branches on what was captured or what the backend answered.
//!
//! # Modules
//!
//! - [`flow`] - Step schema, validation, flow state and the transition engine
//! - [`dispatch`] - Side-effect dispatcher and backends
//! - [`binding`] - View model and actions for whatever renders a flow
//! - [`config`] - Configuration loading, parsing, and validation
//! - [`registry`] - Built-in and project flows
//! - [`runner`] - Terminal wizard driving a flow
//! - [`ui`] - Interactive prompts, spinners, and terminal output
//! - [`cli`] - Command-line interface and argument parsing
//! - [`error`] - Error types and result aliases
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use waypost::dispatch::{DemoBackend, Dispatcher};
//! use waypost::flow::{Flow, RawInput};
//! use waypost::registry::FlowRegistry;
//! use waypost::runner::block_on;
//!
//! let registry = FlowRegistry::builtin()?;
//! let schema = Arc::clone(&registry.require("password_reset")?.schema);
//! let dispatcher = Dispatcher::new().register_all(
//!     ["send_verification_code", "verify_code", "verify_security_answer"],
//!     Arc::new(DemoBackend::default()),
//! );
//! let flow = Flow::start(schema, Arc::new(dispatcher))?;
//!
//! let mut input = RawInput::new();
//! input.insert("email".into(), json!("user@example.com"));
//! let transition = block_on(flow.advance(input))??;
//! assert_eq!(transition.to, "verification");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod binding;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod flow;
pub mod registry;
pub mod runner;
pub mod ui;

pub use error::{Result, WaypostError};
