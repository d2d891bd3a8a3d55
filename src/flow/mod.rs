//! The guided multi-step flow engine.
//!
//! A flow is declared as a [`FlowSchema`]: ordered steps, each with input
//! fields, an optional side effect and declarative branch rules. A [`Flow`]
//! runs one instance of it, moving between steps with
//! [`advance`](Flow::advance) and [`retreat`](Flow::retreat).
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use waypost::dispatch::{Dispatcher, DemoBackend};
//! use waypost::flow::{FieldSpec, Flow, FlowSchema, RawInput, StepDefinition, Target};
//!
//! let schema = FlowSchema::builder("newsletter")
//!     .step(
//!         StepDefinition::new("email")
//!             .field(FieldSpec::email("email"))
//!             .effect("send_verification_code")
//!             .next(Target::End),
//!     )
//!     .build()?;
//! let dispatcher = Dispatcher::new()
//!     .register("send_verification_code", Arc::new(DemoBackend::default()));
//!
//! let flow = Flow::start(Arc::new(schema), Arc::new(dispatcher))?;
//! let mut input = RawInput::new();
//! input.insert("email".into(), "user@example.com".into());
//! flow.advance(input).await?;
//! # Ok(())
//! # }
//! ```

pub mod branch;
pub mod engine;
pub mod error;
pub mod field;
pub mod schema;
pub mod state;
pub mod validator;

pub use branch::{resolve, BranchRule, Condition, Outcome, Target};
pub use engine::{Flow, Transition};
pub use error::{
    ExternalError, FieldErrorKind, FlowError, InvalidState, SchemaError, ValidationError,
};
pub use field::{parse_bool, FieldSpec, Validator, ValidatorFn};
pub use schema::{FlowSchema, FlowSchemaBuilder, StepDefinition};
pub use state::{
    CapturedData, FlowId, FlowState, FlowStatus, StepId, TerminalOutcome, END_MARKER,
};
pub use validator::{validate, RawInput};
