//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results.
//!
//! # Architecture
//!
//! Commands are dispatched via [`CommandDispatcher`], which routes CLI
//! subcommands to their implementations and gives each one the same
//! [`ConfigSource`].

pub mod completions;
pub mod dispatcher;
pub mod lint;
pub mod list;
pub mod run;
pub mod schema;
pub mod show;

pub use dispatcher::{Command, CommandDispatcher, CommandResult, ConfigSource};
