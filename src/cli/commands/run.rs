//! Run command implementation.
//!
//! The `waypost run <flow>` command walks the user through a flow.

use std::sync::Arc;

use crate::cli::args::RunArgs;
use crate::dispatch::Dispatcher;
use crate::error::{Result, WaypostError};
use crate::flow::{Flow, TerminalOutcome};
use crate::registry::FlowRegistry;
use crate::runner::{block_on, RunOptions, RunOutcome, RunReport, WizardRunner};
use crate::ui::{UserInterface, WaypostTheme};

use super::dispatcher::{Command, CommandResult, ConfigSource};

/// The run command implementation.
pub struct RunCommand {
    source: ConfigSource,
    args: RunArgs,
}

impl RunCommand {
    /// Create a new run command.
    pub fn new(source: ConfigSource, args: RunArgs) -> Self {
        Self { source, args }
    }

    /// Get the command arguments.
    pub fn args(&self) -> &RunArgs {
        &self.args
    }

    fn summarize(&self, report: &RunReport, flow: &Flow, ui: &mut dyn UserInterface) {
        let description = flow
            .schema()
            .step(report.final_step.as_str())
            .and_then(|s| s.description.clone());
        let reached_step = !report.final_step.is_end();

        match &report.outcome {
            RunOutcome::Finished(TerminalOutcome::Completed) => {
                if reached_step {
                    ui.success(&report.final_title);
                } else {
                    ui.success(&format!("Flow '{}' completed", report.flow));
                }
                if let Some(description) = &description {
                    ui.message(description);
                }
            }
            RunOutcome::Finished(TerminalOutcome::Failed) => {
                ui.warning(&report.final_title);
                if let Some(description) = &description {
                    ui.message(description);
                }
            }
            RunOutcome::Cancelled => ui.warning(&format!("Flow '{}' cancelled", report.flow)),
            RunOutcome::Aborted { step, reason } => {
                ui.error(&format!("Stopped at step '{}': {}", step, reason));
            }
        }

        if ui.output_mode().shows_details() {
            let theme = WaypostTheme::detect();
            ui.message("");
            ui.message(&theme.format_pair("Flow id", &report.flow_id));
            ui.message(&theme.format_pair(
                "Duration",
                &format!("{:.1}s", report.duration.as_secs_f64()),
            ));
            for (key, value) in &report.captured {
                let text = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                ui.message(&format!("  {}", theme.format_pair(key, &text)));
            }
        }
    }
}

impl Command for RunCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let config = self.source.load(ui)?;
        let registry = FlowRegistry::load(&config)?;

        let registered = match registry.require(&self.args.flow) {
            Ok(r) => r,
            Err(WaypostError::UnknownFlow { name }) => {
                ui.error(&format!(
                    "Unknown flow: {}. Run 'waypost list' to see available flows.",
                    name
                ));
                return Ok(CommandResult::failure(1));
            }
            Err(e) => return Err(e),
        };

        let schema = Arc::clone(&registered.schema);
        let dispatcher =
            Dispatcher::from_settings(&config.settings, schema.effects().map(|(_, e)| e))?;
        let flow = Flow::start(schema, Arc::new(dispatcher)).map_err(|err| {
            WaypostError::Schema {
                flow: self.args.flow.clone(),
                source: err,
            }
        })?;
        let flow = Arc::new(flow);

        let options = RunOptions {
            answers: self.args.set.iter().cloned().collect(),
            max_attempts: config.settings.max_attempts,
        };
        let mut runner = WizardRunner::new(Arc::clone(&flow), options);
        let report = block_on(runner.run(ui))??;

        self.summarize(&report, &flow, ui);

        if report.success() {
            Ok(CommandResult::success())
        } else {
            Ok(CommandResult::failure(1))
        }
    }
}
