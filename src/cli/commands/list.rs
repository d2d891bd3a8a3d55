//! List command implementation.
//!
//! The `waypost list` command lists built-in and project flows.

use serde_json::json;

use crate::cli::args::ListArgs;
use crate::error::{Result, WaypostError};
use crate::registry::FlowRegistry;
use crate::ui::{UserInterface, WaypostTheme};

use super::dispatcher::{Command, CommandResult, ConfigSource};

/// The list command implementation.
pub struct ListCommand {
    source: ConfigSource,
    args: ListArgs,
}

impl ListCommand {
    /// Create a new list command.
    pub fn new(source: ConfigSource, args: ListArgs) -> Self {
        Self { source, args }
    }
}

impl Command for ListCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let config = self.source.load(ui)?;
        let registry = FlowRegistry::load(&config)?;

        if self.args.json {
            let flows: Vec<_> = registry
                .iter()
                .map(|(name, flow)| {
                    json!({
                        "name": name,
                        "source": flow.source.to_string(),
                        "description": flow.schema.description(),
                        "steps": flow.schema.steps().len(),
                    })
                })
                .collect();
            let output =
                serde_json::to_string_pretty(&flows).map_err(|e| WaypostError::Other(e.into()))?;
            ui.message(&output);
            return Ok(CommandResult::success());
        }

        let theme = WaypostTheme::detect();
        ui.message(&format!("  {}", theme.key.apply_to("Flows:")));
        for (name, flow) in registry.iter() {
            ui.message(&format!(
                "    {} {}",
                theme.highlight.apply_to(name),
                theme.dim.apply_to(format!("({})", flow.source))
            ));
            if let Some(description) = flow.schema.description() {
                ui.message(&format!("      {}", theme.dim.apply_to(description)));
            }
        }

        Ok(CommandResult::success())
    }
}
