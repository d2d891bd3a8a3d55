//! Schema command implementation.
//!
//! The `waypost schema` command prints the JSON Schema of the config file,
//! for editor integration.

use crate::config::json_schema;
use crate::error::{Result, WaypostError};
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// The schema command implementation.
pub struct SchemaCommand;

impl Command for SchemaCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let schema = json_schema().map_err(|e| WaypostError::Other(e.into()))?;
        ui.message(&schema);
        Ok(CommandResult::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::MockUI;

    #[test]
    fn prints_config_schema() {
        let mut ui = MockUI::new();
        let result = SchemaCommand.execute(&mut ui).unwrap();
        assert!(result.success);
        let value: serde_json::Value = serde_json::from_str(&ui.messages()[0]).unwrap();
        assert!(value["properties"]["flows"].is_object());
    }
}
