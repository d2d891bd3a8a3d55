//! Lint command implementation.
//!
//! The `waypost lint` command validates configuration files and every flow
//! they declare.

use crate::cli::args::{LintArgs, LintFormat};
use crate::config::{load_config, validate_config, ConfigPaths, ValidationError};
use crate::error::{Result, WaypostError};
use crate::ui::{OutputMode, UserInterface};

use super::dispatcher::{Command, CommandResult, ConfigSource};

/// The lint command implementation.
pub struct LintCommand {
    source: ConfigSource,
    args: LintArgs,
}

impl LintCommand {
    /// Create a new lint command.
    pub fn new(source: ConfigSource, args: LintArgs) -> Self {
        Self { source, args }
    }

    fn format_human(error: &ValidationError) -> String {
        let location = match (&error.flow, &error.step) {
            (Some(flow), Some(step)) => format!(" [{}.{}]", flow, step),
            (Some(flow), None) => format!(" [{}]", flow),
            _ => String::new(),
        };
        format!("error[{}]{}: {}", error.rule, location, error.message)
    }
}

impl Command for LintCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        if self.source.config_path.is_none()
            && !ConfigPaths::discover(&self.source.project_root).has_project_config()
        {
            ui.error("No configuration found at .waypost/config.yml");
            return Ok(CommandResult::failure(2));
        }

        let config = match load_config(
            &self.source.project_root,
            self.source.config_path.as_deref(),
        ) {
            Ok(c) => c,
            Err(WaypostError::ConfigParseError { path, message }) => {
                ui.error(&format!("Parse error in {}: {}", path.display(), message));
                return Ok(CommandResult::failure(1));
            }
            Err(e) => return Err(e),
        };

        if ui.output_mode() == OutputMode::Normal {
            ui.set_output_mode(config.settings.default_output.into());
        }

        let errors = validate_config(&config);

        match self.args.format {
            LintFormat::Json => {
                let output = serde_json::to_string_pretty(&errors)
                    .map_err(|e| WaypostError::Other(e.into()))?;
                ui.message(&output);
            }
            LintFormat::Human if errors.is_empty() => ui.success("Configuration is valid!"),
            LintFormat::Human => {
                for error in &errors {
                    ui.error(&Self::format_human(error));
                }
                ui.message(&format!("{} problem(s) found", errors.len()));
            }
        }

        if errors.is_empty() {
            Ok(CommandResult::success())
        } else {
            Ok(CommandResult::failure(1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::MockUI;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn setup_project(config: &str) -> TempDir {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".waypost");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.yml"), config).unwrap();
        temp
    }

    fn lint(root: &Path, format: LintFormat) -> (CommandResult, MockUI) {
        let mut ui = MockUI::new();
        let result = LintCommand::new(ConfigSource::new(root, None), LintArgs { format })
            .execute(&mut ui)
            .unwrap();
        (result, ui)
    }

    #[test]
    fn no_config_exits_2() {
        let temp = TempDir::new().unwrap();
        let (result, ui) = lint(temp.path(), LintFormat::Human);
        assert_eq!(result.exit_code, 2);
        assert!(ui.has_error("No configuration found"));
    }

    #[test]
    fn valid_config_passes() {
        let temp = setup_project("app_name: demo\n");
        let (result, ui) = lint(temp.path(), LintFormat::Human);
        assert!(result.success);
        assert!(ui.has_success("valid"));
    }

    #[test]
    fn broken_flow_is_reported_with_rule_and_location() {
        let temp = setup_project(
            r#"
flows:
  intake:
    steps:
      - id: start
        next: nowhere
"#,
        );
        let (result, ui) = lint(temp.path(), LintFormat::Human);
        assert_eq!(result.exit_code, 1);
        assert!(ui.has_error("error[unknown-target] [intake.start]"));
        assert!(ui.has_message("1 problem(s) found"));
    }

    #[test]
    fn json_format_lists_errors() {
        let temp = setup_project("settings:\n  dispatch_timeout: 0\n");
        let (result, ui) = lint(temp.path(), LintFormat::Json);
        assert_eq!(result.exit_code, 1);
        let value: serde_json::Value = serde_json::from_str(&ui.messages()[0]).unwrap();
        assert_eq!(value[0]["rule"], "zero-timeout");
    }

    #[test]
    fn parse_error_is_reported() {
        let temp = setup_project("flows: [unclosed\n");
        let (result, ui) = lint(temp.path(), LintFormat::Human);
        assert_eq!(result.exit_code, 1);
        assert!(ui.has_error("Parse error"));
    }
}
