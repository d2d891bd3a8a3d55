//! Show command implementation.
//!
//! The `waypost show <flow>` command prints the structure of one flow.

use crate::cli::args::ShowArgs;
use crate::error::{Result, WaypostError};
use crate::flow::{FlowSchema, StepDefinition, Validator};
use crate::registry::FlowRegistry;
use crate::ui::{UserInterface, WaypostTheme};

use super::dispatcher::{Command, CommandResult, ConfigSource};

/// The show command implementation.
pub struct ShowCommand {
    source: ConfigSource,
    args: ShowArgs,
}

impl ShowCommand {
    /// Create a new show command.
    pub fn new(source: ConfigSource, args: ShowArgs) -> Self {
        Self { source, args }
    }
}

fn describe_validator(validator: &Validator) -> String {
    match validator {
        Validator::Text {
            min_length: Some(min),
        } => format!("text, min {}", min),
        Validator::Digits { length: Some(len) } => format!("{} digits", len),
        Validator::Choice { options } => format!("one of {}", options.join(" | ")),
        Validator::Pattern { source, .. } => format!("matches {}", source),
        other => other.kind().to_string(),
    }
}

fn show_step(step: &StepDefinition, entry: bool, theme: &WaypostTheme, ui: &mut dyn UserInterface) {
    let mut heading = format!("  {}", theme.highlight.apply_to(step.id.as_str()));
    if step.title.is_some() {
        heading.push_str(&format!(" {}", theme.dim.apply_to(step.display_title())));
    }
    if entry {
        heading.push_str(&format!(" {}", theme.info.apply_to("(entry)")));
    }
    if let Some(outcome) = step.terminal {
        heading.push_str(&format!(
            " {}",
            theme.info.apply_to(format!("(terminal: {:?})", outcome).to_lowercase())
        ));
    }
    ui.message(&heading);

    for field in &step.fields {
        let mut flags = Vec::new();
        if !field.required {
            flags.push("optional");
        }
        if field.secret {
            flags.push("secret");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        ui.message(&format!(
            "    {} {}{}",
            theme.key.apply_to(&field.name),
            theme.dim.apply_to(describe_validator(&field.validator)),
            flags
        ));
    }

    if let Some(effect) = &step.effect {
        ui.message(&format!("    {}", theme.format_pair("effect", effect)));
    }
    for rule in &step.branches {
        ui.message(&format!(
            "    {} {} {}",
            theme.dim.apply_to(format!("when {}", rule.condition)),
            theme.dim.apply_to("→"),
            rule.target
        ));
    }
    if let Some(next) = &step.next {
        ui.message(&format!("    {} {}", theme.dim.apply_to("→"), next));
    }
}

fn show_flow(schema: &FlowSchema, source: &str, ui: &mut dyn UserInterface) {
    let theme = WaypostTheme::detect();
    ui.show_header(schema.name());
    if let Some(description) = schema.description() {
        ui.message(description);
    }
    ui.message(&theme.format_pair("Source", source));
    ui.message("");
    for step in schema.steps() {
        show_step(step, step.id == *schema.entry(), &theme, ui);
    }
}

impl Command for ShowCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let config = self.source.load(ui)?;
        let registry = FlowRegistry::load(&config)?;

        match registry.require(&self.args.flow) {
            Ok(flow) => {
                show_flow(&flow.schema, &flow.source.to_string(), ui);
                Ok(CommandResult::success())
            }
            Err(WaypostError::UnknownFlow { name }) => {
                ui.error(&format!("Unknown flow: {}", name));
                Ok(CommandResult::failure(1))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::MockUI;
    use tempfile::TempDir;

    fn show(flow: &str) -> (CommandResult, MockUI) {
        let temp = TempDir::new().unwrap();
        let mut ui = MockUI::new();
        let args = ShowArgs {
            flow: flow.to_string(),
        };
        let result = ShowCommand::new(ConfigSource::new(temp.path(), None), args)
            .execute(&mut ui)
            .unwrap();
        (result, ui)
    }

    #[test]
    fn shows_password_reset_structure() {
        let (result, ui) = show("password_reset");
        assert!(result.success);
        assert_eq!(ui.headers(), ["password_reset"]);
        assert!(ui.has_message("(entry)"));
        assert!(ui.has_message("6 digits"));
        assert!(ui.has_message("[secret]"));
        assert!(ui.has_message("verify_code"));
        assert!(ui.has_message("when payload.matched == true"));
        assert!(ui.has_message("(terminal: failed)"));
    }

    #[test]
    fn shows_choice_options() {
        let (_, ui) = show("course_creation");
        assert!(ui.has_message("one of online | in_person | blended"));
    }

    #[test]
    fn unknown_flow_is_reported() {
        let (result, ui) = show("missing");
        assert_eq!(result.exit_code, 1);
        assert!(ui.has_error("Unknown flow: missing"));
    }

    #[test]
    fn describes_validators() {
        assert_eq!(describe_validator(&Validator::Email), "email");
        assert_eq!(
            describe_validator(&Validator::Text {
                min_length: Some(3)
            }),
            "text, min 3"
        );
    }
}
