//! Non-interactive UI for scripted and CI runs.

use std::collections::HashMap;

use crate::error::{Result, WaypostError};

use super::theme::WaypostTheme;
use super::{
    parse_bool, OutputMode, Prompt, PromptResult, PromptType, SpinnerHandle, UserInterface,
};

/// Prefix of environment variables that answer prompts.
pub const PROMPT_ENV_PREFIX: &str = "WAYPOST_PROMPT_";

/// UI implementation for non-interactive mode.
///
/// Prompts are answered from `WAYPOST_PROMPT_<KEY>` environment variables,
/// then from the prompt's default. A prompt with neither is an error.
pub struct NonInteractiveUI {
    mode: OutputMode,
    env_overrides: HashMap<String, String>,
    theme: WaypostTheme,
}

impl NonInteractiveUI {
    /// Create a new non-interactive UI.
    pub fn new(mode: OutputMode) -> Self {
        let env_overrides: HashMap<String, String> = std::env::vars()
            .filter(|(k, _)| k.starts_with(PROMPT_ENV_PREFIX))
            .collect();
        Self::with_overrides(mode, env_overrides)
    }

    /// Create with explicit overrides (for testing).
    pub fn with_overrides(mode: OutputMode, overrides: HashMap<String, String>) -> Self {
        Self {
            mode,
            env_overrides: overrides,
            theme: WaypostTheme::plain(),
        }
    }

    /// Environment variable consulted for a prompt key.
    pub fn env_key(key: &str) -> String {
        format!("{}{}", PROMPT_ENV_PREFIX, key.to_uppercase())
    }
}

impl UserInterface for NonInteractiveUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn set_output_mode(&mut self, mode: OutputMode) {
        self.mode = mode;
    }

    fn message(&mut self, msg: &str) {
        if self.mode.shows_status() {
            println!("{}", msg);
        }
    }

    fn success(&mut self, msg: &str) {
        if self.mode.shows_status() {
            println!("{}", self.theme.format_success(msg));
        }
    }

    fn warning(&mut self, msg: &str) {
        if self.mode.shows_status() {
            eprintln!("{}", self.theme.format_warning(msg));
        }
    }

    fn error(&mut self, msg: &str) {
        eprintln!("{}", self.theme.format_error(msg));
    }

    fn prompt(&mut self, prompt: &Prompt) -> Result<PromptResult> {
        let answer = self
            .env_overrides
            .get(&Self::env_key(&prompt.key))
            .or(prompt.default.as_ref())
            .ok_or_else(|| WaypostError::MissingInput {
                field: prompt.key.clone(),
            })?;

        // A blank answer is left for the validator, which skips optional fields.
        if matches!(prompt.prompt_type, PromptType::Confirm) && !answer.trim().is_empty() {
            let value = parse_bool(answer).ok_or_else(|| WaypostError::MissingInput {
                field: prompt.key.clone(),
            })?;
            return Ok(PromptResult::Bool(value));
        }

        Ok(PromptResult::String(answer.clone()))
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        if self.mode.shows_spinners() {
            println!("  {}", message);
        }
        Box::new(PrintedSpinner {
            visible: self.mode.shows_status(),
            theme: self.theme.clone(),
        })
    }

    fn show_header(&mut self, title: &str) {
        if self.mode.shows_status() {
            println!("\n{}\n", self.theme.format_header(title));
        }
    }

    fn show_step(&mut self, position: usize, total: usize, title: &str) {
        if self.mode.shows_steps() {
            println!("{}", self.theme.format_step(position, total, title));
        }
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

/// Spinner stand-in that prints the final status line.
struct PrintedSpinner {
    visible: bool,
    theme: WaypostTheme,
}

impl SpinnerHandle for PrintedSpinner {
    fn set_message(&mut self, _msg: &str) {}

    fn finish_success(&mut self, msg: &str) {
        if self.visible {
            println!("  {}", self.theme.format_success(msg));
        }
    }

    fn finish_error(&mut self, msg: &str) {
        if self.visible {
            println!("  {}", self.theme.format_error(msg));
        }
    }

    fn finish_clear(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ui_with(pairs: &[(&str, &str)]) -> NonInteractiveUI {
        let overrides = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        NonInteractiveUI::with_overrides(OutputMode::Silent, overrides)
    }

    #[test]
    fn non_interactive_is_not_interactive() {
        assert!(!ui_with(&[]).is_interactive());
    }

    #[test]
    fn prompt_uses_default() {
        let mut ui = ui_with(&[]);
        let prompt = Prompt::new("venue", "Venue", PromptType::Input).with_default("Room 4");
        assert_eq!(ui.prompt(&prompt).unwrap().as_string(), "Room 4");
    }

    #[test]
    fn env_override_beats_default() {
        let mut ui = ui_with(&[("WAYPOST_PROMPT_EMAIL", "ops@example.org")]);
        let prompt = Prompt::new("email", "Email", PromptType::Input).with_default("x@y.z");
        assert_eq!(ui.prompt(&prompt).unwrap().as_string(), "ops@example.org");
    }

    #[test]
    fn env_key_is_uppercased() {
        assert_eq!(
            NonInteractiveUI::env_key("start_date"),
            "WAYPOST_PROMPT_START_DATE"
        );
    }

    #[test]
    fn blank_confirm_default_is_left_unanswered() {
        let mut ui = ui_with(&[]);
        let prompt = Prompt::new("review_publish", "Publish", PromptType::Confirm).with_default("");
        assert_eq!(ui.prompt(&prompt).unwrap(), PromptResult::String(String::new()));
    }

    #[test]
    fn confirm_reads_numeric_override() {
        let mut ui = ui_with(&[("WAYPOST_PROMPT_REVIEW_PUBLISH", "1")]);
        let prompt = Prompt::new("review_publish", "Publish", PromptType::Confirm);
        assert_eq!(ui.prompt(&prompt).unwrap(), PromptResult::Bool(true));
    }

    #[test]
    fn prompt_fails_without_answer() {
        let mut ui = ui_with(&[]);
        let prompt = Prompt::new("code", "Code", PromptType::Secret);
        assert!(matches!(
            ui.prompt(&prompt),
            Err(WaypostError::MissingInput { ref field }) if field == "code"
        ));
    }

    #[test]
    fn confirm_parses_answer() {
        let mut ui = ui_with(&[("WAYPOST_PROMPT_PUBLISH", "yes")]);
        let prompt = Prompt::new("publish", "Publish?", PromptType::Confirm);
        assert_eq!(ui.prompt(&prompt).unwrap(), PromptResult::Bool(true));
    }

    #[test]
    fn printed_spinner_finishes_quietly() {
        let mut ui = ui_with(&[]);
        let mut spinner = ui.start_spinner("Sending");
        spinner.set_message("still sending");
        spinner.finish_success("Sent");
        spinner.finish_error("failed");
    }
}
