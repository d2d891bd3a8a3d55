//! Mock UI implementation for testing.
//!
//! `MockUI` implements the `UserInterface` trait and captures all
//! interactions for later assertion. It can be configured with
//! pre-determined prompt responses.
//!
//! # Example
//!
//! ```
//! use waypost::ui::{MockUI, Prompt, PromptType, UserInterface};
//!
//! let mut ui = MockUI::new();
//! ui.set_prompt_response("email", "user@example.com");
//!
//! let prompt = Prompt::new("email", "Email address", PromptType::Input);
//! assert_eq!(ui.prompt(&prompt).unwrap().as_string(), "user@example.com");
//! ui.success("Done!");
//!
//! assert_eq!(ui.prompts_shown(), ["email"]);
//! assert!(ui.has_success("Done"));
//! ```

use std::collections::{HashMap, VecDeque};

use crate::error::Result;

use super::{parse_bool, OutputMode, Prompt, PromptResult, PromptType, SpinnerHandle, UserInterface};

/// Mock UI implementation for testing.
///
/// Supports both single responses (via `set_prompt_response`) and queued
/// responses (via `queue_prompt_responses`) for keys asked more than once,
/// such as a field re-prompted after a validation error.
#[derive(Debug, Default)]
pub struct MockUI {
    mode: OutputMode,
    interactive: bool,
    messages: Vec<String>,
    successes: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
    headers: Vec<String>,
    steps: Vec<(usize, usize, String)>,
    spinners: Vec<String>,
    prompt_responses: HashMap<String, String>,
    prompt_queues: HashMap<String, VecDeque<String>>,
    prompts_shown: Vec<String>,
    /// Fallback response for any prompt key not otherwise configured.
    default_prompt_response: Option<String>,
}

impl MockUI {
    /// Create a new MockUI with Normal output mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new MockUI with a specific output mode.
    pub fn with_mode(mode: OutputMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Set a response for a prompt key.
    pub fn set_prompt_response(&mut self, key: &str, response: &str) {
        self.prompt_responses
            .insert(key.to_string(), response.to_string());
    }

    /// Queue multiple responses for the same prompt key.
    ///
    /// Responses are returned in order. After the queue is exhausted,
    /// falls back to `set_prompt_response` or defaults.
    pub fn queue_prompt_responses(&mut self, key: &str, responses: Vec<&str>) {
        let queue = responses.into_iter().map(|s| s.to_string()).collect();
        self.prompt_queues.insert(key.to_string(), queue);
    }

    /// Set a default response for any prompt key not explicitly configured.
    pub fn set_default_prompt_response(&mut self, response: &str) {
        self.default_prompt_response = Some(response.to_string());
    }

    /// Set whether this mock behaves as interactive.
    pub fn set_interactive(&mut self, interactive: bool) {
        self.interactive = interactive;
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn successes(&self) -> &[String] {
        &self.successes
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Steps shown, as (position, total, title).
    pub fn steps(&self) -> &[(usize, usize, String)] {
        &self.steps
    }

    /// Get all spinner messages that were started.
    pub fn spinners(&self) -> &[String] {
        &self.spinners
    }

    /// Get all prompts that were shown (by key).
    pub fn prompts_shown(&self) -> &[String] {
        &self.prompts_shown
    }

    pub fn has_message(&self, msg: &str) -> bool {
        self.messages.iter().any(|m| m.contains(msg))
    }

    pub fn has_success(&self, msg: &str) -> bool {
        self.successes.iter().any(|m| m.contains(msg))
    }

    pub fn has_error(&self, msg: &str) -> bool {
        self.errors.iter().any(|m| m.contains(msg))
    }

    pub fn has_warning(&self, msg: &str) -> bool {
        self.warnings.iter().any(|m| m.contains(msg))
    }

    fn next_response(&mut self, prompt: &Prompt) -> Option<String> {
        if let Some(response) = self
            .prompt_queues
            .get_mut(&prompt.key)
            .and_then(VecDeque::pop_front)
        {
            return Some(response);
        }
        self.prompt_responses
            .get(&prompt.key)
            .or(self.default_prompt_response.as_ref())
            .or(prompt.default.as_ref())
            .cloned()
    }
}

impl UserInterface for MockUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn set_output_mode(&mut self, mode: OutputMode) {
        self.mode = mode;
    }

    fn message(&mut self, msg: &str) {
        self.messages.push(msg.to_string());
    }

    fn success(&mut self, msg: &str) {
        self.successes.push(msg.to_string());
    }

    fn warning(&mut self, msg: &str) {
        self.warnings.push(msg.to_string());
    }

    fn error(&mut self, msg: &str) {
        self.errors.push(msg.to_string());
    }

    fn prompt(&mut self, prompt: &Prompt) -> Result<PromptResult> {
        self.prompts_shown.push(prompt.key.clone());

        let response = self.next_response(prompt);
        if matches!(prompt.prompt_type, PromptType::Confirm) {
            match response.as_deref() {
                Some(text) if text.trim().is_empty() => {
                    return Ok(PromptResult::String(String::new()));
                }
                other => {
                    let value = other.and_then(parse_bool).unwrap_or(false);
                    return Ok(PromptResult::Bool(value));
                }
            }
        }
        Ok(PromptResult::String(response.unwrap_or_default()))
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        self.spinners.push(message.to_string());
        Box::new(MockSpinner::new())
    }

    fn show_header(&mut self, title: &str) {
        self.headers.push(title.to_string());
    }

    fn show_step(&mut self, position: usize, total: usize, title: &str) {
        self.steps.push((position, total, title.to_string()));
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }
}

/// Mock spinner that records how it finished.
#[derive(Debug, Default)]
pub struct MockSpinner {
    pub messages: Vec<String>,
    pub finished: Option<String>,
}

impl MockSpinner {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpinnerHandle for MockSpinner {
    fn set_message(&mut self, msg: &str) {
        self.messages.push(msg.to_string());
    }

    fn finish_success(&mut self, msg: &str) {
        self.finished = Some(format!("success: {}", msg));
    }

    fn finish_error(&mut self, msg: &str) {
        self.finished = Some(format!("error: {}", msg));
    }

    fn finish_clear(&mut self) {
        self.finished = Some("cleared".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(key: &str) -> Prompt {
        Prompt::new(key, key, PromptType::Input)
    }

    #[test]
    fn captures_messages() {
        let mut ui = MockUI::new();
        ui.message("hello");
        ui.warning("careful");
        ui.error("boom");
        assert!(ui.has_message("hell"));
        assert!(ui.has_warning("careful"));
        assert!(ui.has_error("boom"));
    }

    #[test]
    fn queued_responses_come_first() {
        let mut ui = MockUI::new();
        ui.queue_prompt_responses("code", vec!["111111", "123456"]);
        ui.set_prompt_response("code", "999999");

        assert_eq!(ui.prompt(&input("code")).unwrap().as_string(), "111111");
        assert_eq!(ui.prompt(&input("code")).unwrap().as_string(), "123456");
        assert_eq!(ui.prompt(&input("code")).unwrap().as_string(), "999999");
        assert_eq!(ui.prompts_shown().len(), 3);
    }

    #[test]
    fn falls_back_to_prompt_default() {
        let mut ui = MockUI::new();
        let prompt = input("venue").with_default("Hall");
        assert_eq!(ui.prompt(&prompt).unwrap().as_string(), "Hall");
    }

    #[test]
    fn confirm_parses_response() {
        let mut ui = MockUI::new();
        ui.set_prompt_response("publish", "yes");
        let prompt = Prompt::new("publish", "Publish?", PromptType::Confirm);
        assert_eq!(ui.prompt(&prompt).unwrap(), PromptResult::Bool(true));
    }

    #[test]
    fn blank_confirm_response_stays_text() {
        let mut ui = MockUI::new();
        ui.set_prompt_response("publish", " ");
        let prompt = Prompt::new("publish", "Publish?", PromptType::Confirm);
        assert_eq!(ui.prompt(&prompt).unwrap(), PromptResult::String(String::new()));
    }

    #[test]
    fn unanswered_prompt_is_empty() {
        let mut ui = MockUI::new();
        assert_eq!(ui.prompt(&input("x")).unwrap().as_string(), "");
    }

    #[test]
    fn records_steps_and_spinners() {
        let mut ui = MockUI::new();
        ui.show_step(1, 3, "Email");
        let mut spinner = ui.start_spinner("Sending code");
        spinner.finish_success("sent");
        assert_eq!(ui.steps(), [(1, 3, "Email".to_string())]);
        assert_eq!(ui.spinners(), ["Sending code"]);
    }

    #[test]
    fn mock_spinner_records_finish() {
        let mut spinner = MockSpinner::new();
        spinner.set_message("working");
        spinner.finish_error("failed");
        assert_eq!(spinner.finished.as_deref(), Some("error: failed"));
    }
}
