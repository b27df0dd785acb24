use tracing::debug;

use super::{App, NotifyKind};
use crate::commands::{self, CommandResult};
use crate::core::session::DeleteOutcome;

/// A destructive action waiting for the user to type `y`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    ClearCurrent,
    Delete(String),
}

impl PendingAction {
    fn prompt(&self) -> String {
        match self {
            PendingAction::ClearCurrent => {
                "Clear the current chat? This cannot be undone. Type 'y' to confirm.".to_string()
            }
            PendingAction::Delete(id) => {
                format!("Delete chat '{id}'? This cannot be undone. Type 'y' to confirm.")
            }
        }
    }
}

/// `Some(true)` for y/yes, `Some(false)` for n/no or a blank line, `None` for
/// anything else.
fn confirmation_answer(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "" | "n" | "no" => Some(false),
        _ => None,
    }
}

/// What a line of input led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputOutcome {
    /// Nothing happened (empty input).
    Ignored,
    /// An exchange is already in flight.
    Busy,
    Handled,
    ExchangeStarted(u64),
    RunCode { language: String, code: String },
    Quit,
}

impl App {
    /// Entry point for one line typed by the user.
    pub fn submit_input(&mut self, input: &str) -> InputOutcome {
        if let Some(action) = self.pending_confirmation.take() {
            match confirmation_answer(input) {
                Some(true) => return self.confirm(action),
                Some(false) => {
                    self.notify(NotifyKind::Info, "Cancelled");
                    return InputOutcome::Handled;
                }
                None => {
                    // anything else cancels and is handled as ordinary input
                    self.notify(NotifyKind::Info, "Cancelled");
                }
            }
        }

        let trimmed = input.trim();
        if trimmed.is_empty() {
            self.notify(NotifyKind::Warning, "Please enter a message");
            return InputOutcome::Ignored;
        }

        if trimmed.starts_with('/') {
            return match commands::process_input(self, trimmed) {
                CommandResult::Continue => InputOutcome::Handled,
                CommandResult::ExchangeStarted(stream_id) => InputOutcome::ExchangeStarted(stream_id),
                CommandResult::RunCode { language, code } => {
                    InputOutcome::RunCode { language, code }
                }
                CommandResult::Quit => InputOutcome::Quit,
            };
        }

        self.send_message(trimmed)
    }

    pub fn request_confirmation(&mut self, action: PendingAction) {
        let prompt = action.prompt();
        self.pending_confirmation = Some(action);
        self.notify(NotifyKind::Warning, &prompt);
    }

    fn confirm(&mut self, action: PendingAction) -> InputOutcome {
        match action {
            PendingAction::ClearCurrent => {
                if let Some(id) = self.history.current_id().map(str::to_string) {
                    self.delete_chat(&id);
                } else {
                    self.start_new_chat();
                }
                self.notify(NotifyKind::Success, "Chat cleared");
            }
            PendingAction::Delete(id) => {
                if self.delete_chat(&id) {
                    self.notify(NotifyKind::Success, "Chat deleted");
                }
            }
        }
        InputOutcome::Handled
    }

    /// Delete a chat; deleting the current one opens a fresh chat.
    fn delete_chat(&mut self, id: &str) -> bool {
        let outcome = self
            .history
            .delete_session(id, &self.current_model, &self.current_personality);
        match outcome {
            Ok(DeleteOutcome::ReplacedCurrent { new_id }) => {
                debug!(deleted = id, current = %new_id, "current chat replaced");
                self.frontend.clear_transcript();
                self.show_greeting();
            }
            Ok(DeleteOutcome::Deleted) => {}
            Err(e) => {
                self.notify(NotifyKind::Error, &e.to_string());
                return false;
            }
        }
        self.pinned
            .retain(|pin| pin.split_once('#').map(|(chat, _)| chat) != Some(id));
        self.save_pinned();
        true
    }
}
