use crate::core::message::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotifyKind {
    pub fn label(self) -> &'static str {
        match self {
            NotifyKind::Info => "info",
            NotifyKind::Success => "ok",
            NotifyKind::Warning => "warning",
            NotifyKind::Error => "error",
        }
    }
}

/// A transcript entry handed to the frontend.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageView<'a> {
    pub role: Role,
    /// Raw text as typed or received.
    pub text: &'a str,
    /// `text` run through the message formatter.
    pub html: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    /// False for greetings, apologies and other display-only entries.
    pub persisted: bool,
    pub pinned: bool,
}

/// Autocomplete entry for a partially typed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub command: String,
    pub description: &'static str,
}

/// Everything the core needs from a user interface.
pub trait Frontend: Send {
    /// Transient status line.
    fn notify(&mut self, kind: NotifyKind, message: &str);
    fn show_message(&mut self, view: &MessageView<'_>);
    /// The in-progress reply, re-rendered after every streamed delta.
    fn show_partial(&mut self, text: &str, html: &str);
    /// Multi-line informational output such as help or listings.
    fn show_notice(&mut self, text: &str);
    fn show_suggestions(&mut self, suggestions: &[Suggestion]);
    fn clear_transcript(&mut self);
    fn set_processing(&mut self, processing: bool);
}
