//! Line-oriented terminal frontend.
//!
//! Streamed replies are printed as they arrive; the committed message that
//! follows only prints whatever the stream had not already shown.

use std::io::{self, Write};

use chrono::{Local, TimeZone};

use crate::core::app::{Frontend, MessageView, NotifyKind, Suggestion};
use crate::core::message::Role;

const PIN_MARKER: &str = "[pinned] ";

pub struct TerminalFrontend<W: Write + Send> {
    out: W,
    /// Reply text already echoed by `show_partial`.
    partial: String,
}

impl TerminalFrontend<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TerminalFrontend<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            partial: String::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, text: &str) {
        // a closed stdout is not worth crashing the chat over
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }

    fn end_partial(&mut self) {
        if !self.partial.is_empty() {
            self.partial.clear();
            self.write("\n");
        }
    }
}

fn format_time(timestamp: i64) -> String {
    Local
        .timestamp_millis_opt(timestamp)
        .single()
        .map(|time| time.format("%H:%M").to_string())
        .unwrap_or_default()
}

fn header(role: Role, timestamp: i64, pinned: bool) -> String {
    let pin = if pinned { PIN_MARKER } else { "" };
    format!("{pin}[{}] {}: ", format_time(timestamp), role.display_label())
}

impl<W: Write + Send> Frontend for TerminalFrontend<W> {
    fn notify(&mut self, kind: NotifyKind, message: &str) {
        self.end_partial();
        self.write(&format!("({}) {message}\n", kind.label()));
    }

    fn show_message(&mut self, view: &MessageView<'_>) {
        if view.role == Role::Bot && !self.partial.is_empty() {
            if let Some(rest) = view.text.strip_prefix(self.partial.as_str()) {
                let rest = rest.to_string();
                self.partial.clear();
                self.write(&format!("{rest}\n\n"));
                return;
            }
            self.end_partial();
        }

        let line = format!(
            "{}{}\n\n",
            header(view.role, view.timestamp, view.pinned),
            view.text
        );
        self.write(&line);
    }

    fn show_partial(&mut self, text: &str, _html: &str) {
        if self.partial.is_empty() {
            let start = header(Role::Bot, crate::core::message::now_millis(), false);
            self.write(&start);
        }

        match text.strip_prefix(self.partial.as_str()) {
            Some(delta) => {
                let delta = delta.to_string();
                self.write(&delta);
            }
            None => {
                // the reply was rewritten; start a fresh line
                self.write("\n");
                self.write(text);
            }
        }
        self.partial = text.to_string();
    }

    fn show_notice(&mut self, text: &str) {
        self.end_partial();
        self.write(&format!("{text}\n\n"));
    }

    fn show_suggestions(&mut self, suggestions: &[Suggestion]) {
        self.end_partial();
        let mut text = String::from("Try:\n");
        for suggestion in suggestions {
            text.push_str(&format!(
                "  {:<14} {}\n",
                suggestion.command, suggestion.description
            ));
        }
        self.write(&text);
    }

    fn clear_transcript(&mut self) {
        self.end_partial();
        self.write("\n──────────────────────────────\n\n");
    }

    fn set_processing(&mut self, processing: bool) {
        if processing {
            self.write("NEXUS is thinking...\n");
        }
    }
}
