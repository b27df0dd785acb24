mod handlers;
mod registry;

pub use registry::{all_commands, find_command, Command, CommandInvocation};

use thiserror::Error;
use tracing::warn;

use crate::core::app::{App, NotifyKind, Suggestion};
use crate::core::export::ExportError;
use crate::core::providers::ExchangeError;
use crate::core::session::SessionError;

/// Commands offered when usage history is thin.
pub const DEFAULT_SUGGESTIONS: [&str; 3] = ["/help", "/export", "/clear"];
const TOP_SUGGESTIONS: usize = 3;
const MAX_FILTERED_SUGGESTIONS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Continue,
    ExchangeStarted(u64),
    RunCode { language: String, code: String },
    Quit,
}

/// Failures raised by command handlers, reported at the dispatch boundary.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    Usage(String),

    #[error("Unknown personality '{0}'. Available: professional, friendly, sarcastic, creative")]
    UnknownPersonality(String),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Parse `/name args` and run the matching handler.
pub fn process_input(app: &mut App, input: &str) -> CommandResult {
    let trimmed = input.trim();
    let body = trimmed.strip_prefix('/').unwrap_or(trimmed);
    let mut parts = body.splitn(2, char::is_whitespace);
    let command_name = parts.next().unwrap_or("");
    let args = parts.next().unwrap_or("").trim();

    if command_name.is_empty() {
        let suggestions = suggestions(app, "");
        app.show_suggestions(&suggestions);
        return CommandResult::Continue;
    }

    let Some(command) = registry::find_command(command_name) else {
        app.notify(
            NotifyKind::Error,
            &format!("Unknown command: /{command_name}. Type /help for available commands."),
        );
        let similar = suggestions(app, command_name);
        if !similar.is_empty() {
            app.show_suggestions(&similar);
        }
        return CommandResult::Continue;
    };

    track_usage(app, command.name);

    match (command.handler)(app, CommandInvocation { args }) {
        Ok(result) => result,
        Err(e) => {
            warn!(command = command.name, "command failed: {e}");
            app.notify(
                NotifyKind::Error,
                &format!("Error executing command: {e}"),
            );
            CommandResult::Continue
        }
    }
}

fn track_usage(app: &mut App, name: &str) {
    *app.command_usage.entry(format!("/{name}")).or_insert(0) += 1;
    app.save();
}

/// The most used commands, padded with the defaults.
pub fn top_used_commands(app: &App) -> Vec<String> {
    let mut ranked: Vec<(&String, &u64)> = app.command_usage.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    let mut top: Vec<String> = ranked
        .into_iter()
        .take(TOP_SUGGESTIONS)
        .map(|(name, _)| name.clone())
        .collect();
    for default in DEFAULT_SUGGESTIONS {
        if top.len() >= TOP_SUGGESTIONS {
            break;
        }
        if !top.iter().any(|name| name == default) {
            top.push(default.to_string());
        }
    }
    top
}

/// Autocomplete for `/partial`: top commands when empty, else up to five
/// commands whose name contains `partial`.
pub fn suggestions(app: &App, partial: &str) -> Vec<Suggestion> {
    let partial = partial.trim_start_matches('/').to_ascii_lowercase();

    if partial.is_empty() {
        return top_used_commands(app)
            .into_iter()
            .map(|command| {
                let description = find_command(&command)
                    .map(|found| found.description)
                    .unwrap_or("");
                Suggestion {
                    command,
                    description,
                }
            })
            .collect();
    }

    all_commands()
        .iter()
        .filter(|command| command.name.contains(partial.as_str()))
        .take(MAX_FILTERED_SUGGESTIONS)
        .map(|command| Suggestion {
            command: format!("/{}", command.name),
            description: command.description,
        })
        .collect()
}
