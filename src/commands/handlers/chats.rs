use super::required_arg;
use crate::commands::registry::CommandInvocation;
use crate::commands::{CommandError, CommandResult};
use crate::core::app::{App, NotifyKind, PendingAction};
use crate::core::session::SessionError;

pub(crate) fn handle_new(
    app: &mut App,
    _invocation: CommandInvocation<'_>,
) -> Result<CommandResult, CommandError> {
    app.start_new_chat();
    app.notify(NotifyKind::Success, "New chat started");
    Ok(CommandResult::Continue)
}

pub(crate) fn handle_chats(
    app: &mut App,
    _invocation: CommandInvocation<'_>,
) -> Result<CommandResult, CommandError> {
    let current = app.history.current_id().map(str::to_string);
    let mut listing = String::from("Chats (newest first):\n");
    for (id, session) in app.history.list_newest_first() {
        let marker = if current.as_deref() == Some(id) { "*" } else { " " };
        let date = chrono::DateTime::from_timestamp_millis(session.timestamp)
            .map(|date| {
                date.with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
            })
            .unwrap_or_default();
        listing.push_str(&format!(
            "{marker} {id}  {}  ({} messages, {date})\n",
            session.title,
            session.messages.len()
        ));
    }
    app.notice(listing.trim_end());
    Ok(CommandResult::Continue)
}

pub(crate) fn handle_load(
    app: &mut App,
    invocation: CommandInvocation<'_>,
) -> Result<CommandResult, CommandError> {
    let id = required_arg(&invocation, "/load <chat-id>")?;
    let title = app.history.load_session(id)?.title.clone();
    app.replay_current();
    app.save();
    app.notify(NotifyKind::Info, &format!("Loaded \"{title}\""));
    Ok(CommandResult::Continue)
}

pub(crate) fn handle_delete(
    app: &mut App,
    invocation: CommandInvocation<'_>,
) -> Result<CommandResult, CommandError> {
    let id = required_arg(&invocation, "/delete <chat-id>")?;
    if !app.history.contains(id) {
        return Err(SessionError::NotFound(id.to_string()).into());
    }
    app.request_confirmation(PendingAction::Delete(id.to_string()));
    Ok(CommandResult::Continue)
}
