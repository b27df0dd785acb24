use super::required_arg;
use crate::commands::registry::{all_commands, find_command, CommandInvocation};
use crate::commands::{CommandError, CommandResult};
use crate::core::app::{App, NotifyKind, PendingAction};
use crate::core::builtin_providers::{find_builtin_provider, load_builtin_providers};
use crate::core::message::Role;
use crate::core::personality::all_personalities;
use crate::core::store::Theme;
use crate::ui::html::extract_code_blocks;

const USAGE_CODE: &str = "/code [language] [code]";

pub(crate) fn handle_help(
    app: &mut App,
    invocation: CommandInvocation<'_>,
) -> Result<CommandResult, CommandError> {
    if let Some(name) = invocation.first_arg() {
        let command = find_command(name)
            .ok_or_else(|| CommandError::Usage(format!("Unknown command: /{}", name.trim_start_matches('/'))))?;
        app.notice(&format!(
            "{}\n{}\nExample: {}",
            command.usage, command.description, command.example
        ));
        return Ok(CommandResult::Continue);
    }

    let mut help = String::from("Available commands:\n");
    for command in all_commands() {
        help.push_str(&format!("  {:<40} {}\n", command.usage, command.description));
    }
    help.push_str("\nType /help <command> for an example.");
    app.notice(&help);
    Ok(CommandResult::Continue)
}

pub(crate) fn handle_clear(
    app: &mut App,
    _invocation: CommandInvocation<'_>,
) -> Result<CommandResult, CommandError> {
    app.request_confirmation(PendingAction::ClearCurrent);
    Ok(CommandResult::Continue)
}

pub(crate) fn handle_model(
    app: &mut App,
    invocation: CommandInvocation<'_>,
) -> Result<CommandResult, CommandError> {
    let Some(id) = invocation.first_arg() else {
        let mut listing = String::from("Models:\n");
        for provider in load_builtin_providers() {
            let marker = if provider.id == app.current_model { "*" } else { " " };
            listing.push_str(&format!(
                "{marker} {:<8} {} ({})\n",
                provider.id, provider.display_name, provider.model
            ));
        }
        app.notice(listing.trim_end());
        return Ok(CommandResult::Continue);
    };

    let kind = app.set_model(id)?;
    let name = find_builtin_provider(kind.id())
        .map(|provider| provider.display_name)
        .unwrap_or_else(|| kind.to_string());
    app.notify(NotifyKind::Success, &format!("Switched to {name}"));
    Ok(CommandResult::Continue)
}

pub(crate) fn handle_personality(
    app: &mut App,
    invocation: CommandInvocation<'_>,
) -> Result<CommandResult, CommandError> {
    let Some(id) = invocation.first_arg() else {
        let mut listing = String::from("Personalities:\n");
        for personality in all_personalities() {
            let marker = if personality.id == app.current_personality {
                "*"
            } else {
                " "
            };
            listing.push_str(&format!("{marker} {:<13} {}\n", personality.id, personality.name));
        }
        app.notice(listing.trim_end());
        return Ok(CommandResult::Continue);
    };

    let personality = app
        .set_personality(id)
        .ok_or_else(|| CommandError::UnknownPersonality(id.to_string()))?;
    app.notify(
        NotifyKind::Success,
        &format!("Switched to {} mode", personality.name),
    );
    app.show_display_only(Role::Bot, personality.greeting);
    Ok(CommandResult::Continue)
}

/// `/code` alone runs the last code block of the latest reply.
pub(crate) fn handle_code(
    app: &mut App,
    invocation: CommandInvocation<'_>,
) -> Result<CommandResult, CommandError> {
    if let Some(language) = invocation.first_arg() {
        let code = invocation.rest_after_first();
        if code.is_empty() {
            return Err(CommandError::Usage(format!("Usage: {USAGE_CODE}")));
        }
        return Ok(CommandResult::RunCode {
            language: language.to_string(),
            code: code.to_string(),
        });
    }

    let block = app
        .history
        .current()
        .and_then(|session| session.messages.iter().rev().find(|m| m.is_bot()))
        .and_then(|message| extract_code_blocks(&message.text).pop())
        .ok_or_else(|| {
            CommandError::Usage(format!(
                "No code block found in the last response. Usage: {USAGE_CODE}"
            ))
        })?;

    Ok(CommandResult::RunCode {
        language: block.language,
        code: block.code,
    })
}

pub(crate) fn handle_summarize(
    app: &mut App,
    _invocation: CommandInvocation<'_>,
) -> Result<CommandResult, CommandError> {
    Ok(match app.summarize_current() {
        Some(stream_id) => CommandResult::ExchangeStarted(stream_id),
        None => CommandResult::Continue,
    })
}

pub(crate) fn handle_pin(
    app: &mut App,
    _invocation: CommandInvocation<'_>,
) -> Result<CommandResult, CommandError> {
    let (_, pinned) = app
        .toggle_pin_last()
        .ok_or_else(|| CommandError::Usage("No message to pin".to_string()))?;
    let status = if pinned {
        "Message pinned"
    } else {
        "Message unpinned"
    };
    app.notify(NotifyKind::Success, status);
    Ok(CommandResult::Continue)
}

pub(crate) fn handle_memory(
    app: &mut App,
    invocation: CommandInvocation<'_>,
) -> Result<CommandResult, CommandError> {
    let enabled = match invocation.first_arg().map(str::to_ascii_lowercase).as_deref() {
        None | Some("toggle") => !app.history.memory_enabled(),
        Some("on") => true,
        Some("off") => false,
        Some(_) => return Err(CommandError::Usage("Usage: /memory [on|off]".to_string())),
    };

    app.set_memory_enabled(enabled);
    let status = if enabled {
        "Memory enabled"
    } else {
        "Memory disabled"
    };
    app.notify(NotifyKind::Info, status);
    Ok(CommandResult::Continue)
}

pub(crate) fn handle_analytics(
    app: &mut App,
    _invocation: CommandInvocation<'_>,
) -> Result<CommandResult, CommandError> {
    let summary = app.analytics.summary();
    app.notice(&summary);
    Ok(CommandResult::Continue)
}

pub(crate) fn handle_theme(
    app: &mut App,
    invocation: CommandInvocation<'_>,
) -> Result<CommandResult, CommandError> {
    let theme = match invocation.first_arg() {
        Some(name) => name.parse::<Theme>().map_err(CommandError::Usage)?,
        None => app.theme.next(),
    };
    app.set_theme(theme);
    app.notify(NotifyKind::Info, &format!("Theme: {}", theme.as_str()));
    Ok(CommandResult::Continue)
}

pub(crate) fn handle_profile(
    app: &mut App,
    invocation: CommandInvocation<'_>,
) -> Result<CommandResult, CommandError> {
    if invocation.args.is_empty() {
        let image = if app.user_profile.image.starts_with("data:") {
            "(embedded image)"
        } else {
            app.user_profile.image.as_str()
        };
        let text = format!("Name: {}\nImage: {}", app.user_profile.name, image);
        app.notice(&text);
        return Ok(CommandResult::Continue);
    }

    let name = required_arg(&invocation, "/profile [name]").map(|_| invocation.args.trim())?;
    app.user_profile.name = name.to_string();
    app.save_profile();
    app.notify(NotifyKind::Success, &format!("Profile name set to {name}"));
    Ok(CommandResult::Continue)
}

pub(crate) fn handle_quit(
    _app: &mut App,
    _invocation: CommandInvocation<'_>,
) -> Result<CommandResult, CommandError> {
    Ok(CommandResult::Quit)
}
