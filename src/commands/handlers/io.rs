use std::path::Path;

use super::required_arg;
use crate::commands::registry::CommandInvocation;
use crate::commands::{CommandError, CommandResult};
use crate::core::app::{App, NotifyKind};
use crate::core::export::{read_import, ExportFormat};

pub(crate) fn handle_export(
    app: &mut App,
    invocation: CommandInvocation<'_>,
) -> Result<CommandResult, CommandError> {
    let format = invocation
        .first_arg()
        .unwrap_or(ExportFormat::Markdown.as_str())
        .parse::<ExportFormat>()?;

    let artifact = app.render_export(format)?;
    let path = artifact.write_to(&app.export_dir)?;
    app.notify(
        NotifyKind::Success,
        &format!("Exported as {} to {}", format.as_str().to_uppercase(), path.display()),
    );
    Ok(CommandResult::Continue)
}

pub(crate) fn handle_import(
    app: &mut App,
    invocation: CommandInvocation<'_>,
) -> Result<CommandResult, CommandError> {
    required_arg(&invocation, "/import <path>")?;
    let data = read_import(Path::new(invocation.args.trim()))?;

    let current = app.history.current_id().map(str::to_string);
    let touches_current = match (&data.chat_history, &current) {
        (Some(chats), Some(id)) => chats.contains_key(id),
        _ => false,
    };

    let merged = app.apply_import(data);
    if touches_current {
        app.replay_current();
    }
    app.notify(
        NotifyKind::Success,
        &format!("Data imported successfully ({merged} chats)"),
    );
    Ok(CommandResult::Continue)
}
