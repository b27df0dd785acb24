pub(super) mod chats;
pub(super) mod core;
pub(super) mod io;

pub(super) use self::chats::{handle_chats, handle_delete, handle_load, handle_new};
pub(super) use self::core::{
    handle_analytics, handle_clear, handle_code, handle_help, handle_memory, handle_model,
    handle_personality, handle_pin, handle_profile, handle_quit, handle_summarize, handle_theme,
};
pub(super) use self::io::{handle_export, handle_import};

use crate::commands::registry::CommandInvocation;
use crate::commands::CommandError;

pub(super) fn required_arg<'a>(
    invocation: &CommandInvocation<'a>,
    usage: &'static str,
) -> Result<&'a str, CommandError> {
    invocation
        .first_arg()
        .ok_or_else(|| CommandError::Usage(format!("Usage: {usage}")))
}
