use super::{handlers, CommandError, CommandResult};
use crate::core::app::App;

pub type CommandHandler = fn(&mut App, CommandInvocation<'_>) -> Result<CommandResult, CommandError>;

pub struct Command {
    pub name: &'static str,
    pub description: &'static str,
    pub usage: &'static str,
    pub example: &'static str,
    pub handler: CommandHandler,
}

#[derive(Clone, Copy)]
pub struct CommandInvocation<'a> {
    pub args: &'a str,
}

impl<'a> CommandInvocation<'a> {
    pub fn first_arg(&self) -> Option<&'a str> {
        self.args.split_whitespace().next()
    }

    /// Everything after the first argument, leading whitespace removed.
    pub fn rest_after_first(&self) -> &'a str {
        let args = self.args.trim_start();
        match args.find(char::is_whitespace) {
            Some(index) => args[index..].trim_start(),
            None => "",
        }
    }
}

pub fn all_commands() -> &'static [Command] {
    COMMANDS
}

pub fn find_command(name: &str) -> Option<&'static Command> {
    let name = name.strip_prefix('/').unwrap_or(name);
    all_commands()
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}

const COMMANDS: &[Command] = &[
    Command {
        name: "help",
        description: "Show available commands",
        usage: "/help [command]",
        example: "/help export → Show help for export",
        handler: handlers::handle_help,
    },
    Command {
        name: "clear",
        description: "Clear current chat",
        usage: "/clear",
        example: "/clear → Clear all messages",
        handler: handlers::handle_clear,
    },
    Command {
        name: "export",
        description: "Export chat in various formats",
        usage: "/export [markdown|all|json|html|pdf]",
        example: "/export json → Export everything as JSON",
        handler: handlers::handle_export,
    },
    Command {
        name: "model",
        description: "Switch AI model",
        usage: "/model [gemini|gpt4|claude]",
        example: "/model gpt4 → Switch to GPT-4",
        handler: handlers::handle_model,
    },
    Command {
        name: "personality",
        description: "Change personality mode",
        usage: "/personality [professional|friendly|sarcastic|creative]",
        example: "/personality friendly → Switch to friendly mode",
        handler: handlers::handle_personality,
    },
    Command {
        name: "code",
        description: "Execute code",
        usage: "/code [language] [code]",
        example: "/code js console.log('Hello')",
        handler: handlers::handle_code,
    },
    Command {
        name: "summarize",
        description: "Summarize current chat",
        usage: "/summarize",
        example: "/summarize → Get chat summary",
        handler: handlers::handle_summarize,
    },
    Command {
        name: "pin",
        description: "Pin the last message",
        usage: "/pin",
        example: "/pin → Pin last message",
        handler: handlers::handle_pin,
    },
    Command {
        name: "new",
        description: "Start a new chat",
        usage: "/new",
        example: "/new → Open an empty chat",
        handler: handlers::handle_new,
    },
    Command {
        name: "chats",
        description: "List saved chats",
        usage: "/chats",
        example: "/chats → Show chats, newest first",
        handler: handlers::handle_chats,
    },
    Command {
        name: "load",
        description: "Switch to a saved chat",
        usage: "/load <chat-id>",
        example: "/load chat_1700000000000 → Resume that chat",
        handler: handlers::handle_load,
    },
    Command {
        name: "delete",
        description: "Delete a saved chat",
        usage: "/delete <chat-id>",
        example: "/delete chat_1700000000000 → Remove that chat",
        handler: handlers::handle_delete,
    },
    Command {
        name: "memory",
        description: "Toggle conversation memory",
        usage: "/memory [on|off]",
        example: "/memory off → Stop saving messages",
        handler: handlers::handle_memory,
    },
    Command {
        name: "analytics",
        description: "Show usage statistics",
        usage: "/analytics",
        example: "/analytics → Messages, words and response times",
        handler: handlers::handle_analytics,
    },
    Command {
        name: "theme",
        description: "Cycle or set the theme",
        usage: "/theme [auto|light|dark|matrix|cyberpunk]",
        example: "/theme matrix → Switch to the matrix theme",
        handler: handlers::handle_theme,
    },
    Command {
        name: "import",
        description: "Import chats from a JSON export",
        usage: "/import <path>",
        example: "/import nexus-export.json → Merge exported chats",
        handler: handlers::handle_import,
    },
    Command {
        name: "profile",
        description: "Show or rename your profile",
        usage: "/profile [name]",
        example: "/profile Ada → Set your display name",
        handler: handlers::handle_profile,
    },
    Command {
        name: "quit",
        description: "Save and exit",
        usage: "/quit",
        example: "/quit → Leave NEXUS",
        handler: handlers::handle_quit,
    },
];
