//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod data;
pub mod personality_list;
pub mod provider_list;
pub mod say;
pub mod set_key;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli::data::{run_chats, run_export, run_import, run_profile};
use crate::cli::personality_list::list_personalities;
use crate::cli::provider_list::list_providers;
use crate::cli::say::run_say;
use crate::cli::set_key::run_set_key;
use crate::core::personality::{find_personality, personality_ids};
use crate::core::providers::{ExchangeError, ProviderKind};
use crate::ui::chat_loop::{run_chat, ChatOptions};

#[derive(Parser)]
#[command(name = "nexus", version)]
#[command(about = "A terminal chat client for Gemini, GPT-4 and Claude")]
#[command(
    long_about = "NEXUS is a terminal chat client that talks to Gemini, GPT-4 or Claude with a \
selectable personality. Chats, settings and usage counters are kept in a local data directory.\n\n\
Credentials:\n\
  GEMINI_API_KEY     Key for the gemini provider\n\
  OPENAI_API_KEY     Key for the gpt4 provider\n\
  ANTHROPIC_API_KEY  Key for the claude provider\n\
  Keys may also be set as api_key under [providers.<id>] in config.toml.\n\n\
Diagnostics:\n\
  NEXUS_LOG          Log filter (default nexus=info), written to <data-dir>/nexus.log\n\n\
In chat:\n\
  Enter              Send the message\n\
  /help              List slash commands\n\
  /quit or Ctrl+D    Leave"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Provider to use (gemini, gpt4, claude)
    #[arg(short = 'p', long, global = true, value_name = "PROVIDER")]
    pub provider: Option<String>,

    /// Personality to use (professional, friendly, sarcastic, creative)
    #[arg(short = 'P', long, global = true, value_name = "PERSONALITY")]
    pub personality: Option<String>,

    /// Directory holding chats and settings
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Ask for complete replies instead of streamed ones
    #[arg(long, global = true)]
    pub no_stream: bool,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Send one prompt and print the reply without touching chat history
    Say {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        prompt: Vec<String>,
    },
    /// Export chats to a file
    Export {
        /// markdown, all, json, html or pdf
        #[arg(short, long, default_value = "markdown")]
        format: String,
        /// Chat id to export (defaults to the most recent chat)
        #[arg(short, long)]
        chat: Option<String>,
        /// Output directory (defaults to the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Merge chats and settings from a JSON export
    Import { file: PathBuf },
    /// List saved chats, newest first
    Chats,
    /// List providers and whether a credential is available
    Providers,
    /// List personalities
    Personalities,
    /// Show or update the user profile
    Profile {
        #[arg(long)]
        name: Option<String>,
        /// Image file embedded as a data URL
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Save a provider API key in config.toml (prompts when KEY is omitted)
    SetKey { provider: String, key: Option<String> },
}

impl Args {
    pub fn chat_options(&self) -> ChatOptions {
        ChatOptions {
            provider: self.provider.clone(),
            personality: self.personality.clone(),
            data_dir: self.data_dir.clone(),
            disable_streaming: self.no_stream,
        }
    }

    /// Reject unknown `--provider` / `--personality` values up front.
    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        if let Some(provider) = &self.provider {
            if ProviderKind::from_id(provider).is_none() {
                return Err(ExchangeError::UnknownProvider(provider.clone()).into());
            }
        }
        if let Some(personality) = &self.personality {
            if find_personality(personality).is_none() {
                return Err(format!(
                    "Unknown personality '{personality}'. Available: {}",
                    personality_ids().join(", ")
                )
                .into());
            }
        }
        Ok(())
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let mut args = Args::parse();
    if let Err(e) = args.validate() {
        eprintln!("❌ {e}");
        std::process::exit(2);
    }

    let options = args.chat_options();
    match args.command.take().unwrap_or(Commands::Chat) {
        Commands::Chat => run_chat(options).await,
        Commands::Say { prompt } => run_say(prompt, &options).await,
        Commands::Export {
            format,
            chat,
            output,
        } => run_export(&options, &format, chat, output),
        Commands::Import { file } => run_import(&options, &file),
        Commands::Chats => run_chats(&options),
        Commands::Providers => list_providers(&options),
        Commands::Personalities => {
            list_personalities(&options);
            Ok(())
        }
        Commands::Profile { name, image } => run_profile(&options, name, image),
        Commands::SetKey { provider, key } => run_set_key(&provider, key),
    }
}
