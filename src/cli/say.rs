//! One-shot "say" command

use std::error::Error;
use std::io::{self, Write};

use tokio_util::sync::CancellationToken;

use crate::core::chat_stream::{ChatStreamService, ExchangeParams, StreamMessage};
use crate::core::personality::{personality_or_default, DEFAULT_PERSONALITY};
use crate::core::providers::{build_request, ProviderConfig, RequestOptions};
use crate::core::store::{FileStore, Store, DEFAULT_MODEL};
use crate::logging;
use crate::ui::chat_loop::ChatOptions;

/// Provider and personality for a one-shot prompt: flags first, then
/// `config.toml` defaults.
fn pick<'a>(flag: Option<&'a str>, configured: Option<&'a str>, fallback: &'a str) -> &'a str {
    flag.or(configured).unwrap_or(fallback)
}

pub async fn run_say(prompt: Vec<String>, options: &ChatOptions) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: nexus say <prompt>");
        std::process::exit(1);
    }

    let (config, data_dir) = options.load_config()?;
    logging::init_or_warn(&data_dir);
    let behavior = Store::new(FileStore::new(&data_dir)).load_settings().config;

    let provider_id = pick(
        options.provider.as_deref(),
        config.default_provider.as_deref(),
        DEFAULT_MODEL,
    );
    let personality = personality_or_default(pick(
        options.personality.as_deref(),
        config.default_personality.as_deref(),
        DEFAULT_PERSONALITY,
    ));

    let provider = ProviderConfig::resolve(&config, provider_id)?;
    let request = build_request(
        &provider,
        personality.system_prompt,
        &[],
        &prompt,
        RequestOptions {
            temperature: behavior.temperature,
            max_tokens: behavior.max_tokens,
            stream: behavior.streaming_enabled && !options.disable_streaming,
        },
    )?;

    let (stream_service, mut rx) = ChatStreamService::new();
    stream_service.spawn_exchange(ExchangeParams {
        client: reqwest::Client::new(),
        request,
        cancel_token: CancellationToken::new(),
        stream_id: 1,
    });

    let mut failed = false;
    while let Some((message, _)) = rx.recv().await {
        match message {
            StreamMessage::Chunk(content) => {
                print!("{content}");
                io::stdout().flush()?;
            }
            StreamMessage::Error(err) => {
                eprintln!("\n❌ {err}");
                failed = true;
            }
            StreamMessage::End => {
                println!();
                break;
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::pick;

    #[test]
    fn flag_beats_config_beats_fallback() {
        assert_eq!(pick(Some("claude"), Some("gpt4"), "gemini"), "claude");
        assert_eq!(pick(None, Some("gpt4"), "gemini"), "gpt4");
        assert_eq!(pick(None, None, "gemini"), "gemini");
    }
}
