//! Provider adapter.
//!
//! Resolves the active backend's endpoint and credential, builds the request
//! body and headers for one exchange, and pulls reply text back out of the
//! three response shapes. The set of backends is closed: every match over
//! [`ProviderKind`] is exhaustive.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::api::{
    ChatMessage, ChatRequest, ChatResponse, Content, GenerateContentRequest,
    GenerateContentResponse, GenerationConfig, MessagesRequest, MessagesResponse, Part,
    SystemInstruction,
};
use crate::core::builtin_providers::find_builtin_provider;
use crate::core::config::Config;
use crate::core::message::{Message, Role};
use crate::utils::auth::auth_headers;

const GEMINI_TOP_P: f32 = 0.8;
const GEMINI_TOP_K: u32 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Gemini,
    Gpt4,
    Claude,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::Gemini,
        ProviderKind::Gpt4,
        ProviderKind::Claude,
    ];

    pub fn id(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::Gpt4 => "gpt4",
            ProviderKind::Claude => "claude",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.id().eq_ignore_ascii_case(id.trim()))
    }

    /// Wire name for a stored role.
    fn wire_role(self, role: Role) -> &'static str {
        match (self, role) {
            (_, Role::User) => "user",
            (ProviderKind::Gemini, Role::Bot) => "model",
            (ProviderKind::Gpt4 | ProviderKind::Claude, Role::Bot) => "assistant",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Failures that end an exchange before or during the network call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExchangeError {
    #[error("Unknown model '{0}'. Available models: gemini, gpt4, claude")]
    UnknownProvider(String),

    #[error("No API key configured for {provider}. Set {env_var} or add api_key under [providers.{provider}] in config.toml")]
    MissingCredential { provider: String, env_var: String },

    #[error("API request failed: {status} - {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Stream interrupted: {0}")]
    Interrupted(String),

    #[error("{0}")]
    Provider(String),

    #[error("Invalid response format")]
    InvalidResponse,
}

/// Resolved endpoint for one backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub display_name: String,
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Environment variable consulted for the credential.
    pub api_key_env: String,
    pub streaming: bool,
}

impl ProviderConfig {
    /// Built-in defaults overlaid with `config.toml`, credential from config
    /// first and then the environment.
    pub fn resolve(config: &Config, id: &str) -> Result<Self, ExchangeError> {
        Self::resolve_with_env(config, id, |name| std::env::var(name).ok())
    }

    pub fn resolve_with_env<F>(config: &Config, id: &str, env: F) -> Result<Self, ExchangeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kind =
            ProviderKind::from_id(id).ok_or_else(|| ExchangeError::UnknownProvider(id.to_string()))?;
        let builtin = find_builtin_provider(kind.id())
            .ok_or_else(|| ExchangeError::UnknownProvider(id.to_string()))?;
        let overrides = config.provider_override(kind.id()).cloned().unwrap_or_default();

        let api_key = overrides
            .api_key
            .filter(|key| !key.trim().is_empty())
            .or_else(|| env(&builtin.api_key_env).filter(|key| !key.trim().is_empty()));

        Ok(Self {
            kind,
            display_name: builtin.display_name,
            url: overrides.url.unwrap_or(builtin.url),
            model: overrides.model.unwrap_or(builtin.model),
            api_key,
            api_key_env: builtin.api_key_env,
            streaming: overrides.streaming.unwrap_or(builtin.streaming),
        })
    }

    pub fn require_api_key(&self) -> Result<&str, ExchangeError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ExchangeError::MissingCredential {
                provider: self.kind.id().to_string(),
                env_var: self.api_key_env.clone(),
            })
    }

    /// Endpoint for this exchange. Gemini streams from a sibling method.
    pub fn endpoint(&self, stream: bool) -> String {
        match self.kind {
            ProviderKind::Gemini if stream => {
                let base = match self.url.split_once('?') {
                    Some((base, _)) => base,
                    None => self.url.as_str(),
                };
                let base = base
                    .strip_suffix(":generateContent")
                    .unwrap_or(base)
                    .trim_end_matches(":streamGenerateContent");
                format!("{base}:streamGenerateContent?alt=sse")
            }
            _ => self.url.clone(),
        }
    }
}

/// Sampling knobs carried from the behavior config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

/// A fully prepared outbound call.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub kind: ProviderKind,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
    pub stream: bool,
}

/// Build the request for `outbound` preceded by the `history` window.
pub fn build_request(
    provider: &ProviderConfig,
    system_prompt: &str,
    history: &[Message],
    outbound: &str,
    options: RequestOptions,
) -> Result<HttpRequest, ExchangeError> {
    let api_key = provider.require_api_key()?;
    let kind = provider.kind;
    let stream = options.stream && provider.streaming;

    let turns = history
        .iter()
        .map(|message| (kind.wire_role(message.role), message.text.as_str()))
        .chain(std::iter::once(("user", outbound)));

    let body = match kind {
        ProviderKind::Gemini => serde_json::to_value(GenerateContentRequest {
            contents: turns
                .map(|(role, text)| Content {
                    role: role.to_string(),
                    parts: vec![Part {
                        text: text.to_string(),
                    }],
                })
                .collect(),
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: system_prompt.to_string(),
                }],
            },
            generation_config: GenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_tokens,
                top_p: GEMINI_TOP_P,
                top_k: GEMINI_TOP_K,
            },
        }),
        ProviderKind::Gpt4 => serde_json::to_value(ChatRequest {
            model: provider.model.clone(),
            messages: std::iter::once(ChatMessage::new("system", system_prompt))
                .chain(turns.map(|(role, text)| ChatMessage::new(role, text)))
                .collect(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stream,
        }),
        ProviderKind::Claude => serde_json::to_value(MessagesRequest {
            model: provider.model.clone(),
            system: system_prompt.to_string(),
            messages: turns.map(|(role, text)| ChatMessage::new(role, text)).collect(),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            stream,
        }),
    }
    .map_err(|_| ExchangeError::InvalidResponse)?;

    let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
    headers.extend(auth_headers(kind, api_key));

    Ok(HttpRequest {
        kind,
        url: provider.endpoint(stream),
        headers,
        body,
        stream,
    })
}

/// Reply text from a complete body or one stream record. `None` when `raw` is
/// not JSON at all.
pub fn parse_reply(kind: ProviderKind, raw: &str) -> Option<String> {
    let value: Value = serde_json::from_str(raw).ok()?;
    Some(reply_from_value(kind, value))
}

/// Reply text from `raw`, or an empty string when nothing usable is present.
pub fn extract_reply(kind: ProviderKind, raw: &str) -> String {
    parse_reply(kind, raw).unwrap_or_default()
}

pub(crate) fn reply_from_value(kind: ProviderKind, value: Value) -> String {
    match kind {
        ProviderKind::Gemini => serde_json::from_value::<GenerateContentResponse>(value)
            .ok()
            .and_then(|response| response.candidates.into_iter().next())
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default(),
        ProviderKind::Gpt4 => serde_json::from_value::<ChatResponse>(value)
            .ok()
            .and_then(|response| response.choices.into_iter().next())
            .and_then(|choice| choice.delta.or(choice.message))
            .and_then(|content| content.content)
            .unwrap_or_default(),
        ProviderKind::Claude => serde_json::from_value::<MessagesResponse>(value)
            .ok()
            .and_then(|response| {
                response
                    .delta
                    .and_then(|delta| delta.text)
                    .or_else(|| response.content.into_iter().find_map(|block| block.text))
            })
            .unwrap_or_default(),
    }
}

/// Provider error message carried inside a JSON payload, if any.
pub fn extract_error_summary(value: &Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                Value::String(s) => Some(s.to_string()),
                Value::Object(map) => map
                    .get("type")
                    .and_then(|kind| kind.as_str().map(str::to_owned)),
                _ => None,
            })
        });

    summary.map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// One-line description of a failed response body.
pub fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();
    if trimmed.is_empty() {
        return "<no body>".to_string();
    }

    serde_json::from_str::<Value>(trimmed)
        .ok()
        .and_then(|value| extract_error_summary(&value))
        .filter(|summary| !summary.is_empty())
        .unwrap_or_else(|| trimmed.split_whitespace().collect::<Vec<_>>().join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ProviderOverride;
    use serde_json::json;

    fn env_with_keys(name: &str) -> Option<String> {
        match name {
            "GEMINI_API_KEY" => Some("gemini-env".to_string()),
            "OPENAI_API_KEY" => Some("openai-env".to_string()),
            "ANTHROPIC_API_KEY" => Some("anthropic-env".to_string()),
            _ => None,
        }
    }

    fn options() -> RequestOptions {
        RequestOptions {
            temperature: 0.7,
            max_tokens: 2048,
            stream: true,
        }
    }

    fn history() -> Vec<Message> {
        vec![
            Message::new(Role::User, "hi", "gpt4", "professional"),
            Message::new(Role::Bot, "hello", "gpt4", "professional"),
        ]
    }

    fn header<'a>(request: &'a HttpRequest, name: &str) -> Option<&'a str> {
        request
            .headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    #[test]
    fn provider_ids_round_trip() {
        for kind in ProviderKind::ALL {
            assert_eq!(ProviderKind::from_id(kind.id()), Some(kind));
        }
        assert_eq!(ProviderKind::from_id("CLAUDE"), Some(ProviderKind::Claude));
        assert_eq!(ProviderKind::from_id("llama"), None);
    }

    #[test]
    fn config_key_wins_over_environment() {
        let mut config = Config::default();
        config.providers.insert(
            "claude".to_string(),
            ProviderOverride {
                api_key: Some("from-config".to_string()),
                url: Some("http://localhost/v1/messages".to_string()),
                ..Default::default()
            },
        );

        let claude = ProviderConfig::resolve_with_env(&config, "claude", env_with_keys).unwrap();
        assert_eq!(claude.api_key.as_deref(), Some("from-config"));
        assert_eq!(claude.url, "http://localhost/v1/messages");

        let gpt4 = ProviderConfig::resolve_with_env(&config, "gpt4", env_with_keys).unwrap();
        assert_eq!(gpt4.api_key.as_deref(), Some("openai-env"));
        assert_eq!(gpt4.model, "gpt-4");
    }

    #[test]
    fn missing_credential_fails_before_building() {
        let provider = ProviderConfig::resolve_with_env(&Config::default(), "gpt4", |_| None).unwrap();
        let err = build_request(&provider, "sys", &[], "hello", options()).unwrap_err();
        assert_eq!(
            err,
            ExchangeError::MissingCredential {
                provider: "gpt4".to_string(),
                env_var: "OPENAI_API_KEY".to_string(),
            }
        );
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = ProviderConfig::resolve_with_env(&Config::default(), "llama", env_with_keys)
            .unwrap_err();
        assert!(matches!(err, ExchangeError::UnknownProvider(id) if id == "llama"));
    }

    #[test]
    fn gpt4_request_injects_system_message_first() {
        let provider = ProviderConfig::resolve_with_env(&Config::default(), "gpt4", env_with_keys).unwrap();
        let request = build_request(&provider, "be precise", &history(), "next", options()).unwrap();

        assert_eq!(request.url, "https://api.openai.com/v1/chat/completions");
        assert_eq!(header(&request, "authorization"), Some("Bearer openai-env"));
        assert!(request.stream);
        assert_eq!(
            request.body["messages"],
            json!([
                {"role": "system", "content": "be precise"},
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "hello"},
                {"role": "user", "content": "next"},
            ])
        );
        assert_eq!(request.body["model"], "gpt-4");
        assert_eq!(request.body["max_tokens"], 2048);
    }

    #[test]
    fn claude_request_uses_top_level_system() {
        let provider = ProviderConfig::resolve_with_env(&Config::default(), "claude", env_with_keys).unwrap();
        let request = build_request(&provider, "be witty", &history(), "next", options()).unwrap();

        assert_eq!(request.body["system"], "be witty");
        assert_eq!(request.body["messages"][0]["role"], "user");
        assert_eq!(request.body["messages"][1]["role"], "assistant");
        assert_eq!(request.body["messages"].as_array().unwrap().len(), 3);
        assert_eq!(header(&request, "x-api-key"), Some("anthropic-env"));
        assert_eq!(header(&request, "anthropic-version"), Some("2023-06-01"));
        assert!(header(&request, "authorization").is_none());
    }

    #[test]
    fn gemini_request_maps_bot_to_model_role() {
        let provider = ProviderConfig::resolve_with_env(&Config::default(), "gemini", env_with_keys).unwrap();
        let request = build_request(&provider, "be creative", &history(), "next", options()).unwrap();

        // gemini ships with streaming off, so the single-shot endpoint is used
        assert!(!request.stream);
        assert!(request.url.ends_with(":generateContent"));
        assert_eq!(header(&request, "x-goog-api-key"), Some("gemini-env"));
        assert_eq!(request.body["contents"][1]["role"], "model");
        assert_eq!(request.body["contents"][2]["parts"][0]["text"], "next");
        assert_eq!(
            request.body["systemInstruction"]["parts"][0]["text"],
            "be creative"
        );
        assert_eq!(request.body["generationConfig"]["topK"], 40);
    }

    #[test]
    fn gemini_streaming_switches_endpoint() {
        let mut provider =
            ProviderConfig::resolve_with_env(&Config::default(), "gemini", env_with_keys).unwrap();
        provider.streaming = true;

        assert_eq!(
            provider.endpoint(true),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:streamGenerateContent?alt=sse"
        );
        assert_eq!(provider.endpoint(false), provider.url);
    }

    #[test]
    fn extract_reply_handles_each_shape() {
        let gemini = r#"{"candidates":[{"content":{"parts":[{"text":"Hi "},{"text":"there"}]}}]}"#;
        assert_eq!(extract_reply(ProviderKind::Gemini, gemini), "Hi there");

        let openai_full = r#"{"choices":[{"message":{"role":"assistant","content":"Full"}}]}"#;
        assert_eq!(extract_reply(ProviderKind::Gpt4, openai_full), "Full");
        let openai_delta = r#"{"choices":[{"delta":{"content":"Tok"}}]}"#;
        assert_eq!(extract_reply(ProviderKind::Gpt4, openai_delta), "Tok");

        let claude_full = r#"{"content":[{"type":"text","text":"Answer"}]}"#;
        assert_eq!(extract_reply(ProviderKind::Claude, claude_full), "Answer");
        let claude_delta =
            r#"{"type":"content_block_delta","delta":{"type":"text_delta","text":"Piece"}}"#;
        assert_eq!(extract_reply(ProviderKind::Claude, claude_delta), "Piece");
    }

    #[test]
    fn extract_reply_tolerates_partial_or_invalid_input() {
        assert_eq!(extract_reply(ProviderKind::Gemini, r#"{"candidates":[]}"#), "");
        assert_eq!(extract_reply(ProviderKind::Gpt4, r#"{"choices":[{}]}"#), "");
        assert_eq!(extract_reply(ProviderKind::Claude, r#"{"type":"ping"}"#), "");
        assert_eq!(extract_reply(ProviderKind::Gpt4, "not json"), "");
        assert_eq!(parse_reply(ProviderKind::Gpt4, "not json"), None);
    }

    #[test]
    fn format_api_error_prefers_provider_message() {
        let raw = r#"{"error":{"message":"model   overloaded","type":"server_error"}}"#;
        assert_eq!(format_api_error(raw), "model overloaded");
        assert_eq!(
            format_api_error(r#"{"type":"error","error":{"type":"overloaded_error"}}"#),
            "overloaded_error"
        );
        assert_eq!(format_api_error("bad gateway\n"), "bad gateway");
        assert_eq!(format_api_error(""), "<no body>");
    }
}
