//! Wire payloads for the three supported backends.
//!
//! Request types serialize to the exact body each provider expects. Response
//! types are permissive: every field is optional or defaulted so
//! partial stream fragments still deserialize.

use serde::{Deserialize, Serialize};

// OpenAI chat completions ----------------------------------------------------

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct ChatResponseContent {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ChatResponseChoice {
    #[serde(default)]
    pub message: Option<ChatResponseContent>,
    #[serde(default)]
    pub delta: Option<ChatResponseContent>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatResponseChoice>,
}

// Anthropic messages ---------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stream: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct TextBlock {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct MessagesResponse {
    #[serde(default)]
    pub content: Vec<TextBlock>,
    /// Present on `content_block_delta` stream events.
    #[serde(default)]
    pub delta: Option<TextBlock>,
}

// Gemini generateContent -----------------------------------------------------

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
pub struct SystemInstruction {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub system_instruction: SystemInstruction,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize, Default)]
pub struct CandidatePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize, Default)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize, Default)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}
