//! Authentication utilities for API requests
//!
//! Each backend authenticates differently; this module maps a provider to the
//! header set it expects.

use crate::core::providers::ProviderKind;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Provider-specific authentication headers.
///
/// - Gemini: `x-goog-api-key`
/// - GPT-4: `Authorization: Bearer`
/// - Claude: `x-api-key` with `anthropic-version`
pub fn auth_headers(kind: ProviderKind, api_key: &str) -> Vec<(String, String)> {
    match kind {
        ProviderKind::Gemini => vec![("x-goog-api-key".to_string(), api_key.to_string())],
        ProviderKind::Gpt4 => vec![(
            "Authorization".to_string(),
            format!("Bearer {api_key}"),
        )],
        ProviderKind::Claude => vec![
            ("x-api-key".to_string(), api_key.to_string()),
            ("anthropic-version".to_string(), ANTHROPIC_VERSION.to_string()),
        ],
    }
}
