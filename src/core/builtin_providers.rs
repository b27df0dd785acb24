//! Built-in provider configuration
//!
//! Endpoint defaults for the three supported backends are embedded from
//! `builtin_providers.toml` at build time.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinProvider {
    pub id: String,
    pub display_name: String,
    pub url: String,
    pub model: String,
    #[serde(default)]
    pub streaming: bool,
    /// Environment variable consulted when no key is configured.
    pub api_key_env: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct BuiltinProvidersConfig {
    providers: Vec<BuiltinProvider>,
}

/// Load built-in providers from the embedded configuration
pub fn load_builtin_providers() -> Vec<BuiltinProvider> {
    const CONFIG_CONTENT: &str = include_str!("../builtin_providers.toml");

    let config: BuiltinProvidersConfig =
        toml::from_str(CONFIG_CONTENT).expect("Failed to parse builtin_providers.toml");

    config.providers
}

/// Find a built-in provider by ID (case-insensitive)
pub fn find_builtin_provider(id: &str) -> Option<BuiltinProvider> {
    load_builtin_providers()
        .into_iter()
        .find(|p| p.id.eq_ignore_ascii_case(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_builtin_providers() {
        let providers = load_builtin_providers();
        let provider_ids: Vec<&str> = providers.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(provider_ids, ["gemini", "gpt4", "claude"]);
    }

    #[test]
    fn test_find_builtin_provider() {
        let provider = find_builtin_provider("GPT4");
        assert_eq!(provider.unwrap().display_name, "GPT-4");

        let provider = find_builtin_provider("claude").unwrap();
        assert!(provider.streaming);
        assert_eq!(provider.api_key_env, "ANTHROPIC_API_KEY");

        assert!(find_builtin_provider("nonexistent").is_none());
    }

    #[test]
    fn test_provider_properties() {
        for provider in load_builtin_providers() {
            assert!(!provider.display_name.is_empty());
            assert!(!provider.model.is_empty());
            assert!(provider.url.starts_with("https://"));
        }
    }
}
