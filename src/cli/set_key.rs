use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::core::config::{path_display, Config};
use crate::core::providers::{ExchangeError, ProviderKind};

/// Write `api_key` for `provider` into the config file at `config_path`.
pub fn store_key(
    config_path: &Path,
    provider: &str,
    api_key: &str,
) -> Result<ProviderKind, Box<dyn Error>> {
    let kind = ProviderKind::from_id(provider)
        .ok_or_else(|| ExchangeError::UnknownProvider(provider.to_string()))?;
    let api_key = api_key.trim();
    if api_key.is_empty() {
        return Err("No API key given".into());
    }

    let mut config = Config::load_from_path(config_path)?;
    config.set_api_key(kind.id(), api_key.to_string());
    config.save_to_path(config_path)?;
    Ok(kind)
}

pub fn run_set_key(provider: &str, key: Option<String>) -> Result<(), Box<dyn Error>> {
    let key = match key {
        Some(key) => key,
        None => {
            print!("API key for {provider}: ");
            io::stdout().flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            line
        }
    };

    let config_path = Config::get_config_path()?;
    let kind = store_key(&config_path, provider, &key)?;
    println!("✅ Saved {kind} key to {}", path_display(&config_path));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn key_is_saved_under_canonical_id() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let kind = store_key(&path, "Claude", "  sk-ant  \n").unwrap();

        assert_eq!(kind, ProviderKind::Claude);
        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(
            config.provider_override("claude").and_then(|p| p.api_key.as_deref()),
            Some("sk-ant")
        );
    }

    #[test]
    fn unknown_provider_and_blank_key_are_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        assert!(store_key(&path, "llama", "k").is_err());
        assert!(store_key(&path, "gpt4", "   ").is_err());
        assert!(!path.exists());
    }
}
