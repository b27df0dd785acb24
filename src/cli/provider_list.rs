use std::error::Error;

use crate::core::builtin_providers::load_builtin_providers;
use crate::core::config::Config;
use crate::core::providers::ProviderConfig;
use crate::ui::chat_loop::ChatOptions;

/// One row of the provider table.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRow {
    pub id: String,
    pub display_name: String,
    pub model: String,
    pub url: String,
    pub streaming: bool,
    pub has_key: bool,
    pub is_default: bool,
}

pub fn provider_rows<F>(config: &Config, env: F) -> Vec<ProviderRow>
where
    F: Fn(&str) -> Option<String> + Copy,
{
    load_builtin_providers()
        .into_iter()
        .filter_map(|builtin| ProviderConfig::resolve_with_env(config, &builtin.id, env).ok())
        .map(|provider| {
            let id = provider.kind.id().to_string();
            let is_default = config
                .default_provider
                .as_deref()
                .is_some_and(|d| d.eq_ignore_ascii_case(&id));
            ProviderRow {
                is_default,
                has_key: provider.api_key.is_some(),
                streaming: provider.streaming,
                url: provider.url,
                model: provider.model,
                display_name: provider.display_name,
                id,
            }
        })
        .collect()
}

pub fn list_providers(options: &ChatOptions) -> Result<(), Box<dyn Error>> {
    let (config, _) = options.load_config()?;
    let rows = provider_rows(&config, |name| std::env::var(name).ok());

    println!("Providers:\n");
    println!(
        "  {:<8} {:<8} {:<26} {:<9} {}",
        "ID", "NAME", "MODEL", "STREAMING", "KEY"
    );
    for row in &rows {
        let id = if row.is_default {
            format!("{}*", row.id)
        } else {
            row.id.clone()
        };
        println!(
            "  {:<8} {:<8} {:<26} {:<9} {}",
            id,
            row.display_name,
            row.model,
            if row.streaming { "yes" } else { "no" },
            if row.has_key { "✅" } else { "❌" }
        );
    }

    if rows.iter().any(|row| row.is_default) {
        println!("\n* = default provider");
    }
    Ok(())
}
