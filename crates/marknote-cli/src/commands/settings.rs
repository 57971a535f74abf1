use std::path::Path;

use marknote_core::models::{SettingKey, Settings};
use marknote_core::util;

use crate::commands::common::open_store;
use crate::error::CliError;

pub async fn run_settings_show(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path)?;
    let document = store.load_settings().await?;
    let mut settings = document.settings;
    if settings.ai_api_key.is_some() {
        settings.ai_api_key = Some("[REDACTED]".to_string());
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    for line in format_settings_lines(&settings) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_settings_set(key: &str, value: &str, db_path: &Path) -> Result<(), CliError> {
    let key: SettingKey = key.parse()?;
    let store = open_store(db_path)?;
    let mut document = store.load_settings().await?;

    document.settings.apply(key, value)?;
    document.updated_at = Some(util::now());
    store.save_settings(&document).await?;

    println!("{} updated", key.name());
    Ok(())
}

pub fn format_settings_lines(settings: &Settings) -> Vec<String> {
    SettingKey::ALL
        .into_iter()
        .map(|key| format!("{:<17} {}", key.name(), setting_value(settings, key)))
        .collect()
}

fn setting_value(settings: &Settings, key: SettingKey) -> String {
    let optional = |value: &Option<String>| value.clone().unwrap_or_else(|| "(not set)".into());
    match key {
        SettingKey::Theme => format!("{:?}", settings.theme).to_lowercase(),
        SettingKey::FontSize => settings.font_size.to_string(),
        SettingKey::AutoSave => settings.auto_save.to_string(),
        SettingKey::MarkdownTheme => settings.markdown_theme.clone(),
        SettingKey::CustomThemeUrl => optional(&settings.custom_theme_url),
        SettingKey::AiEnabled => settings.ai_enabled.to_string(),
        SettingKey::AiProvider => settings.ai_provider.to_string(),
        SettingKey::AiApiKey => optional(&settings.ai_api_key),
        SettingKey::AiBaseUrl => optional(&settings.ai_base_url),
        SettingKey::AiModel => settings.ai_model.clone(),
        SettingKey::ServerUrl => optional(&settings.server_url),
        SettingKey::UserId => settings.user_id.clone(),
    }
}
