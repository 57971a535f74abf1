//! Application settings model
//!
//! Settings are an explicit schema rather than an open key/value bag. Each
//! field is either shared (follows the cloud copy) or device-local (never
//! overwritten by a remote document), see [`Settings::merged_with_remote`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::models::note::DEFAULT_USER_ID;
use crate::util::{is_http_url, normalize_text_option};

/// Workspaces every settings document starts with.
pub const DEFAULT_WORKSPACES: [&str; 2] = ["public", "private"];

/// Theme mode options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    /// Light theme
    #[default]
    Light,
    /// Dark theme
    Dark,
    /// Follow system preference
    System,
}

impl FromStr for ThemeMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "system" => Ok(Self::System),
            other => Err(Error::validation(format!("unknown theme '{other}'"))),
        }
    }
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    #[default]
    OpenAi,
    DeepSeek,
    Anthropic,
}

impl AiProvider {
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com",
            Self::DeepSeek => "https://api.deepseek.com",
            Self::Anthropic => "https://api.anthropic.com",
        }
    }

    pub const fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-3.5-turbo",
            Self::DeepSeek => "deepseek-chat",
            Self::Anthropic => "claude-3-haiku-20240307",
        }
    }
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OpenAi => "openai",
            Self::DeepSeek => "deepseek",
            Self::Anthropic => "anthropic",
        })
    }
}

impl FromStr for AiProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "deepseek" => Ok(Self::DeepSeek),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(Error::validation(format!("unsupported AI provider '{other}'"))),
        }
    }
}

/// Application settings
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub theme: ThemeMode,
    /// Font size in pixels
    pub font_size: u32,
    pub auto_save: bool,
    pub markdown_theme: String,
    pub custom_theme_url: Option<String>,
    pub ai_enabled: bool,
    pub ai_provider: AiProvider,
    pub ai_api_key: Option<String>,
    pub ai_base_url: Option<String>,
    pub ai_model: String,
    /// Device-local: whether this device syncs with the backend
    pub cloud_sync: bool,
    /// Device-local: backend base URL
    pub server_url: Option<String>,
    /// Device-local: identity used to scope remote queries
    pub user_id: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: ThemeMode::Light,
            font_size: 14,
            auto_save: true,
            markdown_theme: "github".to_string(),
            custom_theme_url: None,
            ai_enabled: false,
            ai_provider: AiProvider::OpenAi,
            ai_api_key: None,
            ai_base_url: None,
            ai_model: AiProvider::OpenAi.default_model().to_string(),
            cloud_sync: false,
            server_url: None,
            user_id: DEFAULT_USER_ID.to_string(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Settings")
            .field("theme", &self.theme)
            .field("font_size", &self.font_size)
            .field("auto_save", &self.auto_save)
            .field("markdown_theme", &self.markdown_theme)
            .field("custom_theme_url", &self.custom_theme_url)
            .field("ai_enabled", &self.ai_enabled)
            .field("ai_provider", &self.ai_provider)
            .field(
                "ai_api_key",
                &self.ai_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("ai_base_url", &self.ai_base_url)
            .field("ai_model", &self.ai_model)
            .field("cloud_sync", &self.cloud_sync)
            .field("server_url", &self.server_url)
            .field("user_id", &self.user_id)
            .finish()
    }
}

impl Settings {
    /// Combine these (local) settings with a document pulled from the cloud.
    ///
    /// Shared fields follow the remote copy. The API key only follows it when
    /// the remote one is set. `cloud_sync`, `server_url` and `user_id` always
    /// stay local.
    #[must_use]
    pub fn merged_with_remote(&self, remote: &Self) -> Self {
        Self {
            theme: remote.theme,
            font_size: remote.font_size,
            auto_save: remote.auto_save,
            markdown_theme: remote.markdown_theme.clone(),
            custom_theme_url: remote.custom_theme_url.clone(),
            ai_enabled: remote.ai_enabled,
            ai_provider: remote.ai_provider,
            ai_api_key: normalize_text_option(remote.ai_api_key.clone())
                .or_else(|| self.ai_api_key.clone()),
            ai_base_url: remote.ai_base_url.clone(),
            ai_model: remote.ai_model.clone(),
            cloud_sync: self.cloud_sync,
            server_url: self.server_url.clone(),
            user_id: self.user_id.clone(),
        }
    }

    /// Keep the device-local cloud fields of `self` while adopting everything
    /// else from `imported`.
    #[must_use]
    pub fn with_imported(&self, imported: &Self) -> Self {
        Self {
            cloud_sync: self.cloud_sync,
            server_url: self.server_url.clone(),
            user_id: self.user_id.clone(),
            ..imported.clone()
        }
    }

    /// Replace a blank or placeholder user id with a generated one.
    ///
    /// Returns `true` when a new id was assigned.
    pub fn ensure_user_id(&mut self) -> bool {
        let current = self.user_id.trim();
        if current.is_empty() || current == DEFAULT_USER_ID {
            self.user_id = format!("user_{}", Uuid::now_v7().simple());
            true
        } else {
            false
        }
    }

    /// Validate and assign a single setting.
    pub fn apply(&mut self, key: SettingKey, value: &str) -> Result<(), Error> {
        let value = value.trim();
        match key {
            SettingKey::Theme => self.theme = value.parse()?,
            SettingKey::FontSize => {
                let size = value
                    .parse::<u32>()
                    .ok()
                    .filter(|size| (8..=48).contains(size))
                    .ok_or_else(|| Error::validation("font-size must be an integer in [8, 48]"))?;
                self.font_size = size;
            }
            SettingKey::AutoSave => self.auto_save = parse_bool(value)?,
            SettingKey::MarkdownTheme => {
                if value.is_empty() {
                    return Err(Error::validation("markdown-theme must not be empty"));
                }
                self.markdown_theme = value.to_string();
            }
            SettingKey::CustomThemeUrl => self.custom_theme_url = optional_url(value)?,
            SettingKey::AiEnabled => self.ai_enabled = parse_bool(value)?,
            SettingKey::AiProvider => {
                let provider: AiProvider = value.parse()?;
                if provider != self.ai_provider {
                    self.ai_model = provider.default_model().to_string();
                }
                self.ai_provider = provider;
            }
            SettingKey::AiApiKey => {
                self.ai_api_key = normalize_text_option(Some(value.to_string()));
            }
            SettingKey::AiBaseUrl => self.ai_base_url = optional_url(value)?,
            SettingKey::AiModel => {
                if value.is_empty() {
                    return Err(Error::validation("ai-model must not be empty"));
                }
                self.ai_model = value.to_string();
            }
            SettingKey::ServerUrl => self.server_url = optional_url(value)?,
            SettingKey::UserId => {
                if value.is_empty() {
                    return Err(Error::validation("user-id must not be empty"));
                }
                self.user_id = value.to_string();
            }
        }
        Ok(())
    }
}

/// Keys accepted by [`Settings::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    Theme,
    FontSize,
    AutoSave,
    MarkdownTheme,
    CustomThemeUrl,
    AiEnabled,
    AiProvider,
    AiApiKey,
    AiBaseUrl,
    AiModel,
    ServerUrl,
    UserId,
}

impl SettingKey {
    pub const ALL: [Self; 12] = [
        Self::Theme,
        Self::FontSize,
        Self::AutoSave,
        Self::MarkdownTheme,
        Self::CustomThemeUrl,
        Self::AiEnabled,
        Self::AiProvider,
        Self::AiApiKey,
        Self::AiBaseUrl,
        Self::AiModel,
        Self::ServerUrl,
        Self::UserId,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Theme => "theme",
            Self::FontSize => "font-size",
            Self::AutoSave => "auto-save",
            Self::MarkdownTheme => "markdown-theme",
            Self::CustomThemeUrl => "custom-theme-url",
            Self::AiEnabled => "ai-enabled",
            Self::AiProvider => "ai-provider",
            Self::AiApiKey => "ai-api-key",
            Self::AiBaseUrl => "ai-base-url",
            Self::AiModel => "ai-model",
            Self::ServerUrl => "server-url",
            Self::UserId => "user-id",
        }
    }
}

impl FromStr for SettingKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| Error::validation(format!("unknown setting '{}'", s.trim())))
    }
}

/// Settings plus workspace list, the unit persisted locally and exchanged
/// with the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsDocument {
    #[serde(default = "default_user")]
    pub user_id: String,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default = "default_workspaces")]
    pub workspaces: Vec<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for SettingsDocument {
    fn default() -> Self {
        Self {
            user_id: default_user(),
            settings: Settings::default(),
            workspaces: default_workspaces(),
            updated_at: None,
        }
    }
}

impl SettingsDocument {
    /// Apply a remote document with the field-level merge rules.
    #[must_use]
    pub fn merged_with_remote(&self, remote: &Self) -> Self {
        Self {
            user_id: self.user_id.clone(),
            settings: self.settings.merged_with_remote(&remote.settings),
            workspaces: union_workspaces(&self.workspaces, &remote.workspaces),
            updated_at: remote.updated_at.or(self.updated_at),
        }
    }

    /// Add a workspace name; returns `false` when it already exists.
    pub fn add_workspace(&mut self, name: &str) -> Result<bool, Error> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("workspace name must not be empty"));
        }
        if self.workspaces.iter().any(|existing| existing == name) {
            return Ok(false);
        }
        self.workspaces.push(name.to_string());
        Ok(true)
    }
}

/// Ordered union: every local name first, then remote-only names.
#[must_use]
pub fn union_workspaces(local: &[String], remote: &[String]) -> Vec<String> {
    let mut merged = local.to_vec();
    for name in remote {
        if !merged.contains(name) {
            merged.push(name.clone());
        }
    }
    merged
}

fn default_user() -> String {
    DEFAULT_USER_ID.to_string()
}

fn default_workspaces() -> Vec<String> {
    DEFAULT_WORKSPACES.iter().map(ToString::to_string).collect()
}

fn parse_bool(value: &str) -> Result<bool, Error> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::validation(format!("expected a boolean, got '{other}'"))),
    }
}

fn optional_url(value: &str) -> Result<Option<String>, Error> {
    if value.is_empty() {
        return Ok(None);
    }
    if !is_http_url(value) {
        return Err(Error::validation("URL must include http:// or https://"));
    }
    Ok(Some(value.trim_end_matches('/').to_string()))
}
