//! Configuration management for ThinkChat.
//!
//! Loads configuration from ${THINKCHAT_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::prompts::BASE_SYSTEM_PROMPT;

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
/// To update, edit default_config.toml directly.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Merges user config values into the default template.
///
/// This ensures new comments/sections from the template are always present,
/// while preserving user's customized values.
fn merge_with_template(user_config: &str) -> Result<String> {
    use toml_edit::DocumentMut;

    let mut doc: DocumentMut = default_config_template()
        .parse()
        .context("Failed to parse default config template")?;

    let user_doc: DocumentMut = user_config.parse().context("Failed to parse user config")?;

    merge_items(doc.as_table_mut(), user_doc.as_table());

    Ok(doc.to_string())
}

/// Recursively merges items from source table into target table.
fn merge_items(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, value) in source.iter() {
        match value {
            Item::Value(v) => {
                target[key] = Item::Value(v.clone());
            }
            Item::Table(src_table) => {
                if let Some(Item::Table(target_table)) = target.get_mut(key) {
                    merge_items(target_table, src_table);
                } else {
                    target[key] = Item::Table(src_table.clone());
                }
            }
            Item::ArrayOfTables(src_arr) => {
                target[key] = Item::ArrayOfTables(src_arr.clone());
            }
            Item::None => {}
        }
    }
}

pub mod paths {
    //! Path resolution for ThinkChat configuration and data directories.
    //!
    //! THINKCHAT_HOME resolution order:
    //! 1. THINKCHAT_HOME environment variable (if set)
    //! 2. ~/.config/thinkchat (default)

    use std::path::PathBuf;

    /// Returns the ThinkChat home directory.
    ///
    /// Checks THINKCHAT_HOME env var first, falls back to ~/.config/thinkchat
    pub fn thinkchat_home() -> PathBuf {
        if let Ok(home) = std::env::var("THINKCHAT_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("thinkchat"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        thinkchat_home().join("config.toml")
    }

    /// Returns the directory for rotated log files.
    pub fn logs_dir() -> PathBuf {
        thinkchat_home().join("logs")
    }
}

/// Gemini provider configuration (API key and endpoint overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiProviderConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl GeminiProviderConfig {
    pub fn effective_api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    pub fn effective_base_url(&self) -> Option<&str> {
        self.base_url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

/// Provider configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub gemini: GeminiProviderConfig,
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model used for streamed chat turns.
    pub model: String,

    /// Model used for image generation.
    pub image_model: String,

    /// Maximum output tokens for chat responses (optional).
    pub max_output_tokens: Option<u32>,

    /// Optional replacement for the built-in base system instruction.
    pub system_prompt: Option<String>,

    /// Provider configuration (API keys, base URLs).
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Config {
    const DEFAULT_MODEL: &str = "gemini-2.5-flash";
    const DEFAULT_IMAGE_MODEL: &str = "imagen-4.0-generate-001";

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Writes the default config template to the default path if not present.
    ///
    /// Returns true if a new file was written.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn init() -> Result<bool> {
        Self::init_at(&paths::config_path())
    }

    /// Writes the default config template to a specific path if not present.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn init_at(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        Self::write_config(path, default_config_template())?;
        Ok(true)
    }

    /// Saves only the model field to the config file.
    ///
    /// Creates the file if it doesn't exist.
    /// Preserves existing fields and comments using toml_edit.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save_model(model: &str) -> Result<()> {
        Self::save_model_to(&paths::config_path(), model)
    }

    /// Saves only the model field to a specific config file path.
    ///
    /// Creates the file with default template if it doesn't exist.
    /// If file exists, merges user values into the latest template.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or written.
    pub fn save_model_to(path: &Path, model: &str) -> Result<()> {
        use toml_edit::{DocumentMut, value};

        let contents = if path.exists() {
            let user_config = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            merge_with_template(&user_config)?
        } else {
            default_config_template().to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        doc["model"] = value(model);

        Self::write_config(path, &doc.to_string())
    }

    /// Returns the base system instruction, preferring the config override.
    pub fn base_system_prompt(&self) -> &str {
        self.system_prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| BASE_SYSTEM_PROMPT.trim())
    }

    fn write_config(path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory {}", parent.display())
            })?;
        }
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: Self::DEFAULT_MODEL.to_string(),
            image_model: Self::DEFAULT_IMAGE_MODEL.to_string(),
            max_output_tokens: None,
            system_prompt: None,
            providers: ProvidersConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_from_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.image_model, "imagen-4.0-generate-001");
        assert!(config.system_prompt.is_none());
    }

    #[test]
    fn load_from_parses_provider_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
model = "gemini-2.5-pro"

[providers.gemini]
api_key = "test-key"
base_url = "https://example.com/v1beta"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.providers.gemini.effective_api_key(), Some("test-key"));
        assert_eq!(
            config.providers.gemini.effective_base_url(),
            Some("https://example.com/v1beta")
        );
    }

    #[test]
    fn default_template_parses_to_default_config() {
        let config: Config = toml::from_str(default_config_template()).unwrap();
        assert_eq!(config.model, Config::DEFAULT_MODEL);
        assert_eq!(config.image_model, Config::DEFAULT_IMAGE_MODEL);
    }

    #[test]
    fn save_model_to_preserves_user_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "model = \"gemini-2.5-pro\"\n\n[providers.gemini]\napi_key = \"keep-me\"\n",
        )
        .unwrap();

        Config::save_model_to(&path, "gemini-2.5-flash").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.providers.gemini.effective_api_key(), Some("keep-me"));
    }

    #[test]
    fn base_system_prompt_prefers_override() {
        let config = Config {
            system_prompt: Some("You are a test bot.".to_string()),
            ..Config::default()
        };
        assert_eq!(config.base_system_prompt(), "You are a test bot.");

        let config = Config::default();
        assert!(config.base_system_prompt().starts_with("You are 'ThinkChat,'"));
    }
}
