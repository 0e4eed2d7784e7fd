use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "office-assistant";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly and professional office assistant. \
    You help the user plan their day, answer questions concisely and keep track of their meetings. \
    When the user asks about their schedule, rely on the meeting list you are given.";

/// Configuration for the assistant and its model connection
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct AssistantConfig {
    pub api_key: Option<String>,
    pub system_prompt: Option<String>,
    pub model_name: Option<String>,
    pub api_base_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub request_timeout_secs: Option<u64>,
    pub max_history_turns: Option<usize>,
    pub data_dir: Option<PathBuf>,
    pub typing_effect: Option<bool>,
    pub log_level: Option<String>,
}

impl AssistantConfig {
    /// Built-in values used when neither the file nor the environment set a field
    pub fn builtin() -> Self {
        Self {
            api_key: None,
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            model_name: Some(DEFAULT_MODEL.to_string()),
            api_base_url: Some(DEFAULT_BASE_URL.to_string()),
            temperature: Some(0.7),
            max_tokens: None,
            request_timeout_secs: Some(60),
            max_history_turns: Some(50),
            data_dir: None,
            typing_effect: Some(true),
            log_level: None,
        }
    }

    /// Loads configuration from a file if it exists, otherwise returns an empty config
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Reads overrides from the given variable lookup.
    pub fn from_env_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            api_key: non_empty("GROQ_API_KEY"),
            model_name: non_empty("OFFICE_ASSISTANT_MODEL"),
            api_base_url: non_empty("OFFICE_ASSISTANT_BASE_URL"),
            ..Self::default()
        }
    }

    /// Reads overrides from the process environment (after `.env` is loaded).
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Merges this config with another config, preferring values from the other config if present
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            api_key: other.api_key.clone().or_else(|| self.api_key.clone()),
            system_prompt: other
                .system_prompt
                .clone()
                .or_else(|| self.system_prompt.clone()),
            model_name: other.model_name.clone().or_else(|| self.model_name.clone()),
            api_base_url: other
                .api_base_url
                .clone()
                .or_else(|| self.api_base_url.clone()),
            temperature: other.temperature.or(self.temperature),
            max_tokens: other.max_tokens.or(self.max_tokens),
            request_timeout_secs: other.request_timeout_secs.or(self.request_timeout_secs),
            max_history_turns: other.max_history_turns.or(self.max_history_turns),
            data_dir: other.data_dir.clone().or_else(|| self.data_dir.clone()),
            typing_effect: other.typing_effect.or(self.typing_effect),
            log_level: other.log_level.clone().or_else(|| self.log_level.clone()),
        }
    }

    /// Builtins, then the config file, then the environment.
    pub fn resolve(config_file: &Path) -> Result<Self, ConfigError> {
        let from_file = Self::load_from_file(config_file)?;
        Ok(Self::builtin().merge(&from_file).merge(&Self::from_env()))
    }

    pub fn system_prompt(&self) -> &str {
        self.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    pub fn max_history_turns(&self) -> usize {
        self.max_history_turns.unwrap_or(50)
    }

    /// The key with everything but a short prefix hidden.
    pub fn masked_api_key(&self) -> String {
        match self.api_key.as_deref() {
            None => "Not Set".to_string(),
            Some(k) if k.chars().count() > 8 => format!("{}...", k.chars().take(8).collect::<String>()),
            Some(_) => "Set".to_string(),
        }
    }
}

/// Helper function to get default config directory
pub fn get_default_config_dir(app_name: &str) -> Result<PathBuf, ConfigError> {
    let home_dir = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home_dir.join(".config").join(app_name))
}

/// Helper function to get default config file path
pub fn get_default_config_file(app_name: &str) -> Result<PathBuf, ConfigError> {
    let config_dir = get_default_config_dir(app_name)?;
    Ok(config_dir.join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_empty_config() {
        let dir = tempdir().unwrap();
        let config = AssistantConfig::load_from_file(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, AssistantConfig::default());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "model_name = \"some-model\"\nmax_history_turns = 10\ntyping_effect = false\n",
        )
        .unwrap();

        let loaded = AssistantConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.model_name.as_deref(), Some("some-model"));
        assert_eq!(loaded.max_history_turns, Some(10));
        assert_eq!(loaded.typing_effect, Some(false));
        assert!(loaded.api_key.is_none());

        let merged = AssistantConfig::builtin().merge(&loaded);
        assert_eq!(merged.max_history_turns(), 10);
        assert_eq!(merged.api_base_url.as_deref(), Some(DEFAULT_BASE_URL));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "temperature = [not toml").unwrap();
        let err = AssistantConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_merge_prefers_other() {
        let base = AssistantConfig::builtin();
        let other = AssistantConfig {
            model_name: Some("override".to_string()),
            typing_effect: Some(false),
            ..AssistantConfig::default()
        };

        let merged = base.merge(&other);
        assert_eq!(merged.model_name.as_deref(), Some("override"));
        assert_eq!(merged.typing_effect, Some(false));
        assert_eq!(merged.temperature, Some(0.7));
        assert_eq!(merged.api_base_url.as_deref(), Some(DEFAULT_BASE_URL));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [("GROQ_API_KEY", "gsk_abcdefghijkl"), ("OFFICE_ASSISTANT_MODEL", "  ")]
            .into_iter()
            .collect();
        let env = AssistantConfig::from_env_with(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(env.api_key.as_deref(), Some("gsk_abcdefghijkl"));
        // Blank values do not override
        assert_eq!(env.model_name, None);
        assert_eq!(env.masked_api_key(), "gsk_abcd...");
    }
}
