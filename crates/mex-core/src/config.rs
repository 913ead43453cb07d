//! Assistant configuration.
//!
//! Settings come from an optional YAML file with environment-variable
//! overrides for the secrets (`GEMINI_API_KEY`, `SUPABASE_URL`,
//! `SUPABASE_ANON_KEY`). Defaults cover everything except credentials, so a
//! bare deployment only needs the environment set.

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::AssistantError;
use crate::prompts::{IMAGE_MODEL_NAME, MODEL_NAME};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AssistantConfig {
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub supabase: SupabaseSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    /// Environment variable holding the Gemini API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseSettings {
    /// Project base URL, e.g. `https://xyz.supabase.co`. Overridden by
    /// `SUPABASE_URL` when set.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_anon_key_env")]
    pub anon_key_env: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_merchant_id")]
    pub default_merchant_id: String,
    #[serde(default = "default_merchant_name")]
    pub default_merchant_name: String,
}

fn default_model() -> String {
    MODEL_NAME.to_string()
}

fn default_image_model() -> String {
    IMAGE_MODEL_NAME.to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_max_tool_rounds() -> usize {
    8
}

fn default_anon_key_env() -> String {
    "SUPABASE_ANON_KEY".to_string()
}

fn default_bucket() -> String {
    "generated-food-items".to_string()
}

fn default_bind_addr() -> String {
    "127.0.0.1:3001".to_string()
}

fn default_merchant_id() -> String {
    "0c2d7".to_string()
}

fn default_merchant_name() -> String {
    "Fried Chicken Express".to_string()
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            image_model: default_image_model(),
            api_key_env: default_api_key_env(),
            base_url: None,
            max_tool_rounds: default_max_tool_rounds(),
        }
    }
}

impl Default for SupabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            anon_key_env: default_anon_key_env(),
            bucket: default_bucket(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            default_merchant_id: default_merchant_id(),
            default_merchant_name: default_merchant_name(),
        }
    }
}

impl AssistantConfig {
    /// Loads configuration from a YAML file, then applies environment
    /// overrides.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssistantError> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            AssistantError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let mut config: AssistantConfig = serde_yaml::from_str(&raw)
            .map_err(|e| AssistantError::ConfigError(format!("Invalid config file: {}", e)))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Defaults plus environment overrides, for deployments with no file.
    pub fn from_env() -> Self {
        let mut config = AssistantConfig::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var("SUPABASE_URL") {
            if !url.is_empty() {
                self.supabase.url = Some(url);
            }
        }
    }

    /// Resolves the Gemini API key from the configured environment variable.
    pub fn gemini_api_key(&self) -> Result<String, AssistantError> {
        env::var(&self.llm.api_key_env).map_err(|_| {
            AssistantError::ConfigError(format!(
                "Environment variable {} not set; required for the Gemini API",
                self.llm.api_key_env
            ))
        })
    }

    /// Resolves the Supabase anon key from the configured environment
    /// variable.
    pub fn supabase_anon_key(&self) -> Result<String, AssistantError> {
        env::var(&self.supabase.anon_key_env).map_err(|_| {
            AssistantError::ConfigError(format!(
                "Environment variable {} not set; required for Supabase access",
                self.supabase.anon_key_env
            ))
        })
    }

    /// Checks the fields that have no usable default.
    pub fn validate(&self) -> Result<(), AssistantError> {
        if self.supabase.url.as_deref().unwrap_or("").is_empty() {
            return Err(AssistantError::ConfigError(
                "Supabase URL not configured; set supabase.url or SUPABASE_URL".to_string(),
            ));
        }
        if self.llm.max_tool_rounds == 0 {
            return Err(AssistantError::ConfigError(
                "llm.max_tool_rounds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_deployed_models() {
        let config = AssistantConfig::default();
        assert_eq!(config.llm.model, "gemini-2.0-flash");
        assert_eq!(config.llm.max_tool_rounds, 8);
        assert_eq!(config.supabase.bucket, "generated-food-items");
        assert_eq!(config.server.default_merchant_id, "0c2d7");
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let config: AssistantConfig = serde_yaml::from_str(
            "llm:\n  model: gemini-2.5-pro\nsupabase:\n  url: https://demo.supabase.co\n",
        )
        .unwrap();
        assert_eq!(config.llm.model, "gemini-2.5-pro");
        assert_eq!(config.llm.max_tool_rounds, 8);
        assert_eq!(config.supabase.url.as_deref(), Some("https://demo.supabase.co"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_supabase_url_fails_validation() {
        let config = AssistantConfig::default();
        assert!(config.validate().is_err());
    }
}
