//! Process configuration read from the environment.
//!
//! All settings have defaults except the provider API key. [`Settings::validate`]
//! reports whether the key is usable; the binary refuses to start without one
//! and the generation endpoints answer `500` if they are somehow reached.

use std::env;
use std::path::PathBuf;

use thiserror::Error;

/// Placeholder keys shipped in sample `.env` files. Never valid.
const PLACEHOLDER_KEYS: [&str; 2] = ["your-openai-api-key-here", "your-openrouter-api-key-here"];

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "google/gemma-2-9b-it:free";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;

/// Errors produced while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Why the configured API key cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyProblem {
    Missing,
    Placeholder,
}

impl KeyProblem {
    pub fn describe(self) -> &'static str {
        match self {
            Self::Missing => "OPENAI_API_KEY environment variable is not set",
            Self::Placeholder => {
                "OPENAI_API_KEY is still the default value, please set a real API key"
            }
        }
    }
}

/// Connection parameters for one model invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub model: String,
    pub temperature: f32,
    pub api_key: String,
    pub base_url: String,
}

/// Service settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub default_model: String,
    pub default_temperature: f32,
    pub host: String,
    pub port: u16,
    pub debug: bool,
    /// Directory holding the prompt template files.
    pub prompt_dir: PathBuf,
    /// Directory served by `GET /data/:file`.
    pub template_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: DEFAULT_BASE_URL.to_owned(),
            default_model: DEFAULT_MODEL.to_owned(),
            default_temperature: DEFAULT_TEMPERATURE,
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            debug: false,
            prompt_dir: PathBuf::from("prompts"),
            template_dir: PathBuf::from("template"),
        }
    }
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `PORT` or `DEFAULT_TEMPERATURE`
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Reads settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let default_temperature = match lookup("DEFAULT_TEMPERATURE") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid {
                    var: "DEFAULT_TEMPERATURE",
                    value,
                })?,
            None => defaults.default_temperature,
        };

        let port = match lookup("PORT") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "PORT",
                value,
            })?,
            None => defaults.port,
        };

        Ok(Self {
            openai_api_key: lookup("OPENAI_API_KEY"),
            openai_base_url: lookup("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            default_model: lookup("DEFAULT_MODEL").unwrap_or(defaults.default_model),
            default_temperature,
            host: lookup("HOST").unwrap_or(defaults.host),
            port,
            debug: lookup("DEBUG").is_some_and(|v| v.eq_ignore_ascii_case("true")),
            prompt_dir: lookup("PROMPT_DIR").map_or(defaults.prompt_dir, PathBuf::from),
            template_dir: lookup("TEMPLATE_DIR").map_or(defaults.template_dir, PathBuf::from),
        })
    }

    /// Returns the reason the API key is unusable, if any.
    pub fn key_problem(&self) -> Option<KeyProblem> {
        match self.openai_api_key.as_deref() {
            None | Some("") => Some(KeyProblem::Missing),
            Some(key) if PLACEHOLDER_KEYS.contains(&key) => Some(KeyProblem::Placeholder),
            Some(_) => None,
        }
    }

    /// Returns `true` if a real API key is configured.
    pub fn validate(&self) -> bool {
        self.key_problem().is_none()
    }

    /// Resolves the model configuration for a request.
    ///
    /// `model` wins when non-empty; otherwise the configured default model is used.
    pub fn model_config(&self, model: Option<&str>) -> ModelConfig {
        let model = match model {
            Some(name) if !name.trim().is_empty() => name.to_owned(),
            _ => self.default_model.clone(),
        };
        ModelConfig {
            model,
            temperature: self.default_temperature,
            api_key: self.openai_api_key.clone().unwrap_or_default(),
            base_url: self.openai_base_url.clone(),
        }
    }

    /// Returns the `host:port` pair to bind to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Settings::from_lookup(|var| map.get(var).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.openai_base_url, "https://openrouter.ai/api/v1");
        assert_eq!(s.default_model, "google/gemma-2-9b-it:free");
        assert_eq!(s.port, 8000);
        assert_eq!(s.bind_addr(), "0.0.0.0:8000");
        assert!(!s.debug);
        assert_eq!(s.key_problem(), Some(KeyProblem::Missing));
    }

    #[test]
    fn reads_overrides() {
        let s = settings(&[
            ("OPENAI_API_KEY", "sk-real"),
            ("PORT", "9001"),
            ("DEFAULT_TEMPERATURE", "0.2"),
            ("DEBUG", "TRUE"),
            ("PROMPT_DIR", "/etc/prompts"),
        ])
        .unwrap();
        assert!(s.validate());
        assert_eq!(s.port, 9001);
        assert!((s.default_temperature - 0.2).abs() < f32::EPSILON);
        assert!(s.debug);
        assert_eq!(s.prompt_dir, PathBuf::from("/etc/prompts"));
    }

    #[test]
    fn debug_requires_literal_true() {
        assert!(!settings(&[("DEBUG", "1")]).unwrap().debug);
    }

    #[test]
    fn placeholder_key_is_rejected() {
        let s = settings(&[("OPENAI_API_KEY", "your-openrouter-api-key-here")]).unwrap();
        assert_eq!(s.key_problem(), Some(KeyProblem::Placeholder));
        assert!(!s.validate());
    }

    #[test]
    fn bad_port_is_an_error() {
        let err = settings(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "PORT", .. }));
    }

    #[test]
    fn model_config_falls_back_to_default() {
        let s = settings(&[("OPENAI_API_KEY", "sk"), ("DEFAULT_MODEL", "m-default")]).unwrap();
        assert_eq!(s.model_config(Some("gpt-4o")).model, "gpt-4o");
        assert_eq!(s.model_config(Some("")).model, "m-default");
        assert_eq!(s.model_config(None).model, "m-default");
        assert_eq!(s.model_config(None).api_key, "sk");
    }
}
