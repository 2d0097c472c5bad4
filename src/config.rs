//! Process-wide configuration, resolved once at startup and injected into the orchestrator.

use std::{fmt::Display, str::FromStr, time::Duration};

use tracing::warn;

use crate::error::ConfigError;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The generative providers a deployment can select from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    #[default]
    OpenAi,
    Gemini,
}

impl Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::OpenAi => "OpenAI",
                Self::Gemini => "Gemini",
            }
        )
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            _ => Err(ConfigError::UnknownProvider(s.to_string())),
        }
    }
}

/// Credentials and endpoint of a single provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    /// `None` when unset or blank; the provider then counts as not configured.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub provider: Provider,
    pub openai: ProviderSettings,
    pub gemini: ProviderSettings,
    /// Upper bound for a single provider call.
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            openai: ProviderSettings {
                api_key: None,
                model: DEFAULT_OPENAI_MODEL.to_string(),
                base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            },
            gemini: ProviderSettings {
                api_key: None,
                model: DEFAULT_GEMINI_MODEL.to_string(),
                base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            },
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Config {
    /// Read the configuration from the environment, or from a corresponding `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup. Blank values count as unset.
    ///
    /// An unknown `LLM_PROVIDER` falls back to the default provider.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|e| !e.trim().is_empty());
        let defaults = Self::default();

        let provider = match var("LLM_PROVIDER").map(|e| e.parse::<Provider>()) {
            Some(Ok(provider)) => provider,
            Some(Err(e)) => {
                warn!("{e}, falling back to {}", defaults.provider);
                defaults.provider
            }
            None => defaults.provider,
        };

        let timeout = match var("LLM_TIMEOUT_SECS") {
            Some(e) => Duration::from_secs(
                e.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidTimeout(e.clone()))?,
            ),
            None => defaults.timeout,
        };

        Ok(Self {
            provider,
            openai: ProviderSettings {
                api_key: var("OPENAI_API_KEY"),
                model: var("OPENAI_MODEL").unwrap_or(defaults.openai.model),
                base_url: var("OPENAI_BASE_URL").unwrap_or(defaults.openai.base_url),
            },
            gemini: ProviderSettings {
                api_key: var("GEMINI_API_KEY"),
                model: var("GEMINI_MODEL").unwrap_or(defaults.gemini.model),
                base_url: var("GEMINI_BASE_URL").unwrap_or(defaults.gemini.base_url),
            },
            timeout,
        })
    }

    /// Settings of the selected provider.
    #[must_use]
    pub const fn selected(&self) -> &ProviderSettings {
        match self.provider {
            Provider::OpenAi => &self.openai,
            Provider::Gemini => &self.gemini,
        }
    }
}

#[cfg(test)]
mod test {
    use std::{collections::HashMap, time::Duration};

    use super::{Config, DEFAULT_OPENAI_MODEL, Provider};
    use crate::error::ConfigError;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect::<HashMap<_, _>>();

        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.provider, Provider::OpenAi);
        assert_eq!(config.openai.model, DEFAULT_OPENAI_MODEL);
        assert!(config.selected().api_key.is_none());
    }

    #[test]
    fn test_provider_selection() {
        let config = Config::from_lookup(lookup(&[
            ("LLM_PROVIDER", "Gemini"),
            ("GEMINI_API_KEY", "secret"),
            ("LLM_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.provider, Provider::Gemini);
        assert_eq!(config.selected().api_key.as_deref(), Some("secret"));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_blank_and_unknown_values() {
        let config = Config::from_lookup(lookup(&[
            ("LLM_PROVIDER", "claude"),
            ("OPENAI_API_KEY", "   "),
        ]))
        .unwrap();

        assert_eq!(config.provider, Provider::OpenAi);
        assert!(config.openai.api_key.is_none());
    }

    #[test]
    fn test_invalid_timeout() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("LLM_TIMEOUT_SECS", "soon")])),
            Err(ConfigError::InvalidTimeout(_))
        ));
    }
}
