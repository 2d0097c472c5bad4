//! Generative providers and the strategy that selects between them.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::{
    config::{Config, Provider, ProviderSettings},
    error::CollaboratorError,
};

const TEMPERATURE: f64 = 0.2;
const MAX_TOKENS: u32 = 400;

/// The generation strategy picked by configuration.
pub enum Strategy {
    OpenAi(OpenAiClient),
    Gemini(GeminiClient),
    /// The selected provider has no credentials, every request takes the heuristic path.
    Unconfigured(Provider),
}

impl Strategy {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let Some(api_key) = config.selected().api_key.clone() else {
            return Self::Unconfigured(config.provider);
        };

        match config.provider {
            Provider::OpenAi => {
                Self::OpenAi(OpenAiClient::new(api_key, &config.openai, config.timeout))
            }
            Provider::Gemini => {
                Self::Gemini(GeminiClient::new(api_key, &config.gemini, config.timeout))
            }
        }
    }

    #[must_use]
    pub const fn provider(&self) -> Provider {
        match self {
            Self::OpenAi(_) => Provider::OpenAi,
            Self::Gemini(_) => Provider::Gemini,
            Self::Unconfigured(provider) => *provider,
        }
    }

    /// Model name of a configured provider.
    #[must_use]
    pub fn model(&self) -> Option<&str> {
        match self {
            Self::OpenAi(e) => Some(e.model.as_str()),
            Self::Gemini(e) => Some(e.model.as_str()),
            Self::Unconfigured(_) => None,
        }
    }

    pub async fn complete(&self, system: &str, user: &str) -> Result<String, CollaboratorError> {
        match self {
            Self::OpenAi(e) => e.complete(system, user).await,
            Self::Gemini(e) => e.complete(system, user).await,
            Self::Unconfigured(provider) => Err(CollaboratorError::Unconfigured(*provider)),
        }
    }
}

/// OpenAI chat-completions client.
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OpenAiClient {
    #[must_use]
    pub fn new(api_key: String, settings: &ProviderSettings, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            timeout,
        }
    }

    pub async fn complete(&self, system: &str, user: &str) -> Result<String, CollaboratorError> {
        let request = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| request_error(Provider::OpenAi, &e))?;

        let response = check_status(Provider::OpenAi, response).await?;

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Malformed(format!("failed to parse response: {e}")))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|e| e.message.content)
            .filter(|e| !e.trim().is_empty())
            .ok_or(CollaboratorError::Empty)
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Google Gemini `generateContent` client.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl GeminiClient {
    #[must_use]
    pub fn new(api_key: String, settings: &ProviderSettings, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            timeout,
        }
    }

    /// Gemini gets system and user prompt as a single user turn.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, CollaboratorError> {
        let request = json!({
            "contents": [
                { "role": "user", "parts": [{ "text": format!("{system}\n\n{user}") }] },
            ],
            "generationConfig": {
                "temperature": TEMPERATURE,
                "maxOutputTokens": MAX_TOKENS,
            },
        });

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| request_error(Provider::Gemini, &e))?;

        let response = check_status(Provider::Gemini, response).await?;

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Malformed(format!("failed to parse response: {e}")))?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .map(|e| e.content.parts.into_iter().filter_map(|e| e.text).collect::<String>())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(CollaboratorError::Empty);
        }

        Ok(text)
    }
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

fn request_error(provider: Provider, error: &reqwest::Error) -> CollaboratorError {
    if error.is_timeout() {
        CollaboratorError::Timeout(provider)
    } else {
        CollaboratorError::Transport {
            provider,
            message: error.to_string(),
        }
    }
}

async fn check_status(
    provider: Provider,
    response: reqwest::Response,
) -> Result<reqwest::Response, CollaboratorError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(CollaboratorError::Unauthorized {
            provider,
            status: status.as_u16(),
        });
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    Err(CollaboratorError::Api {
        provider,
        status: status.as_u16(),
        body,
    })
}
