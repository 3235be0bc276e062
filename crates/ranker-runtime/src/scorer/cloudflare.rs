//! Cloudflare Workers AI backend.
//!
//! Sends the prompt to `POST {base_url}/accounts/{account_id}/ai/run/{model}`
//! and pulls the reply text out of whichever field the model populated.
//!
//! ## Security
//!
//! The account id and API token are held in [`ApiCredential`]s. See the
//! [`secrets`](super::secrets) module for details.

use super::{
    factory::ScorerFactory,
    secrets::{ApiCredential, CredentialBuilder, CredentialSource},
    InvocationError, ScoreOptions, Scorer,
};
use crate::config::ConfigurationError;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::Arc;

pub const CLOUDFLARE_ACCOUNT_ID_ENV: &str = "CLOUDFLARE_ACCOUNT_ID";
pub const CLOUDFLARE_API_TOKEN_ENV: &str = "CLOUDFLARE_API_TOKEN";
pub const CLOUDFLARE_MODEL_ENV: &str = "CLOUDFLARE_MODEL";

pub const DEFAULT_CLOUDFLARE_MODEL: &str = "@cf/meta/llama-3-8b-instruct";
pub const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Prepended to every prompt.
pub const PREAMBLE: &str = "You are an assistant that scores candidates. \
Return a single STRICT JSON object following the schema described in the prompt. \
The JSON must be valid (double-quoted keys/strings, no comments, no trailing commas).\n\n";

/// Characters of an error body kept in [`InvocationError::Api`].
const ERROR_BODY_CHARS: usize = 500;

/// Cloudflare Workers AI scorer.
pub struct CloudflareScorer {
    account_id: ApiCredential,
    api_token: ApiCredential,
    model: String,
    base_url: String,
    #[cfg(feature = "cloudflare")]
    client: reqwest::Client,
}

impl std::fmt::Debug for CloudflareScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareScorer")
            .field("account_id", &self.account_id)
            .field("api_token", &self.api_token)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CloudflareScorer {
    /// Create a scorer from explicit credentials.
    pub fn new(account_id: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self::from_parts(
            ApiCredential::new(account_id, CredentialSource::Programmatic, "Cloudflare account ID"),
            ApiCredential::new(api_token, CredentialSource::Programmatic, "Cloudflare API token"),
            DEFAULT_CLOUDFLARE_MODEL.to_string(),
            DEFAULT_BASE_URL.to_string(),
        )
    }

    /// Create from JSON config with environment fallback.
    ///
    /// Keys: `account_id`, `api_token`, `model`, `base_url`. The first two
    /// fall back to `CLOUDFLARE_ACCOUNT_ID` and `CLOUDFLARE_API_TOKEN`;
    /// `model` falls back to `CLOUDFLARE_MODEL`, then the default model.
    pub fn from_config(config: &JsonValue) -> Result<Self, ConfigurationError> {
        let mut creds = credentials().build(config)?;
        let account_id = creds.take("account_id")?;
        let api_token = creds.take("api_token")?;

        let model = config["model"]
            .as_str()
            .filter(|m| !m.is_empty())
            .map(String::from)
            .or_else(|| std::env::var(CLOUDFLARE_MODEL_ENV).ok().filter(|m| !m.is_empty()))
            .unwrap_or_else(|| DEFAULT_CLOUDFLARE_MODEL.to_string());

        let base_url = config["base_url"]
            .as_str()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        tracing::debug!(
            token_source = %api_token.source(),
            model = %model,
            "Loaded Cloudflare credentials"
        );
        Ok(Self::from_parts(account_id, api_token, model, base_url))
    }

    fn from_parts(
        account_id: ApiCredential,
        api_token: ApiCredential,
        model: String,
        base_url: String,
    ) -> Self {
        Self {
            account_id,
            api_token,
            model,
            base_url,
            #[cfg(feature = "cloudflare")]
            client: reqwest::Client::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run endpoint for `model`.
    pub fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/accounts/{}/ai/run/{}",
            self.base_url,
            self.account_id.expose(),
            model
        )
    }

    /// JSON body for one prompt.
    pub fn request_body(&self, prompt: &str) -> JsonValue {
        serde_json::json!({ "prompt": format!("{}{}", PREAMBLE, prompt) })
    }
}

fn credentials() -> CredentialBuilder {
    CredentialBuilder::new()
        .require("account_id", CLOUDFLARE_ACCOUNT_ID_ENV, "Cloudflare account ID")
        .require("api_token", CLOUDFLARE_API_TOKEN_ENV, "Cloudflare API token")
}

/// Pull the reply text out of a `/ai/run` response body.
///
/// Checked in order: `result.response`, `result.output` (each either a
/// string or an object with `content`/`message`), `result.output_text`,
/// then `result` itself when it is a string. When nothing matches the
/// whole body is returned as JSON text so the caller can still inspect it.
pub fn extract_reply_text(data: &JsonValue) -> String {
    let result = &data["result"];
    let text = match result {
        JsonValue::Object(map) => {
            if let Some(message) = map.get("response") {
                message_text(message)
            } else if let Some(message) = map.get("output") {
                message_text(message)
            } else {
                map.get("output_text")
                    .and_then(JsonValue::as_str)
                    .map(String::from)
            }
        }
        JsonValue::String(text) => Some(text.clone()),
        _ => None,
    };

    text.filter(|t| !t.is_empty())
        .unwrap_or_else(|| data.to_string())
}

fn message_text(message: &JsonValue) -> Option<String> {
    match message {
        JsonValue::String(text) => Some(text.clone()),
        JsonValue::Object(map) => ["content", "message"]
            .iter()
            .filter_map(|key| map.get(*key).and_then(JsonValue::as_str))
            .find(|text| !text.is_empty())
            .map(String::from),
        _ => None,
    }
}

#[cfg(feature = "cloudflare")]
fn transport_error(err: reqwest::Error, options: &ScoreOptions) -> InvocationError {
    if err.is_timeout() {
        InvocationError::Timeout(options.timeout)
    } else {
        // The URL carries the account id
        InvocationError::Http(err.without_url().to_string())
    }
}

#[async_trait]
impl Scorer for CloudflareScorer {
    #[cfg(feature = "cloudflare")]
    async fn score(&self, prompt: &str, options: &ScoreOptions) -> Result<String, InvocationError> {
        let model = options.model.as_deref().unwrap_or(&self.model);
        tracing::debug!(model = %model, prompt_chars = prompt.len(), "Calling Cloudflare AI");

        // The token is only exposed here, at the point of use
        let response = self
            .client
            .post(self.endpoint(model))
            .bearer_auth(self.api_token.expose())
            .timeout(options.timeout)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| transport_error(e, options))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, options))?;

        if !status.is_success() {
            return Err(InvocationError::Api {
                status: status.as_u16(),
                message: body.chars().take(ERROR_BODY_CHARS).collect(),
            });
        }

        let data: JsonValue = serde_json::from_str(&body)
            .map_err(|e| InvocationError::MalformedResponse(e.to_string()))?;

        Ok(extract_reply_text(&data))
    }

    #[cfg(not(feature = "cloudflare"))]
    async fn score(&self, _prompt: &str, _options: &ScoreOptions) -> Result<String, InvocationError> {
        Err(InvocationError::Backend(
            "Cloudflare backend requires the 'cloudflare' feature".to_string(),
        ))
    }

    fn name(&self) -> &str {
        "cloudflare"
    }
}

/// Factory for Cloudflare scorers.
///
/// ## Configuration Format
/// ```json
/// {
///   "account_id": "...",                        // Optional, falls back to CLOUDFLARE_ACCOUNT_ID
///   "api_token": "...",                         // Optional, falls back to CLOUDFLARE_API_TOKEN
///   "model": "@cf/meta/llama-3-8b-instruct",    // Optional, falls back to CLOUDFLARE_MODEL
///   "base_url": "https://..."                   // Optional, custom API endpoint
/// }
/// ```
pub struct CloudflareScorerFactory;

impl ScorerFactory for CloudflareScorerFactory {
    fn backend_name(&self) -> &'static str {
        "cloudflare"
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn Scorer>, ConfigurationError> {
        self.validate_config(config)?;
        Ok(Arc::new(CloudflareScorer::from_config(config)?))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), ConfigurationError> {
        credentials().check(config)?;

        if let Some(url) = config["base_url"].as_str() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigurationError::InvalidValue {
                    key: "base_url".to_string(),
                    message: "must start with http:// or https://".to_string(),
                });
            }
        }

        Ok(())
    }

    fn default_config(&self) -> JsonValue {
        serde_json::json!({
            "model": DEFAULT_CLOUDFLARE_MODEL,
            "base_url": DEFAULT_BASE_URL
        })
    }

    fn description(&self) -> &'static str {
        "Cloudflare Workers AI text generation"
    }
}
