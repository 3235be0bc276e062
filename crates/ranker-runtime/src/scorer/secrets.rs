//! Credential handling for scorer backends.
//!
//! Backend credentials (account ids, API tokens) are wrapped in
//! [`ApiCredential`] as soon as they are read:
//!
//! - `Debug`/`Display` print `[REDACTED]`, never the value
//! - the value is zeroed on drop through `secrecy`
//! - callers must call `.expose()` at the point of use
//!
//! ## Usage
//!
//! ```ignore
//! use crate::scorer::secrets::{ApiCredential, CredentialBuilder};
//!
//! let creds = CredentialBuilder::new()
//!     .require("account_id", "CLOUDFLARE_ACCOUNT_ID", "Cloudflare account ID")
//!     .require("api_token", "CLOUDFLARE_API_TOKEN", "Cloudflare API token")
//!     .build(&config)?;
//!
//! request.bearer_auth(creds.get("api_token")?.expose());
//! ```

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;

use crate::config::ConfigurationError;

/// Where a credential was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// JSON scorer config
    Config,
    /// Environment variable
    Environment,
    /// Passed in by code
    Programmatic,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Config => write!(f, "config"),
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Programmatic => write!(f, "programmatic"),
        }
    }
}

/// A securely stored backend credential.
pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
    name: &'static str,
}

impl ApiCredential {
    pub fn new(value: impl Into<String>, source: CredentialSource, name: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
            name,
        }
    }

    /// Load from JSON config, falling back to an environment variable.
    ///
    /// Config wins over the environment. Empty strings count as missing in
    /// both places.
    pub fn from_config_or_env(
        config: &JsonValue,
        config_key: &str,
        env_var: &str,
        name: &'static str,
    ) -> Result<Self, ConfigurationError> {
        if let Some(value) = config_str(config, config_key) {
            return Ok(Self::new(value, CredentialSource::Config, name));
        }

        if let Some(value) = read_env(env_var) {
            return Ok(Self::new(value, CredentialSource::Environment, name));
        }

        Err(ConfigurationError::NotConfigured(format!(
            "Missing {} environment variable ({} required: set '{}' in config or {})",
            env_var, name, config_key, env_var
        )))
    }

    /// Whether a credential could be loaded, without loading it.
    pub fn is_available(config: &JsonValue, config_key: &str, env_var: &str) -> bool {
        config_str(config, config_key).is_some() || read_env(env_var).is_some()
    }

    /// Expose the value for use in a request header.
    ///
    /// Call this only where the value is sent; never store the result.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }
}

fn config_str<'a>(config: &'a JsonValue, key: &str) -> Option<&'a str> {
    config[key].as_str().filter(|v| !v.is_empty())
}

fn read_env(env_var: &str) -> Option<String> {
    std::env::var(env_var).ok().filter(|v| !v.is_empty())
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {} [REDACTED]", self.name, self.source)
    }
}

/// Loads several credentials for one backend.
///
/// Required credentials are checked in registration order, so the first
/// missing one is the one reported.
#[derive(Default)]
pub struct CredentialBuilder {
    required: Vec<CredentialSpec>,
}

struct CredentialSpec {
    config_key: &'static str,
    env_var: &'static str,
    name: &'static str,
}

impl CredentialBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(
        mut self,
        config_key: &'static str,
        env_var: &'static str,
        name: &'static str,
    ) -> Self {
        self.required.push(CredentialSpec {
            config_key,
            env_var,
            name,
        });
        self
    }

    /// Check availability without loading anything.
    pub fn check(&self, config: &JsonValue) -> Result<(), ConfigurationError> {
        for entry in &self.required {
            if !ApiCredential::is_available(config, entry.config_key, entry.env_var) {
                return Err(ConfigurationError::NotConfigured(format!(
                    "Missing {} environment variable ({} required: set '{}' in config or {})",
                    entry.env_var, entry.name, entry.config_key, entry.env_var
                )));
            }
        }
        Ok(())
    }

    pub fn build(self, config: &JsonValue) -> Result<CredentialSet, ConfigurationError> {
        let mut credentials = BTreeMap::new();

        for entry in self.required {
            let cred =
                ApiCredential::from_config_or_env(config, entry.config_key, entry.env_var, entry.name)?;
            credentials.insert(entry.config_key, cred);
        }

        Ok(CredentialSet { credentials })
    }
}

/// Credentials loaded by a [`CredentialBuilder`].
pub struct CredentialSet {
    credentials: BTreeMap<&'static str, ApiCredential>,
}

impl CredentialSet {
    /// Take ownership of a credential.
    pub fn take(&mut self, key: &str) -> Result<ApiCredential, ConfigurationError> {
        self.credentials.remove(key).ok_or_else(|| {
            ConfigurationError::NotConfigured(format!("Credential '{}' not found", key))
        })
    }
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("keys", &self.credentials.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_redacted_in_debug() {
        let secret = "cf-token-12345";
        let cred = ApiCredential::new(secret, CredentialSource::Programmatic, "Cloudflare API token");

        let debug = format!("{:?}", cred);
        assert!(!debug.contains(secret), "Secret exposed in Debug!");
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_credential_redacted_in_display() {
        let secret = "cf-token-12345";
        let cred = ApiCredential::new(secret, CredentialSource::Config, "Cloudflare API token");

        let display = format!("{}", cred);
        assert!(!display.contains(secret), "Secret exposed in Display!");
        assert!(display.contains("Cloudflare API token from config"));
    }

    #[test]
    fn test_credential_expose() {
        let cred = ApiCredential::new("cf-token", CredentialSource::Programmatic, "token");
        assert_eq!(cred.expose(), "cf-token");
    }

    #[test]
    fn test_from_config_or_env_prefers_config() {
        let config = serde_json::json!({ "api_token": "config-token" });

        std::env::set_var("RANKER_TEST_TOKEN_PRIORITY", "env-token");
        let cred = ApiCredential::from_config_or_env(
            &config,
            "api_token",
            "RANKER_TEST_TOKEN_PRIORITY",
            "Test token",
        )
        .unwrap();
        std::env::remove_var("RANKER_TEST_TOKEN_PRIORITY");

        assert_eq!(cred.expose(), "config-token");
        assert_eq!(cred.source(), CredentialSource::Config);
    }

    #[test]
    fn test_from_config_or_env_falls_back_to_env() {
        std::env::set_var("RANKER_TEST_TOKEN_FALLBACK", "env-token");
        let cred = ApiCredential::from_config_or_env(
            &serde_json::json!({ "api_token": "" }),
            "api_token",
            "RANKER_TEST_TOKEN_FALLBACK",
            "Test token",
        )
        .unwrap();
        std::env::remove_var("RANKER_TEST_TOKEN_FALLBACK");

        assert_eq!(cred.expose(), "env-token");
        assert_eq!(cred.source(), CredentialSource::Environment);
    }

    #[test]
    fn test_missing_credential_names_env_var() {
        let err = ApiCredential::from_config_or_env(
            &serde_json::json!({}),
            "api_token",
            "RANKER_TEST_NONEXISTENT_12345",
            "Test token",
        )
        .unwrap_err();

        let message = err.to_string();
        assert!(message.starts_with("Missing RANKER_TEST_NONEXISTENT_12345 environment variable"));
        assert!(message.contains("'api_token'"));
    }

    #[test]
    fn test_builder_reports_first_missing() {
        let builder = CredentialBuilder::new()
            .require("account_id", "RANKER_TEST_MISSING_ACCOUNT", "account")
            .require("api_token", "RANKER_TEST_MISSING_TOKEN", "token");

        let err = builder.check(&serde_json::json!({})).unwrap_err();
        assert!(err.to_string().contains("RANKER_TEST_MISSING_ACCOUNT"));

        let err = builder
            .check(&serde_json::json!({ "account_id": "acc" }))
            .unwrap_err();
        assert!(err.to_string().contains("RANKER_TEST_MISSING_TOKEN"));
    }

    #[test]
    fn test_builder_loads_set() {
        let config = serde_json::json!({ "account_id": "acc", "api_token": "tok" });
        let mut creds = CredentialBuilder::new()
            .require("account_id", "RANKER_TEST_ACCOUNT", "account")
            .require("api_token", "RANKER_TEST_TOKEN", "token")
            .build(&config)
            .unwrap();

        assert_eq!(creds.take("api_token").unwrap().expose(), "tok");
        assert!(creds.take("api_token").is_err());
        assert_eq!(creds.take("account_id").unwrap().expose(), "acc");
    }
}
