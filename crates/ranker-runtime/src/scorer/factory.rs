//! Scorer factory registry.
//!
//! Backends register a factory under a name; the ranker asks the registry
//! for a backend by name plus a JSON config. Adding a backend never touches
//! the ranker.
//!
//! ```ignore
//! let mut registry = ScorerRegistry::new();
//! registry.register(Arc::new(CloudflareScorerFactory));
//!
//! let scorer = registry.create("cloudflare", &serde_json::json!({}))?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::Scorer;
use crate::config::ConfigurationError;

/// Creates scorers of one backend from configuration.
pub trait ScorerFactory: Send + Sync {
    /// Unique backend name, e.g. "cloudflare".
    fn backend_name(&self) -> &'static str;

    /// Create a scorer from backend-specific JSON config.
    fn create(&self, config: &JsonValue) -> Result<Arc<dyn Scorer>, ConfigurationError>;

    /// Validate config without creating anything.
    fn validate_config(&self, config: &JsonValue) -> Result<(), ConfigurationError>;

    /// Defaults for optional config keys.
    fn default_config(&self) -> JsonValue {
        serde_json::json!({})
    }

    fn description(&self) -> &'static str {
        "Scorer backend"
    }
}

/// Registry of available scorer backends.
#[derive(Default)]
pub struct ScorerRegistry {
    factories: BTreeMap<String, Arc<dyn ScorerFactory>>,
}

impl ScorerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory, replacing any with the same name.
    pub fn register(&mut self, factory: Arc<dyn ScorerFactory>) {
        self.factories
            .insert(factory.backend_name().to_string(), factory);
    }

    /// Create a scorer by backend name.
    pub fn create(
        &self,
        backend: &str,
        config: &JsonValue,
    ) -> Result<Arc<dyn Scorer>, ConfigurationError> {
        self.factory(backend)?.create(config)
    }

    /// Validate config for a backend.
    pub fn validate(&self, backend: &str, config: &JsonValue) -> Result<(), ConfigurationError> {
        self.factory(backend)?.validate_config(config)
    }

    pub fn available_backends(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }

    pub fn has_backend(&self, backend: &str) -> bool {
        self.factories.contains_key(backend)
    }

    pub fn default_config(&self, backend: &str) -> Option<JsonValue> {
        self.factories.get(backend).map(|f| f.default_config())
    }

    fn factory(&self, backend: &str) -> Result<&Arc<dyn ScorerFactory>, ConfigurationError> {
        self.factories
            .get(backend)
            .ok_or_else(|| ConfigurationError::UnknownBackend {
                name: backend.to_string(),
                available: self
                    .available_backends()
                    .into_iter()
                    .map(String::from)
                    .collect(),
            })
    }

    /// Registry with every built-in backend.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(super::CloudflareScorerFactory));
        registry
    }
}

impl std::fmt::Debug for ScorerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScorerRegistry")
            .field("backends", &self.available_backends())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::StubScorer;

    struct StubFactory;

    impl ScorerFactory for StubFactory {
        fn backend_name(&self) -> &'static str {
            "stub"
        }

        fn create(&self, config: &JsonValue) -> Result<Arc<dyn Scorer>, ConfigurationError> {
            let reply = config["reply"].as_str().unwrap_or("{}");
            Ok(Arc::new(StubScorer::always(reply)))
        }

        fn validate_config(&self, config: &JsonValue) -> Result<(), ConfigurationError> {
            if config["reply"].is_number() {
                return Err(ConfigurationError::InvalidValue {
                    key: "reply".to_string(),
                    message: "must be a string".to_string(),
                });
            }
            Ok(())
        }

        fn description(&self) -> &'static str {
            "Stub backend for tests"
        }
    }

    #[test]
    fn test_register_and_create() {
        let mut registry = ScorerRegistry::new();
        registry.register(Arc::new(StubFactory));

        assert!(registry.has_backend("stub"));
        assert!(!registry.has_backend("unknown"));

        let scorer = registry
            .create("stub", &serde_json::json!({ "reply": "{\"score\": 1}" }))
            .unwrap();
        assert_eq!(scorer.name(), "stub");
    }

    #[test]
    fn test_unknown_backend_lists_available() {
        let mut registry = ScorerRegistry::new();
        registry.register(Arc::new(StubFactory));

        match registry.create("openai", &serde_json::json!({})) {
            Err(ConfigurationError::UnknownBackend { name, available }) => {
                assert_eq!(name, "openai");
                assert_eq!(available, vec!["stub".to_string()]);
            }
            other => panic!("Expected UnknownBackend, got {:?}", other.map(|s| s.name().to_string())),
        }
    }

    #[test]
    fn test_validate() {
        let mut registry = ScorerRegistry::new();
        registry.register(Arc::new(StubFactory));

        assert!(registry.validate("stub", &serde_json::json!({})).is_ok());
        assert!(registry.validate("stub", &serde_json::json!({ "reply": 3 })).is_err());
        assert!(registry.validate("unknown", &serde_json::json!({})).is_err());
    }

    #[test]
    fn test_defaults_include_cloudflare() {
        let registry = ScorerRegistry::with_defaults();
        assert_eq!(registry.available_backends(), vec!["cloudflare"]);
        assert_eq!(
            registry.default_config("cloudflare").unwrap()["model"],
            crate::scorer::DEFAULT_CLOUDFLARE_MODEL
        );
    }
}
