//! Scorer abstractions for ranker-runtime.
//!
//! A scorer turns a prompt into free text. This module defines the trait,
//! the per-call options, the invocation error taxonomy, and
//! [`ScorerInvoker`], which decides whether an injected scorer or the
//! registry's default backend answers the call.
//!
//! ## Security
//!
//! Backends load credentials through the [`secrets`] module. See
//! [`ApiCredential`] for the recommended patterns.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigurationError;

mod callable;
mod cloudflare;
mod factory;
pub mod secrets;
mod stub;

pub use callable::FnScorer;
pub use cloudflare::{
    extract_reply_text, CloudflareScorer, CloudflareScorerFactory, CLOUDFLARE_ACCOUNT_ID_ENV,
    CLOUDFLARE_API_TOKEN_ENV, CLOUDFLARE_MODEL_ENV, DEFAULT_CLOUDFLARE_MODEL,
};
pub use factory::{ScorerFactory, ScorerRegistry};
pub use secrets::{ApiCredential, CredentialBuilder, CredentialSet, CredentialSource};
pub use stub::{StubReply, StubScorer};

/// Name of the backend used when nothing is injected.
pub const DEFAULT_BACKEND: &str = "cloudflare";

/// Errors from a single scorer call. Never fatal to a run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvocationError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Request timed out after {}", humantime::format_duration(*.0))]
    Timeout(Duration),

    #[error("API returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),

    #[error("{0}")]
    Backend(String),
}

impl InvocationError {
    /// Transport failures, timeouts and server-side errors; worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            InvocationError::Http(_) | InvocationError::Timeout(_) => true,
            InvocationError::Api { status, .. } => *status == 429 || *status >= 500,
            InvocationError::MalformedResponse(_) | InvocationError::Backend(_) => false,
        }
    }
}

/// Options for one scorer call.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreOptions {
    /// Model override; backends fall back to their configured model
    pub model: Option<String>,

    /// Budget for the call
    pub timeout: Duration,
}

impl Default for ScoreOptions {
    fn default() -> Self {
        Self {
            model: None,
            timeout: Duration::from_secs(600),
        }
    }
}

/// Scorer abstraction allows swapping LLM backends.
///
/// This is the only place where the ranking pipeline leaves the process.
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Send one prompt and return the raw reply text.
    async fn score(&self, prompt: &str, options: &ScoreOptions) -> Result<String, InvocationError>;

    /// Backend name for logs.
    fn name(&self) -> &str;
}

/// Chooses which scorer answers a call.
///
/// An injected scorer always wins. Otherwise the registry's backend is
/// created on first use and reused for the rest of the run.
pub enum ScorerInvoker {
    Injected(Arc<dyn Scorer>),
    Default {
        registry: Arc<ScorerRegistry>,
        backend: String,
        config: JsonValue,
        resolved: Mutex<Option<Arc<dyn Scorer>>>,
    },
}

impl ScorerInvoker {
    /// Use a caller-supplied scorer.
    pub fn injected(scorer: Arc<dyn Scorer>) -> Self {
        ScorerInvoker::Injected(scorer)
    }

    /// Use a registry backend, created lazily from `config`.
    pub fn from_registry(
        registry: Arc<ScorerRegistry>,
        backend: impl Into<String>,
        config: JsonValue,
    ) -> Self {
        ScorerInvoker::Default {
            registry,
            backend: backend.into(),
            config,
            resolved: Mutex::new(None),
        }
    }

    /// The built-in backend with environment configuration.
    pub fn default_backend() -> Self {
        Self::from_registry(
            Arc::new(ScorerRegistry::with_defaults()),
            DEFAULT_BACKEND,
            serde_json::json!({}),
        )
    }

    /// Resolve the scorer, surfacing configuration problems early.
    pub fn resolve(&self) -> Result<Arc<dyn Scorer>, ConfigurationError> {
        match self {
            ScorerInvoker::Injected(scorer) => Ok(Arc::clone(scorer)),
            ScorerInvoker::Default {
                registry,
                backend,
                config,
                resolved,
            } => {
                let mut slot = resolved.lock();
                if let Some(scorer) = slot.as_ref() {
                    return Ok(Arc::clone(scorer));
                }
                let scorer = registry.create(backend, config)?;
                tracing::debug!(backend = %backend, "Resolved default scorer");
                *slot = Some(Arc::clone(&scorer));
                Ok(scorer)
            }
        }
    }

    /// Resolve and invoke in one step.
    pub async fn invoke(
        &self,
        prompt: &str,
        options: &ScoreOptions,
    ) -> Result<String, InvocationError> {
        let scorer = self
            .resolve()
            .map_err(|e| InvocationError::Backend(e.to_string()))?;
        scorer.score(prompt, options).await
    }
}

impl std::fmt::Debug for ScorerInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScorerInvoker::Injected(scorer) => {
                f.debug_tuple("Injected").field(&scorer.name()).finish()
            }
            ScorerInvoker::Default {
                backend, resolved, ..
            } => f
                .debug_struct("Default")
                .field("backend", backend)
                .field("resolved", &resolved.lock().is_some())
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFactory {
        created: Arc<AtomicUsize>,
    }

    impl ScorerFactory for CountingFactory {
        fn backend_name(&self) -> &'static str {
            "counting"
        }

        fn create(&self, _config: &JsonValue) -> Result<Arc<dyn Scorer>, ConfigurationError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(StubScorer::always("{}")))
        }

        fn validate_config(&self, _config: &JsonValue) -> Result<(), ConfigurationError> {
            Ok(())
        }
    }

    #[test]
    fn test_transient_classification() {
        assert!(InvocationError::Http("reset".into()).is_transient());
        assert!(InvocationError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(InvocationError::Api { status: 503, message: String::new() }.is_transient());
        assert!(InvocationError::Api { status: 429, message: String::new() }.is_transient());
        assert!(!InvocationError::Api { status: 401, message: String::new() }.is_transient());
        assert!(!InvocationError::MalformedResponse("x".into()).is_transient());
    }

    #[test]
    fn test_timeout_message_is_human() {
        let err = InvocationError::Timeout(Duration::from_secs(600));
        assert_eq!(err.to_string(), "Request timed out after 10m");
    }

    #[tokio::test]
    async fn test_injected_scorer_is_used() {
        let stub = Arc::new(StubScorer::always(r#"{"score": 1}"#));
        let invoker = ScorerInvoker::injected(stub.clone());

        let reply = invoker.invoke("prompt", &ScoreOptions::default()).await.unwrap();
        assert_eq!(reply, r#"{"score": 1}"#);
        assert_eq!(stub.prompts(), vec!["prompt".to_string()]);
    }

    #[tokio::test]
    async fn test_default_backend_resolved_once() {
        let created = Arc::new(AtomicUsize::new(0));
        let mut registry = ScorerRegistry::new();
        registry.register(Arc::new(CountingFactory { created: created.clone() }));

        let invoker =
            ScorerInvoker::from_registry(Arc::new(registry), "counting", serde_json::json!({}));
        for _ in 0..3 {
            invoker.invoke("p", &ScoreOptions::default()).await.unwrap();
        }
        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unknown_backend_is_configuration_error() {
        let invoker = ScorerInvoker::from_registry(
            Arc::new(ScorerRegistry::new()),
            "missing",
            serde_json::json!({}),
        );
        assert!(matches!(
            invoker.resolve(),
            Err(ConfigurationError::UnknownBackend { .. })
        ));
    }
}
