//! Closure-backed scorer.

use async_trait::async_trait;

use super::{InvocationError, ScoreOptions, Scorer};

/// Wraps a synchronous `prompt -> reply` function.
///
/// Useful for plugging in a local model or a canned transformation without
/// writing a full [`Scorer`] impl.
pub struct FnScorer<F> {
    name: String,
    func: F,
}

impl<F> FnScorer<F>
where
    F: Fn(&str) -> Result<String, InvocationError> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self {
            name: "fn".to_string(),
            func,
        }
    }

    pub fn named(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

#[async_trait]
impl<F> Scorer for FnScorer<F>
where
    F: Fn(&str) -> Result<String, InvocationError> + Send + Sync,
{
    async fn score(&self, prompt: &str, _options: &ScoreOptions) -> Result<String, InvocationError> {
        (self.func)(prompt)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
