//! Deterministic scripted scorer.
//!
//! Replies are chosen in this order:
//! 1. the next queued reply, if any (see [`StubScorer::then`])
//! 2. the first rule whose pattern occurs in the prompt
//! 3. the fallback reply
//!
//! Every prompt received is recorded, so tests can assert on call counts
//! and prompt content.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

use super::{InvocationError, ScoreOptions, Scorer};

/// One scripted outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum StubReply {
    Text(String),
    Fail(InvocationError),
}

impl From<&str> for StubReply {
    fn from(text: &str) -> Self {
        StubReply::Text(text.to_string())
    }
}

impl From<String> for StubReply {
    fn from(text: String) -> Self {
        StubReply::Text(text)
    }
}

impl From<InvocationError> for StubReply {
    fn from(err: InvocationError) -> Self {
        StubReply::Fail(err)
    }
}

#[derive(Debug)]
pub struct StubScorer {
    queue: Mutex<VecDeque<StubReply>>,
    rules: Vec<(String, StubReply)>,
    fallback: StubReply,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl StubScorer {
    /// Answer every prompt with `reply`.
    pub fn always(reply: impl Into<StubReply>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            rules: Vec::new(),
            fallback: reply.into(),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer prompts containing `pattern` with `reply`.
    pub fn when(mut self, pattern: impl Into<String>, reply: impl Into<StubReply>) -> Self {
        self.rules.push((pattern.into(), reply.into()));
        self
    }

    /// Queue a one-shot reply, consumed before any rule.
    pub fn then(self, reply: impl Into<StubReply>) -> Self {
        self.queue.lock().push_back(reply.into());
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn pick(&self, prompt: &str) -> StubReply {
        if let Some(reply) = self.queue.lock().pop_front() {
            return reply;
        }
        self.rules
            .iter()
            .find(|(pattern, _)| prompt.contains(pattern.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl Scorer for StubScorer {
    async fn score(&self, prompt: &str, _options: &ScoreOptions) -> Result<String, InvocationError> {
        self.calls.lock().push(prompt.to_string());
        let reply = self.pick(prompt);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match reply {
            StubReply::Text(text) => Ok(text),
            StubReply::Fail(err) => Err(err),
        }
    }

    fn name(&self) -> &str {
        "stub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rules_then_fallback() {
        let stub = StubScorer::always("fallback")
            .when("alice", "for alice")
            .when("bob", InvocationError::Http("connection reset".to_string()));
        let options = ScoreOptions::default();

        assert_eq!(stub.score("about alice", &options).await.unwrap(), "for alice");
        assert!(matches!(
            stub.score("about bob", &options).await,
            Err(InvocationError::Http(_))
        ));
        assert_eq!(stub.score("about carol", &options).await.unwrap(), "fallback");
        assert_eq!(stub.call_count(), 3);
    }

    #[tokio::test]
    async fn test_queue_is_consumed_first() {
        let stub = StubScorer::always("steady")
            .then(InvocationError::Timeout(Duration::from_secs(1)))
            .then("second");
        let options = ScoreOptions::default();

        assert!(stub.score("p", &options).await.is_err());
        assert_eq!(stub.score("p", &options).await.unwrap(), "second");
        assert_eq!(stub.score("p", &options).await.unwrap(), "steady");
    }

    #[tokio::test]
    async fn test_records_prompts_in_order() {
        let stub = StubScorer::always("{}");
        let options = ScoreOptions::default();
        stub.score("one", &options).await.unwrap();
        stub.score("two", &options).await.unwrap();
        assert_eq!(stub.prompts(), vec!["one".to_string(), "two".to_string()]);
    }
}
