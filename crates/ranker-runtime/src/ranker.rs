//! The ranking loop.
//!
//! For each candidate, in input order:
//! 1. Build the prompt (deterministic)
//! 2. Serve it from the reply cache, if enabled
//! 3. Otherwise invoke the scorer under the per-call timeout, retrying
//!    transient failures when configured
//! 4. Parse and canonicalize the reply
//!
//! A failure at steps 3 or 4 becomes a failed record for that candidate
//! only; the run continues. Once every candidate has a record the list is
//! sorted by [`rank_results`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ranker_core::{
    canonicalize, parse_reply, rank_results, Candidate, CanonicalResult, PromptBuilder,
    RubricConfig,
};

use crate::cache::ReplyCache;
use crate::config::{ConfigurationError, RuntimeConfig};
use crate::resilience::RetryPolicy;
use crate::scorer::{InvocationError, ScoreOptions, Scorer, ScorerInvoker};

/// How long cached replies stay valid.
const CACHE_TTL: Duration = Duration::from_secs(3600);

/// Errors that abort a whole run.
#[derive(Error, Debug)]
pub enum RankError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Ranking cancelled after {completed} of {total} candidates")]
    Cancelled { completed: usize, total: usize },
}

/// Shared cancellation switch.
///
/// Checked before each candidate starts; candidates already in flight run
/// to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Output of one completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingRun {
    /// Ranked results, best first
    pub results: Vec<CanonicalResult>,

    /// When the run started
    pub evaluated_at: DateTime<Utc>,

    /// Wall time of the run, in seconds when serialized
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,

    /// Candidates that hard-failed
    pub failures: usize,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// Progress of one candidate, reported after it finishes.
#[derive(Debug)]
pub struct CandidateProgress<'a> {
    /// 1-based position in the input
    pub index: usize,
    pub total: usize,
    pub candidate: &'a Candidate,
    pub result: &'a CanonicalResult,
    pub elapsed: Duration,
}

/// Receives live progress from a run.
pub trait ProgressObserver: Send + Sync {
    fn candidate_started(&self, _index: usize, _total: usize, _candidate: &Candidate) {}

    fn candidate_finished(&self, _progress: &CandidateProgress<'_>) {}
}

/// Ranks candidates against one rubric.
pub struct Ranker {
    invoker: ScorerInvoker,
    prompts: PromptBuilder,
    concurrency: usize,
    options: ScoreOptions,
    retry: RetryPolicy,
    cache: Option<ReplyCache>,
    cancel: CancelFlag,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl Ranker {
    pub fn builder(rubric: &RubricConfig) -> RankerBuilder {
        RankerBuilder::new(rubric)
    }

    /// Flag that cancels this ranker's runs.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Resolve the scorer without ranking anything.
    pub fn check(&self) -> Result<(), ConfigurationError> {
        self.invoker.resolve().map(|_| ())
    }

    /// Score and rank `candidates`.
    ///
    /// Returns one result per candidate. Fails only on configuration
    /// problems (before any candidate is scored) or cancellation.
    pub async fn rank(&self, candidates: &[Candidate]) -> Result<RankingRun, RankError> {
        let evaluated_at = Utc::now();
        let started = Instant::now();
        let scorer = self.invoker.resolve()?;
        let total = candidates.len();

        tracing::info!(
            candidates = total,
            concurrency = self.concurrency,
            scorer = scorer.name(),
            "Ranking started"
        );

        let outcomes: Vec<Option<CanonicalResult>> = stream::iter(candidates.iter().enumerate())
            .map(|(index, candidate)| self.evaluate_slot(&scorer, index + 1, total, candidate))
            .buffered(self.concurrency)
            .collect()
            .await;

        let completed = outcomes.iter().filter(|o| o.is_some()).count();
        if completed < total {
            tracing::warn!(completed, total, "Ranking cancelled");
            return Err(RankError::Cancelled { completed, total });
        }

        let results: Vec<CanonicalResult> = outcomes.into_iter().flatten().collect();
        let failures = results.iter().filter(|r| r.is_failure()).count();
        let elapsed = started.elapsed();

        tracing::info!(
            candidates = total,
            failures,
            elapsed = ?elapsed,
            "Ranking finished"
        );

        Ok(RankingRun {
            results: rank_results(results),
            evaluated_at,
            elapsed,
            failures,
        })
    }

    async fn evaluate_slot(
        &self,
        scorer: &Arc<dyn Scorer>,
        index: usize,
        total: usize,
        candidate: &Candidate,
    ) -> Option<CanonicalResult> {
        if self.cancel.is_cancelled() {
            tracing::debug!(candidate = %candidate.display_name(), "Skipped after cancellation");
            return None;
        }

        if let Some(observer) = &self.observer {
            observer.candidate_started(index, total, candidate);
        }

        let started = Instant::now();
        let result = self.evaluate(scorer, candidate).await;

        if let Some(observer) = &self.observer {
            observer.candidate_finished(&CandidateProgress {
                index,
                total,
                candidate,
                result: &result,
                elapsed: started.elapsed(),
            });
        }

        Some(result)
    }

    /// Score one candidate. Never fails; errors become a failed record.
    pub async fn evaluate(&self, scorer: &Arc<dyn Scorer>, candidate: &Candidate) -> CanonicalResult {
        let prompt = self.prompts.build(candidate);

        let reply = match &self.cache {
            Some(cache) => cache.get_or_invoke(&prompt, self.invoke(scorer, &prompt)).await,
            None => self.invoke(scorer, &prompt).await,
        };

        let raw = match reply {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!(candidate = %candidate.display_name(), error = %e, "Scorer call failed");
                return CanonicalResult::failed(&candidate.id, &candidate.name, e);
            }
        };

        match parse_reply(&raw) {
            Ok(parsed) => canonicalize(&parsed, &candidate.id, &candidate.name, &raw),
            Err(e) => {
                tracing::debug!(candidate = %candidate.display_name(), error = %e, "Unusable scorer reply");
                tracing::debug!(candidate = %candidate.display_name(), raw = %raw, "Raw reply");
                CanonicalResult::failed(&candidate.id, &candidate.name, e)
            }
        }
    }

    async fn invoke(&self, scorer: &Arc<dyn Scorer>, prompt: &str) -> Result<String, InvocationError> {
        let options = &self.options;
        self.retry
            .run(move || async move {
                match tokio::time::timeout(options.timeout, scorer.score(prompt, options)).await {
                    Ok(reply) => reply,
                    Err(_) => Err(InvocationError::Timeout(options.timeout)),
                }
            })
            .await
    }
}

impl std::fmt::Debug for Ranker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ranker")
            .field("invoker", &self.invoker)
            .field("concurrency", &self.concurrency)
            .field("options", &self.options)
            .field("retry", &self.retry)
            .field("cache", &self.cache.is_some())
            .finish()
    }
}

/// Builder for [`Ranker`].
pub struct RankerBuilder {
    rubric: RubricConfig,
    invoker: Option<ScorerInvoker>,
    config: RuntimeConfig,
    cancel: Option<CancelFlag>,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl RankerBuilder {
    pub fn new(rubric: &RubricConfig) -> Self {
        Self {
            rubric: rubric.clone(),
            invoker: None,
            config: RuntimeConfig::default(),
            cancel: None,
            observer: None,
        }
    }

    /// Use an injected scorer instead of the default backend.
    pub fn scorer(mut self, scorer: Arc<dyn Scorer>) -> Self {
        self.invoker = Some(ScorerInvoker::injected(scorer));
        self
    }

    pub fn invoker(mut self, invoker: ScorerInvoker) -> Self {
        self.invoker = Some(invoker);
        self
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> Result<Ranker, ConfigurationError> {
        self.config.validate()?;
        let prompts = PromptBuilder::new(&self.rubric)?;

        let cache = self
            .config
            .cache_enabled
            .then(|| ReplyCache::new(self.config.cache_capacity, CACHE_TTL));

        Ok(Ranker {
            invoker: self.invoker.unwrap_or_else(ScorerInvoker::default_backend),
            prompts,
            concurrency: self.config.concurrency,
            options: ScoreOptions {
                model: self.config.model.clone(),
                timeout: self.config.timeout,
            },
            retry: RetryPolicy::new(self.config.max_retries, self.config.retry_min_delay),
            cache,
            cancel: self.cancel.unwrap_or_default(),
            observer: self.observer,
        })
    }
}
