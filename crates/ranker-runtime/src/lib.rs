//! # ranker-runtime
//!
//! Async scoring runtime for ranker.
//!
//! `ranker-core` decides what to send and how to read the answer; this
//! crate does the sending:
//! - [`Scorer`] backends (Cloudflare Workers AI, closures, scripted stubs)
//! - per-call timeout and optional retry with backoff
//! - an optional prompt-keyed reply cache
//! - the [`Ranker`] loop with bounded concurrency and cancellation
//!
//! ## Example
//!
//! ```rust,ignore
//! use ranker_runtime::{Ranker, RuntimeConfig};
//!
//! let ranker = Ranker::builder(&rubric)
//!     .config(RuntimeConfig::from_env()?)
//!     .build()?;
//!
//! ranker.check()?; // fail fast on missing credentials
//! let run = ranker.rank(&candidates).await?;
//! for result in &run.results {
//!     println!("{} {:?}", result.name, result.score_10);
//! }
//! ```

pub mod cache;
pub mod config;
pub mod ranker;
pub mod resilience;
pub mod scorer;

pub use cache::ReplyCache;
pub use config::{ConfigurationError, RuntimeConfig};
pub use ranker::{
    CancelFlag, CandidateProgress, ProgressObserver, RankError, Ranker, RankerBuilder, RankingRun,
};
pub use resilience::RetryPolicy;
pub use scorer::{
    CloudflareScorer, FnScorer, InvocationError, ScoreOptions, Scorer, ScorerInvoker,
    ScorerRegistry, StubReply, StubScorer,
};
