//! # ranker-core
//!
//! Deterministic building blocks for ranking candidates with an LLM scorer.
//!
//! This crate owns everything around the scorer's judgment that must be
//! predictable:
//! - Which rubric is in force, and is it well-formed?
//! - What exactly do we send for each candidate?
//! - What did the scorer actually say, once the noise is stripped?
//! - In which order are results shown?
//!
//! ## Key Guarantees
//!
//! 1. **No LLM calls**: nothing in this crate performs I/O against a scorer
//! 2. **Deterministic prompts**: same candidate and rubric, same prompt bytes
//! 3. **Total canonicalization**: any parsed reply yields a `CanonicalResult`
//! 4. **Stable ordering**: ties keep input order
//!
//! ## Example
//!
//! ```rust,ignore
//! use ranker_core::{canonicalize, parse_reply, Candidate, PromptBuilder, RubricConfig};
//!
//! let rubric = RubricConfig::from_yaml_file("rubric.yaml")?;
//! let builder = PromptBuilder::new(&rubric)?;
//! let candidate = Candidate::new("resumes/jane.pdf", "jane.pdf");
//!
//! let prompt = builder.build(&candidate);
//! let reply = call_your_scorer(&prompt)?;
//! let parsed = parse_reply(&reply)?;
//! let result = canonicalize(&parsed, &candidate.id, &candidate.name, &reply);
//! ```

pub mod candidate;
pub mod document;
pub mod prompt;
pub mod ranking;
pub mod report;
pub mod response;
pub mod result;
pub mod rubric;

// Re-export main types at crate root
pub use candidate::{normalize_candidate, Candidate};
pub use document::{Document, DocumentError};
pub use prompt::{build_prompt, PromptBuilder, PromptError};
pub use ranking::rank_results;
pub use report::{error_preview, render_report, render_summary, write_report};
pub use response::{parse_reply, ParseError, Repair};
pub use result::{canonicalize, CanonicalResult};
pub use rubric::{
    EducationRequirement, LocationRequirement, Qualities, RubricConfig, RubricError,
    SkillRequirement, Weights, WorkArrangement,
};
