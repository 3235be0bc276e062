//! Prompt construction.
//!
//! One prompt per candidate, laid out as:
//! 1. Role line and strict-JSON output rules
//! 2. The normalized candidate record
//! 3. The full rubric
//! 4. A literal example reply in the expected schema
//!
//! Prompts are pure functions of (candidate, rubric): building twice yields
//! byte-identical text, which keeps golden-file tests and reply caching
//! meaningful.

use serde_json::Value;
use thiserror::Error;

use crate::candidate::Candidate;
use crate::rubric::RubricConfig;

/// Output rules placed right after the role line.
pub const OUTPUT_RULES: &str = "Return a single STRICT JSON object EXACTLY in the format shown in the example.\n\
Important: The response must be valid JSON, with keys and strings in double quotes, \
no comments, no trailing commas, and no Markdown code fences. \
Respond with ONLY the JSON object and nothing else.";

/// Literal reply example embedded in every prompt.
pub const RESPONSE_EXAMPLE: &str = r#"{
  "score": 0.82,
  "breakdown": {
    "experience": 0.9,
    "education": 0.6,
    "general": 0.7,
    "optional_bonus": 0.05
  },
  "passed_required": true,
  "reasons": ["Short explanation here"],
  "explanation": "One or two sentence explanation"
}"#;

/// Closing instruction.
pub const CLOSING_INSTRUCTION: &str =
    "Score the candidate now and return only the JSON object. Do not wrap it in backticks or markdown.";

/// Errors from prompt construction.
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Failed to serialize rubric: {0}")]
    Rubric(#[from] serde_json::Error),
}

/// Builds prompts for one rubric.
///
/// The rubric is serialized once at construction; [`PromptBuilder::build`]
/// is then infallible.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    target_field: String,
    rubric_json: String,
}

impl PromptBuilder {
    pub fn new(rubric: &RubricConfig) -> Result<Self, PromptError> {
        let rubric_value = serde_json::to_value(rubric)?;
        Ok(Self {
            target_field: rubric.target_field.clone(),
            rubric_json: format!("{:#}", rubric_value),
        })
    }

    /// Build the prompt for one candidate.
    pub fn build(&self, candidate: &Candidate) -> String {
        let candidate_json = format!("{:#}", Value::Object(candidate.normalized()));

        let mut prompt = String::with_capacity(
            candidate_json.len() + self.rubric_json.len() + RESPONSE_EXAMPLE.len() + 512,
        );
        prompt.push_str(&format!(
            "You are an assistant that scores candidates for a {} role.\n",
            self.target_field
        ));
        prompt.push_str(OUTPUT_RULES);
        prompt.push_str("\n\nCandidate (input):\n");
        prompt.push_str(&candidate_json);
        prompt.push_str("\n\nConfig (rules):\n");
        prompt.push_str(&self.rubric_json);
        prompt.push_str("\n\nRESPONSE FORMAT EXAMPLE (must be valid JSON):\n");
        prompt.push_str(RESPONSE_EXAMPLE);
        prompt.push_str("\n\n");
        prompt.push_str(CLOSING_INSTRUCTION);
        prompt
    }
}

/// Build a single prompt without keeping a [`PromptBuilder`] around.
pub fn build_prompt(candidate: &Candidate, rubric: &RubricConfig) -> Result<String, PromptError> {
    Ok(PromptBuilder::new(rubric)?.build(candidate))
}
