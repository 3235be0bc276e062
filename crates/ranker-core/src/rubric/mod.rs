//! Rubric configuration loading and validation.
//!
//! Rubrics are structured data validated against an embedded JSON Schema,
//! then deserialized into typed sections. The weight invariant is checked
//! once here; the rest of the pipeline treats a `RubricConfig` as read-only.

mod parser;
mod schema;

pub use parser::{
    EducationRequirement, LocationRequirement, Qualities, RubricConfig, RubricError,
    SkillRequirement, Weights, WorkArrangement, WEIGHT_TOLERANCE,
};
pub use schema::{is_valid_rubric, validate_rubric_schema};
