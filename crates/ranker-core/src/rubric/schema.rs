//! JSON Schema validation for rubrics.
//!
//! Rubrics are validated against `schema/rubric.schema.json` before they are
//! deserialized, so structural mistakes surface as a list of readable
//! messages instead of a single serde error.

use std::sync::OnceLock;
use thiserror::Error;

/// Embedded rubric schema (loaded at compile time).
const RUBRIC_SCHEMA_JSON: &str = include_str!("../../schema/rubric.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Errors from schema validation.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to load schema: {0}")]
    LoadError(String),
}

fn get_validator() -> Result<&'static jsonschema::Validator, SchemaError> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = match serde_json::from_str(RUBRIC_SCHEMA_JSON) {
            Ok(v) => v,
            Err(e) => return Err(format!("Invalid schema JSON: {}", e)),
        };

        match jsonschema::options().build(&schema_value) {
            Ok(v) => Ok(v),
            Err(e) => Err(format!("Failed to compile schema: {}", e)),
        }
    });

    match result {
        Ok(v) => Ok(v),
        Err(e) => Err(SchemaError::LoadError(e.clone())),
    }
}

/// Validate a rubric JSON value against the schema.
///
/// # Returns
///
/// * `Ok(())` - Rubric is structurally valid
/// * `Err(Vec<String>)` - One message per violation, with its location
pub fn validate_rubric_schema(rubric_json: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e.to_string()])?;

    let errors: Vec<String> = validator
        .iter_errors(rubric_json)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check if a rubric JSON value is valid against the schema.
pub fn is_valid_rubric(rubric_json: &serde_json::Value) -> bool {
    get_validator()
        .map(|v| v.is_valid(rubric_json))
        .unwrap_or(false)
}
