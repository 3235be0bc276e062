//! Rubric parsing from YAML/JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::schema::validate_rubric_schema;

/// Allowed distance between the weight total and 1.0.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Errors that can occur when loading a rubric.
#[derive(Error, Debug)]
pub enum RubricError {
    #[error("Failed to read rubric file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Rubric does not match schema: {}", .0.join("; "))]
    SchemaViolation(Vec<String>),

    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Unsupported rubric file extension: {0}")]
    UnsupportedFormat(String),
}

/// Relative weight of each scoring dimension.
///
/// The weights must sum to 1.0; this is checked when a rubric is built or
/// loaded, never at scoring time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Weights {
    pub experience: f64,
    pub education: f64,
    pub general_skills: f64,
}

impl Weights {
    pub fn new(experience: f64, education: f64, general_skills: f64) -> Self {
        Self {
            experience,
            education,
            general_skills,
        }
    }

    /// Named weights in declaration order.
    pub fn entries(&self) -> [(&'static str, f64); 3] {
        [
            ("experience", self.experience),
            ("education", self.education),
            ("general_skills", self.general_skills),
        ]
    }

    pub fn total(&self) -> f64 {
        self.entries().iter().map(|(_, weight)| weight).sum()
    }

    fn validate(&self) -> Result<(), RubricError> {
        for (name, weight) in self.entries() {
            if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
                return Err(RubricError::InvalidWeights(format!(
                    "weight '{}' must be within [0, 1], got {}",
                    name, weight
                )));
            }
        }

        let total = self.total();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(RubricError::InvalidWeights(format!(
                "weights must sum to 1.0, got {:.4}",
                total
            )));
        }

        Ok(())
    }
}

/// Education baseline: named degree levels plus language proficiencies.
///
/// ```yaml
/// education:
///   school: "high school diploma"
///   computer science: "bachelor degree"
///   languages:
///     english: "conversational"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EducationRequirement {
    /// Field of study (or "school") to minimum degree
    #[serde(flatten)]
    pub degrees: BTreeMap<String, String>,

    /// Language to required level
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub languages: BTreeMap<String, String>,
}

/// Minimum experience for one skill.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkillRequirement {
    /// Minimum years of hands-on experience
    #[serde(alias = "years")]
    pub minimum_years: u32,

    /// Whether adjacent skills (frameworks, synonyms) may satisfy it
    #[serde(default)]
    pub relative_skills_accepted: bool,
}

impl SkillRequirement {
    pub fn new(minimum_years: u32, relative_skills_accepted: bool) -> Self {
        Self {
            minimum_years,
            relative_skills_accepted,
        }
    }
}

/// Accepted work arrangement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum WorkArrangement {
    Remote,
    Hybrid,
    #[serde(alias = "on-site", alias = "onsite")]
    OnSite,
}

impl fmt::Display for WorkArrangement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkArrangement::Remote => write!(f, "remote"),
            WorkArrangement::Hybrid => write!(f, "hybrid"),
            WorkArrangement::OnSite => write!(f, "on_site"),
        }
    }
}

/// Where the candidate must be based.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct LocationRequirement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(default, alias = "city", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// A set of qualities. Used for both the required baseline and the
/// optional bonus section.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Qualities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<EducationRequirement>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub specific_skills_and_experience_in_years: BTreeMap<String, SkillRequirement>,

    /// Soft skills (communication, team work, ...)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub general_skills: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub available_types_of_work: Vec<WorkArrangement>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal_information: Option<LocationRequirement>,
}

impl Qualities {
    /// True when no section is set.
    pub fn is_empty(&self) -> bool {
        self.education.is_none()
            && self.specific_skills_and_experience_in_years.is_empty()
            && self.general_skills.is_empty()
            && self.available_types_of_work.is_empty()
            && self.personal_information.is_none()
    }

    pub fn with_skill(mut self, name: impl Into<String>, requirement: SkillRequirement) -> Self {
        self.specific_skills_and_experience_in_years
            .insert(name.into(), requirement);
        self
    }

    pub fn with_general_skill(mut self, skill: impl Into<String>) -> Self {
        self.general_skills.push(skill.into());
        self
    }

    pub fn with_work_arrangement(mut self, arrangement: WorkArrangement) -> Self {
        self.available_types_of_work.push(arrangement);
        self
    }

    pub fn with_education(mut self, education: EducationRequirement) -> Self {
        self.education = Some(education);
        self
    }

    pub fn with_location(mut self, location: LocationRequirement) -> Self {
        self.personal_information = Some(location);
        self
    }
}

/// A scoring rubric.
///
/// Built once per run and read-only afterwards. Construction (either via
/// [`RubricConfig::new`] or one of the loaders) guarantees that the weights
/// sum to 1.0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RubricConfig {
    /// Field the candidates are evaluated for (e.g. "software engineering")
    pub target_field: String,

    pub weights: Weights,

    /// Baseline every candidate must meet
    #[serde(default)]
    pub required_qualities: Qualities,

    /// Good-to-have qualities, only ever a bonus
    #[serde(default)]
    pub optional_qualities: Qualities,
}

impl RubricConfig {
    /// Build a rubric programmatically.
    pub fn new(target_field: impl Into<String>, weights: Weights) -> Result<Self, RubricError> {
        let rubric = Self {
            target_field: target_field.into(),
            weights,
            required_qualities: Qualities::default(),
            optional_qualities: Qualities::default(),
        };
        rubric.validate()?;
        Ok(rubric)
    }

    pub fn with_required(mut self, qualities: Qualities) -> Self {
        self.required_qualities = qualities;
        self
    }

    pub fn with_optional(mut self, qualities: Qualities) -> Self {
        self.optional_qualities = qualities;
        self
    }

    /// Parse a rubric from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, RubricError> {
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Parse a rubric from JSON string.
    pub fn from_json(json: &str) -> Result<Self, RubricError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse a rubric from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, RubricError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse a rubric from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RubricError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse a rubric file, picking the format from its extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RubricError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "yaml" | "yml" => Self::from_yaml_file(path),
            "json" => Self::from_json_file(path),
            other => Err(RubricError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Validate against the schema, deserialize, then check invariants.
    fn from_value(value: serde_json::Value) -> Result<Self, RubricError> {
        validate_rubric_schema(&value).map_err(RubricError::SchemaViolation)?;
        let rubric: RubricConfig = serde_json::from_value(value)?;
        rubric.validate()?;

        tracing::debug!(
            target_field = %rubric.target_field,
            required_skills = rubric.required_qualities.specific_skills_and_experience_in_years.len(),
            optional_skills = rubric.optional_qualities.specific_skills_and_experience_in_years.len(),
            "Rubric loaded"
        );

        Ok(rubric)
    }

    fn validate(&self) -> Result<(), RubricError> {
        if self.target_field.trim().is_empty() {
            return Err(RubricError::MissingField("target_field".to_string()));
        }

        self.weights.validate()
    }
}
