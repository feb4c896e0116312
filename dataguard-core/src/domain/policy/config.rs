// dataguard-core/src/domain/policy/config.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use crate::domain::model::FieldType;
use crate::domain::quality::Dimension;
use crate::domain::validators::FormatRule;

pub const CURRENT_POLICY_VERSION: u32 = 1;
pub const DEFAULT_TOLERANCE: f64 = 0.01;

// --- CONFIGURATION STRUCTS ---

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PolicyConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub defaults: PolicyDefaults,

    #[serde(default)]
    pub domains: BTreeMap<String, DomainPolicyConfig>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_POLICY_VERSION,
            defaults: PolicyDefaults::default(),
            domains: BTreeMap::new(),
        }
    }
}

impl PolicyConfig {
    /// Canonical YAML rendering, used by `dataguard check` to show the effective policy.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

fn default_version() -> u32 {
    CURRENT_POLICY_VERSION
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct PolicyDefaults {
    #[validate(nested)]
    #[serde(default = "ThresholdConfig::standard")]
    pub thresholds: ThresholdConfig,

    #[validate(range(min = 0.0, message = "Tolerance must be non-negative"))]
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl Default for PolicyDefaults {
    fn default() -> Self {
        Self {
            thresholds: ThresholdConfig::standard(),
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

/// Maximum violation ratio per dimension. Unset entries fall back to the policy defaults.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, Default, PartialEq)]
pub struct ThresholdConfig {
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completeness: Option<f64>,
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uniqueness: Option<f64>,
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity: Option<f64>,
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consistency: Option<f64>,
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<f64>,
}

impl ThresholdConfig {
    /// Completeness ≤ 2%, Uniqueness 0, Validity ≤ 1%, Consistency ≤ 0.5%, Integrity 0.
    pub fn standard() -> Self {
        Self {
            completeness: Some(0.02),
            uniqueness: Some(0.0),
            validity: Some(0.01),
            consistency: Some(0.005),
            integrity: Some(0.0),
        }
    }

    pub fn get(&self, dimension: Dimension) -> Option<f64> {
        match dimension {
            Dimension::Completeness => self.completeness,
            Dimension::Uniqueness => self.uniqueness,
            Dimension::Validity => self.validity,
            Dimension::Consistency => self.consistency,
            Dimension::Integrity => self.integrity,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone, Default)]
pub struct DomainPolicyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub primary_key: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unique_keys: Vec<Vec<String>>,

    #[validate(nested)]
    #[serde(default)]
    pub fields: Vec<FieldConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub consistency: Vec<ConsistencyCheckConfig>,

    #[validate(nested)]
    #[serde(default)]
    pub thresholds: ThresholdConfig,

    #[validate(range(min = 0.0))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,

    #[serde(default)]
    pub actions: ActionOverrides,
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct FieldConfig {
    #[validate(length(min = 1, message = "Field name cannot be empty"))]
    pub name: String,

    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    #[serde(default)]
    pub critical: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<FormatRule>,

    /// Allowed values for `enum` fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<ReferenceConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReferenceConfig {
    pub domain: String,
    pub field: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConsistencyCheckConfig {
    pub name: String,
    #[serde(flatten)]
    pub check: ConsistencyKindConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum ConsistencyKindConfig {
    InCatalog { field: String, catalog: Vec<String> },
    SumEquals { target: String, items: String },
    ProductEquals { target: String, factors: Vec<String> },
    LengthEquals { field: String, length: usize },
}

/// Action names stay raw strings here; the router parses them and recovers from unknown ones.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ActionOverrides {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ingestion: BTreeMap<Dimension, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub at_rest: BTreeMap<Dimension, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldActionOverrides>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct FieldActionOverrides {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ingestion: BTreeMap<Dimension, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub at_rest: BTreeMap<Dimension, String>,
}
