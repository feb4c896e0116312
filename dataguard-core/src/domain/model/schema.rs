// dataguard-core/src/domain/model/schema.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::value::Value;
use crate::domain::validators::FormatValidator;

/// Business area name. Normalised to lowercase so `Customers` and `customers` match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainName(String);

impl DomainName {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DomainName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    String,
    Numeric,
    Date,
    Enum,
    ForeignKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub domain: DomainName,
    pub field: String,
}

#[derive(Debug, Clone)]
pub struct FieldDefinition {
    pub name: String,
    pub field_type: FieldType,
    /// Type raw values are coerced to. Foreign keys take the type of the key they point at.
    pub value_type: FieldType,
    pub format: Option<FormatValidator>,
    pub critical: bool,
    pub references: Option<ForeignKey>,
    pub date_format: String,
}

/// Ordered field definitions plus key declarations for one domain.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub fields: Vec<FieldDefinition>,
    pub primary_key: Vec<String>,
    pub unique_keys: Vec<Vec<String>>,
}

impl Schema {
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_primary_key_field(&self, name: &str) -> bool {
        self.primary_key.iter().any(|k| k == name)
    }

    /// Applies field types to a raw record. Undeclared fields pass through untouched.
    pub fn coerce(&self, raw: BTreeMap<String, Value>) -> BTreeMap<String, Value> {
        raw.into_iter()
            .map(|(name, value)| {
                let value = match self.field(&name) {
                    Some(def) => value.coerce(def.value_type, &def.date_format),
                    None => value,
                };
                (name, value)
            })
            .collect()
    }
}
