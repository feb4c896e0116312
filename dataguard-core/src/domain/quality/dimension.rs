// dataguard-core/src/domain/quality/dimension.rs

use serde::{Deserialize, Serialize};
use std::fmt;

// Declaration order is the report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Completeness,
    Uniqueness,
    Validity,
    Consistency,
    Integrity,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Self::Completeness,
        Self::Uniqueness,
        Self::Validity,
        Self::Consistency,
        Self::Integrity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completeness => "completeness",
            Self::Uniqueness => "uniqueness",
            Self::Validity => "validity",
            Self::Consistency => "consistency",
            Self::Integrity => "integrity",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "completeness" => Ok(Self::Completeness),
            "uniqueness" => Ok(Self::Uniqueness),
            "validity" => Ok(Self::Validity),
            "consistency" => Ok(Self::Consistency),
            "integrity" => Ok(Self::Integrity),
            _ => Err(format!("Unknown quality dimension: {}", s)),
        }
    }
}
