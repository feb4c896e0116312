// dataguard-core/src/domain/quality/rule.rs

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use super::dimension::Dimension;
use crate::domain::model::{DomainName, ForeignKey};
use crate::domain::validators::FormatValidator;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RuleId(String);

impl RuleId {
    pub fn new(domain: &DomainName, dimension: Dimension, target: &str) -> Self {
        Self(format!("{}.{}.{}", domain, dimension, target))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Record-local derived-value predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsistencyCheck {
    InCatalog {
        field: String,
        catalog: BTreeSet<String>,
    },
    SumEquals {
        target: String,
        items: String,
    },
    ProductEquals {
        target: String,
        factors: Vec<String>,
    },
    LengthEquals {
        field: String,
        length: usize,
    },
}

impl ConsistencyCheck {
    pub fn fields(&self) -> Vec<String> {
        match self {
            Self::InCatalog { field, .. } | Self::LengthEquals { field, .. } => vec![field.clone()],
            Self::SumEquals { target, items } => vec![target.clone(), items.clone()],
            Self::ProductEquals { target, factors } => {
                let mut fields = vec![target.clone()];
                fields.extend(factors.iter().cloned());
                fields
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum RuleKind {
    Required {
        field: String,
    },
    UniqueKey {
        fields: Vec<String>,
    },
    Format {
        field: String,
        validator: FormatValidator,
    },
    Derived {
        name: String,
        check: ConsistencyCheck,
        tolerance: f64,
    },
    Reference {
        field: String,
        target: ForeignKey,
    },
}

impl RuleKind {
    pub fn dimension(&self) -> Dimension {
        match self {
            Self::Required { .. } => Dimension::Completeness,
            Self::UniqueKey { .. } => Dimension::Uniqueness,
            Self::Format { .. } => Dimension::Validity,
            Self::Derived { .. } => Dimension::Consistency,
            Self::Reference { .. } => Dimension::Integrity,
        }
    }

    fn target(&self) -> String {
        match self {
            Self::Required { field } | Self::Format { field, .. } | Self::Reference { field, .. } => {
                field.clone()
            }
            Self::UniqueKey { fields } => fields.join("+"),
            Self::Derived { name, .. } => name.clone(),
        }
    }
}

/// One active quality rule of a domain. Compiled once from configuration.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: RuleId,
    pub domain: DomainName,
    pub kind: RuleKind,
}

impl Rule {
    pub fn new(domain: DomainName, kind: RuleKind) -> Self {
        let id = RuleId::new(&domain, kind.dimension(), &kind.target());
        Self { id, domain, kind }
    }

    pub fn dimension(&self) -> Dimension {
        self.kind.dimension()
    }
}
