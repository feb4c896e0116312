// dataguard-core/src/domain/quality/violation.rs

use serde::Serialize;

use super::dimension::Dimension;
use super::rule::{Rule, RuleId};
use crate::domain::model::{DomainName, RecordId};

/// One finding. Never mutated after an evaluator emits it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Violation {
    pub domain: DomainName,
    pub dimension: Dimension,
    pub rule: RuleId,
    pub records: Vec<RecordId>,
    pub fields: Vec<String>,
    pub cause: String,
}

impl Violation {
    pub fn new(rule: &Rule, records: Vec<RecordId>, fields: Vec<String>, cause: String) -> Self {
        Self {
            domain: rule.domain.clone(),
            dimension: rule.dimension(),
            rule: rule.id.clone(),
            records,
            fields,
            cause,
        }
    }

    /// Field used to look up per-field corrective action overrides.
    pub fn primary_field(&self) -> Option<&str> {
        self.fields.first().map(String::as_str)
    }
}
