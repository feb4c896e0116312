// dataguard-core/src/domain/evaluators/mod.rs

use chrono::NaiveDate;
use std::collections::BTreeMap;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::model::{Dataset, DomainName, Record};
use crate::domain::policy::DomainPolicy;
use crate::domain::quality::{Dimension, Rule, Violation};

pub mod completeness;
pub mod consistency;
pub mod integrity;
pub mod uniqueness;
pub mod validity;

pub use completeness::CompletenessEvaluator;
pub use consistency::ConsistencyEvaluator;
pub use integrity::IntegrityEvaluator;
pub use uniqueness::UniquenessEvaluator;
pub use validity::ValidityEvaluator;

/// Lazy, finite sequence of findings. Restart by calling `evaluate` again on the same snapshot.
pub type ViolationStream<'a> = Box<dyn Iterator<Item = Violation> + Send + 'a>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("Snapshot of referenced domain '{referenced}' is not available to '{domain}'")]
    MissingReference {
        domain: String,
        referenced: String,
    },
}

/// Everything one evaluator may read. All of it is shared and read-only.
#[derive(Clone, Copy)]
pub struct EvaluationInput<'a> {
    pub dataset: &'a Dataset,
    pub policy: &'a DomainPolicy,
    /// Fixed snapshots of every domain loaded for the run, keyed by domain.
    pub snapshots: &'a BTreeMap<DomainName, Dataset>,
    pub as_of: NaiveDate,
    pub cancel: &'a CancellationToken,
}

impl<'a> EvaluationInput<'a> {
    /// Records in snapshot order. Stops at the next record boundary once the run is cancelled.
    pub fn records(&self) -> impl Iterator<Item = &'a Record> + Send + 'a {
        let cancel = self.cancel;
        self.dataset
            .records()
            .iter()
            .take_while(move |_| !cancel.is_cancelled())
    }

    pub fn rules(&self, dimension: Dimension) -> Vec<&'a Rule> {
        self.policy.rules_for(dimension).collect()
    }
}

/// One quality dimension. New dimensions plug in without touching the orchestrator.
pub trait Evaluator: Send + Sync {
    fn dimension(&self) -> Dimension;

    /// Units the ratio is computed over: records × rules of this dimension.
    fn denominator(&self, input: &EvaluationInput<'_>) -> u64 {
        let rules = input.policy.rules_for(self.dimension()).count() as u64;
        input.dataset.len() as u64 * rules
    }

    fn evaluate<'a>(&self, input: EvaluationInput<'a>) -> Result<ViolationStream<'a>, EvaluationError>;
}

pub fn standard_evaluators() -> Vec<Box<dyn Evaluator>> {
    vec![
        Box::new(CompletenessEvaluator),
        Box::new(UniquenessEvaluator),
        Box::new(ValidityEvaluator),
        Box::new(ConsistencyEvaluator),
        Box::new(IntegrityEvaluator),
    ]
}
