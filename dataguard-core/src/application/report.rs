// dataguard-core/src/application/report.rs

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::model::{DomainName, RecordId};
use crate::domain::policy::{CorrectiveAction, EvaluationContext};
use crate::domain::quality::{Dimension, Ratio, RuleId, Threshold, Violation};

/// Ratio of one dimension of one domain against its threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionScore {
    pub violations: u64,
    pub evaluated: u64,
    pub ratio: f64,
    pub threshold: Threshold,
    pub passed: bool,
    /// Set when the evaluator could not run; the dimension then counts as failing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unavailable: Option<String>,
}

impl DimensionScore {
    pub fn new(ratio: Ratio, threshold: Threshold) -> Self {
        Self {
            violations: ratio.violations,
            evaluated: ratio.evaluated,
            ratio: ratio.value(),
            threshold,
            passed: !ratio.exceeds(threshold),
            unavailable: None,
        }
    }

    pub fn unavailable(reason: impl Into<String>, threshold: Threshold) -> Self {
        Self {
            violations: 0,
            evaluated: 0,
            ratio: 0.0,
            threshold,
            passed: false,
            unavailable: Some(reason.into()),
        }
    }

    /// Quality score shown on dashboards: `1 - ratio`.
    pub fn score(&self) -> f64 {
        1.0 - self.ratio
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DomainStatus {
    Evaluated,
    Aborted { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainReport {
    #[serde(flatten)]
    pub status: DomainStatus,
    pub records_evaluated: usize,
    pub insufficient_data: bool,
    pub dimensions: BTreeMap<Dimension, DimensionScore>,
    pub passed: bool,
}

impl DomainReport {
    pub fn evaluated(records: usize, dimensions: BTreeMap<Dimension, DimensionScore>) -> Self {
        let passed = dimensions.values().all(|d| d.passed);
        Self {
            status: DomainStatus::Evaluated,
            records_evaluated: records,
            insufficient_data: records == 0,
            dimensions,
            passed,
        }
    }

    pub fn aborted(reason: impl Into<String>) -> Self {
        Self {
            status: DomainStatus::Aborted {
                reason: reason.into(),
            },
            records_evaluated: 0,
            insufficient_data: true,
            dimensions: BTreeMap::new(),
            passed: false,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.status, DomainStatus::Aborted { .. })
    }

    pub fn failing_dimensions(&self) -> impl Iterator<Item = Dimension> + '_ {
        self.dimensions
            .iter()
            .filter(|(_, s)| !s.passed)
            .map(|(d, _)| *d)
    }
}

/// Descriptor handed to an external remediation worker. The dataset itself is never touched.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DispatchedAction {
    pub domain: DomainName,
    pub dimension: Dimension,
    pub rule: RuleId,
    pub action: CorrectiveAction,
    pub records: Vec<RecordId>,
    pub cause: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Result of one evaluation run. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub context: EvaluationContext,
    pub as_of: NaiveDate,
    pub policy_version: u32,
    pub passed: bool,
    pub domains: BTreeMap<DomainName, DomainReport>,
    pub violations: Vec<Violation>,
    pub actions: Vec<DispatchedAction>,
    pub diagnostics: Vec<String>,
}

impl Report {
    pub fn domain(&self, name: &DomainName) -> Option<&DomainReport> {
        self.domains.get(name)
    }

    pub fn score(&self, domain: &DomainName, dimension: Dimension) -> Option<&DimensionScore> {
        self.domains.get(domain)?.dimensions.get(&dimension)
    }

    pub fn violations_for(
        &self,
        domain: &DomainName,
        dimension: Dimension,
    ) -> impl Iterator<Item = &Violation> {
        let domain = domain.clone();
        self.violations
            .iter()
            .filter(move |v| v.domain == domain && v.dimension == dimension)
    }

    /// Records of `domain` that received a rejecting action. In an ingestion run these are
    /// held back; every other record goes through.
    pub fn rejected_records(&self, domain: &DomainName) -> BTreeSet<RecordId> {
        self.actions
            .iter()
            .filter(|a| &a.domain == domain && a.action.is_rejection())
            .filter_map(|a| a.records.first().cloned())
            .collect()
    }

    /// Dispatched actions grouped by kind, for the remediation worker.
    pub fn remediation_plan(&self) -> BTreeMap<CorrectiveAction, Vec<&DispatchedAction>> {
        let mut plan: BTreeMap<CorrectiveAction, Vec<&DispatchedAction>> = BTreeMap::new();
        for action in &self.actions {
            plan.entry(action.action).or_default().push(action);
        }
        plan
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
