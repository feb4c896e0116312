// dataguard-core/src/domain/policy/action.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::quality::Dimension;

/// When a violation is found: on the way in, or on data already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationContext {
    Ingestion,
    #[default]
    AtRest,
}

impl EvaluationContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ingestion => "ingestion",
            Self::AtRest => "at_rest",
        }
    }
}

impl fmt::Display for EvaluationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EvaluationContext {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "ingestion" => Ok(Self::Ingestion),
            "at_rest" | "rest" => Ok(Self::AtRest),
            _ => Err(format!("Unknown evaluation context: {}", s)),
        }
    }
}

/// Directive handed to the external remediation worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CorrectiveAction {
    RejectAndNotifySource,
    UpsertOrDeduplicate,
    RejectChildUntilParentExists,
    SendToRemediationQueue,
    MergeOrDeleteDuplicates,
    CorrectOrRemove,
    IsolateOrphan,
    FlagForManualReview,
}

impl CorrectiveAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RejectAndNotifySource => "reject-and-notify-source",
            Self::UpsertOrDeduplicate => "upsert-or-deduplicate",
            Self::RejectChildUntilParentExists => "reject-child-until-parent-exists",
            Self::SendToRemediationQueue => "send-to-remediation-queue",
            Self::MergeOrDeleteDuplicates => "merge-or-delete-duplicates",
            Self::CorrectOrRemove => "correct-or-remove",
            Self::IsolateOrphan => "isolate-orphan",
            Self::FlagForManualReview => "flag-for-manual-review",
        }
    }

    /// Actions that keep the record out of the accepted partition at ingestion.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::RejectAndNotifySource | Self::RejectChildUntilParentExists
        )
    }

    pub fn default_for(dimension: Dimension, context: EvaluationContext) -> Self {
        match (context, dimension) {
            (EvaluationContext::Ingestion, Dimension::Completeness)
            | (EvaluationContext::Ingestion, Dimension::Validity)
            | (EvaluationContext::Ingestion, Dimension::Consistency) => Self::RejectAndNotifySource,
            (EvaluationContext::Ingestion, Dimension::Uniqueness) => Self::UpsertOrDeduplicate,
            (EvaluationContext::Ingestion, Dimension::Integrity) => {
                Self::RejectChildUntilParentExists
            }
            (EvaluationContext::AtRest, Dimension::Completeness) => Self::SendToRemediationQueue,
            (EvaluationContext::AtRest, Dimension::Uniqueness) => Self::MergeOrDeleteDuplicates,
            (EvaluationContext::AtRest, Dimension::Validity)
            | (EvaluationContext::AtRest, Dimension::Consistency) => Self::CorrectOrRemove,
            (EvaluationContext::AtRest, Dimension::Integrity) => Self::IsolateOrphan,
        }
    }
}

impl fmt::Display for CorrectiveAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CorrectiveAction {
    type Err = String;

    // Accepts both `send-to-remediation-queue` and `send_to_remediation_queue`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "reject-and-notify-source" => Ok(Self::RejectAndNotifySource),
            "upsert-or-deduplicate" => Ok(Self::UpsertOrDeduplicate),
            "reject-child-until-parent-exists" => Ok(Self::RejectChildUntilParentExists),
            "send-to-remediation-queue" => Ok(Self::SendToRemediationQueue),
            "merge-or-delete-duplicates" => Ok(Self::MergeOrDeleteDuplicates),
            "correct-or-remove" => Ok(Self::CorrectOrRemove),
            "isolate-orphan" => Ok(Self::IsolateOrphan),
            "flag-for-manual-review" => Ok(Self::FlagForManualReview),
            _ => Err(format!("Unknown corrective action: {}", s)),
        }
    }
}
