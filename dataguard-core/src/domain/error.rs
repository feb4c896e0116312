// dataguard-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

/// Fatal configuration problems. Raised before any evaluator starts.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum ConfigError {
    #[error("No policy registered for domain '{0}'")]
    #[diagnostic(
        code(dataguard::config::unregistered_domain),
        help("Declare the domain under `domains:` in the policy file.")
    )]
    UnregisteredDomain(String),

    #[error("Threshold for {dimension} in domain '{domain}' is {value}, expected a ratio in [0, 1]")]
    #[diagnostic(code(dataguard::config::threshold_range))]
    ThresholdOutOfRange {
        domain: String,
        dimension: String,
        value: f64,
    },

    #[error("Domain '{domain}' references unknown domain '{target}' (field '{field}')")]
    #[diagnostic(
        code(dataguard::config::dangling_reference),
        help("Foreign keys can only point to domains registered in the same policy.")
    )]
    DanglingReference {
        domain: String,
        field: String,
        target: String,
    },

    #[error("Invalid pattern for field '{field}' in domain '{domain}': {reason}")]
    #[diagnostic(code(dataguard::config::pattern))]
    InvalidPattern {
        domain: String,
        field: String,
        reason: String,
    },

    #[error("Invalid policy for domain '{domain}': {reason}")]
    #[diagnostic(code(dataguard::config::invalid))]
    InvalidPolicy { domain: String, reason: String },

    #[error("Unsupported policy version {0} (expected 1)")]
    #[diagnostic(code(dataguard::config::version))]
    UnsupportedVersion(u32),
}

/// A dataset source that cannot produce records.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum SnapshotError {
    #[error("Snapshot for domain '{domain}' is unreadable: {reason}")]
    #[diagnostic(
        code(dataguard::snapshot::unreadable),
        help("Check that the ingestion collaborator produced the dataset.")
    )]
    Unreadable { domain: String, reason: String },

    #[error("Snapshot for domain '{domain}' is malformed: {reason}")]
    #[diagnostic(code(dataguard::snapshot::malformed))]
    Malformed { domain: String, reason: String },

    #[error("No snapshot available for domain '{0}'")]
    #[diagnostic(code(dataguard::snapshot::missing))]
    Missing(String),

    #[error("Snapshot for domain '{domain}' exceeds the record limit of {limit}")]
    #[diagnostic(
        code(dataguard::snapshot::too_large),
        help("Raise --max-records or split the snapshot; records are held in memory for the run.")
    )]
    TooLarge { domain: String, limit: usize },
}

impl SnapshotError {
    pub fn domain(&self) -> &str {
        match self {
            Self::Unreadable { domain, .. }
            | Self::Malformed { domain, .. }
            | Self::TooLarge { domain, .. } => domain,
            Self::Missing(domain) => domain,
        }
    }
}

/// Unrecognised corrective action. Never escapes the router.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoutingError {
    #[error("Unknown corrective action '{action}' configured for {dimension} in domain '{domain}'")]
    UnknownAction {
        domain: String,
        dimension: String,
        action: String,
    },
}

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("Evaluation run cancelled")]
    #[diagnostic(code(dataguard::run::cancelled))]
    Cancelled,
}
