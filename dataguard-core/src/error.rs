// dataguard-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataGuardError {
    // --- DOMAIN (configuration, snapshots, cancellation) ---
    #[error(transparent)]
    Domain(#[from] DomainError),

    // --- INFRASTRUCTURE (IO, parsing, DuckDB) ---
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),
}

impl From<std::io::Error> for DataGuardError {
    fn from(err: std::io::Error) -> Self {
        DataGuardError::Infrastructure(InfrastructureError::Io(err))
    }
}

impl DataGuardError {
    /// Process exit code for the CLI: 2 for configuration problems, 3 for unreadable
    /// snapshots, 130 for cancellation, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Domain(DomainError::Config(_)) => 2,
            Self::Domain(DomainError::Snapshot(_)) => 3,
            Self::Domain(DomainError::Cancelled) => 130,
            Self::Infrastructure(InfrastructureError::PolicyNotFound(_))
            | Self::Infrastructure(InfrastructureError::PolicyParse { .. })
            | Self::Infrastructure(InfrastructureError::Config(_))
            | Self::Infrastructure(InfrastructureError::Yaml(_)) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ConfigError;

    #[test]
    fn test_exit_codes_follow_error_kind() {
        let config: DataGuardError = DomainError::from(ConfigError::UnsupportedVersion(9)).into();
        assert_eq!(config.exit_code(), 2);
        assert_eq!(DataGuardError::from(DomainError::Cancelled).exit_code(), 130);
        let io = DataGuardError::from(std::io::Error::other("boom"));
        assert_eq!(io.exit_code(), 1);
    }
}
