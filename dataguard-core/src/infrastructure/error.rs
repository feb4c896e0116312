// dataguard-core/src/infrastructure/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DatabaseError {
    #[error("DuckDB Engine Error: {0}")]
    #[diagnostic(
        code(dataguard::infra::database::duckdb),
        help("DuckDB failed while reading a tabular snapshot.")
    )]
    DuckDB(#[from] duckdb::Error),
}

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- DATABASE ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DatabaseError),

    // --- FILESYSTEM (IO) ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(dataguard::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    // --- CONFIG / YAML ---
    #[error("YAML Parsing Error: {0}")]
    #[diagnostic(
        code(dataguard::infra::yaml),
        help("Check your YAML syntax (indentation, types).")
    )]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse policy YAML at {path}: {source}")]
    #[diagnostic(
        code(dataguard::infra::policy_yaml),
        help("Check your YAML syntax (indentation, types) and the policy field names.")
    )]
    PolicyParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("JSON Error: {0}")]
    #[diagnostic(code(dataguard::infra::json))]
    Json(#[from] serde_json::Error),

    #[error("Policy configuration not found: {0}")]
    #[diagnostic(
        code(dataguard::infra::policy_missing),
        help("Pass --policy with a file, or a directory holding dataguard.yaml.")
    )]
    PolicyNotFound(String),

    #[error("Configuration Error: {0}")]
    #[diagnostic(code(dataguard::infra::config))]
    Config(String),

    #[error(transparent)]
    #[diagnostic(code(dataguard::infra::context))]
    Context(#[from] anyhow::Error),
}

impl From<duckdb::Error> for InfrastructureError {
    fn from(err: duckdb::Error) -> Self {
        InfrastructureError::Database(DatabaseError::DuckDB(err))
    }
}
