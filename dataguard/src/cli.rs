// dataguard/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use dataguard_core::{EvaluationContext, RoutingScope};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dataguard")]
#[command(about = "Data-quality rule evaluation engine", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Emit logs as JSON lines (stderr)
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🛡️ Evaluates domain snapshots against the quality policy
    Evaluate(EvaluateArgs),

    /// 📋 Validates the policy file and prints a summary
    Check {
        /// Policy file, or the directory holding dataguard.yaml
        #[arg(long, default_value = ".")]
        policy: PathBuf,

        /// Print the effective policy (satellites merged) as YAML
        #[arg(long)]
        print: bool,
    },
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Policy file, or the directory holding dataguard.yaml
    #[arg(long, default_value = ".")]
    pub policy: PathBuf,

    /// Directory holding one snapshot file per domain (json, jsonl, csv, parquet)
    #[arg(long, env = "DATAGUARD_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Evaluate only these domains (repeatable). Defaults to every registered domain
    #[arg(long = "domain", short = 'd')]
    pub domains: Vec<String>,

    /// Evaluation context: ingestion | at_rest
    #[arg(long, env = "DATAGUARD_CONTEXT", default_value = "at_rest")]
    pub context: EvaluationContext,

    /// Which violations are routed: failing_only | all
    #[arg(long, default_value = "failing_only")]
    pub scope: RoutingScope,

    /// Reference date for "not in future" checks (YYYY-MM-DD, default: today)
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    /// Write the full JSON report here
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Maximum number of snapshots loaded concurrently
    #[arg(long, default_value_t = dataguard_core::application::DEFAULT_WORKERS)]
    pub workers: usize,

    /// Fail a snapshot holding more records than this (snapshots are read into memory)
    #[arg(long)]
    pub max_records: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, bail};
    use clap::Parser;

    #[test]
    fn test_cli_parse_evaluate_defaults() -> Result<()> {
        let args = Cli::try_parse_from(["dataguard", "evaluate"])?;
        match args.command {
            Commands::Evaluate(eval) => {
                assert_eq!(eval.policy.to_string_lossy(), ".");
                assert!(eval.domains.is_empty());
                assert_eq!(eval.scope, RoutingScope::FailingOnly);
                assert_eq!(eval.as_of, None);
                assert_eq!(eval.output, None);
                assert_eq!(eval.workers, 8);
                assert_eq!(eval.max_records, None);
                assert!(!args.log_json);
                Ok(())
            }
            _ => bail!("Expected Evaluate command"),
        }
    }

    #[test]
    fn test_cli_parse_evaluate_full() -> Result<()> {
        let args = Cli::try_parse_from([
            "dataguard",
            "evaluate",
            "--policy",
            "/tmp/policy.yaml",
            "--data-dir",
            "/tmp/data",
            "-d",
            "customers",
            "--domain",
            "sales",
            "--context",
            "ingestion",
            "--scope",
            "all",
            "--as-of",
            "2024-06-01",
            "--output",
            "report.json",
            "--workers",
            "2",
            "--max-records",
            "5000",
            "--log-json",
        ])?;
        match args.command {
            Commands::Evaluate(eval) => {
                assert_eq!(eval.data_dir.to_string_lossy(), "/tmp/data");
                assert_eq!(eval.domains, vec!["customers", "sales"]);
                assert_eq!(eval.context, EvaluationContext::Ingestion);
                assert_eq!(eval.scope, RoutingScope::All);
                assert_eq!(eval.as_of, NaiveDate::from_ymd_opt(2024, 6, 1));
                assert_eq!(eval.workers, 2);
                assert_eq!(eval.max_records, Some(5000));
                assert!(args.log_json);
                Ok(())
            }
            _ => bail!("Expected Evaluate command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_context() {
        let parsed = Cli::try_parse_from(["dataguard", "evaluate", "--context", "streaming"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_cli_parse_check() -> Result<()> {
        let args = Cli::try_parse_from(["dataguard", "check", "--policy", "p.yaml", "--print"])?;
        match args.command {
            Commands::Check { policy, print } => {
                assert_eq!(policy.to_string_lossy(), "p.yaml");
                assert!(print);
                Ok(())
            }
            _ => bail!("Expected Check command"),
        }
    }
}
