use anyhow::Result;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const POLICY: &str = r#"
version: 1
defaults:
  thresholds: { completeness: 0.05 }
domains:
  customers:
    primary_key: [id_cliente]
    fields:
      - { name: id_cliente, type: numeric }
      - name: email
        critical: true
        format: { rule: regex, pattern: '^[\w.-]+@[\w.-]+\.\w+$' }
  sales:
    primary_key: [id_venda]
    fields:
      - { name: id_venda, type: numeric }
      - name: id_cliente
        type: foreign_key
        references: { domain: customers, field: id_cliente }
"#;

/// Temporary project: `dataguard.yaml` plus a `data/` directory of snapshots.
struct DataGuardTestEnv {
    _tmp: TempDir,
    root: PathBuf,
}

impl DataGuardTestEnv {
    fn new(policy: &str) -> Result<Self> {
        let tmp = tempfile::tempdir()?;
        let root = tmp.path().to_path_buf();
        fs::write(root.join("dataguard.yaml"), policy)?;
        fs::create_dir_all(root.join("data"))?;
        Ok(Self { _tmp: tmp, root })
    }

    fn snapshot(&self, file: &str, content: &str) -> Result<()> {
        fs::write(self.root.join("data").join(file), content)?;
        Ok(())
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    fn dataguard(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("dataguard"));
        cmd.current_dir(&self.root)
            .env_remove("DATAGUARD_CONTEXT")
            .env_remove("DATAGUARD_DATA_DIR")
            .env("RUST_LOG", "warn");
        cmd
    }
}

fn customers(n: usize, missing_email: &[usize]) -> String {
    let rows: Vec<String> = (1..=n)
        .map(|i| {
            if missing_email.contains(&i) {
                format!(r#"{{"id_cliente": {}, "email": null}}"#, i)
            } else {
                format!(r#"{{"id_cliente": {}, "email": "c{}@shop.com"}}"#, i, i)
            }
        })
        .collect();
    format!("[{}]", rows.join(","))
}

fn read_report(path: &Path) -> Result<serde_json::Value> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

#[test]
fn test_clean_snapshots_pass_the_gate() -> Result<()> {
    let env = DataGuardTestEnv::new(POLICY)?;
    env.snapshot("customers.json", &customers(20, &[]))?;
    env.snapshot(
        "sales.jsonl",
        "{\"id_venda\": 1, \"id_cliente\": 3}\n{\"id_venda\": 2, \"id_cliente\": 7}\n",
    )?;

    env.dataguard()
        .args(["evaluate", "--as-of", "2024-06-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PASS"))
        .stdout(predicate::str::contains("customers"));

    Ok(())
}

#[test]
fn test_missing_values_fail_the_gate_and_write_report() -> Result<()> {
    let env = DataGuardTestEnv::new(POLICY)?;
    // 2 missing emails out of 20 records: 0.10 > 0.05.
    env.snapshot("customers.json", &customers(20, &[4, 9]))?;

    env.dataguard()
        .args([
            "evaluate",
            "--domain",
            "customers",
            "--output",
            "out/report.json",
        ])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("FAIL"))
        .stderr(predicate::str::contains("QUALITY GATE FAILED"));

    let report = read_report(&env.path("out/report.json"))?;
    assert_eq!(report["passed"], false);
    assert_eq!(
        report["domains"]["customers"]["dimensions"]["completeness"]["violations"],
        2
    );
    let actions = report["actions"].as_array().map(Vec::len).unwrap_or(0);
    assert_eq!(actions, 2);
    Ok(())
}

#[test]
fn test_orphan_sales_are_reported_in_ingestion_context() -> Result<()> {
    let env = DataGuardTestEnv::new(POLICY)?;
    env.snapshot("customers.json", &customers(5, &[]))?;
    env.snapshot(
        "sales.json",
        r#"[{"id_venda": 1, "id_cliente": 2}, {"id_venda": 2, "id_cliente": 99}]"#,
    )?;

    env.dataguard()
        .args([
            "evaluate",
            "-d",
            "sales",
            "--context",
            "ingestion",
            "-o",
            "report.json",
        ])
        .assert()
        .code(1);

    let report = read_report(&env.path("report.json"))?;
    assert_eq!(report["context"], "ingestion");
    let actions = report["actions"].as_array().cloned().unwrap_or_default();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0]["dimension"], "integrity");
    Ok(())
}

#[test]
fn test_context_from_environment() -> Result<()> {
    let env = DataGuardTestEnv::new(POLICY)?;
    env.snapshot("customers.json", &customers(3, &[]))?;

    env.dataguard()
        .env("DATAGUARD_CONTEXT", "ingestion")
        .args(["evaluate", "-d", "customers", "-o", "report.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("'ingestion' context"));

    assert_eq!(read_report(&env.path("report.json"))?["context"], "ingestion");
    Ok(())
}

#[test]
fn test_unreadable_snapshots_exit_with_snapshot_code() -> Result<()> {
    let env = DataGuardTestEnv::new(POLICY)?;

    env.dataguard()
        .args(["evaluate", "--domain", "customers"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("EVALUATION ABORTED"));

    Ok(())
}

#[test]
fn test_unregistered_domain_is_a_configuration_error() -> Result<()> {
    let env = DataGuardTestEnv::new(POLICY)?;
    env.snapshot("customers.json", &customers(3, &[]))?;

    env.dataguard()
        .args(["evaluate", "--domain", "suppliers"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("suppliers"));

    Ok(())
}

#[test]
fn test_check_summarises_valid_policy() -> Result<()> {
    let env = DataGuardTestEnv::new(POLICY)?;

    env.dataguard()
        .args(["check", "--print"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Policy is valid (2 domains)"))
        .stdout(predicate::str::contains("[customers] -> [sales]"))
        .stdout(predicate::str::contains("primary_key"));

    Ok(())
}

#[test]
fn test_check_rejects_dangling_reference() -> Result<()> {
    let env = DataGuardTestEnv::new(
        r#"
domains:
  sales:
    primary_key: [id_venda]
    fields:
      - { name: id_venda, type: numeric }
      - name: id_cliente
        type: foreign_key
        references: { domain: customers, field: id_cliente }
"#,
    )?;

    env.dataguard()
        .arg("check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid policy"));

    Ok(())
}

#[test]
fn test_unparseable_policy_is_a_configuration_error() -> Result<()> {
    let env = DataGuardTestEnv::new("domains: [unclosed")?;
    env.snapshot("customers.json", &customers(3, &[]))?;

    env.dataguard()
        .arg("evaluate")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Failed to parse policy YAML"));
    env.dataguard().arg("check").assert().code(2);

    Ok(())
}

#[test]
fn test_oversized_snapshot_is_rejected() -> Result<()> {
    let env = DataGuardTestEnv::new(POLICY)?;
    env.snapshot("customers.json", &customers(20, &[]))?;

    env.dataguard()
        .args(["evaluate", "--domain", "customers", "--max-records", "5"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("record limit of 5"));

    Ok(())
}

#[test]
fn test_check_rejects_out_of_range_threshold() -> Result<()> {
    let env = DataGuardTestEnv::new(
        r#"
defaults:
  thresholds: { completeness: 1.5 }
domains: {}
"#,
    )?;

    env.dataguard().arg("check").assert().code(2);
    Ok(())
}
