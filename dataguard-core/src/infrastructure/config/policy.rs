// dataguard-core/src/infrastructure/config/policy.rs

use anyhow::Context;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};
use walkdir::WalkDir;

use crate::domain::policy::{DomainPolicyConfig, PolicyConfig, PolicyRegistry};
use crate::error::DataGuardError;
use crate::infrastructure::error::InfrastructureError;

/// File names looked up when the policy path is a directory.
pub const POLICY_FILE_CANDIDATES: [&str; 2] = ["dataguard.yaml", "dataguard_policy.yaml"];

/// Sub-directory of per-domain fragments, `policies/<domain>.yml`.
pub const SATELLITE_DIR: &str = "policies";

/// Reads the main policy file and merges satellite domain fragments next to it.
/// `path` may be the file itself or the directory that holds it.
#[instrument]
pub fn load_policy_config(path: &Path) -> Result<PolicyConfig, InfrastructureError> {
    let (policy_path, root) = locate(path)?;
    info!(path = ?policy_path, "Loading policy");

    let mut config: PolicyConfig = load_fragment(&policy_path)?;

    let satellite_dir = root.join(SATELLITE_DIR);
    if satellite_dir.is_dir() {
        load_satellite_policies(&mut config, &satellite_dir)?;
    }

    Ok(config)
}

/// Loads and compiles the registry in one go.
pub fn load_registry(path: &Path) -> Result<PolicyRegistry, DataGuardError> {
    let config = load_policy_config(path)?;
    let registry = PolicyRegistry::from_config(&config).map_err(crate::domain::DomainError::from)?;
    info!(
        version = registry.version(),
        domains = registry.domain_names().len(),
        "Policy registry ready"
    );
    Ok(registry)
}

fn locate(path: &Path) -> Result<(PathBuf, PathBuf), InfrastructureError> {
    if path.is_file() {
        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        return Ok((path.to_path_buf(), root));
    }
    if path.is_dir() {
        for filename in POLICY_FILE_CANDIDATES {
            let candidate = path.join(filename);
            if candidate.exists() {
                return Ok((candidate, path.to_path_buf()));
            }
        }
        return Err(InfrastructureError::PolicyNotFound(format!(
            "no policy file in {:?}, checked {:?}",
            path, POLICY_FILE_CANDIDATES
        )));
    }
    Err(InfrastructureError::PolicyNotFound(format!("{:?}", path)))
}

fn load_fragment<T: DeserializeOwned>(path: &Path) -> Result<T, InfrastructureError> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read policy file at {:?}", path))?;
    serde_yaml::from_str(&content).map_err(|source| InfrastructureError::PolicyParse {
        path: path.display().to_string(),
        source,
    })
}

/// One file per domain, named after it. A domain defined both inline and as a fragment
/// is a configuration error, not a silent override.
fn load_satellite_policies(
    config: &mut PolicyConfig,
    dir: &Path,
) -> Result<(), InfrastructureError> {
    let mut fragments: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .map(|entry| entry.into_path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e == "yml" || e == "yaml")
        })
        .collect();
    fragments.sort();

    for path in fragments {
        let Some(domain) = path.file_stem().and_then(|s| s.to_str()).map(str::to_lowercase) else {
            continue;
        };
        if config.domains.keys().any(|k| k.trim().to_lowercase() == domain) {
            return Err(InfrastructureError::Config(format!(
                "domain '{}' is defined both in the main policy and in {:?}",
                domain, path
            )));
        }
        let fragment: DomainPolicyConfig = load_fragment(&path)?;
        info!(domain = %domain, "  📄 Satellite policy loaded");
        config.domains.insert(domain, fragment);
    }

    Ok(())
}
