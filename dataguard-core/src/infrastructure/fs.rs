// dataguard-core/src/infrastructure/fs.rs

use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::application::report::Report;
use crate::infrastructure::error::InfrastructureError;

/// Writes `content` through a temporary file in the target directory, then renames it.
/// Readers see either the old file or the complete new one.
pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(
    path: P,
    content: C,
) -> Result<(), InfrastructureError> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    temp_file.write_all(content.as_ref())?;
    temp_file
        .persist(path)
        .map_err(|e| InfrastructureError::Io(e.error))?;

    Ok(())
}

/// Persists a report as pretty JSON.
pub fn write_report(path: &Path, report: &Report) -> Result<(), InfrastructureError> {
    let json = report.to_json()?;
    atomic_write(path, json)?;
    info!(path = ?path, violations = report.violations.len(), "Report written");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::policy::EvaluationContext;
    use anyhow::Result;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write_overwrites_existing() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("nested").join("report.json");

        atomic_write(&file_path, "Initial")?;
        atomic_write(&file_path, "Updated")?;

        assert_eq!(fs::read_to_string(file_path)?, "Updated");
        Ok(())
    }

    #[test]
    fn test_report_is_written_as_json() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("report.json");
        let report = Report {
            context: EvaluationContext::Ingestion,
            as_of: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            policy_version: 1,
            passed: true,
            domains: BTreeMap::new(),
            violations: vec![],
            actions: vec![],
            diagnostics: vec![],
        };

        write_report(&path, &report)?;
        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(json["context"], "ingestion");
        assert_eq!(json["as_of"], "2024-03-01");
        Ok(())
    }
}
