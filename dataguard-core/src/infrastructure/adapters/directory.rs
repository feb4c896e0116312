// dataguard-core/src/infrastructure/adapters/directory.rs

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use super::duckdb::DuckDbReader;
use crate::domain::error::SnapshotError;
use crate::domain::model::{DomainName, Schema, Value};
use crate::infrastructure::error::InfrastructureError;
use crate::ports::snapshot::{BufferedSource, RawRecord, RecordSource, SnapshotProvider};

const SUPPORTED_EXTENSIONS: [&str; 4] = ["json", "jsonl", "csv", "parquet"];

/// Serves `<domain>.<ext>` files found under a data directory.
/// JSON holds an array of objects, JSON Lines one object per line; CSV and Parquet go through DuckDB.
pub struct DirectoryProvider {
    root: PathBuf,
    index: BTreeMap<DomainName, PathBuf>,
    duckdb: DuckDbReader,
}

impl DirectoryProvider {
    #[instrument]
    pub fn new(root: &Path) -> Result<Self, InfrastructureError> {
        if !root.is_dir() {
            return Err(InfrastructureError::Config(format!(
                "data directory {:?} does not exist",
                root
            )));
        }

        let mut files: Vec<PathBuf> = WalkDir::new(root)
            .max_depth(2)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e))
            })
            .collect();
        files.sort();

        let mut index = BTreeMap::new();
        for path in files {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let domain = DomainName::new(stem);
            if let Some(existing) = index.get(&domain) {
                warn!(domain = %domain, kept = ?existing, ignored = ?path, "Several files for one domain");
                continue;
            }
            debug!(domain = %domain, path = ?path, "Indexed snapshot file");
            index.insert(domain, path);
        }

        Ok(Self {
            root: root.to_path_buf(),
            index,
            duckdb: DuckDbReader::in_memory()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn domains(&self) -> impl Iterator<Item = &DomainName> {
        self.index.keys()
    }

    async fn read(&self, domain: &DomainName, path: &Path) -> Result<(BTreeSet<String>, Vec<RawRecord>), SnapshotError> {
        let unreadable = |reason: String| SnapshotError::Unreadable {
            domain: domain.to_string(),
            reason,
        };
        let malformed = |reason: String| SnapshotError::Malformed {
            domain: domain.to_string(),
            reason,
        };

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => {
                let content = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| unreadable(e.to_string()))?;
                let json: serde_json::Value =
                    serde_json::from_str(&content).map_err(|e| malformed(e.to_string()))?;
                let serde_json::Value::Array(items) = json else {
                    return Err(malformed("expected a JSON array of objects".into()));
                };
                let rows = items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| json_record(item).ok_or_else(|| malformed(format!("item {} is not an object", i))))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((columns_of(&rows), rows))
            }
            Some("jsonl") => {
                let content = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| unreadable(e.to_string()))?;
                let mut rows = Vec::new();
                for (i, line) in content.lines().enumerate().filter(|(_, l)| !l.trim().is_empty()) {
                    let item: serde_json::Value =
                        serde_json::from_str(line).map_err(|e| malformed(format!("line {}: {}", i + 1, e)))?;
                    rows.push(json_record(item).ok_or_else(|| malformed(format!("line {} is not an object", i + 1)))?);
                }
                Ok((columns_of(&rows), rows))
            }
            _ => {
                let reader = self.duckdb.clone();
                let file = path.to_path_buf();
                let table = tokio::task::spawn_blocking(move || reader.read_table(&file))
                    .await
                    .map_err(|e| unreadable(e.to_string()))?
                    .map_err(|e| unreadable(e.to_string()))?;
                Ok((table.columns.into_iter().collect(), table.rows))
            }
        }
    }
}

#[async_trait]
impl SnapshotProvider for DirectoryProvider {
    async fn open(
        &self,
        domain: &DomainName,
        schema: &Schema,
    ) -> Result<Box<dyn RecordSource>, SnapshotError> {
        let path = self
            .index
            .get(domain)
            .ok_or_else(|| SnapshotError::Missing(domain.to_string()))?;

        let (columns, rows) = self.read(domain, path).await?;

        // Without its key columns a snapshot cannot be identified or deduplicated.
        if !rows.is_empty() || !columns.is_empty() {
            let missing: Vec<&str> = schema
                .primary_key
                .iter()
                .filter(|k| !columns.contains(*k))
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                return Err(SnapshotError::Malformed {
                    domain: domain.to_string(),
                    reason: format!("key column(s) {:?} absent from {:?}", missing, path),
                });
            }
        }

        Ok(Box::new(BufferedSource::new(rows)))
    }
}

fn json_record(item: serde_json::Value) -> Option<RawRecord> {
    match item {
        serde_json::Value::Object(map) => Some(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()),
        _ => None,
    }
}

fn columns_of(rows: &[RawRecord]) -> BTreeSet<String> {
    rows.iter().flat_map(|r| r.keys().cloned()).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    fn schema(key: &str) -> Schema {
        Schema {
            primary_key: vec![key.to_string()],
            ..Schema::default()
        }
    }

    async fn drain(mut source: Box<dyn RecordSource>) -> Result<Vec<RawRecord>> {
        let mut rows = Vec::new();
        while let Some(row) = source.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    #[tokio::test]
    async fn test_reads_json_jsonl_and_csv() -> Result<()> {
        let dir = tempdir()?;
        fs::write(
            dir.path().join("customers.json"),
            r#"[{"id_cliente": 1, "email": "a@x.com"}, {"id_cliente": 2, "email": null}]"#,
        )?;
        fs::write(
            dir.path().join("Sales.jsonl"),
            "{\"id_venda\": 10, \"itens\": [1.5, 2]}\n\n{\"id_venda\": 11}\n",
        )?;
        fs::write(dir.path().join("products.csv"), "sku,preco\nABC123,9.90\n")?;

        let provider = DirectoryProvider::new(dir.path())?;
        assert_eq!(provider.domains().count(), 3);

        let customers = drain(provider.open(&"customers".into(), &schema("id_cliente")).await?).await?;
        assert_eq!(customers.len(), 2);
        assert_eq!(customers[1]["email"], Value::Null);

        let sales = drain(provider.open(&"sales".into(), &schema("id_venda")).await?).await?;
        assert_eq!(sales.len(), 2);
        assert_eq!(
            sales[0]["itens"],
            Value::List(vec![Value::Float(1.5), Value::Integer(2)])
        );

        let products = drain(provider.open(&"products".into(), &schema("sku")).await?).await?;
        assert_eq!(products[0]["preco"], Value::Text("9.90".into()));
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_and_missing_snapshots() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("customers.json"), r#"{"not": "an array"}"#)?;
        fs::write(dir.path().join("products.json"), r#"[{"nome": "Caneca"}]"#)?;
        let provider = DirectoryProvider::new(dir.path())?;

        let customers = provider.open(&"customers".into(), &schema("id_cliente")).await;
        assert!(matches!(customers, Err(SnapshotError::Malformed { .. })));

        let products = provider.open(&"products".into(), &schema("sku")).await;
        assert!(matches!(products, Err(SnapshotError::Malformed { .. })));

        let sales = provider.open(&"sales".into(), &schema("id_venda")).await;
        assert!(matches!(sales, Err(SnapshotError::Missing(_))));
        Ok(())
    }

    #[test]
    fn test_missing_root_is_a_config_error() {
        let result = DirectoryProvider::new(Path::new("/definitely/not/here"));
        assert!(matches!(result, Err(InfrastructureError::Config(_))));
    }
}
