// dataguard-core/src/infrastructure/adapters/duckdb.rs

use duckdb::{Config, Connection};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::domain::model::Value;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::snapshot::RawRecord;

/// Reads CSV and Parquet files through an in-memory DuckDB.
/// Every cell comes back as text (or null); typing is left to schema coercion.
#[derive(Clone)]
pub struct DuckDbReader {
    conn: Arc<Mutex<Connection>>,
}

/// Column names and rows of one file.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<RawRecord>,
}

impl DuckDbReader {
    pub fn in_memory() -> Result<Self, InfrastructureError> {
        let conn = Connection::open_in_memory_with_flags(Config::default())?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn read_table(&self, path: &Path) -> Result<Table, InfrastructureError> {
        let source = table_function(path)?;
        let conn = self.conn.lock().map_err(|_| {
            InfrastructureError::Io(std::io::Error::other("DuckDB Mutex Poisoned"))
        })?;

        let columns: Vec<String> = {
            let mut stmt = conn.prepare(&format!("DESCRIBE SELECT * FROM {}", source))?;
            let names = stmt.query_map([], |row| row.get::<_, String>(0))?;
            names.collect::<Result<_, _>>()?
        };
        if columns.is_empty() {
            return Ok(Table::default());
        }

        let projection = columns
            .iter()
            .map(|c| format!("CAST({} AS VARCHAR)", quote_ident(c)))
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = conn.prepare(&format!("SELECT {} FROM {}", projection, source))?;
        let mut cursor = stmt.query([])?;

        let mut rows = Vec::new();
        while let Some(row) = cursor.next()? {
            let mut record = BTreeMap::new();
            for (i, name) in columns.iter().enumerate() {
                let cell: Option<String> = row.get(i)?;
                record.insert(name.clone(), cell.map(Value::Text).unwrap_or(Value::Null));
            }
            rows.push(record);
        }

        Ok(Table { columns, rows })
    }
}

fn table_function(path: &Path) -> Result<String, InfrastructureError> {
    let literal = path.to_string_lossy().replace('\'', "''");
    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => Ok(format!("read_csv_auto('{}', all_varchar = true)", literal)),
        Some("parquet") => Ok(format!("read_parquet('{}')", literal)),
        other => Err(InfrastructureError::Config(format!(
            "DuckDB cannot read {:?} files",
            other.unwrap_or("extension-less")
        ))),
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_csv_cells_come_back_as_text() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("products.csv");
        fs::write(&path, "sku,preco,nome\nABC123,10.5,Caneca\n007,,Prato\n")?;

        let table = DuckDbReader::in_memory()?.read_table(&path)?;
        assert_eq!(table.columns.len(), 3);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0]["sku"], Value::Text("ABC123".into()));
        assert_eq!(table.rows[0]["preco"], Value::Text("10.5".into()));
        // Leading zeros survive: nothing is typed before schema coercion.
        assert_eq!(table.rows[1]["sku"], Value::Text("007".into()));
        assert!(table.rows[1]["preco"].is_missing());
        Ok(())
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let result = DuckDbReader::in_memory()
            .and_then(|reader| reader.read_table(Path::new("notes.txt")));
        assert!(matches!(result, Err(InfrastructureError::Config(_))));
    }
}
