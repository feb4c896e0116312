// dataguard-core/src/ports/snapshot.rs

// What the engine needs from a data source: a pull cursor over one domain's records.
// Where the records live (memory, JSON files, CSV through DuckDB) is the adapter's business.

use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};

use crate::domain::error::SnapshotError;
use crate::domain::model::{DomainName, Schema, Value};

/// Field values of one record before type coercion.
pub type RawRecord = BTreeMap<String, Value>;

/// Pull interface over a record source. `Ok(None)` is end-of-data.
#[async_trait]
pub trait RecordSource: Send {
    async fn next(&mut self) -> Result<Option<RawRecord>, SnapshotError>;
}

/// Every source a run reads is drained into memory before evaluation starts, so snapshots
/// are fixed for the whole run. Sources must therefore end; unbounded streams need
/// `RunOptions::with_record_limit`, which turns an overlong source into `SnapshotError::TooLarge`.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// Opens a cursor on `domain`. The schema lets adapters check key columns up front.
    async fn open(
        &self,
        domain: &DomainName,
        schema: &Schema,
    ) -> Result<Box<dyn RecordSource>, SnapshotError>;
}

/// Source over records already read into memory.
#[derive(Debug, Default)]
pub struct BufferedSource {
    rows: VecDeque<RawRecord>,
}

impl BufferedSource {
    pub fn new(rows: impl IntoIterator<Item = RawRecord>) -> Self {
        Self {
            rows: rows.into_iter().collect(),
        }
    }
}

#[async_trait]
impl RecordSource for BufferedSource {
    async fn next(&mut self) -> Result<Option<RawRecord>, SnapshotError> {
        Ok(self.rows.pop_front())
    }
}
