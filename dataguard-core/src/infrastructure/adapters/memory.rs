// dataguard-core/src/infrastructure/adapters/memory.rs

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::domain::error::SnapshotError;
use crate::domain::model::{DomainName, Schema};
use crate::ports::snapshot::{BufferedSource, RawRecord, RecordSource, SnapshotProvider};

/// Snapshots held in memory. Each `open` hands out a fresh cursor over the same rows,
/// so re-running over it evaluates an identical snapshot.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    domains: BTreeMap<DomainName, Vec<RawRecord>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_domain(mut self, domain: impl Into<DomainName>, rows: Vec<RawRecord>) -> Self {
        self.insert(domain, rows);
        self
    }

    pub fn insert(&mut self, domain: impl Into<DomainName>, rows: Vec<RawRecord>) {
        self.domains.insert(domain.into(), rows);
    }
}

#[async_trait]
impl SnapshotProvider for InMemoryProvider {
    async fn open(
        &self,
        domain: &DomainName,
        _schema: &Schema,
    ) -> Result<Box<dyn RecordSource>, SnapshotError> {
        let rows = self
            .domains
            .get(domain)
            .ok_or_else(|| SnapshotError::Missing(domain.to_string()))?;
        Ok(Box::new(BufferedSource::new(rows.iter().cloned())))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::model::Value;
    use anyhow::Result;

    #[tokio::test]
    async fn test_cursor_restarts_on_each_open() -> Result<()> {
        let row = RawRecord::from([("id".to_string(), Value::Integer(1))]);
        let provider = InMemoryProvider::new().with_domain("customers", vec![row.clone()]);
        let schema = Schema::default();

        for _ in 0..2 {
            let mut source = provider.open(&"customers".into(), &schema).await?;
            assert_eq!(source.next().await?, Some(row.clone()));
            assert_eq!(source.next().await?, None);
        }

        let missing = provider.open(&"products".into(), &schema).await;
        assert!(matches!(missing, Err(SnapshotError::Missing(_))));
        Ok(())
    }
}
