// dataguard-core/src/domain/model/record.rs

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::schema::{DomainName, Schema};
use super::value::Value;

/// Identifies a record inside one snapshot: its position and, when present, its primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RecordId {
    pub position: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "#{}({})", self.position, key),
            None => write!(f, "#{}", self.position),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: RecordId,
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(position: usize, fields: BTreeMap<String, Value>, schema: &Schema) -> Self {
        let key = composite_key(&fields, &schema.primary_key);
        Self {
            id: RecordId { position, key },
            fields,
        }
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Key tuple for the given fields, `None` if any component is missing.
    pub fn key(&self, fields: &[String]) -> Option<String> {
        composite_key(&self.fields, fields)
    }
}

fn composite_key(fields: &BTreeMap<String, Value>, names: &[String]) -> Option<String> {
    if names.is_empty() {
        return None;
    }
    let parts = names
        .iter()
        .map(|n| fields.get(n).and_then(Value::key_repr))
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("|"))
}

/// Immutable view of one domain's records for a single evaluation run.
#[derive(Debug, Clone)]
pub struct Dataset {
    domain: DomainName,
    records: Arc<[Record]>,
}

impl Dataset {
    pub fn new(domain: DomainName, records: Vec<Record>) -> Self {
        Self {
            domain,
            records: records.into(),
        }
    }

    /// Builds a snapshot from raw field maps, coercing and numbering them in order.
    pub fn from_raw(
        domain: DomainName,
        schema: &Schema,
        rows: impl IntoIterator<Item = BTreeMap<String, Value>>,
    ) -> Self {
        let records = rows
            .into_iter()
            .enumerate()
            .map(|(i, raw)| Record::new(i, schema.coerce(raw), schema))
            .collect();
        Self::new(domain, records)
    }

    pub fn domain(&self) -> &DomainName {
        &self.domain
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
