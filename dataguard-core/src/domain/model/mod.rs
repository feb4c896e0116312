pub mod record;
pub mod schema;
pub mod value;

pub use record::{Dataset, Record, RecordId};
pub use schema::{DomainName, FieldDefinition, FieldType, ForeignKey, Schema};
pub use value::{DEFAULT_DATE_FORMAT, Value};
