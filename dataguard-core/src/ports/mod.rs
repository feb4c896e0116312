pub mod snapshot;

pub use snapshot::{BufferedSource, RawRecord, RecordSource, SnapshotProvider};
