// dataguard-core/src/infrastructure/adapters/mod.rs

pub mod directory;
pub mod duckdb;
pub mod memory;

pub use directory::DirectoryProvider;
pub use duckdb::DuckDbReader;
pub use memory::InMemoryProvider;
