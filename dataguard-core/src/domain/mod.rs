// dataguard-core/src/domain/mod.rs

pub mod error;
pub mod evaluators;
pub mod graph;
pub mod model;
pub mod policy;
pub mod quality;
pub mod validators;

pub use error::DomainError;
