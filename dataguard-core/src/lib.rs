// dataguard-core/src/lib.rs

#![allow(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::perf)]

// --- HEXAGONAL MODULES ---

// 1. Ports: the snapshot pull interface the engine depends on.
pub mod ports;

// 2. Domain: records, validators, evaluators, policy registry, reference graph.
// Depends on nothing else in the crate.
pub mod domain;

// 3. Infrastructure: YAML policy loading, snapshot adapters, atomic writes.
pub mod infrastructure;

// 4. Application: aggregation, routing, run orchestration.
pub mod application;

// --- GLOBAL ERROR ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
pub use application::{EvaluationOrchestrator, Report, RoutingScope, RunOptions};
pub use domain::model::DomainName;
pub use domain::policy::{EvaluationContext, PolicyRegistry};
pub use error::DataGuardError;
