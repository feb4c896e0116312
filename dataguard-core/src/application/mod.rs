// dataguard-core/src/application/mod.rs

pub mod aggregator;
pub mod orchestrator;
pub mod report;
pub mod router;

// --- RE-EXPORTS (FACADE) ---
// The CLI can `use dataguard_core::application::{EvaluationOrchestrator, RunOptions};`
// without knowing the file layout.

pub use aggregator::{DimensionFindings, DomainOutcome, ViolationAggregator};
pub use orchestrator::{DEFAULT_WORKERS, EvaluationOrchestrator, RunOptions, RunState};
pub use report::{DimensionScore, DispatchedAction, DomainReport, DomainStatus, Report};
pub use router::{RemediationRouter, RoutingScope};
