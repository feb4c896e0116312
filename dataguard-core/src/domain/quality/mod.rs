pub mod dimension;
pub mod ratio;
pub mod rule;
pub mod violation;

pub use dimension::Dimension;
pub use ratio::{Ratio, Threshold};
pub use rule::{ConsistencyCheck, Rule, RuleId, RuleKind};
pub use violation::Violation;
