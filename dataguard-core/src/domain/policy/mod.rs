// dataguard-core/src/domain/policy/mod.rs

pub mod action;
pub mod config;
pub mod registry;

pub use action::{CorrectiveAction, EvaluationContext};
pub use config::{
    ActionOverrides, ConsistencyCheckConfig, ConsistencyKindConfig, DomainPolicyConfig,
    FieldActionOverrides, FieldConfig, PolicyConfig, PolicyDefaults, ReferenceConfig,
    ThresholdConfig,
};
pub use registry::{DomainPolicy, PolicyRegistry};
