// dataguard-core/src/infrastructure/config/mod.rs

pub mod policy;

pub use policy::{POLICY_FILE_CANDIDATES, SATELLITE_DIR, load_policy_config, load_registry};
