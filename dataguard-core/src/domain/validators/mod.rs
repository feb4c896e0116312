pub mod format;

pub use format::{
    FormatRule, FormatValidator, MISSING, TYPE_MISMATCH, ValidationOutcome, check_present,
    validate,
};
