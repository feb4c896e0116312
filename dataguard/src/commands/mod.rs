// dataguard/src/commands/mod.rs

pub mod check;
pub mod evaluate;
