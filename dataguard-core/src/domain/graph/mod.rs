pub mod reference;

pub use reference::ReferenceGraph;
