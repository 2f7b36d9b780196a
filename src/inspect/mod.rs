// Per-object introspection helpers used by the loader

pub mod properties;
pub mod signature;

pub use properties::classify;
pub use signature::{class_signature, extract, resolve_annotation};
