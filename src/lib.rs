//! Docatlas - Introspect Python objects into documentation trees
//!
//! Resolves dotted paths against Python sources, walks their members and
//! parses docstrings into typed sections, producing a serializable tree.

pub mod cli;
pub mod config;
pub mod docstrings;
pub mod error;
pub mod inspect;
pub mod loader;
pub mod logging;
pub mod model;
pub mod parser;
pub mod runtime;

// Re-export main types
pub use config::Config;
pub use docstrings::{DocstringStyle, ParsedDocstring, Section};
pub use error::{Error, Result};
pub use loader::{load, load_batch, load_root, FilterRule, Filters, LoadOptions, LoadRequest};
pub use model::{Category, ObjectNode, Property, RootResult, Signature};
pub use runtime::{ObjectGraph, ObjectId, Runtime, SourceRuntime};
