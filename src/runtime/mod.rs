// Introspection capability
//
// The loader only talks to a `Runtime`: resolve dotted paths, snapshot an
// object's facts, list its declared members. `ObjectGraph` is an in-memory
// implementation; `SourceRuntime` fills one lazily from Python source files.

mod graph;
mod source;

pub use graph::ObjectGraph;
pub use source::SourceRuntime;

use crate::error::Result;
use crate::model::{Signature, SourceInfo};
use std::fmt;
use std::path::PathBuf;

/// Identity of a live object. Equal ids mean the same object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) usize);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What the runtime says an object is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Module { package: bool },
    Class,
    Function,
    Value,
}

/// A base class as written, plus the object it resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseRef {
    pub name: String,
    pub target: Option<ObjectId>,
}

impl BaseRef {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            target: None,
        }
    }

    /// Last dotted segment with any subscript dropped (`typing.Generic[T]` -> `Generic`)
    pub fn simple_name(&self) -> &str {
        let name = self.name.split('[').next().unwrap_or(&self.name);
        let name = name.split('(').next().unwrap_or(name);
        name.rsplit('.').next().unwrap_or(name).trim()
    }
}

/// Where an object's source text lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    File {
        path: PathBuf,
        line_start: usize,
        line_end: usize,
    },
    Inline {
        code: String,
        line_start: usize,
    },
}

impl SourceRef {
    /// Read the referenced text. Unreadable files give `None`.
    pub fn capture(&self) -> Option<SourceInfo> {
        match self {
            SourceRef::Inline { code, line_start } => Some(SourceInfo {
                code: code.clone(),
                line_start: *line_start,
            }),
            SourceRef::File {
                path,
                line_start,
                line_end,
            } => {
                let text = std::fs::read_to_string(path).ok()?;
                let lines: Vec<&str> = text
                    .lines()
                    .skip(line_start.saturating_sub(1))
                    .take(line_end.saturating_sub(*line_start) + 1)
                    .collect();
                if lines.is_empty() {
                    return None;
                }
                Some(SourceInfo {
                    code: lines.join("\n"),
                    line_start: *line_start,
                })
            }
        }
    }
}

/// Snapshot of the facts the runtime exposes about one object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeObject {
    pub name: String,
    /// Dotted path where the object was defined
    pub qualname: String,
    pub kind: ObjectKind,
    /// Dotted name of the defining module
    pub module: String,
    pub docstring: Option<String>,
    pub decorators: Vec<String>,
    pub bases: Vec<BaseRef>,
    /// Signature with annotations as written; `None` for non-callables
    pub signature: Option<Signature>,
    pub annotation: Option<String>,
    pub value: Option<String>,
    /// Declared fields of a tuple-record class
    pub fields: Option<Vec<String>>,
    pub is_async: bool,
    pub is_generator: bool,
    pub source: Option<SourceRef>,
}

impl RuntimeObject {
    pub fn new(name: &str, qualname: &str, kind: ObjectKind, module: &str) -> Self {
        Self {
            name: name.to_string(),
            qualname: qualname.to_string(),
            kind,
            module: module.to_string(),
            docstring: None,
            decorators: Vec::new(),
            bases: Vec::new(),
            signature: None,
            annotation: None,
            value: None,
            fields: None,
            is_async: false,
            is_generator: false,
            source: None,
        }
    }

    pub fn is_module(&self) -> bool {
        matches!(self.kind, ObjectKind::Module { .. })
    }

    pub fn is_package(&self) -> bool {
        matches!(self.kind, ObjectKind::Module { package: true })
    }

    pub fn has_decorator(&self, name: &str) -> bool {
        self.decorators
            .iter()
            .any(|d| d == name || d.rsplit('.').next() == Some(name))
    }
}

/// One entry of an object's namespace
#[derive(Debug)]
pub struct Member {
    pub name: String,
    /// Dotted path the name was imported from, for imported members
    pub origin: Option<String>,
    pub target: Result<ObjectId>,
}

/// An attribute assigned on the receiver inside a constructor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeFacts {
    pub name: String,
    pub annotation: Option<String>,
    pub value: Option<String>,
    pub docstring: Option<String>,
    pub source: Option<SourceRef>,
}

/// Reflection over a live object graph
pub trait Runtime {
    /// Resolve a dotted path to an object
    fn resolve(&self, path: &str) -> Result<ObjectId>;

    /// Snapshot an object's facts
    fn inspect(&self, id: ObjectId) -> Result<RuntimeObject>;

    /// Declared namespace members, in declaration order
    fn members(&self, id: ObjectId) -> Result<Vec<Member>>;

    /// Submodules of a package, sorted by name
    fn submodules(&self, id: ObjectId) -> Result<Vec<(String, ObjectId)>>;

    /// Receiver attributes assigned in a class constructor
    fn constructor_attributes(&self, id: ObjectId) -> Result<Vec<AttributeFacts>>;

    /// Resolve `name` against the namespace of `module` to a dotted path
    fn qualify(&self, module: &str, name: &str) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_base_simple_name() {
        assert_eq!(BaseRef::named("Base").simple_name(), "Base");
        assert_eq!(BaseRef::named("enum.IntEnum").simple_name(), "IntEnum");
        assert_eq!(BaseRef::named("typing.Generic[T]").simple_name(), "Generic");
    }

    #[test]
    fn test_capture_file_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "import os\n\ndef f():\n    return 1\n\nx = 2").unwrap();

        let source = SourceRef::File {
            path: file.path().to_path_buf(),
            line_start: 3,
            line_end: 4,
        };
        let info = source.capture().unwrap();
        assert_eq!(info.code, "def f():\n    return 1");
        assert_eq!(info.line_start, 3);
    }

    #[test]
    fn test_capture_missing_file() {
        let source = SourceRef::File {
            path: PathBuf::from("/nonexistent/module.py"),
            line_start: 1,
            line_end: 2,
        };
        assert!(source.capture().is_none());
    }

    #[test]
    fn test_has_decorator_matches_dotted() {
        let mut object = RuntimeObject::new("f", "m.f", ObjectKind::Function, "m");
        object.decorators.push("functools.cached_property".to_string());
        assert!(object.has_decorator("cached_property"));
        assert!(!object.has_decorator("property"));
    }
}
