// AST types for parsed Python code
//
// These types keep the module namespace in declaration order so the source
// runtime can replay it the way the interpreter would bind names.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A parsed Python file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParsedModule {
    /// File path
    pub path: PathBuf,
    /// Dotted module name
    pub module_name: String,
    /// Module-level docstring, raw
    pub docstring: Option<String>,
    /// Top-level statements that bind names, in source order
    pub definitions: Vec<Definition>,
    /// Line of the first syntax error, if the file does not parse cleanly
    pub error_line: Option<usize>,
    /// Total lines in file
    pub total_lines: usize,
}

impl ParsedModule {
    /// Create a new parsed module with basic info
    pub fn new(path: PathBuf, module_name: String) -> Self {
        Self {
            path,
            module_name,
            docstring: None,
            definitions: Vec::new(),
            error_line: None,
            total_lines: 0,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.error_line.is_some()
    }

    pub fn imports(&self) -> impl Iterator<Item = &Import> {
        self.definitions.iter().filter_map(|d| match d {
            Definition::Import(i) => Some(i),
            _ => None,
        })
    }
}

/// A statement that binds or rebinds names
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Definition {
    Class(Class),
    Function(Function),
    Attribute(Attribute),
    Import(Import),
    /// `Target.attribute = value` outside the target's body
    SetAttribute(SetAttribute),
}

/// An import statement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Import {
    /// The module being imported
    pub module: String,
    /// Specific names imported (for `from x import y`)
    pub names: Vec<ImportedName>,
    /// Import kind
    pub kind: ImportKind,
    /// Line number
    pub line: usize,
}

impl Import {
    /// Create a `from x import y` style import
    pub fn from_import(module: &str, names: Vec<ImportedName>, line: usize) -> Self {
        Self {
            module: module.to_string(),
            names,
            kind: ImportKind::From,
            line,
        }
    }

    /// Create a relative import
    pub fn relative(module: &str, names: Vec<ImportedName>, level: usize, line: usize) -> Self {
        Self {
            module: module.to_string(),
            names,
            kind: ImportKind::Relative { level },
            line,
        }
    }
}

/// A single imported name with optional alias
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportedName {
    /// Original name
    pub name: String,
    /// Alias (from `as` clause)
    pub alias: Option<String>,
}

impl ImportedName {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            alias: None,
        }
    }

    pub fn with_alias(name: &str, alias: &str) -> Self {
        Self {
            name: name.to_string(),
            alias: Some(alias.to_string()),
        }
    }

    /// Get the name as used in code (alias if present, otherwise original)
    pub fn used_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Kind of import statement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ImportKind {
    /// `import x` or `import x as y`
    Direct,
    /// `from x import y`
    From,
    /// `from . import y` or `from ..x import y`
    Relative { level: usize },
}

/// A class definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Class {
    /// Class name
    pub name: String,
    /// Class docstring, raw
    pub docstring: Option<String>,
    /// Base classes (as written, not resolved)
    pub bases: Vec<String>,
    /// Decorators applied to the class
    pub decorators: Vec<String>,
    /// Class body statements in source order
    pub body: Vec<Definition>,
    /// `self.x = ...` assignments found in `__init__`
    pub constructor_attributes: Vec<Attribute>,
    /// Starting line number (decorators included)
    pub line_start: usize,
    /// Ending line number
    pub line_end: usize,
}

impl Class {
    pub fn new(name: &str, line_start: usize) -> Self {
        Self {
            name: name.to_string(),
            docstring: None,
            bases: Vec::new(),
            decorators: Vec::new(),
            body: Vec::new(),
            constructor_attributes: Vec::new(),
            line_start,
            line_end: line_start,
        }
    }

    /// Check if this is a dataclass
    pub fn is_dataclass(&self) -> bool {
        self.decorators.iter().any(|d| d.contains("dataclass"))
    }


    /// Attributes assigned directly in the body
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.body.iter().filter_map(|d| match d {
            Definition::Attribute(a) => Some(a),
            _ => None,
        })
    }
}

/// An assigned or annotated name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attribute {
    /// Attribute name
    pub name: String,
    /// Type annotation if present
    pub type_hint: Option<String>,
    /// Assigned value as written
    pub value: Option<String>,
    /// String literal right after the assignment
    pub docstring: Option<String>,
    /// Line number
    pub line: usize,
}

impl Attribute {
    pub fn new(name: &str, line: usize) -> Self {
        Self {
            name: name.to_string(),
            type_hint: None,
            value: None,
            docstring: None,
            line,
        }
    }
}

/// Post-hoc attribute assignment on a named object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetAttribute {
    /// Object being assigned to (`Node` in `Node.parent = Node`)
    pub target: String,
    /// Attribute name
    pub attribute: String,
    /// Value as written
    pub value: String,
    /// String literal right after the assignment
    pub docstring: Option<String>,
    pub line: usize,
}

/// A function or method definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Function {
    /// Function name
    pub name: String,
    /// Function docstring, raw
    pub docstring: Option<String>,
    /// Parameters with types and defaults
    pub parameters: Vec<Parameter>,
    /// Return type annotation
    pub return_type: Option<String>,
    /// Decorators applied
    pub decorators: Vec<String>,
    /// Whether this is an async function
    pub is_async: bool,
    /// Whether this is a generator (contains yield)
    pub is_generator: bool,
    /// Starting line number (decorators included)
    pub line_start: usize,
    /// Ending line number
    pub line_end: usize,
}

impl Function {
    pub fn new(name: &str, line_start: usize) -> Self {
        Self {
            name: name.to_string(),
            docstring: None,
            parameters: Vec::new(),
            return_type: None,
            decorators: Vec::new(),
            is_async: false,
            is_generator: false,
            line_start,
            line_end: line_start,
        }
    }

    /// Check if this is a special method (__x__)
    pub fn is_special(&self) -> bool {
        self.name.len() > 4 && self.name.starts_with("__") && self.name.ends_with("__")
    }

    /// Check if this is a property
    pub fn is_property(&self) -> bool {
        self.decorators.iter().any(|d| d == "property" || d.ends_with(".getter"))
    }

    /// Check if this is a staticmethod
    pub fn is_staticmethod(&self) -> bool {
        self.decorators.iter().any(|d| d == "staticmethod")
    }

    /// Name of the property this function extends (`@name.setter`)
    pub fn accessor_of(&self) -> Option<(&str, &str)> {
        self.decorators.iter().find_map(|d| {
            let (owner, accessor) = d.rsplit_once('.')?;
            matches!(accessor, "setter" | "deleter").then_some((owner, accessor))
        })
    }
}

/// A function parameter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Type annotation
    pub type_hint: Option<String>,
    /// Default value as string
    pub default: Option<String>,
    /// Parameter kind
    pub kind: ParameterKind,
}

impl Parameter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_hint: None,
            default: None,
            kind: ParameterKind::Regular,
        }
    }
}

/// Kind of function parameter
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum ParameterKind {
    /// Regular positional or keyword parameter
    Regular,
    /// *args
    Args,
    /// **kwargs
    Kwargs,
    /// Positional-only (before /)
    PositionalOnly,
    /// Keyword-only (after *)
    KeywordOnly,
}
