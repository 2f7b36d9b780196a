// Documentation tree produced by the loader
//
// Field names and nesting are the contract consumed by downstream
// serializers and renderers; keep them stable.

use crate::docstrings::Section;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// What kind of entity a node documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Module,
    Package,
    Class,
    Function,
    Method,
    Attribute,
}

impl Category {
    /// Whether children are discovered for this category
    pub fn is_container(self) -> bool {
        matches!(self, Category::Module | Category::Package | Category::Class)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Module => "module",
            Category::Package => "package",
            Category::Class => "class",
            Category::Function => "function",
            Category::Method => "method",
            Category::Attribute => "attribute",
        };
        f.write_str(s)
    }
}

/// Classifier tags attached to a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Property {
    Special,
    Private,
    ClassPrivate,
    Constant,
    Property,
    Cached,
    Writable,
    Readonly,
    Staticmethod,
    Classmethod,
    Abstractmethod,
    Async,
    Exception,
    Dataclass,
}

/// Kind of a signature parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    PositionalOnly,
    PositionalOrKeyword,
    VarPositional,
    KeywordOnly,
    VarKeyword,
}

impl ParameterKind {
    pub fn is_variadic(self) -> bool {
        matches!(self, ParameterKind::VarPositional | ParameterKind::VarKeyword)
    }
}

/// A documented signature parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub kind: ParameterKind,
    pub annotation: Option<String>,
    pub default: Option<String>,
}

impl Parameter {
    pub fn new(name: &str, kind: ParameterKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            annotation: None,
            default: None,
        }
    }

    pub fn with_annotation(mut self, annotation: &str) -> Self {
        self.annotation = Some(annotation.to_string());
        self
    }

    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ParameterKind::VarPositional => f.write_str("*")?,
            ParameterKind::VarKeyword => f.write_str("**")?,
            _ => {}
        }
        f.write_str(&self.name)?;
        if let Some(ref t) = self.annotation {
            write!(f, ": {}", t)?;
        }
        if let Some(ref d) = self.default {
            if self.annotation.is_some() {
                write!(f, " = {}", d)?;
            } else {
                write!(f, "={}", d)?;
            }
        }
        Ok(())
    }
}

/// Ordered parameters plus return annotation of a callable
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub parameters: Vec<Parameter>,
    pub return_annotation: Option<String>,
}

impl Signature {
    /// Look up a parameter by name, ignoring variadic `*`/`**` markers
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        let bare = name.trim_start_matches('*');
        self.parameters.iter().find(|p| p.name == bare)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.parameters.iter().map(|p| p.to_string()).collect();
        write!(f, "({})", params.join(", "))?;
        if let Some(ref r) = self.return_annotation {
            write!(f, " -> {}", r)?;
        }
        Ok(())
    }
}

/// Captured source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub code: String,
    pub line_start: usize,
}

/// One documented entity and its children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectNode {
    pub name: String,
    pub path: String,
    pub category: Category,
    #[serde(rename = "docstring")]
    pub docstring_raw: String,
    pub docstring_sections: Vec<Section>,
    pub docstring_errors: Vec<String>,
    pub signature: Option<Signature>,
    pub properties: BTreeSet<Property>,
    pub source: Option<SourceInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub children: Vec<ObjectNode>,
}

impl ObjectNode {
    pub fn new(name: &str, path: &str, category: Category) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            category,
            docstring_raw: String::new(),
            docstring_sections: Vec::new(),
            docstring_errors: Vec::new(),
            signature: None,
            properties: BTreeSet::new(),
            source: None,
            annotation: None,
            note: None,
            children: Vec::new(),
        }
    }

    /// Direct child by name
    pub fn child(&self, name: &str) -> Option<&ObjectNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Descendant by dotted path relative to this node
    pub fn find(&self, relative: &str) -> Option<&ObjectNode> {
        relative
            .split('.')
            .try_fold(self, |node, segment| node.child(segment))
    }

    pub fn has_property(&self, property: Property) -> bool {
        self.properties.contains(&property)
    }

    /// Number of nodes in this subtree, including self
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(ObjectNode::count).sum::<usize>()
    }
}

/// Outcome of loading one requested root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootResult {
    pub root_path: String,
    pub tree: Option<ObjectNode>,
    pub errors: Vec<String>,
}

impl RootResult {
    /// Whether the root itself resolved
    pub fn resolved(&self) -> bool {
        self.tree.is_some()
    }
}
