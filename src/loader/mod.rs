// Object tree loader
//
// Walks a runtime object depth-first and builds the documentation tree. A
// failing member becomes an error node; only an unresolvable root fails.

mod filters;

pub use filters::{FilterRule, Filters};

use crate::docstrings::{self, DocstringStyle, ParseOptions, Section};
use crate::error::{Error, Result};
use crate::inspect::{self, properties};
use crate::model::{Category, ObjectNode, RootResult, Signature};
use crate::runtime::{AttributeFacts, ObjectId, ObjectKind, Runtime, RuntimeObject};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Base names whose subclasses only document their values
const ENUM_BASES: &[&str] = &["Enum", "IntEnum", "Flag", "IntFlag", "StrEnum"];

/// Bases followed when collecting ancestry or inherited members
const MAX_BASE_DEPTH: usize = 16;

/// Options that shape one load
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub filters: Filters,
    /// Explicit allow-list for the root's members
    pub members: Option<Vec<String>>,
    pub docstring_style: DocstringStyle,
    pub replace_admonitions: bool,
    pub show_source: bool,
    pub inherited_members: bool,
    pub max_depth: Option<usize>,
}

impl LoadOptions {
    fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            style: self.docstring_style,
            replace_admonitions: self.replace_admonitions,
        }
    }
}

/// One root to load
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub path: String,
    pub options: LoadOptions,
}

/// Load the tree rooted at `root_path`.
///
/// Returns the tree and every warning collected on the way, each prefixed
/// with the path it belongs to.
pub fn load(runtime: &dyn Runtime, root_path: &str, options: &LoadOptions) -> Result<(ObjectNode, Vec<String>)> {
    let mut loader = Loader::new(runtime, options);
    let tree = loader.load_root(root_path)?;
    Ok((tree, loader.errors))
}

/// Load one request into an independent result
pub fn load_root(runtime: &dyn Runtime, request: &LoadRequest) -> RootResult {
    match load(runtime, &request.path, &request.options) {
        Ok((tree, errors)) => RootResult {
            root_path: request.path.clone(),
            tree: Some(tree),
            errors,
        },
        Err(e) => {
            warn!(path = %request.path, error = %e, "failed to load root");
            RootResult {
                root_path: request.path.clone(),
                tree: None,
                errors: vec![e.to_string()],
            }
        }
    }
}

/// Load every request in order; one failing root never affects the others
pub fn load_batch(runtime: &dyn Runtime, requests: &[LoadRequest]) -> Vec<RootResult> {
    requests.iter().map(|r| load_root(runtime, r)).collect()
}

/// A child waiting to be documented
enum Candidate {
    Object {
        name: String,
        target: Result<ObjectId>,
        /// Category reported if the object cannot be inspected
        fallback: Category,
    },
    /// Attribute known only from its facts, not a runtime object
    Synthetic(RuntimeObject),
}

impl Candidate {
    fn name(&self) -> &str {
        match self {
            Candidate::Object { name, .. } => name,
            Candidate::Synthetic(object) => &object.name,
        }
    }
}

struct Loader<'a> {
    runtime: &'a dyn Runtime,
    options: &'a LoadOptions,
    errors: Vec<String>,
    /// Objects on the path from the root to the node being built
    ancestors: Vec<ObjectId>,
}

impl<'a> Loader<'a> {
    fn new(runtime: &'a dyn Runtime, options: &'a LoadOptions) -> Self {
        Self {
            runtime,
            options,
            errors: Vec::new(),
            ancestors: Vec::new(),
        }
    }

    fn load_root(&mut self, path: &str) -> Result<ObjectNode> {
        let id = self.runtime.resolve(path)?;
        let object = self.runtime.inspect(id)?;
        let in_class = match path.rsplit_once('.') {
            Some((parent, _)) => self
                .runtime
                .resolve(parent)
                .and_then(|p| self.runtime.inspect(p))
                .map(|p| p.kind == ObjectKind::Class)
                .unwrap_or(false),
            None => false,
        };
        let name = path.rsplit('.').next().unwrap_or(path).to_string();
        debug!(path, "loading root");
        Ok(self.describe(Some(id), object, &name, path, in_class, 0))
    }

    /// Build the node for one object, children included
    fn describe(
        &mut self,
        id: Option<ObjectId>,
        mut object: RuntimeObject,
        name: &str,
        path: &str,
        in_class: bool,
        depth: usize,
    ) -> ObjectNode {
        object.name = name.to_string();
        let category = category_of(&object, in_class);
        debug!(path, %category, "describing object");

        let mut node = ObjectNode::new(name, path, category);
        let ancestry = match (id, object.kind) {
            (Some(id), ObjectKind::Class) => self.ancestry(id),
            _ => Vec::new(),
        };
        node.properties = properties::classify(&object, category, &ancestry);

        node.signature = match (id, category) {
            (Some(id), Category::Class) => inspect::class_signature(self.runtime, id, &object)
                .map_err(|e| debug!(path, error = %e, "no class signature"))
                .ok(),
            (_, Category::Function | Category::Method) => {
                inspect::extract(self.runtime, &object, in_class).ok()
            }
            _ => None,
        };

        node.annotation = self.annotation(&object);
        if self.options.show_source {
            node.source = object.source.as_ref().and_then(|s| s.capture());
        }

        node.docstring_raw = object.docstring.clone().unwrap_or_default();
        self.parse_docstring(&mut node);

        let Some(id) = id else {
            return node;
        };
        if !category.is_container() {
            return node;
        }
        if self.ancestors.contains(&id) {
            debug!(path, "cycle detected");
            node.note = Some(format!("cycle: {} already appears above this node", object.qualname));
            return node;
        }
        if self.options.max_depth.is_some_and(|max| depth >= max) {
            return node;
        }

        self.ancestors.push(id);
        node.children = self.children(id, &object, path, category, &ancestry, depth);
        self.ancestors.pop();
        node
    }

    /// Attribute type: the declared annotation, or a property's return type
    fn annotation(&self, object: &RuntimeObject) -> Option<String> {
        let raw = match object.kind {
            ObjectKind::Value => object.annotation.as_deref(),
            ObjectKind::Function if properties::is_property(object) => object
                .signature
                .as_ref()
                .and_then(|s| s.return_annotation.as_deref()),
            _ => None,
        }?;
        Some(inspect::resolve_annotation(self.runtime, &object.module, raw))
    }

    fn parse_docstring(&mut self, node: &mut ObjectNode) {
        if node.docstring_raw.is_empty() {
            return;
        }

        let (parameters, returns) = match node.signature {
            Some(ref signature) => (
                Some(signature.parameters.as_slice()),
                signature.return_annotation.as_deref(),
            ),
            None => (None, node.annotation.as_deref()),
        };

        let parsed = docstrings::parse(&node.docstring_raw, parameters, returns, self.options.parse_options());
        for warning in &parsed.errors {
            self.errors.push(format!("{}: {}", node.path, warning));
        }
        node.docstring_sections = parsed.sections;
        node.docstring_errors = parsed.errors;
    }

    fn children(
        &mut self,
        id: ObjectId,
        object: &RuntimeObject,
        path: &str,
        category: Category,
        ancestry: &[String],
        depth: usize,
    ) -> Vec<ObjectNode> {
        let is_root = depth == 0;
        let candidates = match category {
            Category::Module | Category::Package => self.module_candidates(id, path, is_root),
            Category::Class => self.class_candidates(id, object, path, ancestry),
            _ => Vec::new(),
        };

        let mut seen = HashSet::new();
        let mut children = Vec::new();
        for candidate in candidates {
            let name = candidate.name().to_string();
            if !self.selected(&name, is_root) || !seen.insert(name.clone()) {
                continue;
            }

            let child_path = format!("{}.{}", path, name);
            let in_class = category == Category::Class;
            let child = match candidate {
                Candidate::Synthetic(object) => self.describe(None, object, &name, &child_path, in_class, depth + 1),
                Candidate::Object { target, fallback, .. } => {
                    match target.and_then(|t| self.runtime.inspect(t).map(|o| (t, o))) {
                        Ok((target, object)) => {
                            self.describe(Some(target), object, &name, &child_path, in_class, depth + 1)
                        }
                        Err(e) => self.error_node(&name, &child_path, fallback, &e),
                    }
                }
            };
            children.push(child);
        }
        children
    }

    /// Filters first, then the root allow-list
    fn selected(&self, name: &str, is_root: bool) -> bool {
        if !self.options.filters.allows(name) {
            return false;
        }
        match self.options.members {
            Some(ref members) if is_root => members.iter().any(|m| m == name),
            _ => true,
        }
    }

    fn allow_listed(&self, name: &str, is_root: bool) -> bool {
        is_root
            && self
                .options
                .members
                .as_ref()
                .is_some_and(|members| members.iter().any(|m| m == name))
    }

    /// Public members defined in the module, then submodules by name
    fn module_candidates(&mut self, id: ObjectId, path: &str, is_root: bool) -> Vec<Candidate> {
        let members = match self.runtime.members(id) {
            Ok(members) => members,
            Err(e) => {
                self.record(path, &e);
                return Vec::new();
            }
        };

        let mut candidates = Vec::new();
        for member in members {
            let explicit = self.allow_listed(&member.name, is_root);
            if member.origin.is_some() && !explicit {
                continue;
            }
            if properties::is_private(&member.name) && !explicit {
                continue;
            }
            candidates.push(Candidate::Object {
                name: member.name,
                target: member.target,
                fallback: Category::Attribute,
            });
        }

        match self.runtime.submodules(id) {
            Ok(submodules) => {
                for (name, sub) in submodules {
                    if properties::is_private(&name) && !self.allow_listed(&name, is_root) {
                        continue;
                    }
                    candidates.push(Candidate::Object {
                        name,
                        target: Ok(sub),
                        fallback: Category::Module,
                    });
                }
            }
            Err(e) => self.record(path, &e),
        }

        candidates
    }

    fn class_candidates(
        &mut self,
        id: ObjectId,
        object: &RuntimeObject,
        path: &str,
        ancestry: &[String],
    ) -> Vec<Candidate> {
        if let Some(ref fields) = object.fields {
            return fields
                .iter()
                .map(|field| {
                    let qualname = format!("{}.{}", object.qualname, field);
                    Candidate::Synthetic(RuntimeObject::new(field, &qualname, ObjectKind::Value, &object.module))
                })
                .collect();
        }

        let members = match self.runtime.members(id) {
            Ok(members) => members,
            Err(e) => {
                self.record(path, &e);
                return Vec::new();
            }
        };

        if ancestry.iter().any(|base| ENUM_BASES.contains(&base.as_str())) {
            return members
                .into_iter()
                .filter(|m| !m.name.starts_with('_'))
                .filter(|m| match m.target {
                    Ok(target) => self.runtime.inspect(target).map_or(true, |o| o.kind == ObjectKind::Value),
                    Err(_) => true,
                })
                .map(|m| Candidate::Object {
                    name: m.name,
                    target: m.target,
                    fallback: Category::Attribute,
                })
                .collect();
        }

        let mut candidates: Vec<Candidate> = members
            .into_iter()
            .map(|m| Candidate::Object {
                name: m.name,
                target: m.target,
                fallback: Category::Attribute,
            })
            .collect();

        if self.options.inherited_members {
            let mut visited = vec![id];
            self.inherited_candidates(id, &mut candidates, &mut visited);
        }

        // Best effort: a constructor that cannot be read adds nothing
        match self.runtime.constructor_attributes(id) {
            Ok(attributes) => {
                candidates.extend(
                    attributes
                        .into_iter()
                        .map(|facts| Candidate::Synthetic(synthetic_attribute(facts, object))),
                );
            }
            Err(e) => debug!(path, error = %e, "skipping constructor attributes"),
        }

        candidates
    }

    /// Members of base classes, depth-first in base order
    fn inherited_candidates(&self, id: ObjectId, candidates: &mut Vec<Candidate>, visited: &mut Vec<ObjectId>) {
        if visited.len() > MAX_BASE_DEPTH {
            return;
        }
        let Ok(object) = self.runtime.inspect(id) else {
            return;
        };

        for base in object.bases.iter().filter_map(|b| b.target) {
            if visited.contains(&base) {
                continue;
            }
            visited.push(base);
            if let Ok(members) = self.runtime.members(base) {
                for member in members {
                    if candidates.iter().any(|c| c.name() == member.name) {
                        continue;
                    }
                    candidates.push(Candidate::Object {
                        name: member.name,
                        target: member.target,
                        fallback: Category::Attribute,
                    });
                }
            }
            self.inherited_candidates(base, candidates, visited);
        }
    }

    /// Simple names of every base class, transitively
    fn ancestry(&self, id: ObjectId) -> Vec<String> {
        let mut names = Vec::new();
        let mut stack = vec![(id, 0)];
        let mut visited = HashSet::new();

        while let Some((current, depth)) = stack.pop() {
            if depth > MAX_BASE_DEPTH || !visited.insert(current) {
                continue;
            }
            let Ok(object) = self.runtime.inspect(current) else {
                continue;
            };
            for base in object.bases.iter().rev() {
                names.push(base.simple_name().to_string());
                if let Some(target) = base.target {
                    stack.push((target, depth + 1));
                }
            }
        }
        names
    }

    /// Node standing in for a member that could not be inspected
    fn error_node(&mut self, name: &str, path: &str, category: Category, error: &Error) -> ObjectNode {
        let message = describe_error(error);
        warn!(path, error = %message, "failed to inspect member");
        self.errors.push(format!("{}: {}", path, message));

        let mut node = ObjectNode::new(name, path, category);
        node.docstring_sections = vec![Section::Text(format!("Error: {}", message))];
        node.docstring_errors = vec![message];
        node
    }

    fn record(&mut self, path: &str, error: &Error) {
        let message = describe_error(error);
        warn!(path, error = %message, "failed to list members");
        self.errors.push(format!("{}: {}", path, message));
    }
}

fn describe_error(error: &Error) -> String {
    match error {
        Error::Introspection { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

/// Category from what the object is and where it was found
fn category_of(object: &RuntimeObject, in_class: bool) -> Category {
    match object.kind {
        ObjectKind::Module { package: true } => Category::Package,
        ObjectKind::Module { package: false } => Category::Module,
        ObjectKind::Class => Category::Class,
        ObjectKind::Function if properties::is_property(object) => Category::Attribute,
        ObjectKind::Function if in_class => Category::Method,
        ObjectKind::Function => Category::Function,
        ObjectKind::Value => Category::Attribute,
    }
}

fn synthetic_attribute(facts: AttributeFacts, owner: &RuntimeObject) -> RuntimeObject {
    let qualname = format!("{}.{}", owner.qualname, facts.name);
    let mut object = RuntimeObject::new(&facts.name, &qualname, ObjectKind::Value, &owner.module);
    object.annotation = facts.annotation;
    object.value = facts.value;
    object.docstring = facts.docstring;
    object.source = facts.source;
    object
}

/// Signature lookup used by tests and callers that only need the parameters
pub fn signature_of(runtime: &dyn Runtime, path: &str) -> Result<Signature> {
    let id = runtime.resolve(path)?;
    let object = runtime.inspect(id)?;
    match object.kind {
        ObjectKind::Class => inspect::class_signature(runtime, id, &object),
        _ => {
            let bound = path
                .rsplit_once('.')
                .and_then(|(parent, _)| runtime.resolve(parent).ok())
                .and_then(|p| runtime.inspect(p).ok())
                .is_some_and(|p| p.kind == ObjectKind::Class);
            inspect::extract(runtime, &object, bound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ParameterKind, Property};
    use crate::runtime::{BaseRef, ObjectGraph};

    fn positional(name: &str) -> crate::model::Parameter {
        crate::model::Parameter::new(name, ParameterKind::PositionalOrKeyword)
    }

    fn sample() -> ObjectGraph {
        let mut graph = ObjectGraph::new();
        let pkg = graph.add_module("pkg", true);
        graph.object_mut(pkg).docstring = Some("Sample package.".to_string());

        let shapes = graph.add_module("pkg.shapes", false);
        let circle = graph.add_class(shapes, "Circle");
        graph.object_mut(circle).docstring = Some("A circle.".to_string());
        graph.add_function(
            circle,
            "__init__",
            crate::model::Signature {
                parameters: vec![positional("self"), positional("radius").with_annotation("float")],
                return_annotation: Some("None".to_string()),
            },
        );
        let area = graph.add_function(
            circle,
            "area",
            crate::model::Signature {
                parameters: vec![positional("self")],
                return_annotation: Some("float".to_string()),
            },
        );
        graph.object_mut(area).docstring = Some("Area.\n\nReturns:\n    The area.".to_string());
        graph.add_value(shapes, "_cache", Some("{}"));
        graph.add_import(shapes, "math", "math");
        graph.add_value(shapes, "PI", Some("3.14"));
        graph
    }

    fn names(node: &ObjectNode) -> Vec<&str> {
        node.children.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_root_path_and_category() {
        let graph = sample();
        let (tree, errors) = load(&graph, "pkg", &LoadOptions::default()).unwrap();
        assert_eq!(tree.path, "pkg");
        assert_eq!(tree.category, Category::Package);
        assert_eq!(names(&tree), vec!["shapes"]);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_module_children_skip_private_and_imported() {
        let graph = sample();
        let (tree, _) = load(&graph, "pkg.shapes", &LoadOptions::default()).unwrap();
        assert_eq!(names(&tree), vec!["Circle", "PI"]);
        assert!(tree.child("PI").unwrap().has_property(Property::Constant));
    }

    #[test]
    fn test_members_allow_list_includes_private() {
        let graph = sample();
        let options = LoadOptions {
            members: Some(vec!["_cache".to_string(), "Circle".to_string()]),
            ..LoadOptions::default()
        };
        let (tree, _) = load(&graph, "pkg.shapes", &options).unwrap();
        assert_eq!(names(&tree), vec!["Circle", "_cache"]);
        assert_eq!(names(tree.child("Circle").unwrap()), vec!["__init__", "area"]);
    }

    #[test]
    fn test_methods_and_class_signature() {
        let graph = sample();
        let (tree, _) = load(&graph, "pkg.shapes.Circle", &LoadOptions::default()).unwrap();
        assert_eq!(tree.category, Category::Class);
        assert_eq!(tree.signature.as_ref().unwrap().to_string(), "(radius: float)");

        let area = tree.child("area").unwrap();
        assert_eq!(area.category, Category::Method);
        assert_eq!(area.signature.as_ref().unwrap().to_string(), "() -> float");
        assert!(matches!(
            &area.docstring_sections[1],
            Section::Returns(r) if r.annotation.as_deref() == Some("float")
        ));
    }

    #[test]
    fn test_root_not_found() {
        let graph = sample();
        let err = load(&graph, "pkg.missing", &LoadOptions::default()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_cycle_guard() {
        let mut graph = ObjectGraph::new();
        let module = graph.add_module("tree", false);
        let node = graph.add_class(module, "Node");
        graph.link(node, "Self", node);

        let (tree, _) = load(&graph, "tree", &LoadOptions::default()).unwrap();
        let cyclic = tree.find("Node.Self").unwrap();
        assert!(cyclic.children.is_empty());
        assert!(cyclic.note.as_deref().unwrap().contains("tree.Node"));
        assert_eq!(cyclic.path, "tree.Node.Self");
    }

    #[test]
    fn test_filter_precedence() {
        let mut graph = ObjectGraph::new();
        let module = graph.add_module("m", false);
        let class = graph.add_class(module, "A");
        graph.add_value(class, "_hidden", None);
        graph.add_function(class, "__init__", Default::default());
        graph.add_value(class, "visible", None);

        let options = LoadOptions {
            filters: Filters::new(vec![
                FilterRule::exclude("^_").unwrap(),
                FilterRule::include("^__init__$").unwrap(),
            ]),
            ..LoadOptions::default()
        };
        let (tree, _) = load(&graph, "m.A", &options).unwrap();
        assert_eq!(names(&tree), vec!["__init__", "visible"]);
    }

    #[test]
    fn test_member_failure_becomes_error_node() {
        let mut graph = ObjectGraph::new();
        let module = graph.add_module("m", false);
        graph.add_broken(module, "bad", "exploded");
        graph.add_value(module, "good", Some("1"));

        let (tree, errors) = load(&graph, "m", &LoadOptions::default()).unwrap();
        assert_eq!(names(&tree), vec!["bad", "good"]);
        let bad = tree.child("bad").unwrap();
        assert_eq!(bad.docstring_sections, vec![Section::Text("Error: exploded".to_string())]);
        assert_eq!(errors, vec!["m.bad: exploded".to_string()]);
    }

    #[test]
    fn test_max_depth() {
        let graph = sample();
        let options = LoadOptions {
            max_depth: Some(1),
            ..LoadOptions::default()
        };
        let (tree, _) = load(&graph, "pkg", &options).unwrap();
        let shapes = tree.child("shapes").unwrap();
        assert!(shapes.children.is_empty());
        assert!(shapes.note.is_none());
    }

    #[test]
    fn test_enum_members_are_values_only() {
        let mut graph = ObjectGraph::new();
        let module = graph.add_module("colors", false);
        let color = graph.add_class(module, "Color");
        graph.object_mut(color).bases.push(BaseRef::named("enum.Enum"));
        graph.add_value(color, "RED", Some("1"));
        graph.add_value(color, "GREEN", Some("2"));
        graph.add_function(color, "describe", Default::default());
        graph.add_value(color, "_ignore_", Some("[]"));

        let (tree, _) = load(&graph, "colors.Color", &LoadOptions::default()).unwrap();
        assert_eq!(names(&tree), vec!["RED", "GREEN"]);
    }

    #[test]
    fn test_namedtuple_fields() {
        let mut graph = ObjectGraph::new();
        let module = graph.add_module("geo", false);
        let point = graph.add_class(module, "Point");
        graph.object_mut(point).fields = Some(vec!["x".to_string(), "y".to_string()]);

        let (tree, _) = load(&graph, "geo.Point", &LoadOptions::default()).unwrap();
        assert_eq!(names(&tree), vec!["x", "y"]);
        assert_eq!(tree.child("x").unwrap().category, Category::Attribute);
        assert_eq!(tree.child("y").unwrap().path, "geo.Point.y");
    }

    #[test]
    fn test_inherited_members() {
        let mut graph = ObjectGraph::new();
        let module = graph.add_module("m", false);
        let base = graph.add_class(module, "Base");
        graph.add_function(base, "shared", Default::default());
        graph.add_function(base, "run", Default::default());
        let child = graph.add_class(module, "Child");
        graph.add_function(child, "run", Default::default());
        graph.object_mut(child).bases.push(BaseRef {
            name: "Base".to_string(),
            target: Some(base),
        });

        let (declared, _) = load(&graph, "m.Child", &LoadOptions::default()).unwrap();
        assert_eq!(names(&declared), vec!["run"]);

        let options = LoadOptions {
            inherited_members: true,
            ..LoadOptions::default()
        };
        let (all, _) = load(&graph, "m.Child", &options).unwrap();
        assert_eq!(names(&all), vec!["run", "shared"]);
        assert_eq!(all.child("shared").unwrap().path, "m.Child.shared");
    }

    #[test]
    fn test_docstring_warnings_copied_to_errors() {
        let mut graph = ObjectGraph::new();
        let module = graph.add_module("m", false);
        let func = graph.add_function(
            module,
            "f",
            crate::model::Signature {
                parameters: vec![positional("x")],
                return_annotation: None,
            },
        );
        graph.object_mut(func).docstring = Some("Do.\n\nArgs:\n    y: missing.".to_string());

        let (tree, errors) = load(&graph, "m", &LoadOptions::default()).unwrap();
        let f = tree.child("f").unwrap();
        assert_eq!(f.docstring_errors, vec!["parameter y documented but not in signature"]);
        assert_eq!(errors, vec!["m.f: parameter y documented but not in signature"]);
    }

    #[test]
    fn test_constructor_attributes_are_children() {
        let mut graph = ObjectGraph::new();
        let module = graph.add_module("m", false);
        let class = graph.add_class(module, "Settings");
        graph.add_constructor_attribute(
            class,
            AttributeFacts {
                name: "debug".to_string(),
                annotation: Some("bool".to_string()),
                value: None,
                docstring: Some("Debug mode.".to_string()),
                source: None,
            },
        );

        let (tree, _) = load(&graph, "m.Settings", &LoadOptions::default()).unwrap();
        let debug = tree.child("debug").unwrap();
        assert_eq!(debug.category, Category::Attribute);
        assert_eq!(debug.annotation.as_deref(), Some("bool"));
        assert_eq!(debug.docstring_raw, "Debug mode.");
    }

    #[test]
    fn test_exception_class_property() {
        let mut graph = ObjectGraph::new();
        let module = graph.add_module("m", false);
        let base = graph.add_class(module, "AppError");
        graph.object_mut(base).bases.push(BaseRef::named("Exception"));
        let child = graph.add_class(module, "Timeout");
        graph.object_mut(child).bases.push(BaseRef {
            name: "AppError".to_string(),
            target: Some(base),
        });

        let (tree, _) = load(&graph, "m", &LoadOptions::default()).unwrap();
        assert!(tree.child("Timeout").unwrap().has_property(Property::Exception));
    }

    #[test]
    fn test_load_batch_isolates_failures() {
        let graph = sample();
        let requests = vec![
            LoadRequest {
                path: "pkg.missing".to_string(),
                options: LoadOptions::default(),
            },
            LoadRequest {
                path: "pkg.shapes".to_string(),
                options: LoadOptions::default(),
            },
        ];
        let results = load_batch(&graph, &requests);
        assert_eq!(results.len(), 2);
        assert!(!results[0].resolved());
        assert_eq!(results[0].errors.len(), 1);
        assert!(results[1].resolved());
    }

    #[test]
    fn test_idempotent() {
        let graph = sample();
        let first = load(&graph, "pkg", &LoadOptions::default()).unwrap();
        let second = load(&graph, "pkg", &LoadOptions::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_signature_of() {
        let graph = sample();
        assert_eq!(signature_of(&graph, "pkg.shapes.Circle").unwrap().to_string(), "(radius: float)");
        assert_eq!(signature_of(&graph, "pkg.shapes.Circle.area").unwrap().to_string(), "() -> float");
        assert!(matches!(signature_of(&graph, "pkg.shapes.PI"), Err(Error::NotCallable(_))));
    }
}
