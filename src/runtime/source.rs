// Source-backed runtime
//
// Locates Python modules on search paths, parses them with tree-sitter and
// replays their bindings into an `ObjectGraph`. A module loads the first time
// a path touches it; imports stay lazy aliases until something resolves them.

use super::graph::{join_path, relabel, Binding, ObjectGraph, MAX_ALIAS_DEPTH};
use super::{AttributeFacts, BaseRef, Member, ObjectId, Runtime, RuntimeObject, SourceRef};
use crate::error::{Error, Result};
use crate::model::{Parameter, ParameterKind, Signature};
use crate::parser::{self, Definition, ImportKind, ParsedModule, PythonParser};
use regex::Regex;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};
use walkdir::WalkDir;

static RE_NAMEDTUPLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)^(?:collections\.)?namedtuple\(\s*['"]\w+['"]\s*,\s*(?P<fields>.*)\)$"#)
        .expect("valid namedtuple regex")
});

static RE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"]([^'"]*)['"]"#).expect("valid quoted regex"));

struct State {
    graph: ObjectGraph,
    parser: PythonParser,
    /// File each loaded module was read from
    files: HashMap<ObjectId, PathBuf>,
}

/// Runtime that reads Python packages from disk
pub struct SourceRuntime {
    search_paths: Vec<PathBuf>,
    state: RefCell<State>,
}

impl SourceRuntime {
    pub fn new(search_paths: Vec<PathBuf>) -> Result<Self> {
        Ok(Self {
            search_paths,
            state: RefCell::new(State {
                graph: ObjectGraph::new(),
                parser: PythonParser::new()?,
                files: HashMap::new(),
            }),
        })
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Number of modules read so far
    pub fn loaded_modules(&self) -> usize {
        self.state.borrow().files.len()
    }

    /// Load a module by dotted name, parents first
    fn load_module(&self, name: &str) -> Result<ObjectId> {
        if let Some(id) = self.state.borrow().graph.module_id(name) {
            return Ok(id);
        }

        let (dirs, leaf) = match name.rsplit_once('.') {
            Some((parent, leaf)) => {
                let parent_id = self.load_module(parent)?;
                let dir = self
                    .package_dir(parent_id)
                    .ok_or_else(|| Error::not_found(name, format!("'{}' is not a package", parent)))?;
                (vec![dir], leaf)
            }
            None => (self.search_paths.clone(), name),
        };

        let (path, package) = dirs
            .iter()
            .find_map(|dir| locate(dir, leaf))
            .ok_or_else(|| Error::not_found(name, format!("no module named '{}'", name)))?;
        Ok(self.import_file(name, &path, package))
    }

    /// Load `parent.leaf` when `parent` is a package
    fn load_submodule(&self, parent: ObjectId, leaf: &str) -> Option<ObjectId> {
        let parent_name = {
            let state = self.state.borrow();
            let object = state.graph.object(parent)?;
            if !object.is_package() {
                return None;
            }
            object.qualname.clone()
        };
        self.load_module(&format!("{}.{}", parent_name, leaf)).ok()
    }

    fn package_dir(&self, id: ObjectId) -> Option<PathBuf> {
        let state = self.state.borrow();
        if !state.graph.object(id)?.is_package() {
            return None;
        }
        state.files.get(&id)?.parent().map(Path::to_path_buf)
    }

    fn import_file(&self, name: &str, path: &Path, package: bool) -> ObjectId {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let id = state.graph.add_module(name, package);
        state.files.insert(id, path.to_path_buf());
        debug!(module = name, path = %path.display(), "loading module");

        match state.parser.parse_file(path, name) {
            Ok(parsed) if parsed.has_errors() => {
                let line = parsed.error_line.unwrap_or(1);
                warn!(module = name, line, "module has syntax errors");
                state
                    .graph
                    .mark_broken(id, &format!("invalid syntax ({}, line {})", path.display(), line));
            }
            Ok(parsed) => populate_module(&mut state.graph, id, &parsed),
            Err(e) => {
                warn!(module = name, error = %e, "failed to read module");
                state.graph.mark_broken(id, &e.to_string());
            }
        }
        id
    }

    fn resolve_at_depth(&self, path: &str, depth: usize) -> Result<ObjectId> {
        if depth > MAX_ALIAS_DEPTH {
            return Err(Error::not_found(path, "import alias cycle"));
        }

        let mut segments = path.split('.');
        let first = segments
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::not_found(path, "empty path"))?;
        let mut current = self.load_module(first).map_err(|e| relabel(path, e))?;
        let mut prefix = first.to_string();

        for segment in segments {
            let child = format!("{}.{}", prefix, segment);
            let binding = self.state.borrow().graph.binding(current, segment);
            current = match binding {
                Some(Binding::Object(id)) => id,
                Some(Binding::Import(origin)) if origin != child => self
                    .resolve_at_depth(&origin, depth + 1)
                    .map_err(|e| relabel(path, e))?,
                Some(Binding::Broken(message)) => return Err(Error::not_found(path, message)),
                _ => self.load_submodule(current, segment).ok_or_else(|| {
                    Error::not_found(path, format!("'{}' has no member '{}'", prefix, segment))
                })?,
            };
            prefix = child;
        }

        Ok(current)
    }
}

impl Runtime for SourceRuntime {
    fn resolve(&self, path: &str) -> Result<ObjectId> {
        self.resolve_at_depth(path, 0)
    }

    fn inspect(&self, id: ObjectId) -> Result<RuntimeObject> {
        let mut object = self.state.borrow().graph.inspect(id)?;
        for base in object.bases.iter_mut().filter(|b| b.target.is_none()) {
            let name = base.name.split('[').next().unwrap_or(&base.name).trim();
            if let Some(path) = self.qualify(&object.module, name) {
                base.target = self.resolve(&path).ok();
            }
        }
        Ok(object)
    }

    fn members(&self, id: ObjectId) -> Result<Vec<Member>> {
        let (owner, bindings) = {
            let state = self.state.borrow();
            let bindings = state.graph.bindings(id)?;
            let owner = state.graph.object(id).map(|o| o.qualname.clone()).unwrap_or_default();
            (owner, bindings)
        };

        Ok(bindings
            .into_iter()
            .map(|(name, binding)| match binding {
                Binding::Object(target) => Member {
                    name,
                    origin: None,
                    target: Ok(target),
                },
                Binding::Import(origin) => {
                    let target = self.resolve(&origin);
                    Member {
                        name,
                        origin: Some(origin),
                        target,
                    }
                }
                Binding::Broken(message) => Member {
                    target: Err(Error::introspection(format!("{}.{}", owner, name), message)),
                    name,
                    origin: None,
                },
            })
            .collect())
    }

    fn submodules(&self, id: ObjectId) -> Result<Vec<(String, ObjectId)>> {
        let Some(dir) = self.package_dir(id) else {
            return Ok(Vec::new());
        };
        let package = match self.state.borrow().graph.object(id) {
            Some(object) => object.qualname.clone(),
            None => return Ok(Vec::new()),
        };

        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry?;
            let Some(leaf) = module_leaf(entry.path()) else {
                continue;
            };
            if let Err(e) = self.load_module(&format!("{}.{}", package, leaf)) {
                debug!(package = %package, leaf = %leaf, error = %e, "skipping submodule");
            }
        }

        self.state.borrow().graph.submodules(id)
    }

    fn constructor_attributes(&self, id: ObjectId) -> Result<Vec<AttributeFacts>> {
        self.state.borrow().graph.constructor_attributes(id)
    }

    fn qualify(&self, module: &str, name: &str) -> Option<String> {
        self.load_module(module).ok()?;
        self.state.borrow().graph.qualify(module, name)
    }
}

/// `dir/leaf.py` or `dir/leaf/__init__.py`, with the package flag
fn locate(dir: &Path, leaf: &str) -> Option<(PathBuf, bool)> {
    let init = dir.join(leaf).join("__init__.py");
    if init.is_file() {
        return Some((init, true));
    }
    let file = dir.join(format!("{}.py", leaf));
    file.is_file().then_some((file, false))
}

/// Module name a directory entry would be imported as
fn module_leaf(path: &Path) -> Option<String> {
    let name = if path.is_dir() {
        if !path.join("__init__.py").is_file() {
            return None;
        }
        path.file_name()?.to_str()?
    } else {
        if path.extension()? != "py" {
            return None;
        }
        path.file_stem()?.to_str()?
    };

    let valid = name != "__init__"
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_alphanumeric() || c == '_');
    valid.then(|| name.to_string())
}

/// Where definitions are being replayed
struct Scope<'a> {
    module: &'a str,
    package: bool,
    path: &'a Path,
}

impl Scope<'_> {
    fn span(&self, line_start: usize, line_end: usize) -> SourceRef {
        SourceRef::File {
            path: self.path.to_path_buf(),
            line_start,
            line_end,
        }
    }
}

fn populate_module(graph: &mut ObjectGraph, id: ObjectId, parsed: &ParsedModule) {
    let object = graph.object_mut(id);
    let package = object.is_package();
    object.docstring = parsed.docstring.clone();
    object.source = Some(SourceRef::File {
        path: parsed.path.clone(),
        line_start: 1,
        line_end: parsed.total_lines.max(1),
    });

    let scope = Scope {
        module: &parsed.module_name,
        package,
        path: &parsed.path,
    };
    populate(graph, id, &scope, &parsed.definitions);
}

fn populate(graph: &mut ObjectGraph, parent: ObjectId, scope: &Scope, definitions: &[Definition]) {
    for definition in definitions {
        match definition {
            Definition::Class(class) => add_class(graph, parent, scope, class),
            Definition::Function(func) => add_function(graph, parent, scope, func),
            Definition::Attribute(attr) => add_attribute(graph, parent, scope, attr),
            Definition::Import(import) => add_import(graph, parent, scope, import),
            Definition::SetAttribute(set) => set_attribute(graph, parent, set),
        }
    }
}

fn add_class(graph: &mut ObjectGraph, parent: ObjectId, scope: &Scope, class: &parser::Class) {
    let id = graph.add_class(parent, &class.name);
    let object = graph.object_mut(id);
    object.docstring = class.docstring.clone();
    object.decorators = class.decorators.clone();
    object.bases = class.bases.iter().map(|b| BaseRef::named(b)).collect();
    object.source = Some(scope.span(class.line_start, class.line_end));
    if object.bases.iter().any(|b| b.simple_name() == "NamedTuple") {
        object.fields = Some(
            class
                .attributes()
                .filter(|a| a.type_hint.is_some())
                .map(|a| a.name.clone())
                .collect(),
        );
    }

    populate(graph, id, scope, &class.body);

    for attr in &class.constructor_attributes {
        graph.add_constructor_attribute(
            id,
            AttributeFacts {
                name: attr.name.clone(),
                annotation: attr.type_hint.clone(),
                value: attr.value.clone(),
                docstring: attr.docstring.clone(),
                source: Some(scope.span(attr.line, attr.line)),
            },
        );
    }
}

fn add_function(graph: &mut ObjectGraph, parent: ObjectId, scope: &Scope, func: &parser::Function) {
    // `@name.setter` extends the property already bound to `name`
    if let Some((owner, accessor)) = func.accessor_of() {
        if let Some(Binding::Object(existing)) = graph.binding(parent, owner) {
            let object = graph.object_mut(existing);
            object.decorators.push(format!("{}.{}", owner, accessor));
            if let Some(SourceRef::File { line_end, .. }) = object.source.as_mut() {
                *line_end = (*line_end).max(func.line_end);
            }
            return;
        }
    }

    let signature = Signature {
        parameters: func.parameters.iter().map(convert_parameter).collect(),
        return_annotation: func.return_type.clone(),
    };
    let id = graph.add_function(parent, &func.name, signature);
    let object = graph.object_mut(id);
    object.docstring = func.docstring.clone();
    object.decorators = func.decorators.clone();
    object.is_async = func.is_async;
    object.is_generator = func.is_generator;
    object.source = Some(scope.span(func.line_start, func.line_end));
}

fn convert_parameter(param: &parser::Parameter) -> Parameter {
    let kind = match param.kind {
        parser::ParameterKind::Regular => ParameterKind::PositionalOrKeyword,
        parser::ParameterKind::Args => ParameterKind::VarPositional,
        parser::ParameterKind::Kwargs => ParameterKind::VarKeyword,
        parser::ParameterKind::PositionalOnly => ParameterKind::PositionalOnly,
        parser::ParameterKind::KeywordOnly => ParameterKind::KeywordOnly,
    };
    Parameter {
        name: param.name.clone(),
        kind,
        annotation: param.type_hint.clone(),
        default: param.default.clone(),
    }
}

fn add_attribute(graph: &mut ObjectGraph, parent: ObjectId, scope: &Scope, attr: &parser::Attribute) {
    let value = attr.value.as_deref();

    // `alias = existing_function` binds the same object under a second name
    if attr.type_hint.is_none() {
        if let Some(Binding::Object(target)) = value.and_then(|v| graph.binding(parent, v)) {
            graph.link(parent, &attr.name, target);
            return;
        }
    }

    let id = match value.and_then(namedtuple_fields) {
        Some(fields) => {
            let id = graph.add_class(parent, &attr.name);
            let object = graph.object_mut(id);
            object.fields = Some(fields);
            object.bases = vec![BaseRef::named("tuple")];
            id
        }
        None => graph.add_value(parent, &attr.name, value),
    };

    let object = graph.object_mut(id);
    object.annotation = attr.type_hint.clone();
    object.docstring = attr.docstring.clone();
    object.source = Some(scope.span(attr.line, attr.line));
}

fn add_import(graph: &mut ObjectGraph, parent: ObjectId, scope: &Scope, import: &parser::Import) {
    if import.kind == ImportKind::Direct {
        for name in &import.names {
            match name.alias {
                Some(ref alias) => graph.add_import(parent, alias, &name.name),
                None => {
                    // `import a.b` binds `a`
                    let head = name.name.split('.').next().unwrap_or(&name.name);
                    graph.add_import(parent, head, head);
                }
            }
        }
        return;
    }

    let Some(base) = import_base(scope, import) else {
        debug!(module = scope.module, line = import.line, "relative import beyond top-level package");
        return;
    };
    for name in &import.names {
        if name.name == "*" {
            debug!(module = scope.module, from = %base, "skipping wildcard import");
            continue;
        }
        graph.add_import(parent, name.used_name(), &join_path(&base, Some(&name.name)));
    }
}

/// Absolute module an import-from statement reads from
fn import_base(scope: &Scope, import: &parser::Import) -> Option<String> {
    let ImportKind::Relative { level } = import.kind else {
        return Some(import.module.clone());
    };

    let mut package: Vec<&str> = scope.module.split('.').collect();
    if !scope.package {
        package.pop();
    }
    for _ in 1..level {
        package.pop()?;
    }

    if !import.module.is_empty() {
        package.push(&import.module);
    }
    let base = package.join(".");
    (!base.is_empty()).then_some(base)
}

/// `Target.attr = value` after the target was defined
fn set_attribute(graph: &mut ObjectGraph, parent: ObjectId, set: &parser::SetAttribute) {
    let Some(Binding::Object(target)) = graph.binding(parent, &set.target) else {
        debug!(target = %set.target, attribute = %set.attribute, "skipping assignment to unknown object");
        return;
    };

    match graph.binding(parent, &set.value) {
        Some(Binding::Object(value)) => graph.link(target, &set.attribute, value),
        _ => {
            let id = graph.add_value(target, &set.attribute, Some(&set.value));
            graph.object_mut(id).docstring = set.docstring.clone();
        }
    }
}

/// Field names of a `namedtuple("Name", ...)` call
fn namedtuple_fields(value: &str) -> Option<Vec<String>> {
    let caps = RE_NAMEDTUPLE.captures(value.trim())?;
    let raw = caps.name("fields")?.as_str();
    let fields = RE_QUOTED
        .captures_iter(raw)
        .flat_map(|c| {
            c[1].split(|ch: char| ch == ',' || ch.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect();
    Some(fields)
}
