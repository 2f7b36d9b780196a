// In-memory object graph
//
// An arena of runtime objects with ordered namespaces. Bindings may point at
// any object, so self-referential graphs are representable.

use super::{AttributeFacts, Member, ObjectId, ObjectKind, Runtime, RuntimeObject};
use crate::error::{Error, Result};
use crate::model::Signature;
use std::collections::{BTreeMap, HashMap};

/// Longest chain of import aliases followed before giving up
pub(crate) const MAX_ALIAS_DEPTH: usize = 32;

/// What a namespace name is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Binding {
    Object(ObjectId),
    /// Lazy alias to a dotted path, resolved on access
    Import(String),
    Broken(String),
}

#[derive(Debug, Clone)]
struct Entry {
    object: RuntimeObject,
    bindings: Vec<(String, Binding)>,
    submodules: BTreeMap<String, ObjectId>,
    constructor_attributes: Vec<AttributeFacts>,
    failure: Option<String>,
}

/// Arena of runtime objects implementing [`Runtime`]
#[derive(Debug, Clone, Default)]
pub struct ObjectGraph {
    entries: Vec<Entry>,
    modules: HashMap<String, ObjectId>,
}

impl ObjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects in the arena
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Id of an already registered module
    pub fn module_id(&self, name: &str) -> Option<ObjectId> {
        self.modules.get(name).copied()
    }

    fn push(&mut self, object: RuntimeObject) -> ObjectId {
        let id = ObjectId(self.entries.len());
        self.entries.push(Entry {
            object,
            bindings: Vec::new(),
            submodules: BTreeMap::new(),
            constructor_attributes: Vec::new(),
            failure: None,
        });
        id
    }

    /// Register a module by dotted name. A registered parent package gains it
    /// as a submodule.
    pub fn add_module(&mut self, name: &str, package: bool) -> ObjectId {
        if let Some(id) = self.module_id(name) {
            return id;
        }

        let leaf = name.rsplit('.').next().unwrap_or(name);
        let id = self.push(RuntimeObject::new(leaf, name, ObjectKind::Module { package }, name));
        self.modules.insert(name.to_string(), id);

        if let Some((parent, _)) = name.rsplit_once('.') {
            if let Some(parent_id) = self.module_id(parent) {
                self.entries[parent_id.0].submodules.insert(leaf.to_string(), id);
            }
        }
        id
    }

    fn add_child(&mut self, parent: ObjectId, name: &str, kind: ObjectKind) -> ObjectId {
        let owner = &self.entries[parent.0].object;
        let module = if owner.is_module() {
            owner.qualname.clone()
        } else {
            owner.module.clone()
        };
        let qualname = format!("{}.{}", owner.qualname, name);
        let id = self.push(RuntimeObject::new(name, &qualname, kind, &module));
        self.bind(parent, name, Binding::Object(id));
        id
    }

    pub fn add_class(&mut self, parent: ObjectId, name: &str) -> ObjectId {
        self.add_child(parent, name, ObjectKind::Class)
    }

    pub fn add_function(&mut self, parent: ObjectId, name: &str, signature: Signature) -> ObjectId {
        let id = self.add_child(parent, name, ObjectKind::Function);
        self.entries[id.0].object.signature = Some(signature);
        id
    }

    pub fn add_value(&mut self, parent: ObjectId, name: &str, value: Option<&str>) -> ObjectId {
        let id = self.add_child(parent, name, ObjectKind::Value);
        self.entries[id.0].object.value = value.map(str::to_string);
        id
    }

    /// Add a member whose introspection fails with `message`
    pub fn add_broken(&mut self, parent: ObjectId, name: &str, message: &str) -> ObjectId {
        let id = self.add_value(parent, name, None);
        self.mark_broken(id, message);
        id
    }

    /// Make every later introspection of `id` fail
    pub fn mark_broken(&mut self, id: ObjectId, message: &str) {
        self.entries[id.0].failure = Some(message.to_string());
    }

    /// Bind `name` in `parent` to an existing object
    pub fn link(&mut self, parent: ObjectId, name: &str, target: ObjectId) {
        self.bind(parent, name, Binding::Object(target));
    }

    /// Bind `name` in `parent` to whatever `origin` resolves to, lazily
    pub fn add_import(&mut self, parent: ObjectId, name: &str, origin: &str) {
        self.bind(parent, name, Binding::Import(origin.to_string()));
    }

    pub fn add_constructor_attribute(&mut self, class: ObjectId, facts: AttributeFacts) {
        self.entries[class.0].constructor_attributes.push(facts);
    }

    /// Mutable access to an object's facts while building
    pub fn object_mut(&mut self, id: ObjectId) -> &mut RuntimeObject {
        &mut self.entries[id.0].object
    }

    /// Rebinding keeps the original position, like a dict update
    pub(crate) fn bind(&mut self, parent: ObjectId, name: &str, binding: Binding) {
        let bindings = &mut self.entries[parent.0].bindings;
        match bindings.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = binding,
            None => bindings.push((name.to_string(), binding)),
        }
    }

    pub(crate) fn binding(&self, parent: ObjectId, name: &str) -> Option<Binding> {
        self.entries
            .get(parent.0)?
            .bindings
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, b)| b.clone())
    }

    pub(crate) fn bindings(&self, id: ObjectId) -> Result<Vec<(String, Binding)>> {
        Ok(self.entry(id)?.bindings.clone())
    }

    pub(crate) fn submodule(&self, id: ObjectId, name: &str) -> Option<ObjectId> {
        self.entries.get(id.0)?.submodules.get(name).copied()
    }

    pub(crate) fn object(&self, id: ObjectId) -> Option<&RuntimeObject> {
        self.entries.get(id.0).map(|e| &e.object)
    }

    /// Entry of a healthy object
    fn entry(&self, id: ObjectId) -> Result<&Entry> {
        let entry = self
            .entries
            .get(id.0)
            .ok_or_else(|| Error::introspection(id.to_string(), "unknown object"))?;
        match entry.failure {
            Some(ref message) => Err(Error::introspection(&entry.object.qualname, message)),
            None => Ok(entry),
        }
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
        let mut current = self
            .module_id(first)
            .ok_or_else(|| Error::not_found(path, format!("no module named '{}'", first)))?;
        let mut prefix = first.to_string();

        for segment in segments {
            let child = format!("{}.{}", prefix, segment);
            current = match self.binding(current, segment) {
                Some(Binding::Object(id)) => id,
                // `from . import sub` aliases the submodule to itself
                Some(Binding::Import(origin)) if origin != child => self
                    .resolve_at_depth(&origin, depth + 1)
                    .map_err(|e| relabel(path, e))?,
                Some(Binding::Broken(message)) => return Err(Error::not_found(path, message)),
                _ => self.submodule(current, segment).ok_or_else(|| {
                    Error::not_found(path, format!("'{}' has no member '{}'", prefix, segment))
                })?,
            };
            prefix = child;
        }

        Ok(current)
    }
}

/// Report a failed alias lookup against the path that was asked for
pub(crate) fn relabel(path: &str, error: Error) -> Error {
    match error {
        Error::ObjectNotFound { reason, .. } => Error::not_found(path, reason),
        other => other,
    }
}

/// Join a resolved head with the rest of a dotted name
pub(crate) fn join_path(head: &str, rest: Option<&str>) -> String {
    match rest {
        Some(rest) => format!("{}.{}", head, rest),
        None => head.to_string(),
    }
}

impl Runtime for ObjectGraph {
    fn resolve(&self, path: &str) -> Result<ObjectId> {
        self.resolve_at_depth(path, 0)
    }

    fn inspect(&self, id: ObjectId) -> Result<RuntimeObject> {
        Ok(self.entry(id)?.object.clone())
    }

    fn members(&self, id: ObjectId) -> Result<Vec<Member>> {
        let entry = self.entry(id)?;
        Ok(entry
            .bindings
            .iter()
            .map(|(name, binding)| match binding {
                Binding::Object(target) => Member {
                    name: name.clone(),
                    origin: None,
                    target: Ok(*target),
                },
                Binding::Import(origin) => Member {
                    name: name.clone(),
                    origin: Some(origin.clone()),
                    target: self.resolve(origin),
                },
                Binding::Broken(message) => Member {
                    name: name.clone(),
                    origin: None,
                    target: Err(Error::introspection(
                        format!("{}.{}", entry.object.qualname, name),
                        message,
                    )),
                },
            })
            .collect())
    }

    fn submodules(&self, id: ObjectId) -> Result<Vec<(String, ObjectId)>> {
        let entry = self
            .entries
            .get(id.0)
            .ok_or_else(|| Error::introspection(id.to_string(), "unknown object"))?;
        Ok(entry.submodules.iter().map(|(n, id)| (n.clone(), *id)).collect())
    }

    fn constructor_attributes(&self, id: ObjectId) -> Result<Vec<AttributeFacts>> {
        Ok(self.entry(id)?.constructor_attributes.clone())
    }

    fn qualify(&self, module: &str, name: &str) -> Option<String> {
        let module_id = self.module_id(module)?;
        let (head, rest) = match name.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (name, None),
        };
        match self.binding(module_id, head)? {
            Binding::Object(id) => Some(join_path(&self.object(id)?.qualname, rest)),
            Binding::Import(origin) => Some(join_path(&origin, rest)),
            Binding::Broken(_) => None,
        }
    }
}
