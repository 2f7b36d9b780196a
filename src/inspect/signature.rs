// Signature extraction
//
// Turns the raw signature a runtime reports into the documented one: the
// receiver is dropped for methods and quoted forward references are
// qualified against the defining module.

use crate::error::{Error, Result};
use crate::model::{Parameter, ParameterKind, Signature};
use crate::runtime::{ObjectId, ObjectKind, Runtime, RuntimeObject};
use regex::{Captures, Regex};
use std::sync::LazyLock;

static RE_FORWARD_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']([A-Za-z_][A-Za-z0-9_.]*)["']"#).expect("valid forward reference regex")
});

const BUILTIN_TYPES: &[&str] = &[
    "int",
    "float",
    "complex",
    "str",
    "bytes",
    "bytearray",
    "bool",
    "list",
    "dict",
    "set",
    "frozenset",
    "tuple",
    "object",
    "type",
    "None",
];

/// Base classes followed when looking for an inherited constructor
const MAX_BASE_DEPTH: usize = 16;

/// Signature of a callable.
///
/// `bound` marks a function defined in a class body; unless it is a
/// staticmethod its first positional parameter is the receiver and is left out.
pub fn extract(runtime: &dyn Runtime, object: &RuntimeObject, bound: bool) -> Result<Signature> {
    let raw = match (object.kind, &object.signature) {
        (ObjectKind::Function, Some(signature)) => signature,
        _ => return Err(Error::NotCallable(object.qualname.clone())),
    };

    let mut parameters = raw.parameters.clone();
    if bound && !object.has_decorator("staticmethod") {
        if let Some(first) = parameters.first() {
            if !first.kind.is_variadic() && first.kind != ParameterKind::KeywordOnly {
                parameters.remove(0);
            }
        }
    }

    for param in &mut parameters {
        if let Some(annotation) = param.annotation.take() {
            param.annotation = Some(resolve_annotation(runtime, &object.module, &annotation));
        }
    }

    Ok(Signature {
        parameters,
        return_annotation: raw
            .return_annotation
            .as_deref()
            .map(|a| resolve_annotation(runtime, &object.module, a)),
    })
}

/// Signature used to instantiate a class
pub fn class_signature(runtime: &dyn Runtime, id: ObjectId, object: &RuntimeObject) -> Result<Signature> {
    if let Some(ref fields) = object.fields {
        return Ok(Signature {
            parameters: fields
                .iter()
                .map(|f| Parameter::new(f, ParameterKind::PositionalOrKeyword))
                .collect(),
            return_annotation: None,
        });
    }

    if let Some(init) = find_constructor(runtime, id, 0) {
        let constructor = runtime.inspect(init)?;
        let mut signature = extract(runtime, &constructor, true)?;
        signature.return_annotation = None;
        return Ok(signature);
    }

    if object.has_decorator("dataclass") {
        return dataclass_signature(runtime, id, &object.module);
    }

    Ok(Signature::default())
}

/// `__init__` declared on the class or the first base that has one
fn find_constructor(runtime: &dyn Runtime, id: ObjectId, depth: usize) -> Option<ObjectId> {
    if depth > MAX_BASE_DEPTH {
        return None;
    }

    let members = runtime.members(id).ok()?;
    if let Some(init) = members
        .into_iter()
        .find(|m| m.name == "__init__")
        .and_then(|m| m.target.ok())
    {
        return Some(init);
    }

    runtime
        .inspect(id)
        .ok()?
        .bases
        .iter()
        .filter_map(|b| b.target)
        .find_map(|base| find_constructor(runtime, base, depth + 1))
}

/// Annotated class attributes become keyword parameters, in declaration order
fn dataclass_signature(runtime: &dyn Runtime, id: ObjectId, module: &str) -> Result<Signature> {
    let mut parameters = Vec::new();
    for member in runtime.members(id)? {
        let Ok(target) = member.target else {
            continue;
        };
        let Ok(field) = runtime.inspect(target) else {
            continue;
        };
        if field.kind != ObjectKind::Value {
            continue;
        }
        if let Some(ref annotation) = field.annotation {
            let mut param = Parameter::new(&member.name, ParameterKind::PositionalOrKeyword)
                .with_annotation(&resolve_annotation(runtime, module, annotation));
            param.default = field.value.clone();
            parameters.push(param);
        }
    }

    Ok(Signature {
        parameters,
        return_annotation: None,
    })
}

/// Qualify quoted names in an annotation.
///
/// Names that cannot be resolved keep their quotes; builtin types lose them.
pub fn resolve_annotation(runtime: &dyn Runtime, module: &str, annotation: &str) -> String {
    RE_FORWARD_REF
        .replace_all(annotation, |caps: &Captures| {
            let name = &caps[1];
            match runtime.qualify(module, name) {
                Some(qualified) => qualified,
                None if BUILTIN_TYPES.contains(&name) => name.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
