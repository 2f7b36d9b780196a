// Property classification
//
// Every rule is evaluated on its own; a member can carry any combination.

use crate::model::{Category, Property};
use crate::runtime::{ObjectKind, RuntimeObject};
use std::collections::BTreeSet;

/// Builtin exception classes whose names do not end in Error/Exception/Warning
const BUILTIN_EXCEPTIONS: &[&str] = &[
    "BaseException",
    "KeyboardInterrupt",
    "SystemExit",
    "GeneratorExit",
    "StopIteration",
    "StopAsyncIteration",
];

pub fn is_special(name: &str) -> bool {
    name.len() > 4 && name.starts_with("__") && name.ends_with("__")
}

pub fn is_private(name: &str) -> bool {
    name.starts_with('_') && !is_special(name)
}

pub fn is_class_private(name: &str) -> bool {
    name.starts_with("__") && !name.ends_with("__")
}

/// ALL_CAPS names with at least one letter
pub fn is_constant_name(name: &str) -> bool {
    name.chars().any(|c| c.is_ascii_alphabetic())
        && name.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Whether a decorated function is exposed as a property
pub fn is_property(object: &RuntimeObject) -> bool {
    object.kind == ObjectKind::Function
        && ["property", "cached_property", "abstractproperty"]
            .iter()
            .any(|d| object.has_decorator(d))
}

/// Whether any class name in an ancestry chain is an exception type
pub fn is_exception_ancestry(ancestry: &[String]) -> bool {
    ancestry.iter().any(|name| {
        name.ends_with("Error")
            || name.ends_with("Exception")
            || name.ends_with("Warning")
            || BUILTIN_EXCEPTIONS.contains(&name.as_str())
    })
}

/// Tags for `object` as documented under `category`.
///
/// `ancestry` lists the simple names of all base classes, transitively; it is
/// empty for anything but classes.
pub fn classify(object: &RuntimeObject, category: Category, ancestry: &[String]) -> BTreeSet<Property> {
    let mut tags = BTreeSet::new();
    let name = object.name.as_str();

    if is_special(name) {
        tags.insert(Property::Special);
    }
    if is_private(name) {
        tags.insert(Property::Private);
    }
    if is_class_private(name) {
        tags.insert(Property::ClassPrivate);
    }

    match object.kind {
        ObjectKind::Value => {
            if is_constant_name(name) {
                tags.insert(Property::Constant);
            }
        }
        ObjectKind::Function => {
            if is_property(object) {
                tags.insert(Property::Property);
                let writable = object.decorators.iter().any(|d| d.ends_with(".setter"));
                tags.insert(if writable {
                    Property::Writable
                } else {
                    Property::Readonly
                });
                if object.has_decorator("cached_property") {
                    tags.insert(Property::Cached);
                }
            }
            if category == Category::Method {
                if object.has_decorator("staticmethod") {
                    tags.insert(Property::Staticmethod);
                }
                if object.has_decorator("classmethod") {
                    tags.insert(Property::Classmethod);
                }
            }
            if object.has_decorator("abstractmethod") || object.has_decorator("abstractproperty") {
                tags.insert(Property::Abstractmethod);
            }
            if object.is_async {
                tags.insert(Property::Async);
            }
        }
        ObjectKind::Class => {
            if is_exception_ancestry(ancestry) {
                tags.insert(Property::Exception);
            }
            if object.has_decorator("dataclass") {
                tags.insert(Property::Dataclass);
            }
        }
        ObjectKind::Module { .. } => {}
    }

    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function(name: &str, decorators: &[&str]) -> RuntimeObject {
        let mut object = RuntimeObject::new(name, name, ObjectKind::Function, "m");
        object.decorators = decorators.iter().map(|d| d.to_string()).collect();
        object
    }

    #[test]
    fn test_name_conventions() {
        assert!(is_special("__init__"));
        assert!(!is_special("____"));
        assert!(is_private("_hidden"));
        assert!(!is_private("__init__"));
        assert!(is_class_private("__secret"));
        assert!(!is_class_private("__eq__"));
        assert!(is_constant_name("MAX_SIZE2"));
        assert!(!is_constant_name("_"));
        assert!(!is_constant_name("Max"));
    }

    #[test]
    fn test_special_method() {
        let tags = classify(&function("__init__", &[]), Category::Method, &[]);
        assert_eq!(tags, BTreeSet::from([Property::Special]));
    }

    #[test]
    fn test_class_private_is_also_private() {
        let tags = classify(&function("__mangled", &[]), Category::Method, &[]);
        assert!(tags.contains(&Property::Private));
        assert!(tags.contains(&Property::ClassPrivate));
    }

    #[test]
    fn test_property_variants() {
        let readonly = classify(&function("size", &["property"]), Category::Attribute, &[]);
        assert!(readonly.contains(&Property::Property));
        assert!(readonly.contains(&Property::Readonly));

        let writable = classify(&function("size", &["property", "size.setter"]), Category::Attribute, &[]);
        assert!(writable.contains(&Property::Writable));
        assert!(!writable.contains(&Property::Readonly));

        let cached = classify(&function("size", &["functools.cached_property"]), Category::Attribute, &[]);
        assert!(cached.contains(&Property::Cached));
        assert!(cached.contains(&Property::Property));
    }

    #[test]
    fn test_method_decorators() {
        let tags = classify(
            &function("build", &["classmethod", "abc.abstractmethod"]),
            Category::Method,
            &[],
        );
        assert_eq!(tags, BTreeSet::from([Property::Classmethod, Property::Abstractmethod]));

        let free = classify(&function("helper", &["staticmethod"]), Category::Function, &[]);
        assert!(!free.contains(&Property::Staticmethod));
    }

    #[test]
    fn test_async_function() {
        let mut object = function("fetch", &[]);
        object.is_async = true;
        assert!(classify(&object, Category::Function, &[]).contains(&Property::Async));
    }

    #[test]
    fn test_constant_value() {
        let object = RuntimeObject::new("DEFAULT_TIMEOUT", "m.DEFAULT_TIMEOUT", ObjectKind::Value, "m");
        assert!(classify(&object, Category::Attribute, &[]).contains(&Property::Constant));

        let function = function("DEFAULT", &[]);
        assert!(!classify(&function, Category::Function, &[]).contains(&Property::Constant));
    }

    #[test]
    fn test_exception_class() {
        let mut object = RuntimeObject::new("Stop", "m.Stop", ObjectKind::Class, "m");
        object.decorators.push("dataclasses.dataclass".to_string());

        let ancestry = vec!["KeyboardInterrupt".to_string()];
        let tags = classify(&object, Category::Class, &ancestry);
        assert!(tags.contains(&Property::Exception));
        assert!(tags.contains(&Property::Dataclass));

        let plain = classify(&object, Category::Class, &["Base".to_string()]);
        assert!(!plain.contains(&Property::Exception));
    }
}
