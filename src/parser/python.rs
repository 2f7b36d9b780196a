// Python parser using tree-sitter

use crate::error::{Error, Result};
use crate::parser::ast::*;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser};

/// Parser for Python source files
pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    /// Create a new Python parser
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_python::language();
        parser
            .set_language(&language)
            .map_err(|e| Error::Parser(format!("Failed to set Python language: {}", e)))?;
        Ok(Self { parser })
    }

    /// Parse a Python file as the module `module_name`
    pub fn parse_file(&mut self, path: &Path, module_name: &str) -> Result<ParsedModule> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))
        })?;
        self.parse_source(&source, path.to_path_buf(), module_name.to_string())
    }

    /// Parse Python source code
    pub fn parse_source(
        &mut self,
        source: &str,
        path: PathBuf,
        module_name: String,
    ) -> Result<ParsedModule> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| Error::parser("Failed to parse source"))?;

        let root = tree.root_node();
        let bytes = source.as_bytes();
        let mut module = ParsedModule::new(path, module_name);
        module.total_lines = source.lines().count();
        module.error_line = first_error_line(&root);

        let statements = statements_of(&root);
        module.docstring = statements
            .first()
            .and_then(|s| string_statement(s))
            .and_then(|s| extract_string_content(&s, bytes));
        module.definitions = parse_statements(&statements, bytes);

        Ok(module)
    }
}

/// Named children of a module or block, comments dropped
fn statements_of<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect()
}

/// The string node of a bare string expression statement
fn string_statement<'t>(node: &Node<'t>) -> Option<Node<'t>> {
    if node.kind() != "expression_statement" || node.named_child_count() != 1 {
        return None;
    }
    node.named_child(0).filter(|c| c.kind() == "string")
}

fn node_text<'s>(node: &Node, source: &'s [u8]) -> Option<&'s str> {
    node.utf8_text(source).ok()
}

fn field_text(node: &Node, field: &str, source: &[u8]) -> Option<String> {
    node.child_by_field_name(field)
        .and_then(|n| node_text(&n, source))
        .map(str::to_string)
}

/// Line of the earliest ERROR or MISSING node
fn first_error_line(root: &Node) -> Option<usize> {
    if !root.has_error() {
        return None;
    }
    let mut earliest: Option<usize> = None;
    let mut stack = vec![*root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let line = node.start_position().row + 1;
            earliest = Some(earliest.map_or(line, |e| e.min(line)));
            continue;
        }
        if node.has_error() {
            let mut cursor = node.walk();
            stack.extend(node.children(&mut cursor));
        }
    }
    earliest.or(Some(root.start_position().row + 1))
}

/// Extract string content without its prefix and quotes; indentation is kept
fn extract_string_content(node: &Node, source: &[u8]) -> Option<String> {
    let text = node_text(node, source)?;
    let text = text.trim_start_matches(|c: char| "rRuUbBfF".contains(c));

    let s = if text.len() >= 6 && (text.starts_with("\"\"\"") || text.starts_with("'''")) {
        &text[3..text.len() - 3]
    } else if text.len() >= 2 && (text.starts_with('"') || text.starts_with('\'')) {
        &text[1..text.len() - 1]
    } else {
        text
    };

    Some(s.to_string())
}

/// Parse a sequence of statements into name-binding definitions
fn parse_statements(statements: &[Node], source: &[u8]) -> Vec<Definition> {
    let mut definitions = Vec::new();

    for (i, stmt) in statements.iter().enumerate() {
        match stmt.kind() {
            "import_statement" => {
                definitions.extend(parse_import(stmt, source).map(Definition::Import));
            }
            "import_from_statement" => {
                definitions.extend(parse_import_from(stmt, source).map(Definition::Import));
            }
            "class_definition" | "function_definition" | "decorated_definition" => {
                definitions.extend(parse_definition(stmt, source));
            }
            "expression_statement" => {
                let docstring = statements
                    .get(i + 1)
                    .and_then(|n| string_statement(n))
                    .and_then(|n| extract_string_content(&n, source));
                definitions.extend(parse_assignment(stmt, docstring, source));
            }
            _ => {}
        }
    }

    definitions
}

/// Parse a class or function, decorated or not
fn parse_definition(node: &Node, source: &[u8]) -> Option<Definition> {
    let line_start = node.start_position().row + 1;
    let line_end = node.end_position().row + 1;

    let (decorators, inner) = if node.kind() == "decorated_definition" {
        (extract_decorators(node, source), node.child_by_field_name("definition")?)
    } else {
        (Vec::new(), *node)
    };

    match inner.kind() {
        "class_definition" => {
            let mut class = parse_class(&inner, source)?;
            class.decorators = decorators;
            class.line_start = line_start;
            class.line_end = line_end;
            Some(Definition::Class(class))
        }
        "function_definition" => {
            let mut func = parse_function(&inner, source)?;
            func.decorators = decorators;
            func.line_start = line_start;
            func.line_end = line_end;
            Some(Definition::Function(func))
        }
        _ => None,
    }
}

/// Parse a class definition
fn parse_class(node: &Node, source: &[u8]) -> Option<Class> {
    let name = node_text(&node.child_by_field_name("name")?, source)?;
    let mut class = Class::new(name, node.start_position().row + 1);

    if let Some(args) = node.child_by_field_name("superclasses") {
        class.bases = extract_bases(&args, source);
    }

    if let Some(body) = node.child_by_field_name("body") {
        let statements = statements_of(&body);
        class.docstring = statements
            .first()
            .and_then(|s| string_statement(s))
            .and_then(|s| extract_string_content(&s, source));
        class.body = parse_statements(&statements, source);

        if let Some(init) = find_constructor(&statements, source) {
            class.constructor_attributes = parse_constructor_attributes(&init, source);
        }
    }

    Some(class)
}

/// Extract base classes from argument list
fn extract_bases(node: &Node, source: &[u8]) -> Vec<String> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| matches!(c.kind(), "identifier" | "attribute" | "subscript" | "call"))
        .filter_map(|c| node_text(&c, source).map(str::to_string))
        .collect()
}

/// The `__init__` function node of a class body
fn find_constructor<'t>(statements: &[Node<'t>], source: &[u8]) -> Option<Node<'t>> {
    statements.iter().rev().find_map(|stmt| {
        let func = if stmt.kind() == "decorated_definition" {
            stmt.child_by_field_name("definition")?
        } else {
            *stmt
        };
        if func.kind() != "function_definition" {
            return None;
        }
        let name = node_text(&func.child_by_field_name("name")?, source)?;
        (name == "__init__").then_some(func)
    })
}

/// `self.x = ...` assignments anywhere in a constructor body
fn parse_constructor_attributes(init: &Node, source: &[u8]) -> Vec<Attribute> {
    let receiver = init
        .child_by_field_name("parameters")
        .map(|p| parse_parameters(&p, source))
        .and_then(|params| params.into_iter().next())
        .map(|p| p.name);
    let (Some(receiver), Some(body)) = (receiver, init.child_by_field_name("body")) else {
        return Vec::new();
    };

    let mut attributes: Vec<Attribute> = Vec::new();
    let mut stack = vec![body];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "function_definition" | "class_definition" | "lambda" => continue,
            "expression_statement" => {
                if let Some(attr) = parse_self_assignment(&node, &receiver, source) {
                    if !attributes.iter().any(|a| a.name == attr.name) {
                        attributes.push(attr);
                    }
                }
            }
            _ => {
                let mut cursor = node.walk();
                let children: Vec<Node> = node.named_children(&mut cursor).collect();
                stack.extend(children.into_iter().rev());
            }
        }
    }

    attributes
}

fn parse_self_assignment(stmt: &Node, receiver: &str, source: &[u8]) -> Option<Attribute> {
    let assign = stmt.named_child(0).filter(|n| n.kind() == "assignment")?;
    let left = assign.child_by_field_name("left")?;
    if left.kind() != "attribute" {
        return None;
    }
    let object = left.child_by_field_name("object")?;
    if object.kind() != "identifier" || node_text(&object, source)? != receiver {
        return None;
    }

    let name = node_text(&left.child_by_field_name("attribute")?, source)?;
    let mut attr = Attribute::new(name, stmt.start_position().row + 1);
    attr.type_hint = field_text(&assign, "type", source);
    attr.value = assignment_value(&assign).and_then(|v| node_text(&v, source).map(str::to_string));
    attr.docstring = next_docstring(stmt, source);
    Some(attr)
}

/// Docstring literal directly following a statement
fn next_docstring(stmt: &Node, source: &[u8]) -> Option<String> {
    let mut next = stmt.next_named_sibling();
    while let Some(n) = next {
        if n.kind() != "comment" {
            break;
        }
        next = n.next_named_sibling();
    }
    next.and_then(|n| string_statement(&n))
        .and_then(|s| extract_string_content(&s, source))
}

/// Right-hand side of an assignment, following chained `a = b = value`
fn assignment_value<'t>(assign: &Node<'t>) -> Option<Node<'t>> {
    let mut right = assign.child_by_field_name("right")?;
    while right.kind() == "assignment" {
        right = right.child_by_field_name("right")?;
    }
    Some(right)
}

/// Parse a name-binding assignment statement
fn parse_assignment(stmt: &Node, docstring: Option<String>, source: &[u8]) -> Option<Definition> {
    let assign = stmt.named_child(0).filter(|n| n.kind() == "assignment")?;
    let line = stmt.start_position().row + 1;
    let left = assign.child_by_field_name("left")?;
    let value = assignment_value(&assign).and_then(|v| node_text(&v, source).map(str::to_string));

    match left.kind() {
        "identifier" => {
            let mut attr = Attribute::new(node_text(&left, source)?, line);
            attr.type_hint = field_text(&assign, "type", source);
            attr.value = value;
            attr.docstring = docstring;
            Some(Definition::Attribute(attr))
        }
        "attribute" => Some(Definition::SetAttribute(SetAttribute {
            target: field_text(&left, "object", source)?,
            attribute: field_text(&left, "attribute", source)?,
            value: value?,
            docstring,
            line,
        })),
        _ => None,
    }
}

/// Parse a function definition
fn parse_function(node: &Node, source: &[u8]) -> Option<Function> {
    let name = node_text(&node.child_by_field_name("name")?, source)?;
    let mut func = Function::new(name, node.start_position().row + 1);
    func.is_async = has_async_keyword(node);

    if let Some(params) = node.child_by_field_name("parameters") {
        func.parameters = parse_parameters(&params, source);
    }
    func.return_type = field_text(node, "return_type", source);

    if let Some(body) = node.child_by_field_name("body") {
        func.docstring = statements_of(&body)
            .first()
            .and_then(|s| string_statement(s))
            .and_then(|s| extract_string_content(&s, source));
        func.is_generator = contains_yield(&body);
    }

    Some(func)
}

/// Check if a function_definition node has an async keyword
fn has_async_keyword(node: &Node) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| c.kind() == "async");
    found
}

/// Whether a body yields, ignoring nested scopes
fn contains_yield(body: &Node) -> bool {
    let mut stack = vec![*body];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "yield" => return true,
            "function_definition" | "class_definition" | "lambda" => continue,
            _ => {
                let mut cursor = node.walk();
                stack.extend(node.named_children(&mut cursor));
            }
        }
    }
    false
}

/// Extract decorators from a decorated definition
fn extract_decorators(node: &Node, source: &[u8]) -> Vec<String> {
    let mut decorators = Vec::new();
    let mut cursor = node.walk();

    for child in node.children(&mut cursor) {
        if child.kind() == "decorator" {
            if let Ok(text) = child.utf8_text(source) {
                // Remove @ prefix and any arguments
                let dec = text.trim_start_matches('@');
                let dec = match dec.find('(') {
                    Some(idx) => &dec[..idx],
                    None => dec,
                };
                decorators.push(dec.trim().to_string());
            }
        }
    }

    decorators
}

/// Parse function parameters
fn parse_parameters(node: &Node, source: &[u8]) -> Vec<Parameter> {
    let mut params: Vec<Parameter> = Vec::new();
    let mut keyword_only = false;
    let mut cursor = node.walk();

    for child in node.children(&mut cursor) {
        match child.kind() {
            "positional_separator" | "/" => {
                for param in params.iter_mut().filter(|p| p.kind == ParameterKind::Regular) {
                    param.kind = ParameterKind::PositionalOnly;
                }
            }
            "keyword_separator" | "*" => keyword_only = true,
            _ => {
                if let Some(mut param) = parse_parameter(&child, source) {
                    match param.kind {
                        ParameterKind::Args => keyword_only = true,
                        ParameterKind::Regular if keyword_only => {
                            param.kind = ParameterKind::KeywordOnly;
                        }
                        _ => {}
                    }
                    params.push(param);
                }
            }
        }
    }

    params
}

fn parse_parameter(node: &Node, source: &[u8]) -> Option<Parameter> {
    match node.kind() {
        "identifier" => Some(Parameter::new(node_text(node, source)?)),
        "list_splat_pattern" | "dictionary_splat_pattern" => {
            let name = node_text(&node.named_child(0)?, source)?;
            let mut param = Parameter::new(name);
            param.kind = if node.kind() == "list_splat_pattern" {
                ParameterKind::Args
            } else {
                ParameterKind::Kwargs
            };
            Some(param)
        }
        "typed_parameter" => {
            let mut param = parse_parameter(&node.named_child(0)?, source)?;
            param.type_hint = field_text(node, "type", source);
            Some(param)
        }
        "default_parameter" | "typed_default_parameter" => {
            let mut param = Parameter::new(node_text(&node.child_by_field_name("name")?, source)?);
            param.type_hint = field_text(node, "type", source);
            param.default = field_text(node, "value", source);
            Some(param)
        }
        _ => None,
    }
}

/// Parse an import statement: `import x` or `import x as y`
fn parse_import(node: &Node, source: &[u8]) -> Option<Import> {
    let line = node.start_position().row + 1;
    let mut names = Vec::new();
    let mut module = String::new();

    let mut cursor = node.walk();
    for child in node.children_by_field_name("name", &mut cursor) {
        match child.kind() {
            "dotted_name" => {
                let name = node_text(&child, source)?;
                names.push(ImportedName::new(name));
            }
            "aliased_import" => {
                let name = field_text(&child, "name", source)?;
                match field_text(&child, "alias", source) {
                    Some(alias) => names.push(ImportedName::with_alias(&name, &alias)),
                    None => names.push(ImportedName::new(&name)),
                }
            }
            _ => continue,
        }
        if module.is_empty() {
            module = names[names.len() - 1].name.clone();
        }
    }

    if module.is_empty() {
        return None;
    }

    Some(Import {
        module,
        names,
        kind: ImportKind::Direct,
        line,
    })
}

/// Parse an import-from statement: `from x import y`
fn parse_import_from(node: &Node, source: &[u8]) -> Option<Import> {
    let line = node.start_position().row + 1;
    let mut module = String::new();
    let mut relative_level = 0;

    let target = node.child_by_field_name("module_name")?;
    if target.kind() == "relative_import" {
        let mut inner_cursor = target.walk();
        for inner in target.children(&mut inner_cursor) {
            match inner.kind() {
                "import_prefix" => {
                    relative_level = node_text(&inner, source)?.chars().filter(|c| *c == '.').count();
                }
                "dotted_name" => {
                    module = node_text(&inner, source)?.to_string();
                }
                _ => {}
            }
        }
    } else {
        module = node_text(&target, source)?.to_string();
    }

    let mut names = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "wildcard_import" {
            names.push(ImportedName::new("*"));
        }
    }
    let mut cursor = node.walk();
    for child in node.children_by_field_name("name", &mut cursor) {
        match child.kind() {
            "dotted_name" => names.push(ImportedName::new(node_text(&child, source)?)),
            "aliased_import" => {
                let name = field_text(&child, "name", source)?;
                match field_text(&child, "alias", source) {
                    Some(alias) => names.push(ImportedName::with_alias(&name, &alias)),
                    None => names.push(ImportedName::new(&name)),
                }
            }
            _ => {}
        }
    }

    if relative_level > 0 {
        Some(Import::relative(&module, names, relative_level, line))
    } else {
        Some(Import::from_import(&module, names, line))
    }
}
