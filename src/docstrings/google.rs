// Google-style docstring parser
//
// Line-by-line state machine. Headers sit at column 0 and end with a colon;
// their bodies are indented blocks whose first line fixes the item indent.

use super::{
    example_blocks, indent_of, is_blank, split_top_level, split_type_prefix, text_section, Context, ParameterEntry,
    RaisesEntry, Section, SectionKind,
};
use regex::Regex;
use std::sync::LazyLock;

static RE_ADMONITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<indent>\s*)(?P<type>[\w-]+):(?:\s+(?P<title>.+))?$").expect("valid admonition regex")
});

static RE_PARAM_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\*{0,2}[A-Za-z_][A-Za-z0-9_]*$").expect("valid parameter name regex")
});

static RE_EXCEPTION_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*$").expect("valid exception name regex")
});

fn header_kind(line: &str) -> Option<SectionKind> {
    if line.starts_with(char::is_whitespace) {
        return None;
    }
    let title = line.trim_end().strip_suffix(':')?;
    match title {
        "Args" | "Arguments" | "Params" | "Parameters" => Some(SectionKind::Parameters),
        "Raises" | "Raise" | "Except" | "Exceptions" => Some(SectionKind::Raises),
        "Returns" | "Return" => Some(SectionKind::Returns),
        "Yields" | "Yield" => Some(SectionKind::Yields),
        "Examples" | "Example" => Some(SectionKind::Examples),
        "Attributes" => Some(SectionKind::Attributes),
        _ => None,
    }
}

pub(super) fn parse(text: &str, ctx: &mut Context<'_>) -> Vec<Section> {
    let lines: Vec<String> = text.split('\n').map(str::to_string).collect();
    let mut sections = Vec::new();
    let mut prose: Vec<String> = Vec::new();
    let mut in_code_block = false;
    let mut i = 0;

    while i < lines.len() {
        let line = &lines[i];

        if in_code_block {
            if line.trim_start().starts_with("```") {
                in_code_block = false;
            }
            prose.push(line.clone());
        } else if let Some(kind) = header_kind(line) {
            flush_prose(&mut prose, &mut sections);
            let (section, next) = read_section(kind, &lines, i, ctx);
            if let Some(section) = section {
                sections.push(section);
            }
            i = next;
            continue;
        } else if line.trim_start().starts_with("```") {
            in_code_block = true;
            prose.push(line.clone());
        } else if let Some(admonition) = ctx
            .replace_admonitions
            .then(|| admonition(&lines, i))
            .flatten()
        {
            prose.push(admonition);
        } else {
            prose.push(line.clone());
        }

        i += 1;
    }

    flush_prose(&mut prose, &mut sections);
    sections
}

fn flush_prose(prose: &mut Vec<String>, sections: &mut Vec<Section>) {
    if let Some(section) = text_section(prose) {
        sections.push(section);
    }
    prose.clear();
}

/// `Note: Title` followed by a more indented line becomes `!!! note "Title"`
fn admonition(lines: &[String], i: usize) -> Option<String> {
    let next = lines.get(i + 1)?;
    let caps = RE_ADMONITION.captures(&lines[i])?;
    let indent = caps.name("indent").map_or("", |m| m.as_str());
    if !next.starts_with(&format!("{}    ", indent)) {
        return None;
    }
    let kind = caps.name("type")?.as_str().to_lowercase();
    let mut replaced = format!("{}!!! {}", indent, kind);
    if let Some(title) = caps.name("title") {
        replaced.push_str(&format!(" \"{}\"", title.as_str()));
    }
    Some(replaced)
}

/// Read the section whose header is at `header`; returns the index to resume at
fn read_section(
    kind: SectionKind,
    lines: &[String],
    header: usize,
    ctx: &mut Context<'_>,
) -> (Option<Section>, usize) {
    let line_no = header + 1;
    match kind {
        SectionKind::Parameters | SectionKind::Attributes => {
            let (items, next) = read_block_items(lines, header + 1, ctx);
            let mut entries: Vec<ParameterEntry> = Vec::new();
            for item in items {
                let Some((name, doc_type, description)) = split_named_item(&item) else {
                    ctx.error(format!("Failed to get 'name: description' pair from '{}'", item));
                    continue;
                };
                let entry = if kind == SectionKind::Parameters {
                    ctx.parameter_entry(&name, doc_type, description)
                } else {
                    ParameterEntry {
                        name,
                        annotation: doc_type,
                        description,
                        kind: None,
                        default: None,
                    }
                };
                ctx.push_unique(&mut entries, entry);
            }
            if entries.is_empty() {
                ctx.error(format!("Empty {} section at line {}", kind, line_no));
                return (None, next);
            }
            let section = if kind == SectionKind::Parameters {
                Section::Parameters(entries)
            } else {
                Section::Attributes(entries)
            };
            (Some(section), next)
        }
        SectionKind::Raises => {
            let (items, next) = read_block_items(lines, header + 1, ctx);
            let mut entries = Vec::new();
            for item in items {
                match split_exception_item(&item) {
                    Some(entry) => entries.push(entry),
                    None => ctx.error(format!(
                        "Failed to get 'exception: description' pair from '{}'",
                        item
                    )),
                }
            }
            if entries.is_empty() {
                ctx.error(format!("Empty {} section at line {}", kind, line_no));
                return (None, next);
            }
            (Some(Section::Raises(entries)), next)
        }
        SectionKind::Returns | SectionKind::Yields => {
            let (block, next) = read_block(lines, header + 1);
            let (doc_type, description) = split_type_prefix(&block);
            if doc_type.is_none() && description.is_empty() {
                ctx.error(format!("Empty {} section at line {}", kind, line_no));
                return (None, next);
            }
            let value = ctx.annotated_text(kind, doc_type, description);
            let section = if kind == SectionKind::Returns {
                Section::Returns(value)
            } else {
                Section::Yields(value)
            };
            (Some(section), next)
        }
        SectionKind::Examples => {
            let (block, next) = read_block(lines, header + 1);
            let blocks = example_blocks(&block);
            if blocks.is_empty() {
                ctx.error(format!("Empty {} section at line {}", kind, line_no));
                return (None, next);
            }
            (Some(Section::Examples(blocks)), next)
        }
        SectionKind::Text => (None, header + 1),
    }
}

/// Read an indented block as a list of items.
///
/// The first non-blank line sets the item indent; lines at twice that indent
/// continue the current item.
fn read_block_items(lines: &[String], start: usize, ctx: &mut Context<'_>) -> (Vec<String>, usize) {
    let mut i = start;
    while i < lines.len() && is_blank(&lines[i]) {
        i += 1;
    }
    if i >= lines.len() {
        return (Vec::new(), i);
    }

    let indent = indent_of(&lines[i]);
    if indent == 0 {
        return (Vec::new(), i);
    }

    let mut items = Vec::new();
    let mut current = vec![lines[i][indent..].to_string()];
    i += 1;

    while i < lines.len() {
        let line = &lines[i];
        if is_blank(line) {
            current.push(String::new());
        } else {
            let line_indent = indent_of(line);
            if line_indent >= indent * 2 {
                current.push(line[indent * 2..].to_string());
            } else if line_indent > indent {
                current.push(line[line_indent..].to_string());
                ctx.error(format!(
                    "Confusing indentation for continuation line {} in docstring, should be {} * 2 = {} spaces, not {}",
                    i + 1,
                    indent,
                    indent * 2,
                    line_indent
                ));
            } else if line_indent == indent {
                items.push(join_item(&current));
                current = vec![line[indent..].to_string()];
            } else {
                break;
            }
        }
        i += 1;
    }

    items.push(join_item(&current));
    (items, i)
}

fn join_item(lines: &[String]) -> String {
    lines.join("\n").trim_end_matches('\n').to_string()
}

/// Read an indented block as a single text, stripping its indent
fn read_block(lines: &[String], start: usize) -> (String, usize) {
    let mut i = start;
    while i < lines.len() && is_blank(&lines[i]) {
        i += 1;
    }
    if i >= lines.len() {
        return (String::new(), i);
    }

    let indent = indent_of(&lines[i]);
    if indent == 0 {
        return (String::new(), i);
    }

    let mut block = Vec::new();
    while i < lines.len() && (is_blank(&lines[i]) || indent_of(&lines[i]) >= indent) {
        if is_blank(&lines[i]) {
            block.push("");
        } else {
            block.push(&lines[i][indent..]);
        }
        i += 1;
    }

    (block.join("\n").trim_end_matches('\n').to_string(), i)
}

/// Split `name (type): description` or `name: description`
fn split_named_item(item: &str) -> Option<(String, Option<String>, String)> {
    let (head, rest) = match item.split_once('\n') {
        Some((head, rest)) => (head, Some(rest)),
        None => (item, None),
    };

    let colon = match head.find('(') {
        Some(open) if head[..open].find(':').is_none() => {
            let close = open + head[open..].find(')')?;
            close + 1 + head[close + 1..].find(':')?
        }
        _ => head.find(':')?,
    };

    let name_with_type = head[..colon].trim();
    let mut description = head[colon + 1..].to_string();
    if let Some(rest) = rest {
        description.push('\n');
        description.push_str(rest);
    }
    let description = description.trim().to_string();

    let (name, doc_type) = match name_with_type.find(|c: char| c == '(' || c.is_whitespace()) {
        Some(split) => {
            let type_part = name_with_type[split..].trim();
            let inner = match type_part.strip_prefix('(') {
                Some(open) => open.strip_suffix(')')?.trim(),
                // `name type: description`, a single type expression only
                None => {
                    let bare = type_part.strip_suffix(", optional").unwrap_or(type_part);
                    if split_top_level(bare, ' ').len() > 1 {
                        return None;
                    }
                    bare
                }
            };
            let inner = inner.strip_suffix(", optional").unwrap_or(inner).trim();
            let doc_type = (!inner.is_empty()).then(|| inner.to_string());
            (name_with_type[..split].trim(), doc_type)
        }
        None => (name_with_type, None),
    };

    if !RE_PARAM_NAME.is_match(name) {
        return None;
    }
    Some((name.to_string(), doc_type, description))
}

fn split_exception_item(item: &str) -> Option<RaisesEntry> {
    let (name, description) = item.split_once(':')?;
    let name = name.trim();
    if !RE_EXCEPTION_NAME.is_match(name) {
        return None;
    }
    Some(RaisesEntry {
        exception_name: name.to_string(),
        description: description.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::super::{parse as parse_docstring, DocstringStyle, ExampleKind, ParseOptions, ParsedDocstring};
    use super::*;
    use crate::model::{Parameter, ParameterKind};

    fn parse(text: &str, params: Option<&[Parameter]>, ret: Option<&str>) -> ParsedDocstring {
        parse_docstring(
            text,
            params,
            ret,
            ParseOptions {
                style: DocstringStyle::Google,
                replace_admonitions: false,
            },
        )
    }

    fn untyped(names: &[&str]) -> Vec<Parameter> {
        names
            .iter()
            .map(|n| Parameter::new(n, ParameterKind::PositionalOrKeyword))
            .collect()
    }

    #[test]
    fn test_simple_docstring() {
        let parsed = parse("A simple docstring.", None, None);
        assert_eq!(parsed.sections, vec![Section::Text("A simple docstring.".to_string())]);
        assert!(parsed.errors.is_empty());
    }

    #[test]
    fn test_multi_line_docstring() {
        let parsed = parse("A somewhat longer docstring.\n\nBlablablabla.", None, None);
        assert_eq!(parsed.sections.len(), 1);
        assert!(parsed.errors.is_empty());
    }

    #[test]
    fn test_types_in_docstring() {
        let params = untyped(&["x", "y"]);
        let text = "Types in the docstring.\n\nParameters:\n    x (int): X value.\n    y (int, optional): Y value.\n\nReturns:\n    int: Sum X + Y.";
        let parsed = parse(text, Some(&params), None);
        assert_eq!(parsed.sections.len(), 3);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);

        let Section::Parameters(entries) = &parsed.sections[1] else {
            panic!("expected parameters");
        };
        assert_eq!(entries[0].annotation.as_deref(), Some("int"));
        assert_eq!(entries[0].kind, Some(ParameterKind::PositionalOrKeyword));
        assert_eq!(entries[1].annotation.as_deref(), Some("int"));
        assert_eq!(entries[1].description, "Y value.");

        let Section::Returns(returns) = &parsed.sections[2] else {
            panic!("expected returns");
        };
        assert_eq!(returns.annotation.as_deref(), Some("int"));
        assert_eq!(returns.description, "Sum X + Y.");
    }

    #[test]
    fn test_types_from_signature() {
        let params = vec![
            Parameter::new("x", ParameterKind::PositionalOrKeyword).with_annotation("int"),
            Parameter::new("y", ParameterKind::PositionalOrKeyword)
                .with_annotation("int")
                .with_default("1"),
        ];
        let text = "Annotated.\n\nParameters:\n    x: X value.\n    y: Y value.\n\nReturns:\n    Sum X + Y.";
        let parsed = parse(text, Some(&params), Some("int"));
        assert!(parsed.errors.is_empty());

        let Section::Parameters(entries) = &parsed.sections[1] else {
            panic!("expected parameters");
        };
        assert_eq!(entries[1].annotation.as_deref(), Some("int"));
        assert_eq!(entries[1].default.as_deref(), Some("1"));

        let Section::Returns(returns) = &parsed.sections[2] else {
            panic!("expected returns");
        };
        assert_eq!(returns.annotation.as_deref(), Some("int"));
        assert_eq!(returns.description, "Sum X + Y.");
    }

    #[test]
    fn test_close_sections() {
        let params = untyped(&["x", "y", "z"]);
        let text = "Parameters:\n    x: X.\nParameters:\n    y: Y.\n\nParameters:\n    z: Z.\nExceptions:\n    Error2: error.\nExceptions:\n    Error1: error.\nReturns:\n    1.\nReturns:\n    2.";
        let parsed = parse(text, Some(&params), None);
        assert_eq!(parsed.sections.len(), 7);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
    }

    #[test]
    fn test_code_fence_hides_headers() {
        let text = "Contains a docstring in a code block.\n\n```python\n\"\"\"\nInner.\n\nParameters:\n    s: A string.\n\"\"\"\n```";
        let parsed = parse(text, Some(&untyped(&["s"])), None);
        assert_eq!(parsed.sections.len(), 1);
        assert!(parsed.errors.is_empty());
    }

    #[test]
    fn test_indented_header_is_prose() {
        let text = "\n    Contains an indented block.\n\n        Parameters:\n            s: A string.\n    ";
        let parsed = parse(text, Some(&untyped(&["s"])), None);
        assert_eq!(parsed.sections.len(), 1);
        assert!(parsed.errors.is_empty());
    }

    #[test]
    fn test_missing_parameter_is_not_an_error() {
        let parsed = parse("\nParameters:\n    x: Integer.", Some(&untyped(&["x", "y"])), None);
        assert_eq!(parsed.sections.len(), 1);
        assert!(parsed.errors.is_empty());
    }

    #[test]
    fn test_param_line_without_colon() {
        let parsed = parse("\nParameters:\n    x is an integer.", Some(&untyped(&["x"])), None);
        assert!(parsed.sections.is_empty());
        assert_eq!(parsed.errors.len(), 2);
        assert!(parsed.errors[0].contains("pair"));
        assert!(parsed.errors[1].starts_with("Empty parameters section"));
    }

    #[test]
    fn test_malformed_entry_does_not_stop_section() {
        let text = "\nParameters:\n    this is prose: not a name.\n    x: kept.";
        let parsed = parse(text, Some(&untyped(&["x"])), None);
        let Section::Parameters(entries) = &parsed.sections[0] else {
            panic!("expected parameters");
        };
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "x");
        assert_eq!(parsed.errors.len(), 1);
    }

    #[test]
    fn test_admonitions_replaced_when_enabled() {
        let text = "Title.\n\nNote:\n    Hello.\n\nWarning: Careful now.\n    Hello again.";
        let parsed = parse_docstring(
            text,
            None,
            None,
            ParseOptions {
                style: DocstringStyle::Google,
                replace_admonitions: true,
            },
        );
        assert_eq!(parsed.sections.len(), 1);
        let Section::Text(body) = &parsed.sections[0] else {
            panic!("expected text");
        };
        assert!(body.contains("!!! note\n    Hello."));
        assert!(body.contains("!!! warning \"Careful now.\""));
    }

    #[test]
    fn test_empty_sections_warn() {
        let text = "Parameters:\nExceptions:\nExceptions:\n\nReturns:\nNote:\n\nImportant:";
        let parsed = parse(text, Some(&[]), None);
        assert_eq!(parsed.sections.len(), 1);
        assert_eq!(parsed.errors.len(), 4);
        assert!(parsed.errors.iter().all(|e| e.starts_with("Empty")));
    }

    #[test]
    fn test_multiple_lines_in_items() {
        let params = vec![
            Parameter::new("p", ParameterKind::PositionalOrKeyword).with_annotation("str"),
            Parameter::new("q", ParameterKind::PositionalOrKeyword).with_annotation("str"),
        ];
        let text = "Hi.\n\nArguments:\n    p: This argument\n       has a description\n      spawning on multiple lines.\n\n       It even has blank lines in it.\n               Some of these lines\n           are indented for no reason.\n    q:\n      What if the first line is blank?";
        let parsed = parse(text, Some(&params), None);
        assert_eq!(parsed.sections.len(), 2);
        let Section::Parameters(entries) = &parsed.sections[1] else {
            panic!("expected parameters");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].description, "What if the first line is blank?");
        assert!(!parsed.errors.is_empty());
        for error in &parsed.errors {
            assert!(error.contains("should be 4 * 2 = 8 spaces, not"), "{}", error);
        }
    }

    #[test]
    fn test_args_kwargs_match_variadics() {
        let params = vec![
            Parameter::new("a", ParameterKind::PositionalOrKeyword),
            Parameter::new("args", ParameterKind::VarPositional),
            Parameter::new("kwargs", ParameterKind::VarKeyword),
        ];
        let text = "\nArguments:\n    a: a parameter.\n    *args: args parameters.\n    kwargs: kwargs parameters.";
        let parsed = parse(text, Some(&params), None);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        let Section::Parameters(entries) = &parsed.sections[0] else {
            panic!("expected parameters");
        };
        assert_eq!(entries[1].name, "*args");
        assert_eq!(entries[1].kind, Some(ParameterKind::VarPositional));
        assert_eq!(entries[2].kind, Some(ParameterKind::VarKeyword));
    }

    #[test]
    fn test_different_indentation() {
        let text = "Hello.\n\nRaises:\n     StartAt5: this section's items starts with 5 spaces of indentation.\n          Well indented continuation line.\n      Badly indented continuation line (will trigger an error).\n\n              Empty lines are preserved, as well as extra-indentation (this line is a code block).\n     AnyOtherLine: ...starting with exactly 5 spaces is a new item.\n    AnyLine: ...indented with less than 5 spaces signifies the end of the section.";
        let parsed = parse(text, Some(&[]), None);
        assert_eq!(parsed.sections.len(), 3);

        let Section::Raises(entries) = &parsed.sections[1] else {
            panic!("expected raises");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0].description,
            "this section's items starts with 5 spaces of indentation.\nWell indented continuation line.\nBadly indented continuation line (will trigger an error).\n\n    Empty lines are preserved, as well as extra-indentation (this line is a code block)."
        );
        assert_eq!(
            parsed.sections[2],
            Section::Text("    AnyLine: ...indented with less than 5 spaces signifies the end of the section.".to_string())
        );
        assert_eq!(parsed.errors.len(), 1);
        assert!(parsed.errors[0].contains("should be 5 * 2 = 10 spaces, not 6"));
    }

    #[test]
    fn test_examples_and_attributes_sections() {
        let text = "Counter.\n\nAttributes:\n    count (int): Current value.\n\nExamples:\n    Build one:\n\n    >>> Counter().count\n    0";
        let parsed = parse(text, None, None);
        assert_eq!(parsed.sections.len(), 3);

        let Section::Attributes(attrs) = &parsed.sections[1] else {
            panic!("expected attributes");
        };
        assert_eq!(attrs[0].name, "count");
        assert_eq!(attrs[0].annotation.as_deref(), Some("int"));

        let Section::Examples(blocks) = &parsed.sections[2] else {
            panic!("expected examples");
        };
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].kind, ExampleKind::Text);
        assert_eq!(blocks[1].kind, ExampleKind::Code);
        assert_eq!(blocks[1].content, ">>> Counter().count\n0");
    }

    #[test]
    fn test_duplicate_parameter_kept_once() {
        let parsed = parse("\nArgs:\n    x: first.\n    x: second.", Some(&untyped(&["x"])), None);
        let Section::Parameters(entries) = &parsed.sections[0] else {
            panic!("expected parameters");
        };
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].description, "first.");
        assert_eq!(parsed.errors, vec!["parameter x documented more than once".to_string()]);
    }

    #[test]
    fn test_split_named_item() {
        assert_eq!(
            split_named_item("x (Dict[str, int]): mapping."),
            Some(("x".to_string(), Some("Dict[str, int]".to_string()), "mapping.".to_string()))
        );
        assert_eq!(
            split_named_item("**kwargs: extra."),
            Some(("**kwargs".to_string(), None, "extra.".to_string()))
        );
        assert_eq!(
            split_named_item("x int: desc."),
            Some(("x".to_string(), Some("int".to_string()), "desc.".to_string()))
        );
        assert_eq!(
            split_named_item("pairs List[Tuple[int, str]], optional: desc."),
            Some(("pairs".to_string(), Some("List[Tuple[int, str]]".to_string()), "desc.".to_string()))
        );
        assert_eq!(split_named_item("no colon here"), None);
    }

    #[test]
    fn test_bare_type_after_name() {
        let parsed = parse("Title.

Args:
    x int: desc.", Some(&untyped(&["x"])), None);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        let Section::Parameters(entries) = &parsed.sections[1] else {
            panic!("expected parameters");
        };
        assert_eq!(entries[0].name, "x");
        assert_eq!(entries[0].annotation.as_deref(), Some("int"));
        assert_eq!(entries[0].description, "desc.");
    }
}
