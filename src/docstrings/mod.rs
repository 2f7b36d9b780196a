// Docstring section parsing
//
// Splits raw docstring text into typed sections and merges documented types
// with the ones captured from the live signature. Parsing never fails: local
// problems become warnings in `ParsedDocstring::errors`.

mod google;
mod rst;

use crate::model::{Parameter, ParameterKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Header vocabulary recognized by the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DocstringStyle {
    #[default]
    Google,
    #[serde(alias = "rst")]
    RestructuredText,
    Plain,
}

impl DocstringStyle {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "google" => Some(DocstringStyle::Google),
            "restructured-text" | "restructuredtext" | "rst" => Some(DocstringStyle::RestructuredText),
            "plain" | "markdown" | "none" => Some(DocstringStyle::Plain),
            _ => None,
        }
    }
}

/// A documented parameter or attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterEntry {
    pub name: String,
    pub annotation: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ParameterKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// Type plus description, used by returns and yields sections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedText {
    pub annotation: Option<String>,
    pub description: String,
}

/// A documented exception
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaisesEntry {
    pub exception_name: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExampleKind {
    Text,
    Code,
}

/// A prose or doctest block inside an examples section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleBlock {
    pub kind: ExampleKind,
    pub content: String,
}

/// A parsed docstring section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Section {
    Text(String),
    Parameters(Vec<ParameterEntry>),
    Returns(AnnotatedText),
    Yields(AnnotatedText),
    Raises(Vec<RaisesEntry>),
    Examples(Vec<ExampleBlock>),
    Attributes(Vec<ParameterEntry>),
}

impl Section {
    pub fn kind(&self) -> SectionKind {
        match self {
            Section::Text(_) => SectionKind::Text,
            Section::Parameters(_) => SectionKind::Parameters,
            Section::Returns(_) => SectionKind::Returns,
            Section::Yields(_) => SectionKind::Yields,
            Section::Raises(_) => SectionKind::Raises,
            Section::Examples(_) => SectionKind::Examples,
            Section::Attributes(_) => SectionKind::Attributes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Text,
    Parameters,
    Returns,
    Yields,
    Raises,
    Examples,
    Attributes,
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SectionKind::Text => "text",
            SectionKind::Parameters => "parameters",
            SectionKind::Returns => "returns",
            SectionKind::Yields => "yields",
            SectionKind::Raises => "raises",
            SectionKind::Examples => "examples",
            SectionKind::Attributes => "attributes",
        };
        f.write_str(s)
    }
}

/// Parser knobs that do not come from the signature
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    pub style: DocstringStyle,
    /// Rewrite google-style `Note:` blocks into `!!! note` admonitions
    pub replace_admonitions: bool,
}

/// Sections plus non-fatal warnings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDocstring {
    pub sections: Vec<Section>,
    pub errors: Vec<String>,
}

/// Parse a docstring.
///
/// `parameters` is `None` when the documented object is not callable; in that
/// case documented parameters are kept as written and never flagged.
pub fn parse(
    text: &str,
    parameters: Option<&[Parameter]>,
    return_annotation: Option<&str>,
    options: ParseOptions,
) -> ParsedDocstring {
    let normalized = normalize_indentation(text);
    if normalized.is_empty() {
        return ParsedDocstring::default();
    }

    let mut ctx = Context::new(parameters, return_annotation, options.replace_admonitions);
    let sections = match options.style {
        DocstringStyle::Google => google::parse(&normalized, &mut ctx),
        DocstringStyle::RestructuredText => rst::parse(&normalized, &mut ctx),
        DocstringStyle::Plain => vec![Section::Text(normalized.clone())],
    };

    ParsedDocstring {
        sections,
        errors: ctx.errors,
    }
}

/// Strip the common indentation of every line after the first.
///
/// The first line is dedented on its own, tabs expand to 8 columns and
/// leading/trailing blank lines are dropped.
pub fn normalize_indentation(text: &str) -> String {
    let lines: Vec<String> = text.lines().map(expand_tabs).collect();
    if lines.is_empty() {
        return String::new();
    }

    let margin = lines
        .iter()
        .skip(1)
        .filter(|l| !is_blank(l))
        .map(|l| indent_of(l))
        .min()
        .unwrap_or(0);

    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    out.push(lines[0].trim().to_string());
    for line in &lines[1..] {
        if is_blank(line) {
            out.push(String::new());
        } else {
            out.push(line[margin..].trim_end().to_string());
        }
    }

    while out.last().map_or(false, |l| l.is_empty()) {
        out.pop();
    }
    let leading = out.iter().take_while(|l| l.is_empty()).count();
    out.drain(..leading);

    out.join("\n")
}

fn expand_tabs(line: &str) -> String {
    if !line.contains('\t') {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + 8);
    let mut column = 0;
    for c in line.chars() {
        if c == '\t' {
            let pad = 8 - column % 8;
            out.extend(std::iter::repeat(' ').take(pad));
            column += pad;
        } else {
            out.push(c);
            column += 1;
        }
    }
    out
}

pub(crate) fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

pub(crate) fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// Whether two annotation spellings denote the same type
pub fn annotations_match(a: &str, b: &str) -> bool {
    let a = canonical_annotation(a);
    let b = canonical_annotation(b);
    if a == b {
        return true;
    }
    // `User` documented against a resolved `pkg.models.User`
    a.ends_with(&format!(".{}", b)) || b.ends_with(&format!(".{}", a))
}

fn canonical_annotation(annotation: &str) -> String {
    let compact: String = annotation.chars().filter(|c| !c.is_whitespace()).collect();
    compact
        .trim_matches(|c| c == '"' || c == '\'')
        .replace("typing.", "")
}

/// Element type yielded by a generator annotation, e.g. `Iterator[int]` -> `int`
pub fn yield_annotation(return_annotation: &str) -> Option<String> {
    let trimmed = return_annotation.trim();
    let open = trimmed.find('[')?;
    let head = trimmed[..open].rsplit('.').next().unwrap_or_default();
    if !matches!(
        head,
        "Iterator" | "Iterable" | "Generator" | "AsyncIterator" | "AsyncIterable" | "AsyncGenerator"
    ) || !trimmed.ends_with(']')
    {
        return None;
    }
    let inner = &trimmed[open + 1..trimmed.len() - 1];
    split_top_level(inner, ',')
        .into_iter()
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Split on `sep` outside of brackets
pub(crate) fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '[' | '(' | '{' => depth += 1,
            ']' | ')' | '}' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Split `type: description` when the prefix looks like a type expression
pub(crate) fn split_type_prefix(text: &str) -> (Option<String>, String) {
    let first_line = text.lines().next().unwrap_or_default();
    let mut depth = 0i32;
    for (i, c) in first_line.char_indices() {
        match c {
            '[' | '(' | '{' => depth += 1,
            ']' | ')' | '}' => depth -= 1,
            ':' if depth == 0 => {
                let candidate = first_line[..i].trim();
                if candidate.is_empty() {
                    break;
                }
                let description = text[i + 1..].trim().to_string();
                return (Some(candidate.to_string()), description);
            }
            c if c.is_whitespace() && depth == 0 => break,
            _ => {}
        }
    }
    (None, text.trim().to_string())
}

/// Mutable parse state shared by the style parsers
pub(crate) struct Context<'a> {
    parameters: Option<&'a [Parameter]>,
    return_annotation: Option<&'a str>,
    pub(crate) replace_admonitions: bool,
    pub(crate) errors: Vec<String>,
}

impl<'a> Context<'a> {
    fn new(
        parameters: Option<&'a [Parameter]>,
        return_annotation: Option<&'a str>,
        replace_admonitions: bool,
    ) -> Self {
        Self {
            parameters,
            return_annotation,
            replace_admonitions,
            errors: Vec::new(),
        }
    }

    pub(crate) fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Merge one documented parameter with the signature
    pub(crate) fn parameter_entry(
        &mut self,
        name: &str,
        doc_type: Option<String>,
        description: String,
    ) -> ParameterEntry {
        let mut entry = ParameterEntry {
            name: name.to_string(),
            annotation: doc_type.clone(),
            description,
            kind: None,
            default: None,
        };

        let Some(parameters) = self.parameters else {
            return entry;
        };

        let bare = name.trim_start_matches('*');
        let Some(known) = parameters.iter().find(|p| p.name == bare) else {
            self.error(format!("parameter {} documented but not in signature", name));
            return entry;
        };

        entry.kind = Some(known.kind);
        entry.default = known.default.clone();
        entry.annotation = match (doc_type, known.annotation.as_deref()) {
            (None, Some(sig)) => Some(sig.to_string()),
            (Some(doc), Some(sig)) => {
                if !annotations_match(&doc, sig) {
                    self.error(format!(
                        "parameter {} type conflict: docstring says '{}', signature says '{}'",
                        name, doc, sig
                    ));
                }
                Some(doc)
            }
            (doc, None) => doc,
        };
        entry
    }

    /// Merge a documented return or yield with the signature
    pub(crate) fn annotated_text(
        &mut self,
        kind: SectionKind,
        doc_type: Option<String>,
        description: String,
    ) -> AnnotatedText {
        let known = match kind {
            SectionKind::Yields => self.return_annotation.and_then(yield_annotation),
            _ => self.return_annotation.map(str::to_string),
        };

        let annotation = match (known, doc_type) {
            (Some(sig), Some(doc)) => {
                if !annotations_match(&doc, &sig) {
                    self.error(format!(
                        "{} type conflict: docstring says '{}', signature says '{}'",
                        kind, doc, sig
                    ));
                }
                Some(sig)
            }
            (Some(sig), None) => Some(sig),
            (None, doc) => doc,
        };

        AnnotatedText {
            annotation,
            description,
        }
    }

    /// Push an entry unless its name is already documented in the section
    pub(crate) fn push_unique(&mut self, entries: &mut Vec<ParameterEntry>, entry: ParameterEntry) {
        if entries.iter().any(|e| e.name == entry.name) {
            self.error(format!("parameter {} documented more than once", entry.name));
            return;
        }
        entries.push(entry);
    }
}

/// Split a prose chunk into text sections, dropping blank edges
pub(crate) fn text_section(lines: &[String]) -> Option<Section> {
    let start = lines.iter().position(|l| !is_blank(l))?;
    let end = lines.iter().rposition(|l| !is_blank(l))?;
    Some(Section::Text(lines[start..=end].join("\n")))
}

/// Split an examples body into prose and doctest blocks
pub(crate) fn example_blocks(body: &str) -> Vec<ExampleBlock> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut in_code = false;

    fn flush(current: &mut Vec<&str>, kind: ExampleKind, blocks: &mut Vec<ExampleBlock>) {
        let content = current.join("\n").trim_matches('\n').to_string();
        if !content.trim().is_empty() {
            blocks.push(ExampleBlock { kind, content });
        }
        current.clear();
    }

    for line in body.lines() {
        if in_code {
            if is_blank(line) {
                flush(&mut current, ExampleKind::Code, &mut blocks);
                in_code = false;
            } else {
                current.push(line);
            }
        } else if line.trim_start().starts_with(">>>") {
            flush(&mut current, ExampleKind::Text, &mut blocks);
            in_code = true;
            current.push(line);
        } else {
            current.push(line);
        }
    }
    let kind = if in_code { ExampleKind::Code } else { ExampleKind::Text };
    flush(&mut current, kind, &mut blocks);
    blocks
}
