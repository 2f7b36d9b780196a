// reStructuredText field-list parser
//
// Recognizes `:param x:`, `:type x:`, `:returns:`, `:rtype:`, `:yields:`,
// `:ytype:`, `:raises E:` and `:var x:` fields. Everything else is prose.
// Each structured section appears where its first field appears.

use super::{indent_of, is_blank, text_section, Context, ParameterEntry, RaisesEntry, Section, SectionKind};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static RE_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^:(?P<field>\w+)(?P<args>(?:\s+[^:]+)?):(?P<body>.*)$").expect("valid field regex")
});

#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Text(Section),
    Structured(SectionKind),
}

#[derive(Default)]
struct Fields {
    params: Vec<(String, Option<String>, String)>,
    param_types: HashMap<String, String>,
    returns: Option<String>,
    rtype: Option<String>,
    yields: Option<String>,
    ytype: Option<String>,
    raises: Vec<RaisesEntry>,
    vars: Vec<(String, String)>,
    var_types: HashMap<String, String>,
}

pub(super) fn parse(text: &str, ctx: &mut Context<'_>) -> Vec<Section> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut fields = Fields::default();
    let mut slots: Vec<Slot> = Vec::new();
    let mut prose: Vec<String> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let Some(caps) = RE_FIELD.captures(lines[i]) else {
            prose.push(lines[i].to_string());
            i += 1;
            continue;
        };

        let field = caps.name("field").map_or("", |m| m.as_str());
        let args = caps.name("args").map_or("", |m| m.as_str()).trim();
        let first = caps.name("body").map_or("", |m| m.as_str());
        let (body, next) = read_field_body(&lines, i, first);

        let recorded = record_field(&mut fields, field, args, body, i + 1, ctx);
        match recorded {
            FieldOutcome::Unknown => {
                prose.extend(lines[i..next].iter().map(|l| l.to_string()));
            }
            FieldOutcome::Skipped => {}
            FieldOutcome::Recorded(kind) => {
                if let Some(section) = text_section(&prose) {
                    slots.push(Slot::Text(section));
                }
                prose.clear();
                if let Some(kind) = kind {
                    if !slots.contains(&Slot::Structured(kind)) {
                        slots.push(Slot::Structured(kind));
                    }
                }
            }
        }
        i = next;
    }

    if let Some(section) = text_section(&prose) {
        slots.push(Slot::Text(section));
    }

    materialize(slots, fields, ctx)
}

enum FieldOutcome {
    /// Not a recognized field; keep the lines as prose
    Unknown,
    /// Recognized but malformed; already reported
    Skipped,
    /// Recorded, possibly opening a section of the given kind
    Recorded(Option<SectionKind>),
}

fn record_field(
    fields: &mut Fields,
    field: &str,
    args: &str,
    body: String,
    line_no: usize,
    ctx: &mut Context<'_>,
) -> FieldOutcome {
    match field {
        "param" | "parameter" | "arg" | "argument" | "key" | "keyword" => {
            let Some((name, doc_type)) = split_name_and_type(args) else {
                ctx.error(format!("Failed to get parameter name from ':{}:' at line {}", field, line_no));
                return FieldOutcome::Skipped;
            };
            fields.params.push((name, doc_type, body));
            FieldOutcome::Recorded(Some(SectionKind::Parameters))
        }
        "type" => {
            if args.is_empty() {
                ctx.error(format!("Failed to get parameter name from ':type:' at line {}", line_no));
                return FieldOutcome::Skipped;
            }
            fields.param_types.insert(args.to_string(), body);
            FieldOutcome::Recorded(None)
        }
        "returns" | "return" => {
            fields.returns = Some(body);
            FieldOutcome::Recorded(Some(SectionKind::Returns))
        }
        "rtype" => {
            fields.rtype = Some(body);
            FieldOutcome::Recorded(Some(SectionKind::Returns))
        }
        "yields" | "yield" => {
            fields.yields = Some(body);
            FieldOutcome::Recorded(Some(SectionKind::Yields))
        }
        "ytype" => {
            fields.ytype = Some(body);
            FieldOutcome::Recorded(Some(SectionKind::Yields))
        }
        "raises" | "raise" | "except" | "exception" => {
            if args.is_empty() || args.contains(char::is_whitespace) {
                ctx.error(format!("Failed to get exception name from ':{}:' at line {}", field, line_no));
                return FieldOutcome::Skipped;
            }
            fields.raises.push(RaisesEntry {
                exception_name: args.to_string(),
                description: body,
            });
            FieldOutcome::Recorded(Some(SectionKind::Raises))
        }
        "var" | "ivar" | "cvar" => {
            if args.is_empty() {
                ctx.error(format!("Failed to get attribute name from ':{}:' at line {}", field, line_no));
                return FieldOutcome::Skipped;
            }
            fields.vars.push((args.to_string(), body));
            FieldOutcome::Recorded(Some(SectionKind::Attributes))
        }
        "vartype" => {
            if !args.is_empty() {
                fields.var_types.insert(args.to_string(), body);
            }
            FieldOutcome::Recorded(None)
        }
        _ => FieldOutcome::Unknown,
    }
}

/// `int x` -> (`x`, `int`); `x` -> (`x`, none)
fn split_name_and_type(args: &str) -> Option<(String, Option<String>)> {
    if args.is_empty() {
        return None;
    }
    match args.rsplit_once(char::is_whitespace) {
        Some((doc_type, name)) => Some((name.to_string(), Some(doc_type.trim().to_string()))),
        None => Some((args.to_string(), None)),
    }
}

/// Field body: the rest of the field line plus indented continuation lines
fn read_field_body(lines: &[&str], start: usize, first: &str) -> (String, usize) {
    let mut continuation: Vec<&str> = Vec::new();
    let mut j = start + 1;

    while j < lines.len() {
        let line = lines[j];
        if is_blank(line) {
            let resumes = lines[j..]
                .iter()
                .find(|l| !is_blank(l))
                .map_or(false, |l| indent_of(l) > 0);
            if !resumes {
                break;
            }
            continuation.push("");
        } else if indent_of(line) == 0 {
            break;
        } else {
            continuation.push(line);
        }
        j += 1;
    }

    let margin = continuation
        .iter()
        .filter(|l| !is_blank(l))
        .map(|l| indent_of(l))
        .min()
        .unwrap_or(0);

    let mut body = first.trim().to_string();
    for line in continuation {
        body.push('\n');
        if !line.is_empty() {
            body.push_str(&line[margin..]);
        }
    }
    (body.trim().to_string(), j)
}

fn materialize(slots: Vec<Slot>, mut fields: Fields, ctx: &mut Context<'_>) -> Vec<Section> {
    let mut sections = Vec::new();
    for slot in slots {
        match slot {
            Slot::Text(section) => sections.push(section),
            Slot::Structured(SectionKind::Parameters) => {
                let mut entries: Vec<ParameterEntry> = Vec::new();
                for (name, inline_type, description) in std::mem::take(&mut fields.params) {
                    let doc_type = inline_type.or_else(|| fields.param_types.get(&name).cloned());
                    let entry = ctx.parameter_entry(&name, doc_type, description);
                    ctx.push_unique(&mut entries, entry);
                }
                sections.push(Section::Parameters(entries));
            }
            Slot::Structured(SectionKind::Returns) => {
                let description = fields.returns.take().unwrap_or_default();
                let value = ctx.annotated_text(SectionKind::Returns, fields.rtype.take(), description);
                sections.push(Section::Returns(value));
            }
            Slot::Structured(SectionKind::Yields) => {
                let description = fields.yields.take().unwrap_or_default();
                let value = ctx.annotated_text(SectionKind::Yields, fields.ytype.take(), description);
                sections.push(Section::Yields(value));
            }
            Slot::Structured(SectionKind::Raises) => {
                sections.push(Section::Raises(std::mem::take(&mut fields.raises)));
            }
            Slot::Structured(SectionKind::Attributes) => {
                let mut entries: Vec<ParameterEntry> = Vec::new();
                for (name, description) in std::mem::take(&mut fields.vars) {
                    let entry = ParameterEntry {
                        annotation: fields.var_types.get(&name).cloned(),
                        name,
                        description,
                        kind: None,
                        default: None,
                    };
                    ctx.push_unique(&mut entries, entry);
                }
                sections.push(Section::Attributes(entries));
            }
            Slot::Structured(_) => {}
        }
    }
    sections
}
