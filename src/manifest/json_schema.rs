//! Type strings (`string`, `number[]`, `'draft' | 'published'`, `Array<Foo>`) -> JSON Schema.
//!
//! A small recursive parser, not a type checker. Anything it does not recognise becomes a string
//! schema carrying the raw type in its description.

use serde_json::{json, Value};

/// Split on `sep` at nesting depth zero, outside quotes.
fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' | '`' => quote = Some(c),
                '<' | '(' | '[' | '{' => depth += 1,
                '>' | ')' | ']' | '}' => depth -= 1,
                c if c == sep && depth == 0 => {
                    parts.push(s[start..i].trim());
                    start = i + c.len_utf8();
                }
                _ => {}
            },
        }
    }
    parts.push(s[start..].trim());
    parts.into_iter().filter(|p| !p.is_empty()).collect()
}

/// `(T)` -> `T`, only when the first paren closes at the very end.
fn strip_outer_parens(s: &str) -> &str {
    let mut s = s.trim();
    while s.starts_with('(') && s.ends_with(')') {
        let mut depth = 0;
        let mut closes_at_end = false;
        for (i, c) in s.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        closes_at_end = i == s.len() - 1;
                        break;
                    }
                }
                _ => {}
            }
        }
        if !closes_at_end {
            break;
        }
        s = s[1..s.len() - 1].trim();
    }
    s
}

fn string_literal(s: &str) -> Option<String> {
    let mut chars = s.chars();
    let open = chars.next()?;
    if !matches!(open, '\'' | '"' | '`') || s.len() < 2 || !s.ends_with(open) {
        return None;
    }
    let inner = &s[1..s.len() - 1];
    if inner.contains(open) {
        return None;
    }
    Some(inner.to_string())
}

/// `Name<T>` -> `T` for the given generic name.
fn generic_arg<'a>(s: &'a str, name: &str) -> Option<&'a str> {
    s.strip_prefix(name)?
        .trim_start()
        .strip_prefix('<')?
        .strip_suffix('>')
        .map(str::trim)
}

pub fn convert_type_to_json_schema(raw: &str) -> Value {
    let t = strip_outer_parens(raw);

    let members = split_top_level(t, '|');
    if members.len() > 1 {
        let literals: Option<Vec<String>> = members.iter().map(|m| string_literal(m)).collect();
        return match literals {
            Some(values) => json!({ "type": "string", "enum": values }),
            None => json!({ "oneOf": members.iter().map(|m| convert_type_to_json_schema(m)).collect::<Vec<_>>() }),
        };
    }

    if let Some(lit) = string_literal(t) {
        return json!({ "type": "string", "enum": [lit] });
    }
    if let Some(inner) = t.strip_suffix("[]") {
        return json!({ "type": "array", "items": convert_type_to_json_schema(inner) });
    }
    if let Some(inner) = generic_arg(t, "Array").or_else(|| generic_arg(t, "ReadonlyArray")) {
        return json!({ "type": "array", "items": convert_type_to_json_schema(inner) });
    }
    match t {
        "string" => return json!({ "type": "string" }),
        "number" => return json!({ "type": "number" }),
        "boolean" => return json!({ "type": "boolean" }),
        "null" => return json!({ "type": "null" }),
        "object" | "Object" => return json!({ "type": "object" }),
        _ => {}
    }
    if generic_arg(t, "Record").is_some() || (t.starts_with('{') && t.ends_with('}')) {
        return json!({ "type": "object" });
    }

    tracing::warn!(type_string = %raw, "unrecognised type string; using string schema");
    json!({ "type": "string", "description": format!("type: {}", raw.trim()) })
}
