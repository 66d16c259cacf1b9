//! Root-element attribute embedding and asset injection.

use serde_json::Value;

use crate::error::EngineError;

/// HTML-escape text for element content or a double-quoted attribute.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            other => out.push(other),
        }
    }
    out
}

/// Escape text for a single-quoted JavaScript string literal.
pub fn escape_js_single_quoted(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('\'', "\\'")
}

fn attribute_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Byte offset just past the root element's tag name.
///
/// The root tag is the first `<name` that opens the markup or starts a
/// line (leading whitespace allowed).
fn root_tag_end(html: &str) -> Option<usize> {
    let bytes = html.as_bytes();
    let mut line_start = 0;
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'\n' {
            line_start = i + 1;
            continue;
        }
        if b != b'<' {
            continue;
        }
        if !html[line_start..i].chars().all(char::is_whitespace) {
            continue;
        }
        let name_len = bytes[i + 1..]
            .iter()
            .take_while(|c| c.is_ascii_alphanumeric() || **c == b'-')
            .count();
        if name_len > 0 {
            return Some(i + 1 + name_len);
        }
    }
    None
}

/// Insert `key="value"` pairs right after the root element's tag name.
pub fn insert_attributes_into_html_root(
    html: &str,
    attributes: &[(&str, Value)],
) -> Result<String, EngineError> {
    let at = root_tag_end(html).ok_or(EngineError::MissingRootElement)?;
    let rendered: Vec<String> = attributes
        .iter()
        .map(|(key, value)| format!("{}=\"{}\"", key, escape(&attribute_text(value))))
        .collect();

    let mut out = String::with_capacity(html.len() + 64);
    out.push_str(&html[..at]);
    out.push(' ');
    out.push_str(&rendered.join(" "));
    out.push_str(&html[at..]);
    Ok(out)
}

/// Splice assets before `</head>` and `</body>`. Markup lacking the
/// closing tag for a group is left untouched for that group.
pub fn inject_assets(html: &str, head: &str, body: &str) -> String {
    let mut out = html.to_string();
    if !head.is_empty() {
        if let Some(at) = out.find("</head>") {
            out.insert_str(at, head);
        }
    }
    if !body.is_empty() {
        if let Some(at) = out.rfind("</body>") {
            out.insert_str(at, body);
        }
    }
    out
}
