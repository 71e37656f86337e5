//! Literal escaping and `?` template formatting.
//!
//! Statements are assembled as text: every value is escaped and inlined
//! in place of its `?` placeholder.

use crate::error::{MapperError, MapperResult};
use crate::value::Value;
use chrono::SecondsFormat;

/// Escape a value into a SQL literal.
///
/// # Example
///
/// ```ignore
/// use sqlmapper::{escape, Value};
///
/// assert_eq!(escape(&Value::Null), "NULL");
/// assert_eq!(escape(&Value::from("a'b")), r"'a\'b'");
/// ```
pub fn escape(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) if f.is_finite() => f.to_string(),
        Value::Float(_) => "NULL".to_string(),
        Value::List(items) => items.iter().map(escape).collect::<Vec<_>>().join(","),
        Value::Timestamp(ts) => {
            format!("'{}'", ts.to_rfc3339_opts(SecondsFormat::Millis, true))
        }
        Value::Text(s) => quote(s),
        Value::Json(json) => quote(&json.to_string()),
        Value::Row(row) => quote(&row.to_json().to_string()),
    }
}

/// Backslash-escape a string and wrap it in single quotes.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{8}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\u{1a}' => out.push_str("\\Z"),
            '\'' | '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Quote a table or column name with backticks.
pub fn escape_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Replace each `?` in `template` with the next escaped value.
///
/// Fails with [`MapperError::ParameterCount`] unless the number of
/// placeholders equals the number of values.
pub fn format(template: &str, values: &[Value]) -> MapperResult<String> {
    let placeholders = template.matches('?').count();
    if placeholders != values.len() {
        return Err(MapperError::ParameterCount {
            placeholders,
            values: values.len(),
        });
    }
    if placeholders == 0 {
        return Ok(template.to_string());
    }

    let mut out = String::with_capacity(template.len() + values.len() * 8);
    let mut values = values.iter();
    for c in template.chars() {
        if c != '?' {
            out.push(c);
        } else if let Some(value) = values.next() {
            out.push_str(&escape(value));
        }
    }
    Ok(out)
}
