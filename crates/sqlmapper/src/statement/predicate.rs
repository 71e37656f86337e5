//! `"column operator"` predicate keys.

use crate::escape::escape;
use crate::value::Value;

/// Recognised comparison operators, lowercase with single spaces.
pub(crate) const OPERATORS: &[&str] = &[
    "=",
    "!=",
    "<>",
    "<",
    "<=",
    ">",
    ">=",
    "like",
    "not like",
    "in",
    "not in",
    "is",
    "is not",
    "regexp",
    "not regexp",
];

/// Split a predicate key at its first space into column and operator.
///
/// `"age >="` → `("age", Some(">="))`, `"name"` → `("name", None)`.
pub(crate) fn split_key(key: &str) -> (&str, Option<&str>) {
    match key.find(' ') {
        Some(idx) if idx > 0 => {
            let op = key[idx + 1..].trim();
            (&key[..idx], (!op.is_empty()).then_some(op))
        }
        _ => (key, None),
    }
}

fn normalize(op: &str) -> String {
    op.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

pub(crate) fn is_known_operator(op: &str) -> bool {
    OPERATORS.contains(&normalize(op).as_str())
}

fn is_list_operator(op: &str) -> bool {
    matches!(normalize(op).as_str(), "in" | "not in")
}

/// A list value only pairs with `in` / `not in` when an operator is given.
pub(crate) fn accepts_value(op: &str, value: &Value) -> bool {
    !matches!(value, Value::List(_)) || is_list_operator(op)
}

fn list(items: &[Value]) -> String {
    if items.is_empty() {
        "(NULL)".to_string()
    } else {
        format!("({})", escape(&Value::List(items.to_vec())))
    }
}

/// Render one comparison. `column` is already escaped.
pub(crate) fn build_expression(column: &str, op: Option<&str>, value: &Value) -> String {
    match (value, op) {
        (Value::List(items), op) => format!("{column} {} {}", op.unwrap_or("IN"), list(items)),
        (Value::Null, None) => format!("{column} IS NULL"),
        (value, Some(op)) if is_list_operator(op) => {
            format!("{column} {op} {}", list(std::slice::from_ref(value)))
        }
        (value, op) => format!("{column} {} {}", op.unwrap_or("="), escape(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_at_first_space() {
        assert_eq!(split_key("name"), ("name", None));
        assert_eq!(split_key("age >="), ("age", Some(">=")));
        assert_eq!(split_key("name not  like"), ("name", Some("not  like")));
        assert_eq!(split_key("name "), ("name", None));
        assert_eq!(split_key(" name"), (" name", None));
    }

    #[test]
    fn operators_are_case_insensitive() {
        assert!(is_known_operator("NOT IN"));
        assert!(is_known_operator("not   like"));
        assert!(is_known_operator("<>"));
        assert!(!is_known_operator("; DROP TABLE"));
        assert!(!is_known_operator("=="));
    }

    #[test]
    fn default_operators_follow_value_shape() {
        assert_eq!(build_expression("`a`", None, &Value::from(1)), "`a` = 1");
        assert_eq!(build_expression("`a`", None, &Value::Null), "`a` IS NULL");
        assert_eq!(
            build_expression("`a`", None, &Value::from(vec![1, 2])),
            "`a` IN (1,2)"
        );
    }

    #[test]
    fn explicit_operators_keep_caller_spelling() {
        assert_eq!(
            build_expression("`name`", Some("in"), &Value::from(vec!["one", "two"])),
            "`name` in ('one','two')"
        );
        assert_eq!(
            build_expression("`deleted_at`", Some("is not"), &Value::Null),
            "`deleted_at` is not NULL"
        );
        assert_eq!(
            build_expression("`age`", Some(">"), &Value::from(15)),
            "`age` > 15"
        );
    }

    #[test]
    fn list_edge_cases() {
        assert_eq!(
            build_expression("`id`", None, &Value::List(vec![])),
            "`id` IN (NULL)"
        );
        assert_eq!(
            build_expression("`id`", Some("not in"), &Value::from(3)),
            "`id` not in (3)"
        );
    }

    #[test]
    fn lists_only_pair_with_list_operators() {
        let list = Value::from(vec![1, 2]);
        assert!(accepts_value("in", &list));
        assert!(accepts_value("NOT IN", &list));
        assert!(!accepts_value(">", &list));
        assert!(!accepts_value("=", &list));
        assert!(accepts_value(">", &Value::from(1)));
    }
}
