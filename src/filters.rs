//! Built-in filters applied with `value|name:arg`

use std::collections::HashMap;

use crate::error::Result;
use crate::value::{escape_html, Value};

/// A filter takes the value and its optional argument
pub type FilterFn = fn(Value, Option<Value>) -> Result<Value>;

/// Filters available to every engine
pub fn builtin_filters() -> HashMap<String, FilterFn> {
    let mut filters: HashMap<String, FilterFn> = HashMap::new();
    filters.insert("default".to_string(), default);
    filters.insert("upper".to_string(), upper);
    filters.insert("lower".to_string(), lower);
    filters.insert("safe".to_string(), safe);
    filters.insert("escape".to_string(), escape);
    filters.insert("length".to_string(), length);
    filters.insert("join".to_string(), join);
    filters
}

fn default(value: Value, arg: Option<Value>) -> Result<Value> {
    if value.is_truthy() {
        Ok(value)
    } else {
        Ok(arg.unwrap_or_default())
    }
}

fn upper(value: Value, _arg: Option<Value>) -> Result<Value> {
    Ok(Value::Str(value.to_text()?.to_uppercase()))
}

fn lower(value: Value, _arg: Option<Value>) -> Result<Value> {
    Ok(Value::Str(value.to_text()?.to_lowercase()))
}

fn safe(value: Value, _arg: Option<Value>) -> Result<Value> {
    Ok(Value::Safe(value.to_text()?))
}

fn escape(value: Value, _arg: Option<Value>) -> Result<Value> {
    if value.is_safe() {
        return Ok(value);
    }
    Ok(Value::Safe(escape_html(&value.to_text()?)))
}

fn length(value: Value, _arg: Option<Value>) -> Result<Value> {
    let len = value.len().unwrap_or(0);
    Ok(Value::Int(i64::try_from(len).unwrap_or(i64::MAX)))
}

fn join(value: Value, arg: Option<Value>) -> Result<Value> {
    let separator = match arg {
        Some(sep) => sep.to_text()?,
        None => String::new(),
    };
    match value {
        Value::List(items) => {
            let parts = items
                .iter()
                .map(|item| item.to_text())
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Str(parts.join(&separator)))
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(name: &str, value: Value, arg: Option<Value>) -> Value {
        let filters = builtin_filters();
        filters[name](value, arg).expect("filter should succeed")
    }

    #[test]
    fn test_default() {
        assert_eq!(
            apply("default", Value::None, Some(Value::from("x"))),
            Value::from("x")
        );
        assert_eq!(
            apply("default", Value::from("set"), Some(Value::from("x"))),
            Value::from("set")
        );
    }

    #[test]
    fn test_case_filters() {
        assert_eq!(apply("upper", Value::from("ab"), None), Value::from("AB"));
        assert_eq!(apply("lower", Value::from("AB"), None), Value::from("ab"));
    }

    #[test]
    fn test_escape_does_not_double_escape() {
        let once = apply("escape", Value::from("<i>"), None);
        assert_eq!(once, Value::Safe("&lt;i&gt;".to_string()));
        assert_eq!(apply("escape", once.clone(), None), once);
    }

    #[test]
    fn test_length_and_join() {
        let items = Value::from(vec!["a", "b", "c"]);
        assert_eq!(apply("length", items.clone(), None), Value::Int(3));
        assert_eq!(
            apply("join", items, Some(Value::from(", "))),
            Value::from("a, b, c")
        );
    }

    #[test]
    fn test_upper_propagates_decode_failure() {
        let filters = builtin_filters();
        let err = filters["upper"](Value::Bytes(vec![0xff]), None).unwrap_err();
        assert!(err.is_decode());
    }
}
