// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Binding: the `key=value` mini-language and request parameter binding.

use crate::class::PageInstance;
use crate::error::{PagewrightError, Result};
use crate::evaluator::{is_property_path, Evaluator};
use crate::request::Request;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

lazy_static! {
    static ref BIND_PAIR: Regex =
        Regex::new(r#"([A-Za-z_][\w.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s,"']+))"#).unwrap();
}

/// Parses `key1=value1 key2="value two"` into a map.
///
/// Pairs are separated by whitespace or commas; values may be double- or
/// single-quoted, and quotes are stripped. Anything that is not a pair is an
/// error.
///
/// ```rust
/// use pagewright::parse_bind_expression;
///
/// let map = parse_bind_expression(r#"items=todos, var="todo""#).unwrap();
/// assert_eq!(map["items"], "todos");
/// assert_eq!(map["var"], "todo");
/// ```
pub fn parse_bind_expression(expression: &str) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();
    let mut last = 0;

    for caps in BIND_PAIR.captures_iter(expression) {
        let (Some(whole), Some(key)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        check_separator(expression, &expression[last..whole.start()])?;
        last = whole.end();

        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| m.as_str())
            .unwrap_or_default();
        map.insert(key.as_str().to_string(), value.to_string());
    }
    check_separator(expression, &expression[last..])?;

    Ok(map)
}

fn check_separator(expression: &str, gap: &str) -> Result<()> {
    if gap.chars().all(|c| c.is_whitespace() || c == ',') {
        Ok(())
    } else {
        Err(PagewrightError::CompileError(format!(
            "malformed binding '{}' near '{}'",
            expression,
            gap.trim()
        )))
    }
}

/// Copies request parameters onto a page instance.
pub trait RequestBinder: Send + Sync + fmt::Debug {
    /// Binds `request` onto `instance`. Returns conversion errors, one
    /// message per rejected parameter.
    fn bind(&self, request: &Request, instance: &mut PageInstance, evaluator: &dyn Evaluator) -> Vec<String>;
}

/// Binds parameters named like existing model properties, converting each
/// value to the property's current JSON type.
#[derive(Debug, Clone, Default)]
pub struct PropertyBinder {
    skip: Vec<String>,
}

impl PropertyBinder {
    /// Creates a binder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Never binds the parameter `name` (e.g. the event discriminator).
    pub fn skipping(mut self, name: impl Into<String>) -> Self {
        self.skip.push(name.into());
        self
    }
}

impl RequestBinder for PropertyBinder {
    fn bind(&self, request: &Request, instance: &mut PageInstance, evaluator: &dyn Evaluator) -> Vec<String> {
        let mut names: Vec<&String> = request.params.keys().collect();
        names.sort();

        let mut errors = Vec::new();
        for name in names {
            if self.skip.iter().any(|skip| skip == name) || !is_property_path(name) {
                continue;
            }

            let pointer = format!("/{}", name.replace('.', "/"));
            let Some(current) = instance.model.pointer(&pointer) else {
                debug!(param = %name, page = instance.class_name(), "No such property, not bound");
                continue;
            };

            let converted = match convert(name, current, request.params(name)) {
                Ok(value) => value,
                Err(message) => {
                    errors.push(message);
                    continue;
                }
            };

            if let Err(e) = evaluator.write(name, &mut instance.model, converted) {
                errors.push(format!("{}: {}", name, e));
            }
        }
        errors
    }
}

fn convert(name: &str, current: &Value, values: &[String]) -> std::result::Result<Value, String> {
    let first = values.first().map(String::as_str).unwrap_or_default();
    match current {
        Value::Array(items) => {
            let template = items.first().cloned().unwrap_or(Value::Null);
            values
                .iter()
                .map(|v| convert(name, &template, std::slice::from_ref(v)))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        Value::Number(_) => {
            if let Ok(n) = first.trim().parse::<i64>() {
                Ok(Value::from(n))
            } else if let Some(n) = first.trim().parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
                Ok(Value::Number(n))
            } else {
                Err(format!("{}: expected a number, got '{}'", name, first))
            }
        }
        Value::Bool(_) => match first.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "yes" | "1" | "checked" => Ok(Value::Bool(true)),
            "false" | "off" | "no" | "0" | "" => Ok(Value::Bool(false)),
            _ => Err(format!("{}: expected true or false, got '{}'", name, first)),
        },
        Value::Object(_) => Err(format!("{}: cannot bind text to an object", name)),
        Value::String(_) => Ok(Value::String(first.to_string())),
        Value::Null if values.len() > 1 => Ok(Value::Array(
            values.iter().cloned().map(Value::String).collect(),
        )),
        Value::Null => Ok(Value::String(first.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::PageClass;
    use crate::evaluator::PathEvaluator;
    use serde_json::json;

    #[test]
    fn test_parse_bind_expression() {
        let map = parse_bind_expression("items=names var=\"name\" pageVar='owner'").unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map["items"], "names");
        assert_eq!(map["var"], "name");
        assert_eq!(map["pageVar"], "owner");

        let map = parse_bind_expression("user=current.user, title=\"a b, c\"").unwrap();
        assert_eq!(map["user"], "current.user");
        assert_eq!(map["title"], "a b, c");

        assert!(parse_bind_expression("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_bind_expression_rejects_garbage() {
        assert!(parse_bind_expression("items=names garbage").is_err());
        assert!(parse_bind_expression("=x").is_err());
    }

    fn bind(model: Value, request: Request, binder: &PropertyBinder) -> (Value, Vec<String>) {
        let class = PageClass::builder("Form").model(model).build();
        let mut instance = class.instantiate();
        let errors = binder.bind(&request, &mut instance, &PathEvaluator::new());
        (instance.model, errors)
    }

    #[test]
    fn test_binds_with_type_conversion() {
        let model = json!({
            "title": "",
            "age": 0,
            "ratio": 0.5,
            "done": false,
            "tags": [],
            "address": { "city": "" },
            "note": null
        });
        let request = Request::new("/form", "POST").with_query_string(
            "title=Milk&age=42&ratio=0.25&done=on&tags=a&tags=b&address.city=Bern&note=hi&unknown=1",
        );

        let (model, errors) = bind(model, request, &PropertyBinder::new());
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(
            model,
            json!({
                "title": "Milk",
                "age": 42,
                "ratio": 0.25,
                "done": true,
                "tags": ["a", "b"],
                "address": { "city": "Bern" },
                "note": "hi"
            })
        );
    }

    #[test]
    fn test_conversion_errors_are_collected() {
        let request = Request::new("/form", "POST").with_query_string("age=old&done=maybe&address=x");
        let (model, errors) = bind(
            json!({ "age": 1, "done": false, "address": {} }),
            request,
            &PropertyBinder::new(),
        );

        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.starts_with("age: expected a number")));
        assert_eq!(model["age"], 1);
    }

    #[test]
    fn test_skips_discriminator_and_invalid_names() {
        let request = Request::new("/todo", "POST").with_query_string("event=save&a-b=1&title=x");
        let (model, _) = bind(
            json!({ "event": "", "title": "" }),
            request,
            &PropertyBinder::new().skipping("event"),
        );
        assert_eq!(model, json!({ "event": "", "title": "x" }));
    }
}
