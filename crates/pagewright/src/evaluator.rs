// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Expression evaluation against bound page models.
//!
//! Widgets never inspect page models directly; they go through an
//! [`Evaluator`], which reads and writes expressions against a bound
//! `serde_json::Value`. [`PathEvaluator`] is the built-in implementation.
//!
//! # Expression Language
//!
//! ```text
//! user.name              property path
//! items[0].title         index into arrays
//! "text" 'text' 42 true  literals
//! !user.admin            negation
//! a == b, a != b         equality
//! a && b, a || b         boolean logic
//! (a || b) && c          grouping
//! ```
//!
//! `!` binds tightest, then `==`/`!=`, then `&&`, then `||`.
//! Missing properties and paths through `null` evaluate to `null`.
//! Reaching into a string, number or boolean is an error.

use crate::error::{PagewrightError, Result};
use lazy_static::lazy_static;
use lru::LruCache;
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::Parser;
use pest_derive::Parser;
use serde_json::{Map, Value};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Reads and writes expressions against bound objects.
pub trait Evaluator: Send + Sync + fmt::Debug {
    /// Evaluates `expression` against `bound`.
    fn evaluate(&self, expression: &str, bound: &Value) -> Result<Value>;

    /// Writes `value` to the location named by `expression` inside `bound`.
    fn write(&self, expression: &str, bound: &mut Value, value: Value) -> Result<()>;
}

/// Returns the template text for a value: strings unquoted, null empty.
pub fn to_display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Truthiness used by `!`, `&&` and `||`.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Returns true if `name` is a dotted identifier path such as `user.address.city`.
pub fn is_property_path(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

#[derive(Parser)]
#[grammar = "expression.pest"]
struct ExpressionParser;

lazy_static! {
    // Loosest binding first.
    static ref PRATT: PrattParser<Rule> = PrattParser::new()
        .op(Op::infix(Rule::or, Assoc::Left))
        .op(Op::infix(Rule::and, Assoc::Left))
        .op(Op::infix(Rule::eq, Assoc::Left) | Op::infix(Rule::ne, Assoc::Left))
        .op(Op::prefix(Rule::not));
}

/// Default number of compiled expressions kept by a [`PathEvaluator`].
pub const DEFAULT_EXPRESSION_CACHE: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
enum Step {
    Key(String),
    Index(usize),
}

/// A compiled expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr(Node);

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Literal(Value),
    Path(Vec<Step>),
    Not(Box<Node>),
    Eq(Box<Node>, Box<Node>),
    NotEq(Box<Node>, Box<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
}

/// Parses `source` into an expression tree.
fn parse(source: &str) -> Result<Expr> {
    let expression = ExpressionParser::parse(Rule::expression, source)
        .map_err(|e| PagewrightError::evaluation(source, e.variant.message()))?
        .next()
        .ok_or_else(|| PagewrightError::evaluation(source, "empty expression"))?;

    let expr = expression
        .into_inner()
        .find(|pair| pair.as_rule() == Rule::expr)
        .ok_or_else(|| PagewrightError::evaluation(source, "empty expression"))?;

    build(source, expr.into_inner()).map(Expr)
}

fn build(source: &str, pairs: Pairs<Rule>) -> Result<Node> {
    PRATT
        .map_primary(|primary| build_primary(source, primary))
        .map_prefix(|op, rhs| match op.as_rule() {
            Rule::not => Ok(Node::Not(Box::new(rhs?))),
            rule => Err(PagewrightError::evaluation(source, format!("unexpected {:?}", rule))),
        })
        .map_infix(|lhs, op, rhs| {
            let (lhs, rhs) = (Box::new(lhs?), Box::new(rhs?));
            match op.as_rule() {
                Rule::or => Ok(Node::Or(lhs, rhs)),
                Rule::and => Ok(Node::And(lhs, rhs)),
                Rule::eq => Ok(Node::Eq(lhs, rhs)),
                Rule::ne => Ok(Node::NotEq(lhs, rhs)),
                rule => Err(PagewrightError::evaluation(source, format!("unexpected {:?}", rule))),
            }
        })
        .parse(pairs)
}

fn build_primary(source: &str, pair: Pair<Rule>) -> Result<Node> {
    match pair.as_rule() {
        Rule::expr => build(source, pair.into_inner()),
        Rule::string => Ok(Node::Literal(Value::String(unescape(&pair)))),
        Rule::boolean => Ok(Node::Literal(Value::Bool(pair.as_str() == "true"))),
        Rule::null => Ok(Node::Literal(Value::Null)),
        Rule::number => {
            let text = pair.as_str();
            let n = text
                .parse::<f64>()
                .map_err(|_| PagewrightError::evaluation(source, format!("invalid number {:?}", text)))?;
            Ok(Node::Literal(number_value(n, text)))
        }
        Rule::path => {
            let steps = pair
                .into_inner()
                .map(|step| match step.as_rule() {
                    Rule::index => step.as_str().parse::<usize>().map(Step::Index).map_err(|_| {
                        PagewrightError::evaluation(source, format!("invalid index {}", step.as_str()))
                    }),
                    Rule::string => Ok(Step::Key(unescape(&step))),
                    _ => Ok(Step::Key(step.as_str().to_string())),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Node::Path(steps))
        }
        rule => Err(PagewrightError::evaluation(source, format!("unexpected {:?}", rule))),
    }
}

/// Body of a string literal with `\x` escapes resolved to `x`.
fn unescape(pair: &Pair<Rule>) -> String {
    let raw = pair.clone().into_inner().next().map(|inner| inner.as_str()).unwrap_or("");
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            c => out.push(c),
        }
    }
    out
}

fn number_value(n: f64, text: &str) -> Value {
    if let Ok(i) = text.parse::<i64>() {
        return Value::from(i);
    }
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

/// The built-in [`Evaluator`] over `serde_json::Value` models.
///
/// Expressions are compiled on first use and kept in an LRU cache, so a
/// template renders without re-parsing its expressions.
#[derive(Clone)]
pub struct PathEvaluator {
    compiled: Arc<Mutex<LruCache<String, Arc<Expr>>>>,
}

impl PathEvaluator {
    /// Creates a new evaluator.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EXPRESSION_CACHE)
    }

    /// Creates an evaluator keeping at most `capacity` compiled expressions.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            compiled: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    /// Compiles `expression`, reusing the cached tree when there is one.
    pub fn compile(&self, expression: &str) -> Result<Arc<Expr>> {
        if let Some(expr) = self.lock().get(expression) {
            return Ok(expr.clone());
        }

        let expr = Arc::new(parse(expression)?);
        self.lock().put(expression.to_string(), expr.clone());
        Ok(expr)
    }

    /// Number of cached compiled expressions.
    pub fn compiled_len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, Arc<Expr>>> {
        self.compiled.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn eval(&self, source: &str, node: &Node, bound: &Value) -> Result<Value> {
        match node {
            Node::Literal(value) => Ok(value.clone()),
            Node::Path(steps) => read_path(source, steps, bound),
            Node::Not(inner) => Ok(Value::Bool(!is_truthy(&self.eval(source, inner, bound)?))),
            Node::Eq(a, b) => Ok(Value::Bool(values_equal(
                &self.eval(source, a, bound)?,
                &self.eval(source, b, bound)?,
            ))),
            Node::NotEq(a, b) => Ok(Value::Bool(!values_equal(
                &self.eval(source, a, bound)?,
                &self.eval(source, b, bound)?,
            ))),
            Node::And(a, b) => {
                if !is_truthy(&self.eval(source, a, bound)?) {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(is_truthy(&self.eval(source, b, bound)?)))
            }
            Node::Or(a, b) => {
                if is_truthy(&self.eval(source, a, bound)?) {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(is_truthy(&self.eval(source, b, bound)?)))
            }
        }
    }
}

fn read_path(source: &str, steps: &[Step], bound: &Value) -> Result<Value> {
    let mut current = bound;
    for step in steps {
        current = match (current, step) {
            (Value::Null, _) => return Ok(Value::Null),
            (Value::Object(map), Step::Key(key)) => match map.get(key) {
                Some(value) => value,
                None => return Ok(Value::Null),
            },
            (Value::Array(items), Step::Index(i)) => match items.get(*i) {
                Some(value) => value,
                None => return Ok(Value::Null),
            },
            (Value::Array(items), Step::Key(key)) if key == "length" || key == "size" => {
                return Ok(Value::from(items.len()));
            }
            (other, step) => {
                return Err(PagewrightError::evaluation(
                    source,
                    format!("cannot read {:?} from {}", step, type_name(other)),
                ));
            }
        };
    }
    Ok(current.clone())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl Default for PathEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PathEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathEvaluator")
            .field("compiled", &self.compiled_len())
            .finish()
    }
}

impl Evaluator for PathEvaluator {
    fn evaluate(&self, expression: &str, bound: &Value) -> Result<Value> {
        let expr = self.compile(expression)?;
        self.eval(expression, &expr.0, bound)
    }

    fn write(&self, expression: &str, bound: &mut Value, value: Value) -> Result<()> {
        let expr = self.compile(expression)?;
        let Node::Path(steps) = &expr.0 else {
            return Err(PagewrightError::evaluation(expression, "only property paths can be written"));
        };

        let Some((last, parents)) = steps.split_last() else {
            return Err(PagewrightError::evaluation(expression, "empty path"));
        };

        let mut current = bound;
        for step in parents {
            if current.is_null() {
                *current = Value::Object(Map::new());
            }
            current = match (current, step) {
                (Value::Object(map), Step::Key(key)) => map
                    .entry(key.clone())
                    .or_insert_with(|| Value::Object(Map::new())),
                (Value::Array(items), Step::Index(i)) => {
                    items.get_mut(*i).ok_or_else(|| {
                        PagewrightError::evaluation(expression, format!("index {} out of bounds", i))
                    })?
                }
                (other, step) => {
                    return Err(PagewrightError::evaluation(
                        expression,
                        format!("cannot write {:?} into {}", step, type_name(other)),
                    ));
                }
            };
        }

        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        match (current, last) {
            (Value::Object(map), Step::Key(key)) => {
                map.insert(key.clone(), value);
                Ok(())
            }
            (Value::Array(items), Step::Index(i)) => match items.get_mut(*i) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(PagewrightError::evaluation(
                    expression,
                    format!("index {} out of bounds", i),
                )),
            },
            (other, step) => Err(PagewrightError::evaluation(
                expression,
                format!("cannot write {:?} into {}", step, type_name(other)),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval(expr: &str, bound: &Value) -> Value {
        PathEvaluator::new().evaluate(expr, bound).unwrap()
    }

    #[test]
    fn test_property_paths() {
        let model = json!({ "user": { "name": "Ann", "tags": ["a", "b"] } });
        assert_eq!(eval("user.name", &model), json!("Ann"));
        assert_eq!(eval("user.tags[1]", &model), json!("b"));
        assert_eq!(eval("user.tags.0", &model), json!("a"));
        assert_eq!(eval("user.tags.length", &model), json!(2));
        assert_eq!(eval("user.missing", &model), Value::Null);
        assert_eq!(eval("nobody.name", &model), Value::Null);
    }

    #[test]
    fn test_literals_and_logic() {
        let model = json!({ "admin": false, "count": 3, "name": "Bob" });
        assert_eq!(eval("!admin", &model), json!(true));
        assert_eq!(eval("count == 3", &model), json!(true));
        assert_eq!(eval("count == 3.0", &model), json!(true));
        assert_eq!(eval("name != 'Bob'", &model), json!(false));
        assert_eq!(eval("admin || count", &model), json!(true));
        assert_eq!(eval("(admin || name == \"Bob\") && count", &model), json!(true));
        assert_eq!(eval("-2", &model), json!(-2));
        assert_eq!(eval("null", &model), Value::Null);
    }

    #[test]
    fn test_operator_precedence() {
        let model = json!({ "a": true, "b": false, "c": false, "n": 1 });
        // && binds tighter than ||
        assert_eq!(eval("a || b && c", &model), json!(true));
        assert_eq!(eval("(a || b) && c", &model), json!(false));
        // == binds tighter than &&, ! tighter than ==
        assert_eq!(eval("a && n == 1", &model), json!(true));
        assert_eq!(eval("!b == a", &model), json!(true));
        assert_eq!(eval("!!a", &model), json!(true));
        assert_eq!(eval("map[\"a b\"]", &json!({ "map": { "a b": 7 } })), json!(7));
        assert_eq!(eval(r#"'it\'s'"#, &Value::Null), json!("it's"));
    }

    #[test]
    fn test_expressions_compile_once() {
        let evaluator = PathEvaluator::new();
        let model = json!({ "user": { "name": "Ann" } });

        let first = evaluator.compile("user.name").unwrap();
        for _ in 0..3 {
            assert_eq!(evaluator.evaluate("user.name", &model).unwrap(), json!("Ann"));
        }
        let again = evaluator.compile("user.name").unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(evaluator.compiled_len(), 1);

        // Clones share the cache, failed parses are not cached.
        let clone = evaluator.clone();
        assert!(clone.evaluate("user ==", &model).is_err());
        clone.evaluate("!user", &model).unwrap();
        assert_eq!(evaluator.compiled_len(), 2);
    }

    #[test]
    fn test_cache_is_bounded() {
        let evaluator = PathEvaluator::with_capacity(2);
        for name in ["a", "b", "c"] {
            evaluator.evaluate(name, &Value::Null).unwrap();
        }
        assert_eq!(evaluator.compiled_len(), 2);
    }

    #[test]
    fn test_reading_into_scalar_is_error() {
        let model = json!({ "name": "Ann" });
        let err = PathEvaluator::new().evaluate("name.first", &model).unwrap_err();
        assert!(matches!(err, PagewrightError::EvaluationError { .. }));
    }

    #[test]
    fn test_syntax_errors() {
        let evaluator = PathEvaluator::new();
        assert!(evaluator.evaluate("a = b", &Value::Null).is_err());
        assert!(evaluator.evaluate("a &", &Value::Null).is_err());
        assert!(evaluator.evaluate("'open", &Value::Null).is_err());
        assert!(evaluator.evaluate("", &Value::Null).is_err());
        assert!(evaluator.evaluate("a b", &Value::Null).is_err());
    }

    #[test]
    fn test_write_creates_intermediate_objects() {
        let evaluator = PathEvaluator::new();
        let mut model = json!({});
        evaluator.write("address.city", &mut model, json!("Bern")).unwrap();
        assert_eq!(model, json!({ "address": { "city": "Bern" } }));

        let mut list = json!({ "items": [1, 2] });
        evaluator.write("items[1]", &mut list, json!(5)).unwrap();
        assert_eq!(list["items"], json!([1, 5]));
        assert!(evaluator.write("items[9]", &mut list, json!(0)).is_err());
        assert!(evaluator.write("!items", &mut list, json!(0)).is_err());
    }

    #[test]
    fn test_is_property_path() {
        assert!(is_property_path("user.name"));
        assert!(is_property_path("_x1"));
        assert!(!is_property_path("1abc"));
        assert!(!is_property_path("a..b"));
        assert!(!is_property_path("a-b"));
    }

    #[test]
    fn test_display_and_truthiness() {
        assert_eq!(to_display(&json!("x")), "x");
        assert_eq!(to_display(&Value::Null), "");
        assert_eq!(to_display(&json!(4)), "4");
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!([])));
    }
}
