//! # Evaluator
//!
//! Normalize heterogeneous input into an [`Expr`]:
//! - native scalars become literals,
//! - a mapping `{column: value}` is an equality, several entries are chained with `AND`,
//! - a mapping `{operator: [operands]}` is the Polish form of an operation,
//!   a key ending with `()` is a function call,
//! - a list is evaluated element-wise,
//! - a string is parsed with the textual [`grammar`].
//!
pub mod grammar;
pub mod operators;

use chrono::{DateTime, FixedOffset};
use log::debug;
use std::{error, fmt, result};

use crate::{
    data_type::{self, Value},
    expr::{self, Expr, Identifier},
};
pub use operators::{Arity, Boundary, Constructor, OperatorEntry, Operators};

// Error management

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed textual expression
    Parse { fragment: String, offset: usize },
    /// Unknown operator or input of the wrong shape
    Evaluation(String),
}

impl Error {
    pub fn parse(fragment: impl fmt::Display, offset: usize) -> Error {
        Error::Parse {
            fragment: fragment.to_string(),
            offset,
        }
    }
    pub fn evaluation(desc: impl fmt::Display) -> Error {
        Error::Evaluation(desc.to_string())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse { fragment, offset } => {
                writeln!(f, "ParseError: unexpected `{}` at offset {}", fragment, offset)
            }
            Error::Evaluation(desc) => writeln!(f, "EvaluationError: {}", desc),
        }
    }
}

impl error::Error for Error {}

impl From<expr::Error> for Error {
    fn from(err: expr::Error) -> Self {
        Error::Evaluation(err.to_string())
    }
}

impl From<data_type::Error> for Error {
    fn from(err: data_type::Error) -> Self {
        Error::Evaluation(err.to_string())
    }
}

pub type Result<T> = result::Result<T, Error>;

/// The inputs an evaluator accepts
#[derive(Clone, Debug, PartialEq)]
pub enum Evaluable {
    /// An already built expression, kept as is
    Expr(Expr),
    /// A native scalar
    Value(Value),
    /// A textual expression
    Text(String),
    List(Vec<Evaluable>),
    /// Ordered entries
    Map(Vec<(String, Evaluable)>),
}

impl Evaluable {
    /// A short name of the input shape
    pub fn kind(&self) -> &'static str {
        match self {
            Evaluable::Expr(_) => "expression",
            Evaluable::Value(_) => "value",
            Evaluable::Text(_) => "text",
            Evaluable::List(_) => "list",
            Evaluable::Map(_) => "map",
        }
    }

    /// A mapping from its entries
    pub fn map<K: Into<String>, V: Into<Evaluable>, I: IntoIterator<Item = (K, V)>>(
        entries: I,
    ) -> Evaluable {
        Evaluable::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    pub fn list<V: Into<Evaluable>, I: IntoIterator<Item = V>>(items: I) -> Evaluable {
        Evaluable::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for Evaluable {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Evaluable::Value(Value::Null),
            serde_json::Value::Bool(b) => Evaluable::Value(Value::Boolean(b)),
            serde_json::Value::Number(n) => Evaluable::Value(match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n.as_f64().map_or(Value::Null, Value::Float),
            }),
            serde_json::Value::String(s) => Evaluable::Text(s),
            serde_json::Value::Array(items) => Evaluable::list(items),
            serde_json::Value::Object(entries) => Evaluable::map(entries),
        }
    }
}

impl From<Expr> for Evaluable {
    fn from(expr: Expr) -> Self {
        Evaluable::Expr(expr)
    }
}

impl From<Value> for Evaluable {
    fn from(value: Value) -> Self {
        Evaluable::Value(value)
    }
}

impl From<&str> for Evaluable {
    fn from(text: &str) -> Self {
        Evaluable::Text(text.to_string())
    }
}

impl From<String> for Evaluable {
    fn from(text: String) -> Self {
        Evaluable::Text(text)
    }
}

impl<T: Into<Evaluable>> From<Vec<T>> for Evaluable {
    fn from(items: Vec<T>) -> Self {
        Evaluable::list(items)
    }
}

/// Scalars are values
macro_rules! impl_value_conversions {
    ( $( $Type:ty ),* ) => {
        $(impl From<$Type> for Evaluable {
            fn from(value: $Type) -> Self {
                Evaluable::Value(value.into())
            }
        })*
    };
}

impl_value_conversions!(bool, i32, i64, f64, DateTime<FixedOffset>);

/// Builds expressions from `Evaluable` inputs with a given set of operators
#[derive(Clone, Debug, Default)]
pub struct Evaluator {
    operators: Operators,
}

impl Evaluator {
    /// An evaluator with the standard operators
    pub fn new() -> Self {
        Evaluator::default()
    }

    /// An evaluator with custom operator tables
    pub fn with_operators(operators: Operators) -> Self {
        Evaluator { operators }
    }

    pub fn operators(&self) -> &Operators {
        &self.operators
    }

    /// Evaluate any input into an expression
    pub fn evaluate<E: Into<Evaluable>>(&self, input: E) -> Result<Expr> {
        match input.into() {
            Evaluable::Expr(expr) => Ok(expr),
            Evaluable::Value(value) => Ok(Expr::val(value)),
            Evaluable::Text(text) => self.parse(&text),
            Evaluable::List(items) => Ok(Expr::list(
                items
                    .into_iter()
                    .map(|item| self.evaluate(item))
                    .collect::<Result<Vec<_>>>()?,
            )),
            Evaluable::Map(entries) => self.evaluate_map(entries),
        }
    }

    /// Parse a textual expression
    pub fn parse(&self, text: &str) -> Result<Expr> {
        grammar::parse(text, &self.operators)
    }

    /// Evaluate each entry of a mapping and chain them with `AND`
    fn evaluate_map(&self, entries: Vec<(String, Evaluable)>) -> Result<Expr> {
        if entries.is_empty() {
            return Err(Error::evaluation("cannot evaluate an empty map"));
        }
        let exprs = entries
            .into_iter()
            .map(|(key, value)| self.evaluate_entry(key, value))
            .collect::<Result<Vec<_>>>()?;
        Expr::and_iter(exprs).ok_or_else(|| Error::evaluation("cannot evaluate an empty map"))
    }

    fn evaluate_entry(&self, key: String, value: Evaluable) -> Result<Expr> {
        match value {
            Evaluable::List(operands) => self.polish(&key, operands),
            map @ Evaluable::Map(_) => self.polish(&key, vec![map]),
            value => Ok(Expr::eq(
                Expr::col(Identifier::parse(&key)),
                self.evaluate(value)?,
            )),
        }
    }

    /// Apply the operator or the function named `key` to its operands
    pub fn polish(&self, key: &str, operands: Vec<Evaluable>) -> Result<Expr> {
        let operands = operands
            .into_iter()
            .map(|operand| self.evaluate(operand))
            .collect::<Result<Vec<_>>>()?;
        if let Some(name) = key.strip_suffix("()") {
            debug!("Function call {name} with {} arguments", operands.len());
            return Ok(Expr::function(name, operands));
        }
        let token = key.trim().to_lowercase();
        match self.operators.polish(&token, operands.len()) {
            Some(constructor) => constructor(operands),
            None => Err(Error::evaluation(format!(
                "no operator `{}` taking {} operands",
                token,
                operands.len()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::{DataType, DataTyped};
    use serde_json::json;

    #[test]
    fn test_native_values() {
        let evaluator = Evaluator::new();
        assert_eq!(evaluator.evaluate(json!(null)).unwrap(), Expr::null());
        assert_eq!(evaluator.evaluate(true).unwrap(), Expr::val(true));
        assert_eq!(evaluator.evaluate(json!(12)).unwrap(), Expr::val(12));
        assert_eq!(evaluator.evaluate(json!(1.5)).unwrap(), Expr::val(1.5));
        let ts = DateTime::parse_from_rfc3339("2024-03-01T12:30:00+02:00").unwrap();
        let expr = evaluator.evaluate(ts).unwrap();
        assert_eq!(expr.data_type(), DataType::Timestamp);
    }

    #[test]
    fn test_literal_round_trip() {
        let evaluator = Evaluator::new();
        let values = [
            Value::from(0),
            Value::from(-17),
            Value::from(i64::MAX),
            Value::from(3.25),
            Value::from(-1e-7),
            Value::from(1e21),
            Value::from("plain"),
            Value::from("O'Reilly"),
            Value::from(true),
            Value::from(false),
            Value::from(DateTime::parse_from_rfc3339("2024-03-01T12:30:00+02:00").unwrap()),
            Value::from(DateTime::parse_from_rfc3339("1999-12-31T23:59:59.5-05:30").unwrap()),
            Value::binary(vec![0x00, 0xff, 0x1a]),
        ];
        for value in values {
            let text = value.to_string();
            println!("{text}");
            let expr = evaluator.evaluate(text.as_str()).unwrap();
            assert_eq!(expr, Expr::val(value.clone()));
            assert_eq!(expr.data_type(), value.data_type());
        }
    }

    #[test]
    fn test_implicit_and() {
        let evaluator = Evaluator::new();
        let expr = evaluator.evaluate(json!({"a": 1, "b": 2})).unwrap();
        assert_eq!(
            expr,
            Expr::and(Expr::eq(Expr::col("a"), 1), Expr::eq(Expr::col("b"), 2))
        );
        assert_eq!(expr.data_type(), DataType::Boolean);
        let expr = evaluator
            .evaluate(json!({"a": 1, "b": 2, "c.d": null}))
            .unwrap();
        assert_eq!(expr.to_string(), "a = 1 AND b = 2 AND c.d = null");
        assert!(evaluator.evaluate(json!({})).is_err());
    }

    #[test]
    fn test_polish() {
        let evaluator = Evaluator::new();
        let expr = evaluator.evaluate(json!({"<": ["price", 10]})).unwrap();
        assert_eq!(expr, Expr::lt(Expr::col("price"), 10));
        let expr = evaluator
            .evaluate(json!({"BETWEEN": ["price", 1, 10]}))
            .unwrap();
        assert_eq!(expr.to_string(), "price BETWEEN 1 AND 10");
        let expr = evaluator.evaluate(json!({"in": ["id", [1, 2, 3]]})).unwrap();
        assert_eq!(expr.to_string(), "id IN (1, 2, 3)");
        let expr = evaluator.evaluate(json!({"in": ["id", 1, 2]})).unwrap();
        assert_eq!(expr.to_string(), "id IN (1, 2)");
        let expr = evaluator
            .evaluate(json!({"or": ["a", "b", "c"]}))
            .unwrap();
        assert_eq!(expr.to_string(), "a OR b OR c");
        // Nested logical operations stay grouped
        let expr = evaluator
            .evaluate(json!({"status": 1, "or": [{"and": ["a", "b"]}, "c"]}))
            .unwrap();
        assert_eq!(expr.to_string(), "status = 1 AND (a AND b OR c)");
        let expr = evaluator
            .evaluate(json!({"*": [{"+": ["a", 1]}, 2]}))
            .unwrap();
        assert_eq!(expr.to_string(), "(a + 1) * 2");
        let expr = evaluator
            .evaluate(json!({"-": ["a", {"-": ["b", "c"]}]}))
            .unwrap();
        assert_eq!(expr.to_string(), "a - (b - c)");
        let expr = evaluator
            .evaluate(json!({"not": [{"and": ["a", "b"]}]}))
            .unwrap();
        assert_eq!(expr.to_string(), "NOT (a AND b)");
        let expr = evaluator.evaluate(json!({"-": [{"-": [-5]}]})).unwrap();
        assert_eq!(expr.to_string(), "-(-(-5))");
        let expr = evaluator.evaluate(json!({"not": {"a": 1}})).unwrap();
        assert_eq!(expr, Expr::not(Expr::eq(Expr::col("a"), 1)));
        let expr = evaluator.evaluate(json!({"-": ["a"]})).unwrap();
        assert_eq!(expr, Expr::opposite(Expr::col("a")));
        let expr = evaluator
            .evaluate(json!({"CONCAT()": ["first_name", "' '", "last_name"]}))
            .unwrap();
        assert_eq!(expr.to_string(), "CONCAT(first_name, ' ', last_name)");
        let expr = evaluator.evaluate(json!({"now()": []})).unwrap();
        assert_eq!(expr.to_string(), "now()");
    }

    #[test]
    fn test_polish_errors() {
        let evaluator = Evaluator::new();
        let error = evaluator.evaluate(json!({"<": ["a", 1, 2]})).unwrap_err();
        println!("{error}");
        assert!(matches!(error, Error::Evaluation(_)));
        assert!(evaluator.evaluate(json!({"frobnicate": ["a"]})).is_err());
        assert!(evaluator.evaluate(json!({"and": ["a"]})).is_err());
        let error = evaluator.evaluate(json!({"=": ["a", "'x"]})).unwrap_err();
        assert!(matches!(error, Error::Parse { .. }));
    }

    #[test]
    fn test_list_and_expr() {
        let evaluator = Evaluator::new();
        let expr = evaluator.evaluate(json!([1, "a", "'b'"])).unwrap();
        assert_eq!(
            expr,
            Expr::list(vec![Expr::val(1), Expr::col("a"), Expr::val("b")])
        );
        let built = Expr::is_null(Expr::col("x"));
        assert_eq!(evaluator.evaluate(built.clone()).unwrap(), built);
    }

    #[test]
    fn test_custom_operators() {
        fn similar(operands: Vec<Expr>) -> Result<Expr> {
            Ok(Expr::function("similarity", operands))
        }
        let operators =
            Operators::default().with_binary("~~", similar, Boundary::NONE);
        let evaluator = Evaluator::with_operators(operators);
        let expr = evaluator.evaluate("name ~~ 'bob'").unwrap();
        assert_eq!(expr.to_string(), "similarity(name, 'bob')");
        assert!(Evaluator::with_operators(Operators::empty())
            .evaluate("a = 1")
            .is_err());
    }
}
