//! # Statement builders
//!
//! A [`StatementBuilder`] is the formatting authority of one SQL dialect:
//! identifier and string quoting, literal syntax, bind parameter placeholders and column types.
//! Builders hold no per-statement state and can be shared between threads.
//!
//! Escaping that requires a live connection (charset aware quoting for instance) is injected
//! as an [`Escaper`].
//!
pub mod generic;
pub mod mssql;
pub mod mysql;
pub mod postgresql;
pub mod sqlite;

use chrono::{DateTime, FixedOffset};
use itertools::Itertools;
use serde::Serialize;
use sqlparser::dialect::Dialect;
use std::{error, fmt, result};

use crate::{
    data_type::{self, DataType, DataTyped, Value},
    expr::Identifier,
    namer,
    schema::Column,
};
pub use generic::GenericBuilder;
pub use mssql::MsSqlBuilder;
pub use mysql::MySqlBuilder;
pub use postgresql::PostgreSqlBuilder;
pub use sqlite::SqliteBuilder;

// Error management

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A parameter name the dialect cannot use, even once normalized
    Parameter(String),
    /// A value the dialect cannot write as a literal of the requested type
    Literal(String),
    Other(String),
}

impl Error {
    pub fn parameter(name: impl fmt::Display) -> Error {
        Error::Parameter(format!("{} cannot be used as a parameter name", name))
    }
    pub fn literal(desc: impl fmt::Display) -> Error {
        Error::Literal(desc.to_string())
    }
    pub fn unsupported_type(data_type: DataType) -> Error {
        Error::Other(format!("No column type for {}", data_type))
    }
    pub fn other(desc: impl fmt::Display) -> Error {
        Error::Other(desc.to_string())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parameter(desc) => writeln!(f, "ParameterError: {}", desc),
            Error::Literal(desc) => writeln!(f, "LiteralError: {}", desc),
            Error::Other(desc) => writeln!(f, "{}", desc),
        }
    }
}

impl From<data_type::Error> for Error {
    fn from(err: data_type::Error) -> Self {
        Error::Literal(err.to_string())
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;

/// Connection backed escaping.
/// Both methods return complete literals, quotes included.
pub trait Escaper: fmt::Debug {
    fn escape_string(&self, value: &str) -> String;
    fn escape_binary(&self, value: &[u8]) -> String;
}

/// Where a placeholder stands in a statement
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, Serialize)]
pub struct ParameterPosition {
    /// Index of this placeholder among all placeholders of the statement, from 0
    pub occurrence: usize,
    /// Index of the parameter among distinct parameters, from 1
    pub ordinal: usize,
}

impl ParameterPosition {
    pub fn new(occurrence: usize, ordinal: usize) -> Self {
        ParameterPosition {
            occurrence,
            ordinal,
        }
    }
}

/// Upper case hexadecimal digits of `value`
pub fn hex(value: &[u8]) -> String {
    value.iter().map(|byte| format!("{:02X}", byte)).join("")
}

/// Characters introducing placeholders in some dialect, never part of a parameter name
const SIGILS: [char; 5] = ['$', '@', '#', ':', '?'];

/// The formatting rules of a SQL dialect
pub trait StatementBuilder: fmt::Debug + Send + Sync {
    /// A short name for logs
    fn name(&self) -> &'static str;

    /// The sqlparser dialect, used for identifier character classes
    fn dialect(&self) -> &dyn Dialect;

    fn escaper(&self) -> Option<&(dyn Escaper + Send + Sync)> {
        None
    }

    /* Identifiers */

    /// Opening and closing identifier quotes
    fn identifier_quotes(&self) -> (char, char) {
        ('"', '"')
    }

    fn escape_identifier(&self, identifier: &str) -> String {
        let (open, close) = self.identifier_quotes();
        let escaped = identifier.replace(close, &format!("{close}{close}"));
        format!("{open}{escaped}{close}")
    }

    /// Quote each segment of a dotted path
    fn escape_path(&self, path: &Identifier) -> String {
        path.iter()
            .map(|segment| self.escape_identifier(segment))
            .join(".")
    }

    /* Literals */

    /// Quote a string, doubling embedded quotes
    fn quote_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    fn escape_string(&self, value: &str) -> String {
        match self.escaper() {
            Some(escaper) => escaper.escape_string(value),
            None => self.quote_string(value),
        }
    }

    fn quote_binary(&self, value: &[u8]) -> String {
        format!("X'{}'", hex(value))
    }

    fn escape_binary(&self, value: &[u8]) -> String {
        match self.escaper() {
            Some(escaper) => escaper.escape_binary(value),
            None => self.quote_binary(value),
        }
    }

    fn boolean_literal(&self, value: bool) -> &'static str {
        if value {
            "TRUE"
        } else {
            "FALSE"
        }
    }

    fn null_literal(&self) -> &'static str {
        "NULL"
    }

    /// The `chrono` format of timestamp literals
    fn timestamp_format(&self) -> &'static str {
        "%Y-%m-%d %H:%M:%S%.f%:z"
    }

    fn timestamp_literal(&self, value: &DateTime<FixedOffset>) -> String {
        self.escape_string(&value.format(self.timestamp_format()).to_string())
    }

    /// Write `value` as a literal of type `data_type`
    fn literal(&self, value: &Value, data_type: DataType) -> Result<String> {
        self.clamped_literal(value, data_type, None, None)
    }

    /// Write `value` as a literal of type `data_type`,
    /// numbers are brought back within `min` and `max` when given
    fn clamped_literal(
        &self,
        value: &Value,
        data_type: DataType,
        min: Option<&Value>,
        max: Option<&Value>,
    ) -> Result<String> {
        let value = clamp(value.cast(data_type)?, min, max)?;
        Ok(match &value {
            Value::Null => self.null_literal().to_string(),
            Value::Boolean(b) => self.boolean_literal(*b).to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) if f.is_finite() => format!("{:?}", f),
            Value::Float(f) => return Err(Error::literal(format!("{} has no literal form", f))),
            Value::Text(t) => self.escape_string(t),
            Value::Timestamp(ts) => self.timestamp_literal(ts),
            Value::Binary(b) => self.escape_binary(b),
        })
    }

    /* Parameters */

    fn is_parameter_start(&self, c: char) -> bool {
        !SIGILS.contains(&c) && self.dialect().is_identifier_start(c)
    }

    fn is_parameter_part(&self, c: char) -> bool {
        !SIGILS.contains(&c) && self.dialect().is_identifier_part(c)
    }

    /// Whether `name` can be written as is in a placeholder
    fn is_valid_parameter_name(&self, name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(c) if self.is_parameter_start(c) => chars.all(|c| self.is_parameter_part(c)),
            _ => false,
        }
    }

    /// A usable name derived from `name`, outside of the names `taken`
    fn normalize_parameter_name(&self, name: &str, taken: &[String]) -> Result<String> {
        let sanitized = namer::sanitize(
            name,
            |c| self.is_parameter_start(c),
            |c| self.is_parameter_part(c),
        );
        let normalized = namer::new_name_outside(sanitized, taken.iter().cloned());
        if self.is_valid_parameter_name(&normalized) {
            Ok(normalized)
        } else {
            Err(Error::parameter(name))
        }
    }

    /// Whether placeholders are bound by position rather than by name
    fn is_positional(&self) -> bool {
        false
    }

    /// The placeholder text of an occurrence of the parameter `name`
    fn parameter_token(&self, name: &str, position: ParameterPosition) -> String;

    /* DDL */

    fn column_type_name(&self, data_type: DataType) -> Result<String>;

    /// The clause making a column auto incremented
    fn auto_increment_clause(&self) -> Option<&'static str> {
        None
    }

    /// `name TYPE [NOT NULL] [DEFAULT value] [auto increment]`
    fn column_definition(&self, column: &Column) -> Result<String> {
        let mut definition = format!(
            "{} {}",
            self.escape_identifier(column.name()),
            self.column_type_name(column.data_type())?
        );
        if !column.is_nullable() {
            definition.push_str(" NOT NULL");
        }
        if let Some(default) = column.default_value() {
            definition.push_str(" DEFAULT ");
            definition.push_str(&self.literal(&default, column.data_type())?);
        }
        if column.is_auto_increment() {
            if let Some(clause) = self.auto_increment_clause() {
                definition.push(' ');
                definition.push_str(clause);
            }
        }
        Ok(definition)
    }

    /* Capabilities */

    /// Call a formatting capability by name, `None` when the builder has no such capability
    fn invoke(&self, name: &str, arguments: &[Value]) -> Option<Result<Value>> {
        let text = |i: usize| match arguments.get(i) {
            Some(Value::Text(t)) => Ok(t.as_str()),
            Some(value) => Err(Error::other(format!("{} is not a text argument", value))),
            None => Err(Error::other(format!("{} expects {} arguments", name, i + 1))),
        };
        let result = match name {
            "escape_string" => text(0).map(|t| self.escape_string(t)),
            "escape_identifier" => text(0).map(|t| self.escape_identifier(t)),
            "escape_path" => text(0).map(|t| self.escape_path(&Identifier::parse(t))),
            "escape_binary" => match arguments.first() {
                Some(Value::Binary(b)) => Ok(self.escape_binary(b)),
                _ => Err(Error::other("escape_binary expects a binary argument")),
            },
            "literal" => match arguments.first() {
                Some(value) => self.literal(value, DataType::Undefined),
                None => Err(Error::other("literal expects 1 argument")),
            },
            "null_literal" => Ok(self.null_literal().to_string()),
            "column_type_name" => text(0)
                .and_then(|t| t.parse::<DataType>().map_err(Error::from))
                .and_then(|data_type| self.column_type_name(data_type)),
            _ => return None,
        };
        Some(result.map(Value::Text))
    }
}

/// Bring numbers back within optional bounds
fn clamp(value: Value, min: Option<&Value>, max: Option<&Value>) -> Result<Value> {
    let bound = |bound: Option<&Value>, data_type| bound.map(|b| b.cast(data_type)).transpose();
    Ok(match value {
        Value::Integer(i) => {
            let mut i = i;
            if let Some(Value::Integer(min)) = bound(min, DataType::Integer)? {
                i = i.max(min);
            }
            if let Some(Value::Integer(max)) = bound(max, DataType::Integer)? {
                i = i.min(max);
            }
            Value::Integer(i)
        }
        Value::Float(f) => {
            let mut f = f;
            if let Some(Value::Float(min)) = bound(min, DataType::Float)? {
                f = f.max(min);
            }
            if let Some(Value::Float(max)) = bound(max, DataType::Float)? {
                f = f.min(max);
            }
            Value::Float(f)
        }
        value => value,
    })
}
