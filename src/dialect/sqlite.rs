use sqlparser::dialect::{Dialect, SQLiteDialect};
use std::sync::Arc;

use super::{Error, Escaper, ParameterPosition, Result, StatementBuilder};
use crate::data_type::DataType;

/// SQLite, with named `:name` placeholders and numeric booleans
#[derive(Clone, Debug, Default)]
pub struct SqliteBuilder {
    pub escaper: Option<Arc<dyn Escaper + Send + Sync>>,
}

impl SqliteBuilder {
    pub fn new() -> Self {
        SqliteBuilder::default()
    }

    pub fn with_escaper<E: Escaper + Send + Sync + 'static>(escaper: E) -> Self {
        SqliteBuilder {
            escaper: Some(Arc::new(escaper)),
        }
    }
}

impl StatementBuilder for SqliteBuilder {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn dialect(&self) -> &dyn Dialect {
        &SQLiteDialect {}
    }

    fn escaper(&self) -> Option<&(dyn Escaper + Send + Sync)> {
        self.escaper.as_deref()
    }

    fn boolean_literal(&self, value: bool) -> &'static str {
        if value {
            "1"
        } else {
            "0"
        }
    }

    fn parameter_token(&self, name: &str, _position: ParameterPosition) -> String {
        format!(":{name}")
    }

    /// Storage classes
    fn column_type_name(&self, data_type: DataType) -> Result<String> {
        Ok(match data_type {
            DataType::Boolean | DataType::Integer => "INTEGER",
            DataType::Float => "REAL",
            DataType::String | DataType::Timestamp => "TEXT",
            DataType::Binary => "BLOB",
            DataType::Undefined | DataType::Null => return Err(Error::unsupported_type(data_type)),
        }
        .to_string())
    }
}
