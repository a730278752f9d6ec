use sqlparser::dialect::{Dialect, PostgreSqlDialect};
use std::sync::Arc;

use super::{hex, Error, Escaper, ParameterPosition, Result, StatementBuilder};
use crate::data_type::DataType;

/// PostgreSQL, with numbered `$n` placeholders
#[derive(Clone, Debug, Default)]
pub struct PostgreSqlBuilder {
    pub escaper: Option<Arc<dyn Escaper + Send + Sync>>,
}

impl PostgreSqlBuilder {
    pub fn new() -> Self {
        PostgreSqlBuilder::default()
    }

    pub fn with_escaper<E: Escaper + Send + Sync + 'static>(escaper: E) -> Self {
        PostgreSqlBuilder {
            escaper: Some(Arc::new(escaper)),
        }
    }
}

impl StatementBuilder for PostgreSqlBuilder {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn dialect(&self) -> &dyn Dialect {
        &PostgreSqlDialect {}
    }

    fn escaper(&self) -> Option<&(dyn Escaper + Send + Sync)> {
        self.escaper.as_deref()
    }

    fn quote_binary(&self, value: &[u8]) -> String {
        format!("'\\x{}'", hex(value))
    }

    /// The same parameter reuses its number
    fn parameter_token(&self, _name: &str, position: ParameterPosition) -> String {
        format!("${}", position.ordinal)
    }

    fn column_type_name(&self, data_type: DataType) -> Result<String> {
        Ok(match data_type {
            DataType::Boolean => "BOOLEAN",
            DataType::Integer => "BIGINT",
            DataType::Float => "DOUBLE PRECISION",
            DataType::String => "TEXT",
            DataType::Timestamp => "TIMESTAMP WITH TIME ZONE",
            DataType::Binary => "BYTEA",
            DataType::Undefined | DataType::Null => return Err(Error::unsupported_type(data_type)),
        }
        .to_string())
    }

    fn auto_increment_clause(&self) -> Option<&'static str> {
        Some("GENERATED BY DEFAULT AS IDENTITY")
    }
}
