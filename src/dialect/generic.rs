use sqlparser::dialect::{Dialect, GenericDialect};
use std::sync::Arc;

use super::{Error, Escaper, ParameterPosition, Result, StatementBuilder};
use crate::data_type::DataType;

/// ANSI flavoured SQL with named `:name` placeholders
#[derive(Clone, Debug, Default)]
pub struct GenericBuilder {
    pub escaper: Option<Arc<dyn Escaper + Send + Sync>>,
}

impl GenericBuilder {
    pub fn new() -> Self {
        GenericBuilder::default()
    }

    pub fn with_escaper<E: Escaper + Send + Sync + 'static>(escaper: E) -> Self {
        GenericBuilder {
            escaper: Some(Arc::new(escaper)),
        }
    }
}

impl StatementBuilder for GenericBuilder {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn dialect(&self) -> &dyn Dialect {
        &GenericDialect {}
    }

    fn escaper(&self) -> Option<&(dyn Escaper + Send + Sync)> {
        self.escaper.as_deref()
    }

    fn parameter_token(&self, name: &str, _position: ParameterPosition) -> String {
        format!(":{name}")
    }

    fn column_type_name(&self, data_type: DataType) -> Result<String> {
        Ok(match data_type {
            DataType::Boolean => "BOOLEAN",
            DataType::Integer => "BIGINT",
            DataType::Float => "DOUBLE PRECISION",
            DataType::String => "VARCHAR",
            DataType::Timestamp => "TIMESTAMP WITH TIME ZONE",
            DataType::Binary => "BLOB",
            DataType::Undefined | DataType::Null => {
                return Err(Error::unsupported_type(data_type))
            }
        }
        .to_string())
    }

    fn auto_increment_clause(&self) -> Option<&'static str> {
        Some("GENERATED BY DEFAULT AS IDENTITY")
    }
}
