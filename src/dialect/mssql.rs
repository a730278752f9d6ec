use sqlparser::dialect::{Dialect, MsSqlDialect};
use std::sync::Arc;

use super::{hex, Error, Escaper, ParameterPosition, Result, StatementBuilder};
use crate::data_type::DataType;

/// SQL Server, with named `@name` placeholders
#[derive(Clone, Debug, Default)]
pub struct MsSqlBuilder {
    pub escaper: Option<Arc<dyn Escaper + Send + Sync>>,
}

impl MsSqlBuilder {
    pub fn new() -> Self {
        MsSqlBuilder::default()
    }

    pub fn with_escaper<E: Escaper + Send + Sync + 'static>(escaper: E) -> Self {
        MsSqlBuilder {
            escaper: Some(Arc::new(escaper)),
        }
    }
}

impl StatementBuilder for MsSqlBuilder {
    fn name(&self) -> &'static str {
        "mssql"
    }

    fn dialect(&self) -> &dyn Dialect {
        &MsSqlDialect {}
    }

    fn escaper(&self) -> Option<&(dyn Escaper + Send + Sync)> {
        self.escaper.as_deref()
    }

    fn identifier_quotes(&self) -> (char, char) {
        ('[', ']')
    }

    /// Unicode string literal
    fn quote_string(&self, value: &str) -> String {
        format!("N'{}'", value.replace('\'', "''"))
    }

    fn quote_binary(&self, value: &[u8]) -> String {
        format!("0x{}", hex(value))
    }

    fn boolean_literal(&self, value: bool) -> &'static str {
        if value {
            "1"
        } else {
            "0"
        }
    }

    fn timestamp_format(&self) -> &'static str {
        "%Y-%m-%d %H:%M:%S%.f %:z"
    }

    fn parameter_token(&self, name: &str, _position: ParameterPosition) -> String {
        format!("@{name}")
    }

    fn column_type_name(&self, data_type: DataType) -> Result<String> {
        Ok(match data_type {
            DataType::Boolean => "BIT",
            DataType::Integer => "BIGINT",
            DataType::Float => "FLOAT",
            DataType::String => "NVARCHAR(MAX)",
            DataType::Timestamp => "DATETIMEOFFSET",
            DataType::Binary => "VARBINARY(MAX)",
            DataType::Undefined | DataType::Null => return Err(Error::unsupported_type(data_type)),
        }
        .to_string())
    }

    fn auto_increment_clause(&self) -> Option<&'static str> {
        Some("IDENTITY(1,1)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::Value;

    #[test]
    fn test_tokens() {
        let builder = MsSqlBuilder::new();
        assert_eq!(builder.escape_identifier("a]b"), "[a]]b]");
        assert_eq!(builder.literal(&Value::from("o'k"), DataType::String).unwrap(), "N'o''k'");
        assert_eq!(builder.literal(&Value::binary(vec![10]), DataType::Binary).unwrap(), "0x0A");
        assert_eq!(builder.literal(&Value::from(false), DataType::Undefined).unwrap(), "0");
        assert_eq!(builder.parameter_token("cid", ParameterPosition::new(0, 1)), "@cid");
        assert!(!builder.is_valid_parameter_name("@cid"));
    }
}
