use chrono::{DateTime, FixedOffset};
use sqlparser::dialect::{Dialect, MySqlDialect};
use std::sync::Arc;

use super::{Error, Escaper, ParameterPosition, Result, StatementBuilder};
use crate::data_type::DataType;

/// MySQL and MariaDB, with positional `?` placeholders
#[derive(Clone, Debug, Default)]
pub struct MySqlBuilder {
    pub escaper: Option<Arc<dyn Escaper + Send + Sync>>,
}

impl MySqlBuilder {
    pub fn new() -> Self {
        MySqlBuilder::default()
    }

    pub fn with_escaper<E: Escaper + Send + Sync + 'static>(escaper: E) -> Self {
        MySqlBuilder {
            escaper: Some(Arc::new(escaper)),
        }
    }
}

impl StatementBuilder for MySqlBuilder {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn dialect(&self) -> &dyn Dialect {
        &MySqlDialect {}
    }

    fn escaper(&self) -> Option<&(dyn Escaper + Send + Sync)> {
        self.escaper.as_deref()
    }

    fn identifier_quotes(&self) -> (char, char) {
        ('`', '`')
    }

    /// Backslashes are escape characters in MySQL strings
    fn quote_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
    }

    fn timestamp_format(&self) -> &'static str {
        "%Y-%m-%d %H:%M:%S%.f"
    }

    /// `DATETIME` has no offset, timestamps are written in UTC
    fn timestamp_literal(&self, value: &DateTime<FixedOffset>) -> String {
        self.escape_string(&value.naive_utc().format(self.timestamp_format()).to_string())
    }

    fn is_positional(&self) -> bool {
        true
    }

    fn parameter_token(&self, _name: &str, _position: ParameterPosition) -> String {
        "?".to_string()
    }

    fn column_type_name(&self, data_type: DataType) -> Result<String> {
        Ok(match data_type {
            DataType::Boolean => "BOOLEAN",
            DataType::Integer => "BIGINT",
            DataType::Float => "DOUBLE",
            DataType::String => "TEXT",
            DataType::Timestamp => "DATETIME",
            DataType::Binary => "BLOB",
            DataType::Undefined | DataType::Null => return Err(Error::unsupported_type(data_type)),
        }
        .to_string())
    }

    fn auto_increment_clause(&self) -> Option<&'static str> {
        Some("AUTO_INCREMENT")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::Value;
    use sqlparser::parser::Parser;

    #[test]
    fn test_literals() {
        let builder = MySqlBuilder::new();
        let text = builder
            .literal(&Value::from("C:\\temp's"), DataType::String)
            .unwrap();
        assert_eq!(text, "'C:\\\\temp''s'");
        let sql = format!(
            "SELECT {}, {}, {}",
            builder.literal(&Value::from("it's"), DataType::String).unwrap(),
            builder.escape_identifier("select"),
            builder.literal(&Value::from(false), DataType::Boolean).unwrap()
        );
        println!("{sql}");
        assert!(Parser::parse_sql(&MySqlDialect {}, &sql).is_ok());
    }

    #[test]
    fn test_timestamps_in_utc() {
        let builder = MySqlBuilder::new();
        let value = Value::from(DateTime::parse_from_rfc3339("2024-03-01T12:30:00+02:00").unwrap());
        assert_eq!(
            builder.literal(&value, DataType::Timestamp).unwrap(),
            "'2024-03-01 10:30:00'"
        );
        let value = Value::from(DateTime::parse_from_rfc3339("2024-03-01T00:15:00.5-01:00").unwrap());
        assert_eq!(
            builder.literal(&value, DataType::Timestamp).unwrap(),
            "'2024-03-01 01:15:00.500'"
        );
    }

    #[test]
    fn test_tokens() {
        let builder = MySqlBuilder::new();
        assert_eq!(builder.escape_identifier("a`b"), "`a``b`");
        assert!(builder.is_positional());
        assert_eq!(builder.parameter_token("cid", ParameterPosition::new(0, 1)), "?");
        assert_eq!(builder.column_type_name(DataType::Float).unwrap(), "DOUBLE");
    }
}
