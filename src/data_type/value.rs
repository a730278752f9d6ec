//! # Typed scalar values
//!
//! The values literals hold, with runtime casting between data types.
//! `Display` writes a value in the textual expression syntax so it can be parsed back.
//!

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::Serialize;
use std::fmt;

use super::{DataType, DataTyped, Error, Result};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%:z";

/// A typed scalar
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<FixedOffset>),
    Binary(Vec<u8>),
}

impl Value {
    pub fn null() -> Value {
        Value::Null
    }

    pub fn boolean(value: bool) -> Value {
        Value::Boolean(value)
    }

    pub fn integer(value: i64) -> Value {
        Value::Integer(value)
    }

    pub fn float(value: f64) -> Value {
        Value::Float(value)
    }

    pub fn text<S: Into<String>>(value: S) -> Value {
        Value::Text(value.into())
    }

    pub fn timestamp(value: DateTime<FixedOffset>) -> Value {
        Value::Timestamp(value)
    }

    pub fn binary<B: Into<Vec<u8>>>(value: B) -> Value {
        Value::Binary(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Convert the value into a value of the given type.
    /// `Undefined` keeps the value as is and `Null` propagates.
    pub fn cast(&self, data_type: DataType) -> Result<Value> {
        let failed = || Error::invalid_conversion(self, data_type);
        Ok(match (data_type, self) {
            (DataType::Undefined, value) => value.clone(),
            (_, Value::Null) | (DataType::Null, _) => Value::Null,
            // Boolean
            (DataType::Boolean, Value::Boolean(b)) => Value::Boolean(*b),
            (DataType::Boolean, Value::Integer(i)) => Value::Boolean(*i != 0),
            (DataType::Boolean, Value::Float(f)) => Value::Boolean(*f != 0.),
            (DataType::Boolean, Value::Text(t)) => {
                match t.trim().to_lowercase().as_str() {
                    "true" | "t" | "yes" | "on" | "1" => Value::Boolean(true),
                    "false" | "f" | "no" | "off" | "0" | "" => Value::Boolean(false),
                    _ => return Err(failed()),
                }
            }
            // Integer
            (DataType::Integer, Value::Boolean(b)) => Value::Integer(*b as i64),
            (DataType::Integer, Value::Integer(i)) => Value::Integer(*i),
            (DataType::Integer, Value::Float(f)) => {
                if f.is_finite() && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    Value::Integer(f.trunc() as i64)
                } else {
                    return Err(failed());
                }
            }
            (DataType::Integer, Value::Text(t)) => match t.trim().parse::<i64>() {
                Ok(i) => Value::Integer(i),
                Err(_) => Value::Float(t.trim().parse::<f64>().map_err(|_| failed())?)
                    .cast(DataType::Integer)?,
            },
            (DataType::Integer, Value::Timestamp(ts)) => Value::Integer(ts.timestamp()),
            // Float
            (DataType::Float, Value::Boolean(b)) => Value::Float(if *b { 1. } else { 0. }),
            (DataType::Float, Value::Integer(i)) => Value::Float(*i as f64),
            (DataType::Float, Value::Float(f)) => Value::Float(*f),
            (DataType::Float, Value::Text(t)) => {
                Value::Float(t.trim().parse::<f64>().map_err(|_| failed())?)
            }
            (DataType::Float, Value::Timestamp(ts)) => Value::Float(
                ts.timestamp() as f64 + ts.timestamp_subsec_nanos() as f64 / 1e9,
            ),
            // String
            (DataType::String, Value::Boolean(b)) => Value::Text(b.to_string()),
            (DataType::String, Value::Integer(i)) => Value::Text(i.to_string()),
            (DataType::String, Value::Float(f)) => Value::Text(f.to_string()),
            (DataType::String, Value::Text(t)) => Value::Text(t.clone()),
            (DataType::String, Value::Timestamp(ts)) => {
                Value::Text(ts.format(TIMESTAMP_FORMAT).to_string())
            }
            (DataType::String, Value::Binary(b)) => {
                Value::Text(String::from_utf8(b.clone()).map_err(|_| failed())?)
            }
            // Timestamp
            (DataType::Timestamp, Value::Timestamp(ts)) => Value::Timestamp(*ts),
            (DataType::Timestamp, Value::Integer(i)) => Value::Timestamp(
                DateTime::from_timestamp(*i, 0)
                    .ok_or_else(failed)?
                    .fixed_offset(),
            ),
            (DataType::Timestamp, Value::Float(f)) if f.is_finite() => Value::Timestamp(
                DateTime::from_timestamp(f.floor() as i64, (f.fract().abs() * 1e9) as u32)
                    .ok_or_else(failed)?
                    .fixed_offset(),
            ),
            (DataType::Timestamp, Value::Text(t)) => {
                Value::Timestamp(parse_timestamp(t.trim()).ok_or_else(failed)?)
            }
            // Binary
            (DataType::Binary, Value::Binary(b)) => Value::Binary(b.clone()),
            (DataType::Binary, Value::Text(t)) => Value::Binary(t.as_bytes().to_vec()),
            _ => return Err(failed()),
        })
    }
}

/// Parse the usual textual timestamp forms, naive ones being read as UTC
fn parse_timestamp(text: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(text)
        .or_else(|_| DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z"))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
                .ok()
                .map(|naive| naive.and_utc().fixed_offset())
        })
}

impl DataTyped for Value {
    fn data_type(&self) -> DataType {
        match self {
            Value::Null => DataType::Null,
            Value::Boolean(_) => DataType::Boolean,
            Value::Integer(_) => DataType::Integer,
            Value::Float(_) => DataType::Float,
            Value::Text(_) => DataType::String,
            Value::Timestamp(_) => DataType::Timestamp,
            Value::Binary(_) => DataType::Binary,
        }
    }
}

/// Write a float so that it always reads back as a float
fn float_syntax(value: f64) -> String {
    let text = format!("{:?}", value);
    if text.contains('.') || !value.is_finite() {
        text
    } else if let Some(index) = text.find('e') {
        format!("{}.0{}", &text[..index], &text[index..])
    } else {
        format!("{}.0", text)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", float_syntax(*x)),
            Value::Text(t) => write!(f, "'{}'", t.replace('\'', "''")),
            Value::Timestamp(ts) => write!(f, "#{}#", ts.format(TIMESTAMP_FORMAT)),
            Value::Binary(b) => write!(
                f,
                "X'{}'",
                b.iter().map(|byte| format!("{:02X}", byte)).collect::<String>()
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Value::Timestamp(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Binary(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Value::from(42).to_string(), "42");
        assert_eq!(Value::from(1.0).to_string(), "1.0");
        assert_eq!(Value::from(1e21).to_string(), "1.0e21");
        assert_eq!(Value::from(-0.25).to_string(), "-0.25");
        assert_eq!(Value::from("it's").to_string(), "'it''s'");
        assert_eq!(Value::from(Option::<i64>::None).to_string(), "null");
        assert_eq!(Value::binary(vec![0xca, 0xfe]).to_string(), "X'CAFE'");
        let ts = DateTime::parse_from_rfc3339("2024-03-01T12:30:00+02:00").unwrap();
        assert_eq!(Value::from(ts).to_string(), "#2024-03-01T12:30:00+02:00#");
    }

    #[test]
    fn test_cast() {
        assert_eq!(
            Value::from("12").cast(DataType::Integer).unwrap(),
            Value::Integer(12)
        );
        assert_eq!(
            Value::from("12.7").cast(DataType::Integer).unwrap(),
            Value::Integer(12)
        );
        assert_eq!(
            Value::from(3).cast(DataType::Float).unwrap(),
            Value::Float(3.)
        );
        assert_eq!(
            Value::from("yes").cast(DataType::Boolean).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            Value::Null.cast(DataType::Integer).unwrap(),
            Value::Null
        );
        assert_eq!(
            Value::from(0).cast(DataType::Timestamp).unwrap().to_string(),
            "#1970-01-01T00:00:00+00:00#"
        );
        assert_eq!(
            Value::from("2024-01-02 03:04:05")
                .cast(DataType::Timestamp)
                .unwrap()
                .cast(DataType::String)
                .unwrap(),
            Value::from("2024-01-02T03:04:05+00:00")
        );
        assert!(Value::from("abc").cast(DataType::Integer).is_err());
        assert!(Value::from(true).cast(DataType::Binary).is_err());
        println!("{}", Value::from(f64::NAN).cast(DataType::Integer).unwrap_err());
    }
}
