//! # Data types
//!
//! The type tags carried by expressions, literal values and schema columns.
//!

pub mod value;

use serde::{Deserialize, Serialize};
use std::{error, fmt, result, str::FromStr};

pub use value::Value;

// Error management

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    InvalidConversion(String),
    UnknownDataType(String),
}

impl Error {
    pub fn invalid_conversion(from: impl fmt::Display, to: impl fmt::Display) -> Error {
        Error::InvalidConversion(format!("Invalid conversion from {} to {}", from, to))
    }
    pub fn unknown_data_type(name: impl fmt::Display) -> Error {
        Error::UnknownDataType(format!("{} is not a data type", name))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConversion(desc) => writeln!(f, "InvalidConversion: {}", desc),
            Error::UnknownDataType(desc) => writeln!(f, "UnknownDataType: {}", desc),
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;

/// The type tag of a value or an expression
#[derive(
    Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    Undefined,
    Null,
    Boolean,
    Integer,
    Float,
    String,
    Timestamp,
    Binary,
}

impl DataType {
    pub fn is_defined(self) -> bool {
        self != DataType::Undefined
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Integer | DataType::Float)
    }

    /// `self` if defined, else `other`
    pub fn or(self, other: DataType) -> DataType {
        if self.is_defined() {
            self
        } else {
            other
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataType::Undefined => "undefined",
            DataType::Null => "null",
            DataType::Boolean => "boolean",
            DataType::Integer => "integer",
            DataType::Float => "float",
            DataType::String => "string",
            DataType::Timestamp => "timestamp",
            DataType::Binary => "binary",
        })
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "undefined" => Ok(DataType::Undefined),
            "null" => Ok(DataType::Null),
            "bool" | "boolean" => Ok(DataType::Boolean),
            "int" | "integer" | "bigint" => Ok(DataType::Integer),
            "float" | "double" | "real" | "decimal" => Ok(DataType::Float),
            "string" | "text" | "varchar" => Ok(DataType::String),
            "timestamp" | "datetime" | "date" | "time" => Ok(DataType::Timestamp),
            "binary" | "blob" | "bytes" => Ok(DataType::Binary),
            _ => Err(Error::unknown_data_type(s)),
        }
    }
}

/// Objects carrying a data type
pub trait DataTyped {
    /// Return the DataType atached to the object
    fn data_type(&self) -> DataType;

    /// Return whether the object has exactly the given type
    fn has_data_type(&self, data_type: DataType) -> bool {
        self.data_type() == data_type
    }
}
