use std::{fmt, ops, vec};

use super::{Error, Result};
use crate::{builder::With, hierarchy::Path};

/// A dotted path such as `namespace.table.column`
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Identifier(Vec<String>);

impl Identifier {
    /// An empty identifier
    pub fn empty() -> Self {
        Identifier(Vec::new())
    }

    /// Split a dotted path into its segments
    pub fn parse(path: &str) -> Self {
        if path.is_empty() {
            Identifier::empty()
        } else {
            path.split('.').collect()
        }
    }

    pub fn from_name<S: Into<String>>(name: S) -> Identifier {
        Identifier(vec![name.into()])
    }

    pub fn from_qualified_name<S: Into<String>>(path: S, name: S) -> Identifier {
        Identifier(vec![path.into(), name.into()])
    }

    /// The segments of the path
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The last segment
    pub fn name(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// The path without its last segment
    pub fn parent(&self) -> Identifier {
        match self.0.split_last() {
            Some((_, parent)) => Identifier(parent.to_vec()),
            None => Identifier::empty(),
        }
    }

    /// Return the first element
    pub fn head(&self) -> Result<String> {
        self.0
            .first()
            .cloned()
            .ok_or_else(|| Error::invalid_expression("Identifier too short"))
    }

    /// Return the tail
    pub fn tail(&self) -> Result<Identifier> {
        Ok(self
            .0
            .split_first()
            .ok_or(Error::invalid_expression("Identifier too short"))?
            .1
            .iter()
            .collect())
    }
}

impl With<String> for Identifier {
    fn with(self, input: String) -> Self {
        let mut result = self.0;
        result.push(input);
        Identifier(result)
    }
}

impl From<&str> for Identifier {
    fn from(path: &str) -> Self {
        Identifier::parse(path)
    }
}

impl From<String> for Identifier {
    fn from(path: String) -> Self {
        Identifier::parse(&path)
    }
}

impl From<Vec<String>> for Identifier {
    fn from(qualified_name: Vec<String>) -> Self {
        Identifier(qualified_name)
    }
}

impl<const N: usize> From<[&str; N]> for Identifier {
    fn from(qualified_name: [&str; N]) -> Self {
        Identifier(qualified_name.into_iter().map(String::from).collect())
    }
}

impl<S: Into<String>> FromIterator<S> for Identifier {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Identifier(iter.into_iter().map(|s| s.into()).collect())
    }
}

impl IntoIterator for Identifier {
    type Item = String;
    type IntoIter = vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl ops::Deref for Identifier {
    type Target = Vec<String>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[String]> for Identifier {
    fn as_ref(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.join("."))
    }
}

impl Path for Identifier {
    fn path(self) -> Vec<String> {
        self.0
    }
}
