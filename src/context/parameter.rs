//! Bind parameters of a statement: their normalized names and every place they occur.

use log::debug;
use serde::{Serialize, Serializer};

use super::{Error, Result};
use crate::{
    dialect::{ParameterPosition, StatementBuilder},
    expr::Expr,
};

fn serialize_default<S: Serializer>(default: &Option<Expr>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    match default {
        Some(expr) => serializer.serialize_some(&expr.to_string()),
        None => serializer.serialize_none(),
    }
}

/// A parameter as written in the statement
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParameterDescriptor {
    normalized_name: String,
    /// From 1, in order of first occurrence
    ordinal: usize,
    /// Occurrence indices, strictly increasing
    positions: Vec<usize>,
    #[serde(serialize_with = "serialize_default")]
    default: Option<Expr>,
}

impl ParameterDescriptor {
    fn new(normalized_name: String, ordinal: usize) -> Self {
        ParameterDescriptor {
            normalized_name,
            ordinal,
            positions: vec![],
            default: None,
        }
    }

    pub fn normalized_name(&self) -> &str {
        &self.normalized_name
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn default(&self) -> Option<&Expr> {
        self.default.as_ref()
    }
}

/// The parameters of one statement, in order of first occurrence
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParameterRegistry {
    descriptors: Vec<(String, ParameterDescriptor)>,
    occurrences: usize,
}

impl ParameterRegistry {
    pub fn new() -> Self {
        ParameterRegistry::default()
    }

    pub fn get(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.descriptors
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, descriptor)| descriptor)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut ParameterDescriptor> {
        self.descriptors
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, descriptor)| descriptor)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterDescriptor)> {
        self.descriptors.iter().map(|(n, d)| (n.as_str(), d))
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// The number of placeholders written so far
    pub fn occurrences(&self) -> usize {
        self.occurrences
    }

    fn normalized_names(&self) -> Vec<String> {
        self.descriptors
            .iter()
            .map(|(_, d)| d.normalized_name.clone())
            .collect()
    }

    /// Record an occurrence of `name` and return the placeholder to write
    pub fn occurrence(&mut self, name: &str, builder: &dyn StatementBuilder) -> Result<String> {
        if self.get(name).is_none() {
            let taken = self.normalized_names();
            let normalized = if builder.is_valid_parameter_name(name) && !taken.iter().any(|t| t == name) {
                name.to_string()
            } else {
                let normalized = builder.normalize_parameter_name(name, &taken)?;
                debug!("Parameter {name} normalized to {normalized} for {}", builder.name());
                normalized
            };
            let ordinal = self.descriptors.len() + 1;
            self.descriptors
                .push((name.to_string(), ParameterDescriptor::new(normalized, ordinal)));
        }
        let occurrence = self.occurrences;
        let descriptor = self
            .get_mut(name)
            .ok_or_else(|| Error::parameter(format!("{name} is not registered")))?;
        descriptor.positions.push(occurrence);
        let position = ParameterPosition::new(occurrence, descriptor.ordinal);
        let token = builder.parameter_token(&descriptor.normalized_name, position);
        self.occurrences += 1;
        Ok(token)
    }

    /// Set the value bound when none is supplied
    pub fn set_default(&mut self, name: &str, default: Expr) -> Result<()> {
        let descriptor = self
            .get_mut(name)
            .ok_or_else(|| Error::parameter(format!("{name} does not occur in the statement")))?;
        descriptor.default = Some(default);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MsSqlBuilder, MySqlBuilder, PostgreSqlBuilder};

    #[test]
    fn test_positional_occurrences() {
        let builder = MySqlBuilder::new();
        let mut registry = ParameterRegistry::new();
        for _ in 0..3 {
            assert_eq!(registry.occurrence("id", &builder).unwrap(), "?");
        }
        assert_eq!(registry.len(), 1);
        let descriptor = registry.get("id").unwrap();
        assert_eq!(descriptor.normalized_name(), "id");
        assert_eq!(descriptor.positions(), &[0, 1, 2]);
        assert_eq!(registry.occurrences(), 3);
    }

    #[test]
    fn test_numbered_occurrences() {
        let builder = PostgreSqlBuilder::new();
        let mut registry = ParameterRegistry::new();
        let tokens: Vec<String> = ["a", "b", "a"]
            .iter()
            .map(|name| registry.occurrence(name, &builder).unwrap())
            .collect();
        assert_eq!(tokens, vec!["$1", "$2", "$1"]);
        assert_eq!(registry.get("a").unwrap().positions(), &[0, 2]);
        assert_eq!(registry.get("b").unwrap().ordinal(), 2);
    }

    #[test]
    fn test_normalization() {
        let builder = MsSqlBuilder::new();
        let mut registry = ParameterRegistry::new();
        assert_eq!(registry.occurrence("user-id", &builder).unwrap(), "@user_id");
        // A valid name already used by a normalized one
        assert_eq!(registry.occurrence("user_id", &builder).unwrap(), "@user_id_0");
        assert_eq!(registry.occurrence("user-id", &builder).unwrap(), "@user_id");
        assert!(registry.set_default("user_id", Expr::val(1)).is_ok());
        assert!(registry.set_default("missing", Expr::val(1)).is_err());
        assert_eq!(registry.get("user_id").unwrap().default(), Some(&Expr::val(1)));
    }
}
