use colored::Colorize;
use itertools::Itertools;
use std::fmt;

use crate::expr::Identifier;

pub const PRIMARY_KEY: &str = "PRIMARY";

/// What a constraint enforces
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum ConstraintKind {
    PrimaryKey,
    Unique,
    /// The constrained columns reference `columns` of `table`, pairwise
    ForeignKey {
        table: Identifier,
        columns: Vec<String>,
    },
}

/// A named set of columns of a table
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Constraint {
    name: String,
    columns: Vec<String>,
    kind: ConstraintKind,
}

impl Constraint {
    pub fn new<S: Into<String>>(name: S, columns: Vec<String>, kind: ConstraintKind) -> Self {
        Constraint {
            name: name.into(),
            columns,
            kind,
        }
    }

    pub fn primary_key<S: Into<String>, I: IntoIterator<Item = S>>(columns: I) -> Self {
        Constraint::new(
            PRIMARY_KEY,
            columns.into_iter().map(Into::into).collect(),
            ConstraintKind::PrimaryKey,
        )
    }

    pub fn unique<N: Into<String>, S: Into<String>, I: IntoIterator<Item = S>>(
        name: N,
        columns: I,
    ) -> Self {
        Constraint::new(
            name,
            columns.into_iter().map(Into::into).collect(),
            ConstraintKind::Unique,
        )
    }

    pub fn foreign_key<N, T, S, I, J>(name: N, columns: I, table: T, referenced: J) -> Self
    where
        N: Into<String>,
        T: Into<Identifier>,
        S: Into<String>,
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = S>,
    {
        Constraint::new(
            name,
            columns.into_iter().map(Into::into).collect(),
            ConstraintKind::ForeignKey {
                table: table.into(),
                columns: referenced.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn kind(&self) -> &ConstraintKind {
        &self.kind
    }

    pub fn is_primary_key(&self) -> bool {
        self.kind == ConstraintKind::PrimaryKey
    }

    pub fn is_unique(&self) -> bool {
        matches!(self.kind, ConstraintKind::PrimaryKey | ConstraintKind::Unique)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// The referenced table of a foreign key
    pub fn referenced_table(&self) -> Option<&Identifier> {
        match &self.kind {
            ConstraintKind::ForeignKey { table, .. } => Some(table),
            _ => None,
        }
    }

    /// The (column, referenced column) pairs of a foreign key
    pub fn mapping(&self) -> Vec<(&str, &str)> {
        match &self.kind {
            ConstraintKind::ForeignKey { columns, .. } => self
                .columns
                .iter()
                .zip(columns)
                .map(|(c, r)| (c.as_str(), r.as_str()))
                .collect(),
            _ => vec![],
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns = self.columns.join(", ");
        match &self.kind {
            ConstraintKind::PrimaryKey => {
                write!(f, "{} ({})", "PRIMARY KEY".bold().blue(), columns)
            }
            ConstraintKind::Unique => {
                write!(f, "{} {} ({})", self.name, "UNIQUE".bold().blue(), columns)
            }
            ConstraintKind::ForeignKey { table, columns: referenced } => write!(
                f,
                "{} {} ({}) {} {}({})",
                self.name,
                "FOREIGN KEY".bold().blue(),
                columns,
                "→".yellow(),
                table,
                referenced.iter().join(", ")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_key() {
        let fk = Constraint::foreign_key(
            "fk_customer",
            ["customer_id"],
            "shop.customers",
            ["id"],
        );
        println!("{fk}");
        assert_eq!(fk.mapping(), vec![("customer_id", "id")]);
        assert_eq!(
            fk.referenced_table(),
            Some(&Identifier::from(["shop", "customers"]))
        );
        assert!(!fk.is_unique());
        let pk = Constraint::primary_key(["id"]);
        assert!(pk.is_primary_key() && pk.is_unique() && pk.contains("id"));
        assert!(pk.mapping().is_empty());
    }
}
