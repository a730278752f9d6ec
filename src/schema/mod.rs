//! # Schema model
//!
//! The declared structure references are checked against:
//! a [`Datasource`] owns [`Namespace`]s, a namespace owns [`Table`]s (or views),
//! a table owns [`Column`]s and [`Constraint`]s.
//!
//! Parents own their children through `Rc`, children point back to their parent
//! through a `Weak` reference. Schemas are assembled by the builders of [`builder`]
//! and are read-only afterwards, except for column flags and default values.
//!
pub mod builder;
pub mod column;
pub mod constraint;

use colored::Colorize;
use std::{
    error, fmt,
    rc::{Rc, Weak},
    result,
};

use crate::{
    builder::With,
    expr::Identifier,
    hierarchy::Hierarchy,
};
pub use builder::{ColumnBuilder, DatasourceBuilder, NamespaceBuilder, TableBuilder};
pub use column::Column;
pub use constraint::{Constraint, ConstraintKind};

// Error management

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    InvalidName(String),
    InvalidConstraint(String),
    Other(String),
}

impl Error {
    pub fn invalid_name(name: impl fmt::Display) -> Error {
        Error::InvalidName(format!("{} is invalid", name))
    }
    pub fn duplicate_name(kind: ElementKind, name: impl fmt::Display) -> Error {
        Error::InvalidName(format!("{} {} is declared twice", kind, name))
    }
    pub fn invalid_constraint(desc: impl fmt::Display) -> Error {
        Error::InvalidConstraint(desc.to_string())
    }
    pub fn other(desc: impl fmt::Display) -> Error {
        Error::Other(desc.to_string())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidName(desc) => writeln!(f, "InvalidName: {}", desc),
            Error::InvalidConstraint(desc) => writeln!(f, "InvalidConstraint: {}", desc),
            Error::Other(desc) => writeln!(f, "{}", desc),
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;

/// Indent each line of `text`
fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("  {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The kinds of schema elements
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ElementKind {
    Datasource,
    Namespace,
    Table,
    Column,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ElementKind::Datasource => "datasource",
            ElementKind::Namespace => "namespace",
            ElementKind::Table => "table",
            ElementKind::Column => "column",
        })
    }
}

/// The root of a schema
#[derive(Debug)]
pub struct Datasource {
    name: String,
    namespaces: Vec<Rc<Namespace>>,
}

impl Datasource {
    pub fn builder() -> DatasourceBuilder<builder::WithoutName> {
        DatasourceBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespaces(&self) -> &[Rc<Namespace>] {
        &self.namespaces
    }

    pub fn namespace(&self, name: &str) -> Option<Rc<Namespace>> {
        self.namespaces.iter().find(|ns| ns.name() == name).cloned()
    }

    /// The tables of all namespaces keyed by `[namespace, table]`
    pub fn tables(&self) -> Hierarchy<Rc<Table>> {
        self.namespaces
            .iter()
            .flat_map(|ns| {
                ns.tables()
                    .iter()
                    .map(|table| (vec![ns.name(), table.name()], table.clone()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

impl fmt::Display for Datasource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", "DATASOURCE".bold().blue(), self.name.bold().red())?;
        for namespace in &self.namespaces {
            write!(f, "\n{}", indent(&namespace.to_string()))?;
        }
        Ok(())
    }
}

/// A named group of tables
#[derive(Debug)]
pub struct Namespace {
    name: String,
    datasource: Weak<Datasource>,
    tables: Vec<Rc<Table>>,
}

impl Namespace {
    pub fn builder() -> NamespaceBuilder<builder::WithoutName> {
        NamespaceBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn datasource(&self) -> Option<Rc<Datasource>> {
        self.datasource.upgrade()
    }

    pub fn tables(&self) -> &[Rc<Table>] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<Rc<Table>> {
        self.tables.iter().find(|table| table.name() == name).cloned()
    }

    pub fn identifier(&self) -> Identifier {
        Identifier::from_name(self.name.as_str())
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", "NAMESPACE".bold().blue(), self.name.bold().red())?;
        for table in &self.tables {
            write!(f, "\n{}", indent(&table.to_string()))?;
        }
        Ok(())
    }
}

/// Tables store rows, views are named queries
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub enum TableKind {
    #[default]
    Table,
    View,
}

/// A table or a view
#[derive(Debug)]
pub struct Table {
    name: String,
    kind: TableKind,
    namespace: Weak<Namespace>,
    columns: Vec<Rc<Column>>,
    constraints: Vec<Constraint>,
}

impl Table {
    pub fn builder() -> TableBuilder<builder::WithoutName> {
        TableBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn is_view(&self) -> bool {
        self.kind == TableKind::View
    }

    pub fn namespace(&self) -> Option<Rc<Namespace>> {
        self.namespace.upgrade()
    }

    pub fn columns(&self) -> &[Rc<Column>] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<Rc<Column>> {
        self.columns
            .iter()
            .find(|column| column.name() == name)
            .cloned()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn primary_key(&self) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.is_primary_key())
    }

    pub fn foreign_keys(&self) -> Vec<&Constraint> {
        self.constraints
            .iter()
            .filter(|c| c.referenced_table().is_some())
            .collect()
    }

    /// `[namespace, table]`, or `[table]` for a detached table
    pub fn identifier(&self) -> Identifier {
        match self.namespace() {
            Some(namespace) => namespace.identifier().with(self.name.clone()),
            None => Identifier::from_name(self.name.as_str()),
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            TableKind::Table => "TABLE",
            TableKind::View => "VIEW",
        };
        write!(f, "{} {}", kind.bold().blue(), self.name.bold().red())?;
        for column in &self.columns {
            write!(f, "\n  {}", column)?;
        }
        for constraint in &self.constraints {
            write!(f, "\n  {}", constraint)?;
        }
        Ok(())
    }
}

/// Any node of a schema
#[derive(Clone, Debug)]
pub enum Element {
    Datasource(Rc<Datasource>),
    Namespace(Rc<Namespace>),
    Table(Rc<Table>),
    Column(Rc<Column>),
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Datasource(_) => ElementKind::Datasource,
            Element::Namespace(_) => ElementKind::Namespace,
            Element::Table(_) => ElementKind::Table,
            Element::Column(_) => ElementKind::Column,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Element::Datasource(d) => d.name(),
            Element::Namespace(n) => n.name(),
            Element::Table(t) => t.name(),
            Element::Column(c) => c.name(),
        }
    }

    /// The owning element
    pub fn parent(&self) -> Option<Element> {
        match self {
            Element::Datasource(_) => None,
            Element::Namespace(n) => n.datasource().map(Element::Datasource),
            Element::Table(t) => t.namespace().map(Element::Namespace),
            Element::Column(c) => c.table().map(Element::Table),
        }
    }

    pub fn as_namespace(&self) -> Option<&Rc<Namespace>> {
        match self {
            Element::Namespace(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Rc<Table>> {
        match self {
            Element::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_column(&self) -> Option<&Rc<Column>> {
        match self {
            Element::Column(c) => Some(c),
            _ => None,
        }
    }

    /// Whether both elements are the same node
    pub fn ptr_eq(&self, other: &Element) -> bool {
        match (self, other) {
            (Element::Datasource(l), Element::Datasource(r)) => Rc::ptr_eq(l, r),
            (Element::Namespace(l), Element::Namespace(r)) => Rc::ptr_eq(l, r),
            (Element::Table(l), Element::Table(r)) => Rc::ptr_eq(l, r),
            (Element::Column(l), Element::Column(r)) => Rc::ptr_eq(l, r),
            _ => false,
        }
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.name())
    }
}

impl From<Rc<Datasource>> for Element {
    fn from(datasource: Rc<Datasource>) -> Self {
        Element::Datasource(datasource)
    }
}

impl From<Rc<Namespace>> for Element {
    fn from(namespace: Rc<Namespace>) -> Self {
        Element::Namespace(namespace)
    }
}

impl From<Rc<Table>> for Element {
    fn from(table: Rc<Table>) -> Self {
        Element::Table(table)
    }
}

impl From<Rc<Column>> for Element {
    fn from(column: Rc<Column>) -> Self {
        Element::Column(column)
    }
}
