//! Builders validating schemas before assembling them.
//!
//! Validation happens on the builder data, the `Rc` tree is assembled afterwards
//! with `Rc::new_cyclic` so that children get a `Weak` reference to their parent.

use std::{
    collections::HashSet,
    rc::{Rc, Weak},
};

use super::{
    Column, Constraint, ConstraintKind, Datasource, ElementKind, Error, Namespace, Result, Table,
    TableKind,
};
use crate::{
    builder::{Ready, With},
    data_type::{DataType, Value},
    hierarchy::Hierarchy,
};

// The name typestate
#[derive(Clone, Debug, Default)]
pub struct WithoutName;
#[derive(Clone, Debug)]
pub struct WithName(String);

/// Check names are non empty and unique
fn check_names<'a, I: IntoIterator<Item = &'a str>>(kind: ElementKind, names: I) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if name.is_empty() {
            return Err(Error::invalid_name(format!("empty {} name", kind)));
        }
        if !seen.insert(name) {
            return Err(Error::duplicate_name(kind, name));
        }
    }
    Ok(())
}

/*
Column builder
 */

/// A column builder, columns are built as part of their table
#[derive(Clone, Debug, Default)]
pub struct ColumnBuilder<RequireName> {
    name: RequireName,
    data_type: DataType,
    nullable: Option<bool>,
    auto_increment: bool,
    default: Option<Value>,
}

impl ColumnBuilder<WithoutName> {
    pub fn new() -> Self {
        ColumnBuilder::default()
    }
}

impl<RequireName> ColumnBuilder<RequireName> {
    pub fn name<S: Into<String>>(self, name: S) -> ColumnBuilder<WithName> {
        ColumnBuilder {
            name: WithName(name.into()),
            data_type: self.data_type,
            nullable: self.nullable,
            auto_increment: self.auto_increment,
            default: self.default,
        }
    }

    pub fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    pub fn not_null(self) -> Self {
        self.nullable(false)
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn default_value<V: Into<Value>>(mut self, default: V) -> Self {
        self.default = Some(default.into());
        self
    }
}

impl ColumnBuilder<WithName> {
    fn assemble(self, table: Weak<Table>, in_primary_key: bool) -> Rc<Column> {
        // Primary key columns are not nullable unless said otherwise
        let nullable = self.nullable.unwrap_or(!in_primary_key);
        Rc::new(Column::new(
            self.name.0,
            self.data_type,
            nullable,
            self.auto_increment,
            self.default,
            table,
        ))
    }
}

/*
Table builder
 */

/// A table or view builder
#[derive(Clone, Debug, Default)]
pub struct TableBuilder<RequireName> {
    name: RequireName,
    kind: TableKind,
    columns: Vec<ColumnBuilder<WithName>>,
    constraints: Vec<Constraint>,
}

impl TableBuilder<WithoutName> {
    pub fn new() -> Self {
        TableBuilder::default()
    }
}

impl<RequireName> TableBuilder<RequireName> {
    pub fn name<S: Into<String>>(self, name: S) -> TableBuilder<WithName> {
        TableBuilder {
            name: WithName(name.into()),
            kind: self.kind,
            columns: self.columns,
            constraints: self.constraints,
        }
    }

    pub fn view(mut self) -> Self {
        self.kind = TableKind::View;
        self
    }

    pub fn primary_key<S: Into<String>, I: IntoIterator<Item = S>>(self, columns: I) -> Self {
        self.with(Constraint::primary_key(columns))
    }

    pub fn unique<N: Into<String>, S: Into<String>, I: IntoIterator<Item = S>>(
        self,
        name: N,
        columns: I,
    ) -> Self {
        self.with(Constraint::unique(name, columns))
    }
}

impl<RequireName> With<ColumnBuilder<WithName>> for TableBuilder<RequireName> {
    fn with(mut self, input: ColumnBuilder<WithName>) -> Self {
        self.columns.push(input);
        self
    }
}

impl<RequireName, S: Into<String>> With<(S, DataType)> for TableBuilder<RequireName> {
    fn with(self, (name, data_type): (S, DataType)) -> Self {
        self.with(ColumnBuilder::new().name(name).data_type(data_type))
    }
}

impl<RequireName> With<Constraint> for TableBuilder<RequireName> {
    fn with(mut self, input: Constraint) -> Self {
        self.constraints.push(input);
        self
    }
}

impl TableBuilder<WithName> {
    fn validate(&self) -> Result<()> {
        check_names(ElementKind::Table, [self.name.0.as_str()])?;
        check_names(
            ElementKind::Column,
            self.columns.iter().map(|c| c.name.0.as_str()),
        )?;
        check_names(
            ElementKind::Table,
            self.constraints.iter().map(|c| c.name()),
        )
        .map_err(|_| {
            Error::invalid_constraint(format!("duplicate constraint name in {}", self.name.0))
        })?;
        for constraint in &self.constraints {
            if constraint.columns().is_empty() {
                return Err(Error::invalid_constraint(format!(
                    "{} has no column",
                    constraint.name()
                )));
            }
            if let Some(missing) = constraint
                .columns()
                .iter()
                .find(|name| self.column(name).is_none())
            {
                return Err(Error::invalid_constraint(format!(
                    "{} references the unknown column {}.{}",
                    constraint.name(),
                    self.name.0,
                    missing
                )));
            }
            if let ConstraintKind::ForeignKey { columns, .. } = constraint.kind() {
                if columns.len() != constraint.columns().len() {
                    return Err(Error::invalid_constraint(format!(
                        "{} maps {} columns onto {}",
                        constraint.name(),
                        constraint.columns().len(),
                        columns.len()
                    )));
                }
            }
        }
        if self.constraints.iter().filter(|c| c.is_primary_key()).count() > 1 {
            return Err(Error::invalid_constraint(format!(
                "{} has several primary keys",
                self.name.0
            )));
        }
        Ok(())
    }

    fn column(&self, name: &str) -> Option<&ColumnBuilder<WithName>> {
        self.columns.iter().find(|c| c.name.0 == name)
    }

    fn assemble(self, namespace: Weak<Namespace>) -> Rc<Table> {
        let primary_key: Vec<String> = self
            .constraints
            .iter()
            .filter(|c| c.is_primary_key())
            .flat_map(|c| c.columns().to_vec())
            .collect();
        let TableBuilder {
            name,
            kind,
            columns,
            constraints,
        } = self;
        Rc::new_cyclic(|table| Table {
            name: name.0,
            kind,
            namespace,
            columns: columns
                .into_iter()
                .map(|column| {
                    let in_primary_key = primary_key.contains(&column.name.0);
                    column.assemble(table.clone(), in_primary_key)
                })
                .collect(),
            constraints,
        })
    }
}

impl Ready<Rc<Table>> for TableBuilder<WithName> {
    type Error = Error;

    /// A table outside of any namespace
    fn try_build(self) -> Result<Rc<Table>> {
        self.validate()?;
        Ok(self.assemble(Weak::new()))
    }
}

/*
Namespace builder
 */

/// A namespace builder
#[derive(Clone, Debug, Default)]
pub struct NamespaceBuilder<RequireName> {
    name: RequireName,
    tables: Vec<TableBuilder<WithName>>,
}

impl NamespaceBuilder<WithoutName> {
    pub fn new() -> Self {
        NamespaceBuilder::default()
    }
}

impl<RequireName> NamespaceBuilder<RequireName> {
    pub fn name<S: Into<String>>(self, name: S) -> NamespaceBuilder<WithName> {
        NamespaceBuilder {
            name: WithName(name.into()),
            tables: self.tables,
        }
    }
}

impl<RequireName> With<TableBuilder<WithName>> for NamespaceBuilder<RequireName> {
    fn with(mut self, input: TableBuilder<WithName>) -> Self {
        self.tables.push(input);
        self
    }
}

impl NamespaceBuilder<WithName> {
    fn validate(&self) -> Result<()> {
        check_names(ElementKind::Namespace, [self.name.0.as_str()])?;
        check_names(
            ElementKind::Table,
            self.tables.iter().map(|t| t.name.0.as_str()),
        )?;
        self.tables.iter().try_for_each(|table| table.validate())
    }

    fn assemble(self, datasource: Weak<Datasource>) -> Rc<Namespace> {
        let NamespaceBuilder { name, tables } = self;
        Rc::new_cyclic(|namespace| Namespace {
            name: name.0,
            datasource,
            tables: tables
                .into_iter()
                .map(|table| table.assemble(namespace.clone()))
                .collect(),
        })
    }
}

impl Ready<Rc<Namespace>> for NamespaceBuilder<WithName> {
    type Error = Error;

    /// A namespace outside of any datasource
    fn try_build(self) -> Result<Rc<Namespace>> {
        self.validate()?;
        Ok(self.assemble(Weak::new()))
    }
}

/*
Datasource builder
 */

/// A datasource builder
#[derive(Clone, Debug, Default)]
pub struct DatasourceBuilder<RequireName> {
    name: RequireName,
    namespaces: Vec<NamespaceBuilder<WithName>>,
}

impl DatasourceBuilder<WithoutName> {
    pub fn new() -> Self {
        DatasourceBuilder::default()
    }
}

impl<RequireName> DatasourceBuilder<RequireName> {
    pub fn name<S: Into<String>>(self, name: S) -> DatasourceBuilder<WithName> {
        DatasourceBuilder {
            name: WithName(name.into()),
            namespaces: self.namespaces,
        }
    }
}

impl<RequireName> With<NamespaceBuilder<WithName>> for DatasourceBuilder<RequireName> {
    fn with(mut self, input: NamespaceBuilder<WithName>) -> Self {
        self.namespaces.push(input);
        self
    }
}

impl DatasourceBuilder<WithName> {
    /// Check foreign keys reference existing tables and columns.
    /// A referenced path is looked up in the namespace of the constraint first.
    fn validate_references(&self) -> Result<()> {
        let tables: Hierarchy<&TableBuilder<WithName>> = self
            .namespaces
            .iter()
            .flat_map(|ns| {
                ns.tables
                    .iter()
                    .map(move |table| (vec![ns.name.0.as_str(), table.name.0.as_str()], table))
            })
            .collect();
        for namespace in &self.namespaces {
            for table in &namespace.tables {
                for constraint in &table.constraints {
                    let ConstraintKind::ForeignKey { table: path, columns } = constraint.kind()
                    else {
                        continue;
                    };
                    let local: Vec<String> = [namespace.name.0.clone()]
                        .into_iter()
                        .chain(path.iter().cloned())
                        .collect();
                    let referenced = tables
                        .get(&local)
                        .or_else(|| tables.get(path))
                        .ok_or_else(|| {
                            Error::invalid_constraint(format!(
                                "{} references the unknown table {}",
                                constraint.name(),
                                path
                            ))
                        })?;
                    if let Some(missing) = columns.iter().find(|c| referenced.column(c).is_none())
                    {
                        return Err(Error::invalid_constraint(format!(
                            "{} references the unknown column {}.{}",
                            constraint.name(),
                            path,
                            missing
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

impl Ready<Rc<Datasource>> for DatasourceBuilder<WithName> {
    type Error = Error;

    fn try_build(self) -> Result<Rc<Datasource>> {
        check_names(ElementKind::Datasource, [self.name.0.as_str()])?;
        check_names(
            ElementKind::Namespace,
            self.namespaces.iter().map(|ns| ns.name.0.as_str()),
        )?;
        self.namespaces
            .iter()
            .try_for_each(|namespace| namespace.validate())?;
        self.validate_references()?;
        let DatasourceBuilder { name, namespaces } = self;
        Ok(Rc::new_cyclic(|datasource| Datasource {
            name: name.0,
            namespaces: namespaces
                .into_iter()
                .map(|namespace| namespace.assemble(datasource.clone()))
                .collect(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customers() -> TableBuilder<WithName> {
        TableBuilder::new()
            .name("customers")
            .with(("id", DataType::Integer))
            .with(("email", DataType::String))
            .primary_key(["id"])
            .unique("uq_email", ["email"])
    }

    fn orders() -> TableBuilder<WithName> {
        TableBuilder::new()
            .name("orders")
            .with(ColumnBuilder::new().name("id").data_type(DataType::Integer).auto_increment())
            .with(
                ColumnBuilder::new()
                    .name("status")
                    .data_type(DataType::String)
                    .default_value("new"),
            )
            .with(("customer_id", DataType::Integer))
            .primary_key(["id"])
            .with(Constraint::foreign_key(
                "fk_customer",
                ["customer_id"],
                "customers",
                ["id"],
            ))
    }

    #[test]
    fn test_build() {
        let datasource = DatasourceBuilder::new()
            .name("main")
            .with(NamespaceBuilder::new().name("shop").with(customers()).with(orders()))
            .try_build()
            .unwrap();
        println!("{datasource}");
        let orders = datasource.namespace("shop").unwrap().table("orders").unwrap();
        let id = orders.column("id").unwrap();
        assert!(id.is_auto_increment());
        // Primary key columns default to not null
        assert!(!id.is_nullable());
        assert_eq!(
            orders.column("status").unwrap().default_value(),
            Some(Value::from("new"))
        );
        assert_eq!(orders.foreign_keys().len(), 1);
    }

    #[test]
    fn test_detached() {
        let table = customers().build();
        assert!(table.namespace().is_none());
        assert_eq!(table.identifier().to_string(), "customers");
        assert!(Rc::ptr_eq(&table.column("id").unwrap().table().unwrap(), &table));
        let namespace = NamespaceBuilder::new().name("shop").with(customers()).build();
        assert!(namespace.datasource().is_none());
        assert_eq!(
            namespace.table("customers").unwrap().identifier().to_string(),
            "shop.customers"
        );
    }

    #[test]
    fn test_invalid() {
        let duplicate_column = customers().with(("id", DataType::Float));
        assert!(matches!(
            duplicate_column.try_build(),
            Err(Error::InvalidName(_))
        ));
        let unknown_column = customers().unique("uq_phone", ["phone"]);
        assert!(matches!(
            unknown_column.try_build(),
            Err(Error::InvalidConstraint(_))
        ));
        let two_keys = customers().primary_key(["email"]);
        assert!(two_keys.try_build().is_err());
        let duplicate_table = NamespaceBuilder::new()
            .name("shop")
            .with(customers())
            .with(customers());
        assert!(matches!(
            duplicate_table.try_build(),
            Err(Error::InvalidName(_))
        ));
        // The referenced table is missing
        let dangling = DatasourceBuilder::new()
            .name("main")
            .with(NamespaceBuilder::new().name("shop").with(orders()));
        let error = dangling.try_build().unwrap_err();
        println!("{error}");
        assert!(matches!(error, Error::InvalidConstraint(_)));
        assert!(TableBuilder::new().name("").try_build().is_err());
    }
}
