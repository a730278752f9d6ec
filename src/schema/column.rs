use colored::Colorize;
use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::{Rc, Weak},
};

use super::Table;
use crate::{
    builder::With,
    data_type::{DataType, DataTyped, Value},
    expr::Identifier,
};

/// A column of a table.
/// Its name and type are fixed, its flags and default value may change after attachment.
#[derive(Debug)]
pub struct Column {
    name: String,
    data_type: DataType,
    nullable: Cell<bool>,
    auto_increment: Cell<bool>,
    default: RefCell<Option<Value>>,
    table: Weak<Table>,
}

impl Column {
    pub(super) fn new(
        name: String,
        data_type: DataType,
        nullable: bool,
        auto_increment: bool,
        default: Option<Value>,
        table: Weak<Table>,
    ) -> Self {
        Column {
            name,
            data_type,
            nullable: Cell::new(nullable),
            auto_increment: Cell::new(auto_increment),
            default: RefCell::new(default),
            table,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The owning table, if still alive
    pub fn table(&self) -> Option<Rc<Table>> {
        self.table.upgrade()
    }

    /// The qualified path of the column up to its namespace
    pub fn identifier(&self) -> Identifier {
        match self.table() {
            Some(table) => table.identifier().with(self.name.clone()),
            None => Identifier::from_name(self.name.as_str()),
        }
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable.get()
    }

    pub fn set_nullable(&self, nullable: bool) {
        self.nullable.set(nullable)
    }

    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment.get()
    }

    pub fn set_auto_increment(&self, auto_increment: bool) {
        self.auto_increment.set(auto_increment)
    }

    pub fn default_value(&self) -> Option<Value> {
        self.default.borrow().clone()
    }

    pub fn set_default_value(&self, default: Option<Value>) {
        *self.default.borrow_mut() = default;
    }

    /// Whether the column belongs to the primary key of its table
    pub fn is_primary_key(&self) -> bool {
        self.table().map_or(false, |table| {
            table
                .primary_key()
                .map_or(false, |pk| pk.contains(&self.name))
        })
    }
}

impl DataTyped for Column {
    fn data_type(&self) -> DataType {
        self.data_type
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name.bold(), self.data_type.to_string().green())?;
        if !self.is_nullable() {
            write!(f, " {}", "NOT NULL".blue())?;
        }
        if self.is_auto_increment() {
            write!(f, " {}", "AUTO INCREMENT".blue())?;
        }
        if let Some(default) = self.default_value() {
            write!(f, " {} {}", "DEFAULT".blue(), default)?;
        }
        Ok(())
    }
}
