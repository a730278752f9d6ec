//! # sqlweave
//! Dialect aware compilation of SQL expression fragments
//!
//! ## What does it do?
//! `sqlweave` turns loosely structured input (native values, JSON-like mappings, lists or a
//! small textual expression language) into a typed expression tree, checks the column and table
//! references of that tree against a declared schema, and renders it as SQL text for a given
//! dialect, collecting bind parameters on the way.
//!
//! ### Expressions
//! [`Expr`] is a closed sum type with literals, parameters, column and table references,
//! functions, lists, unary and binary operations and `CASE` expressions.
//!
//! ### Evaluator
//! The [`evaluator::Evaluator`] normalizes any [`evaluator::Evaluable`] input into an [`Expr`],
//! parsing strings with its grammar and dispatching Polish notation mappings on operator arity.
//!
//! ### Schema and resolution
//! A [`schema::Datasource`] owns namespaces, tables and columns. The
//! [`resolver::StructureResolver`] maps dotted paths and aliases onto that tree,
//! with a stack of scopes for nested expressions.
//!
//! ### Dialects and statements
//! A [`dialect::StatementBuilder`] knows how one dialect writes identifiers, literals and
//! placeholders. A [`context::StatementContext`] ties a builder and a resolver together to
//! compile the expressions of one statement.
//!

pub mod data_type;
pub mod setup;
#[macro_use]
pub mod expr;
pub mod builder;
pub mod context;
pub mod dialect;
pub mod evaluator;
pub mod hierarchy;
pub mod namer;
pub mod resolver;
pub mod schema;

pub use builder::{Ready, With, WithIterator};
pub use context::{Statement, StatementContext};
pub use data_type::{value::Value, DataType};
pub use dialect::StatementBuilder;
pub use evaluator::{Evaluable, Evaluator};
pub use expr::Expr;
pub use resolver::StructureResolver;
