//! # Statement context
//!
//! Everything needed to compile the expressions of one statement:
//! a [`StatementBuilder`] for the dialect, a [`StructureResolver`] for the schema
//! and the registry of bind parameters met so far.
//!
//! ```
//! use sqlweave::{
//!     builder::{Ready, With},
//!     context::StatementContext,
//!     data_type::DataType,
//!     dialect::MySqlBuilder,
//!     resolver::StructureResolver,
//!     schema::{NamespaceBuilder, TableBuilder},
//! };
//!
//! let shop = NamespaceBuilder::new()
//!     .name("shop")
//!     .with(
//!         TableBuilder::new()
//!             .name("orders")
//!             .with(("id", DataType::Integer))
//!             .with(("customer_id", DataType::Integer))
//!             .primary_key(["id"]),
//!     )
//!     .build();
//! let builder = MySqlBuilder::new();
//! let mut context = StatementContext::new(&builder, StructureResolver::new(shop));
//! let sql = context.compile("orders.customer_id = :cid").unwrap();
//! assert_eq!(sql, "`orders`.`customer_id` = ?");
//! ```
//!
pub mod parameter;

use log::debug;
use serde::Serialize;
use std::{collections::BTreeMap, error, fmt, rc::Rc, result};

use crate::{
    data_type::{DataType, Value},
    dialect::{self, StatementBuilder},
    evaluator::{self, Evaluable, Evaluator},
    expr::{self, Expr, Identifier},
    resolver::{self, Alias, StructureResolver},
    schema::{self, Column, Element, ElementKind, Namespace, Table},
};
pub use parameter::{ParameterDescriptor, ParameterRegistry};

// Error management

/// The errors of a compilation
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Parse { fragment: String, offset: usize },
    Evaluation(String),
    Resolution {
        path: String,
        kind: ElementKind,
        reason: String,
    },
    Parameter(String),
    Capability(String),
    Schema(String),
}

impl Error {
    pub fn evaluation(desc: impl fmt::Display) -> Error {
        Error::Evaluation(desc.to_string())
    }
    pub fn resolution(path: impl fmt::Display, kind: ElementKind) -> Error {
        resolver::Error::resolution(path, kind).into()
    }
    pub fn parameter(desc: impl fmt::Display) -> Error {
        Error::Parameter(desc.to_string())
    }
    pub fn capability(name: impl fmt::Display) -> Error {
        Error::Capability(format!("no such capability: {}", name))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse { fragment, offset } => {
                writeln!(f, "ParseError: unexpected `{}` at offset {}", fragment, offset)
            }
            Error::Evaluation(desc) => writeln!(f, "EvaluationError: {}", desc),
            Error::Resolution { path, kind, reason } => {
                writeln!(f, "ResolutionError: {} `{}` {}", kind, path, reason)
            }
            Error::Parameter(desc) => writeln!(f, "ParameterError: {}", desc),
            Error::Capability(desc) => writeln!(f, "CapabilityError: {}", desc),
            Error::Schema(desc) => writeln!(f, "SchemaError: {}", desc),
        }
    }
}

impl error::Error for Error {}

impl From<evaluator::Error> for Error {
    fn from(err: evaluator::Error) -> Self {
        match err {
            evaluator::Error::Parse { fragment, offset } => Error::Parse { fragment, offset },
            evaluator::Error::Evaluation(desc) => Error::Evaluation(desc),
        }
    }
}

impl From<resolver::Error> for Error {
    fn from(err: resolver::Error) -> Self {
        match err {
            resolver::Error::Resolution { path, kind, reason } => {
                Error::Resolution { path, kind, reason }
            }
            resolver::Error::Other(desc) => Error::Evaluation(desc),
        }
    }
}

impl From<dialect::Error> for Error {
    fn from(err: dialect::Error) -> Self {
        match err {
            dialect::Error::Parameter(desc) => Error::Parameter(desc),
            dialect::Error::Literal(desc) | dialect::Error::Other(desc) => Error::Evaluation(desc),
        }
    }
}

impl From<expr::Error> for Error {
    fn from(err: expr::Error) -> Self {
        Error::Evaluation(err.to_string())
    }
}

impl From<schema::Error> for Error {
    fn from(err: schema::Error) -> Self {
        Error::Schema(err.to_string())
    }
}

pub type Result<T> = result::Result<T, Error>;

/// A compiled statement, ready to be prepared
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Statement {
    pub sql: String,
    /// Descriptors keyed by the parameter names used in the expressions
    pub parameters: BTreeMap<String, ParameterDescriptor>,
}

impl Statement {
    /// The value of each parameter, supplied or default
    fn value(&self, name: &str, descriptor: &ParameterDescriptor, values: &BTreeMap<String, Value>) -> Result<Value> {
        match (values.get(name), descriptor.default()) {
            (Some(value), _) => Ok(value.clone()),
            (None, Some(Expr::Literal(literal))) => Ok(literal.value().clone()),
            (None, Some(default)) => Err(Error::parameter(format!(
                "the default of {name} is not a value: {default}"
            ))),
            (None, None) => Err(Error::parameter(format!("no value for {name}"))),
        }
    }

    /// Values in placeholder order, one per occurrence, for `?` placeholders
    pub fn positional_values(&self, values: &BTreeMap<String, Value>) -> Result<Vec<Value>> {
        let mut bound: Vec<(usize, Value)> = vec![];
        for (name, descriptor) in &self.parameters {
            let value = self.value(name, descriptor, values)?;
            bound.extend(descriptor.positions().iter().map(|&p| (p, value.clone())));
        }
        bound.sort_by_key(|(position, _)| *position);
        Ok(bound.into_iter().map(|(_, value)| value).collect())
    }

    /// Values in ordinal order, one per parameter, for `$n` placeholders
    pub fn ordinal_values(&self, values: &BTreeMap<String, Value>) -> Result<Vec<Value>> {
        let mut bound: Vec<(usize, Value)> = self
            .parameters
            .iter()
            .map(|(name, descriptor)| Ok((descriptor.ordinal(), self.value(name, descriptor, values)?)))
            .collect::<Result<_>>()?;
        bound.sort_by_key(|(ordinal, _)| *ordinal);
        Ok(bound.into_iter().map(|(_, value)| value).collect())
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql)
    }
}

/// The state of the compilation of one statement
#[derive(Debug)]
pub struct StatementContext<'b> {
    builder: &'b dyn StatementBuilder,
    resolver: StructureResolver,
    evaluator: Evaluator,
    parameters: ParameterRegistry,
}

impl<'b> StatementContext<'b> {
    pub fn new(builder: &'b dyn StatementBuilder, resolver: StructureResolver) -> Self {
        StatementContext {
            builder,
            resolver,
            evaluator: Evaluator::new(),
            parameters: ParameterRegistry::new(),
        }
    }

    /// Use `evaluator` for [`StatementContext::compile`]
    pub fn with_evaluator(mut self, evaluator: Evaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn builder(&self) -> &'b dyn StatementBuilder {
        self.builder
    }

    pub fn resolver(&self) -> &StructureResolver {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut StructureResolver {
        &mut self.resolver
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn parameters(&self) -> &ParameterRegistry {
        &self.parameters
    }

    /* Builder */

    /// The placeholder of one more occurrence of the parameter `name`
    pub fn parameter(&mut self, name: &str) -> Result<String> {
        self.parameters.occurrence(name, self.builder)
    }

    pub fn literal(&self, value: &Value, data_type: DataType) -> Result<String> {
        Ok(self.builder.literal(value, data_type)?)
    }

    pub fn escape_identifier(&self, identifier: &str) -> String {
        self.builder.escape_identifier(identifier)
    }

    pub fn escape_string(&self, value: &str) -> String {
        self.builder.escape_string(value)
    }

    pub fn column_type_name(&self, data_type: DataType) -> Result<String> {
        Ok(self.builder.column_type_name(data_type)?)
    }

    pub fn column_definition(&self, column: &Column) -> Result<String> {
        Ok(self.builder.column_definition(column)?)
    }

    /// Set the default value of a parameter already used
    pub fn set_parameter_default<E: Into<Expr>>(&mut self, name: &str, default: E) -> Result<()> {
        self.parameters.set_default(name, default.into())
    }

    /* Resolver */

    pub fn find_column<I: Into<Identifier>>(&mut self, path: I) -> Result<Rc<Column>> {
        Ok(self.resolver.find_column(path)?)
    }

    pub fn find_table<I: Into<Identifier>>(&mut self, path: I) -> Result<Rc<Table>> {
        Ok(self.resolver.find_table(path)?)
    }

    pub fn find_namespace<I: Into<Identifier>>(&mut self, path: I) -> Result<Rc<Namespace>> {
        Ok(self.resolver.find_namespace(path)?)
    }

    pub fn set_alias<S: Into<String>, A: Into<Alias>>(&mut self, name: S, alias: A) {
        self.resolver.set_alias(name, alias)
    }

    pub fn is_alias(&self, name: &str) -> bool {
        self.resolver.is_alias(name)
    }

    pub fn push_context<E: Into<Element>>(&mut self, pivot: E) {
        self.resolver.push_context(pivot)
    }

    pub fn pop_context(&mut self) {
        self.resolver.pop_context();
    }

    /// Compile a nested expression resolving from `pivot`
    pub fn scoped<E: Into<Element>, T, F: FnOnce(&mut Self) -> T>(&mut self, pivot: E, f: F) -> T {
        self.push_context(pivot);
        let result = f(self);
        self.pop_context();
        result
    }

    /* Rendering */

    /// Check a column reference and write it quoted
    pub fn render_column(&mut self, path: &Identifier) -> Result<String> {
        match (
            path.segments(),
            path.first().and_then(|head| self.resolver.alias(head)),
        ) {
            ([_, name], Some(Alias::Table(table))) => {
                return if table.has_column(name) {
                    Ok(self.builder.escape_path(path))
                } else {
                    Err(Error::resolution(path, ElementKind::Column))
                };
            }
            ([_], Some(Alias::Column(_))) => return Ok(self.builder.escape_path(path)),
            _ => {}
        }
        let column = self.resolver.find_column(path.clone())?;
        Ok(match path.len() {
            // The datasource is not part of SQL names
            4 => self.builder.escape_path(&column.identifier()),
            _ => self.builder.escape_path(path),
        })
    }

    /// Check a table reference and write it quoted
    pub fn render_table(&mut self, path: &Identifier) -> Result<String> {
        if let [name] = path.segments() {
            if let Some(Alias::Table(_)) = self.resolver.alias(name) {
                return Ok(self.builder.escape_path(path));
            }
        }
        let table = self.resolver.find_table(path.clone())?;
        Ok(match path.len() {
            3 => self.builder.escape_path(&table.identifier()),
            _ => self.builder.escape_path(path),
        })
    }

    /// Render `expr`, the parameters registered on the way are dropped if it fails
    pub fn render(&mut self, expr: &Expr) -> Result<String> {
        let registered = self.parameters.clone();
        expr.render(self).map_err(|error| {
            self.parameters = registered;
            error
        })
    }

    /// Forget the registered parameters to compile an unrelated statement
    pub fn reset(&mut self) {
        debug!("Reset {} parameters", self.parameters.len());
        self.parameters = ParameterRegistry::new();
    }

    /// Evaluate `input` and render the resulting expression
    pub fn compile<E: Into<Evaluable>>(&mut self, input: E) -> Result<String> {
        let expr = self.evaluator.evaluate(input)?;
        debug!("Compile {expr} for {}", self.builder.name());
        self.render(&expr)
    }

    /// Close the compilation around the final `sql` text
    pub fn finish<S: Into<String>>(self, sql: S) -> Statement {
        Statement {
            sql: sql.into(),
            parameters: self
                .parameters
                .iter()
                .map(|(name, descriptor)| (name.to_string(), descriptor.clone()))
                .collect(),
        }
    }

    /* Capabilities */

    /// Call a capability by name: the builder's first, then the resolver's
    pub fn invoke(&mut self, name: &str, arguments: &[Value]) -> Result<Value> {
        if let Some(result) = self.builder.invoke(name, arguments) {
            return Ok(result?);
        }
        let path = || match arguments.first() {
            Some(Value::Text(path)) => Ok(Identifier::parse(path)),
            _ => Err(Error::evaluation(format!("{name} expects a path"))),
        };
        let qualified = |identifier: Identifier| Value::Text(identifier.to_string());
        match name {
            "find_column" => Ok(qualified(self.find_column(path()?)?.identifier())),
            "find_table" => Ok(qualified(self.find_table(path()?)?.identifier())),
            "find_namespace" => Ok(qualified(self.find_namespace(path()?)?.identifier())),
            "is_alias" => match arguments.first() {
                Some(Value::Text(alias)) => Ok(Value::Boolean(self.is_alias(alias))),
                _ => Err(Error::evaluation("is_alias expects a name")),
            },
            _ => Err(Error::capability(name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        builder::{Ready, With},
        dialect::{GenericBuilder, MySqlBuilder, PostgreSqlBuilder, SqliteBuilder},
        resolver::{ColumnReference, TableReference},
        schema::{ColumnBuilder, NamespaceBuilder, TableBuilder},
    };
    use serde_json::json;

    fn shop() -> Rc<Namespace> {
        NamespaceBuilder::new()
            .name("shop")
            .with(
                TableBuilder::new()
                    .name("orders")
                    .with(("id", DataType::Integer))
                    .with(("customer_id", DataType::Integer))
                    .with(("total", DataType::Float))
                    .primary_key(["id"]),
            )
            .with(
                TableBuilder::new()
                    .name("customers")
                    .with(("id", DataType::Integer))
                    .with(
                        ColumnBuilder::new()
                            .name("name")
                            .data_type(DataType::String)
                            .not_null()
                            .default_value("anonymous"),
                    ),
            )
            .build()
    }

    #[test]
    fn test_parameter_occurrences() {
        let builder = MySqlBuilder::new();
        let mut context = StatementContext::new(&builder, StructureResolver::new(shop()));
        let tokens: Vec<String> = (0..3).map(|_| context.parameter("id").unwrap()).collect();
        assert_eq!(tokens, vec!["?", "?", "?"]);
        let descriptor = context.parameters().get("id").unwrap();
        assert_eq!(descriptor.normalized_name(), "id");
        assert_eq!(descriptor.positions(), &[0, 1, 2]);
    }

    #[test]
    fn test_compile() {
        let builder = PostgreSqlBuilder::new();
        let mut context = StatementContext::new(&builder, StructureResolver::new(shop()));
        let sql = context
            .compile(json!({"orders.customer_id": ":cid", ">": ["orders.total", ":min"]}))
            .unwrap();
        assert_eq!(
            sql,
            r#""orders"."customer_id" = $1 AND "orders"."total" > $2"#
        );
        let sql = context.compile("customers.id IN (:cid, 3)").unwrap();
        assert_eq!(sql, r#""customers"."id" IN ($1, 3)"#);
        let error = context.compile("orders.nope = 1").unwrap_err();
        println!("{error}");
        assert_eq!(error, Error::resolution("orders.nope", ElementKind::Column));
        assert!(matches!(context.compile("a = 'open"), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_compile_operand_grouping() {
        let builder = MySqlBuilder::new();
        let mut context = StatementContext::new(&builder, StructureResolver::new(shop()));
        let sql = context
            .compile(json!({"=": [{"-": [-5]}, "orders.id"], "orders.customer_id": 1}))
            .unwrap();
        assert_eq!(sql, "-(-5) = `orders`.`id` AND `orders`.`customer_id` = 1");
        let sql = context.compile("- -5 = orders.id").unwrap();
        assert_eq!(sql, "-(-5) = `orders`.`id`");
        assert!(!sql.contains("--"));
        let sql = context
            .compile(json!({"*": [{"+": ["orders.total", 1]}, 2]}))
            .unwrap();
        assert_eq!(sql, "(`orders`.`total` + 1) * 2");
        let sql = context
            .render(&Expr::not(Expr::and(
                Expr::col("orders.id"),
                Expr::col("orders.customer_id"),
            )))
            .unwrap();
        assert_eq!(sql, "NOT (`orders`.`id` AND `orders`.`customer_id`)");
    }

    #[test]
    fn test_failed_compile_keeps_parameters() {
        let builder = MySqlBuilder::new();
        let mut context = StatementContext::new(&builder, StructureResolver::new(shop()));
        assert!(context
            .compile("orders.customer_id = :a AND orders.nope = 1")
            .is_err());
        assert!(context.parameters().is_empty());
        let sql = context.compile("orders.id = :b").unwrap();
        assert_eq!(sql, "`orders`.`id` = ?");
        assert_eq!(context.parameters().len(), 1);
        assert_eq!(context.parameters().occurrences(), 1);
        let statement = context.finish(sql);
        let values = BTreeMap::from([("b".to_string(), Value::from(5))]);
        assert_eq!(statement.positional_values(&values).unwrap(), vec![Value::from(5)]);
    }

    #[test]
    fn test_reset() {
        let builder = PostgreSqlBuilder::new();
        let mut context = StatementContext::new(&builder, StructureResolver::new(shop()));
        assert_eq!(
            context.compile("orders.customer_id = :cid").unwrap(),
            r#""orders"."customer_id" = $1"#
        );
        context.reset();
        assert!(context.parameters().is_empty());
        assert_eq!(
            context.compile("orders.id = :id").unwrap(),
            r#""orders"."id" = $1"#
        );
        assert!(context.parameters().get("cid").is_none());
    }

    #[test]
    fn test_aliases() {
        let builder = GenericBuilder::new();
        let namespace = shop();
        let mut context = StatementContext::new(&builder, StructureResolver::new(namespace.clone()));
        context.set_alias("o", namespace.table("orders").unwrap());
        context.set_alias("sub", TableReference::new("sub", vec!["n".to_string()]));
        context.set_alias("n_orders", ColumnReference::new("n_orders", DataType::Integer));
        assert_eq!(context.compile("o.id = sub.n").unwrap(), r#""o"."id" = "sub"."n""#);
        assert_eq!(context.compile("n_orders > 1").unwrap(), r#""n_orders" > 1"#);
        assert!(context.compile("sub.m = 1").is_err());
        // Bare columns resolve against the pivot
        let orders = namespace.table("orders").unwrap();
        let sql = context.scoped(orders, |context| context.compile("total >= 10.5"));
        assert_eq!(sql.unwrap(), r#""total" >= 10.5"#);
        assert!(context.compile("total >= 10.5").is_err());
        assert_eq!(context.resolver().depth(), 0);
    }

    #[test]
    fn test_finish() {
        let builder = SqliteBuilder::new();
        let mut context = StatementContext::new(&builder, StructureResolver::new(shop()));
        let condition = context
            .render(&Expr::or(
                Expr::eq(Expr::col("orders.id"), Expr::param("id")),
                Expr::eq(Expr::col("orders.customer_id"), Expr::param("customer-id")),
            ))
            .unwrap();
        assert_eq!(
            condition,
            r#""orders"."id" = :id OR "orders"."customer_id" = :customer_id"#
        );
        context.set_parameter_default("customer-id", 7).unwrap();
        assert!(context.set_parameter_default("other", 7).is_err());
        let statement = context.finish(format!("SELECT * FROM orders WHERE {condition}"));
        println!("{}", serde_json::to_string(&statement).unwrap());
        let values = BTreeMap::from([("id".to_string(), Value::from(1))]);
        assert_eq!(
            statement.positional_values(&values).unwrap(),
            vec![Value::from(1), Value::from(7)]
        );
        assert!(statement.positional_values(&BTreeMap::new()).is_err());
    }

    #[test]
    fn test_capabilities() {
        let builder = MySqlBuilder::new();
        let namespace = shop();
        let mut context = StatementContext::new(&builder, StructureResolver::new(namespace.clone()));
        assert_eq!(
            context.invoke("escape_identifier", &[Value::from("id")]).unwrap(),
            Value::from("`id`")
        );
        assert_eq!(
            context.invoke("find_column", &[Value::from("orders.id")]).unwrap(),
            Value::from("shop.orders.id")
        );
        assert_eq!(
            context.invoke("is_alias", &[Value::from("o")]).unwrap(),
            Value::from(false)
        );
        assert!(matches!(
            context.invoke("vacuum", &[]),
            Err(Error::Capability(_))
        ));
        let name = namespace.table("customers").unwrap().column("name").unwrap();
        assert_eq!(
            context.column_definition(&name).unwrap(),
            "`name` TEXT NOT NULL DEFAULT 'anonymous'"
        );
    }
}
