//! # Structure resolver
//!
//! Map dotted paths and aliases onto the nodes of a schema.
//!
//! The resolver holds a stack of [`ResolverContext`]s. Each context has a pivot,
//! the element short paths are relative to, its own cache of successful
//! resolutions and its own aliases. Pushing a context starts from an empty scope,
//! popping it restores the enclosing one untouched.
//!
use log::debug;
use std::{collections::HashMap, error, fmt, rc::Rc, result};

use crate::{
    data_type::DataType,
    expr::Identifier,
    schema::{Column, Datasource, Element, ElementKind, Namespace, Table},
};

// Error management

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A path that does not lead to an element of the expected kind
    Resolution {
        path: String,
        kind: ElementKind,
        reason: String,
    },
    Other(String),
}

impl Error {
    pub fn resolution(path: impl fmt::Display, kind: ElementKind) -> Error {
        Error::Resolution {
            path: path.to_string(),
            kind,
            reason: "not found".to_string(),
        }
    }
    pub fn ambiguous(path: impl fmt::Display, kind: ElementKind) -> Error {
        Error::Resolution {
            path: path.to_string(),
            kind,
            reason: "ambiguous".to_string(),
        }
    }
    pub fn other(desc: impl fmt::Display) -> Error {
        Error::Other(desc.to_string())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Resolution { path, kind, reason } => {
                writeln!(f, "ResolutionError: {} `{}` {}", kind, path, reason)
            }
            Error::Other(desc) => writeln!(f, "{}", desc),
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;

/// A derived table, such as an aliased sub-query
#[derive(Clone, Debug, PartialEq)]
pub struct TableReference {
    name: String,
    columns: Vec<String>,
}

impl TableReference {
    /// An empty column list accepts any column
    pub fn new<S: Into<String>>(name: S, columns: Vec<String>) -> Self {
        TableReference {
            name: name.into(),
            columns,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.is_empty() || self.columns.iter().any(|c| c == column)
    }
}

/// A computed result column, such as `SELECT count(*) AS total`
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnReference {
    name: String,
    data_type: DataType,
}

impl ColumnReference {
    pub fn new<S: Into<String>>(name: S, data_type: DataType) -> Self {
        ColumnReference {
            name: name.into(),
            data_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }
}

/// What an alias stands for
#[derive(Clone, Debug, PartialEq)]
pub enum Alias {
    Element(Element),
    Table(TableReference),
    Column(ColumnReference),
}

impl From<Element> for Alias {
    fn from(element: Element) -> Self {
        Alias::Element(element)
    }
}

impl From<Rc<Namespace>> for Alias {
    fn from(namespace: Rc<Namespace>) -> Self {
        Alias::Element(namespace.into())
    }
}

impl From<Rc<Table>> for Alias {
    fn from(table: Rc<Table>) -> Self {
        Alias::Element(table.into())
    }
}

impl From<Rc<Column>> for Alias {
    fn from(column: Rc<Column>) -> Self {
        Alias::Element(column.into())
    }
}

impl From<TableReference> for Alias {
    fn from(table: TableReference) -> Self {
        Alias::Table(table)
    }
}

impl From<ColumnReference> for Alias {
    fn from(column: ColumnReference) -> Self {
        Alias::Column(column)
    }
}

/// One level of resolution scope
#[derive(Clone, Debug)]
pub struct ResolverContext {
    pivot: Element,
    cache: HashMap<ElementKind, HashMap<Identifier, Element>>,
    aliases: HashMap<String, Alias>,
}

impl ResolverContext {
    pub fn new<E: Into<Element>>(pivot: E) -> Self {
        ResolverContext {
            pivot: pivot.into(),
            cache: HashMap::new(),
            aliases: HashMap::new(),
        }
    }

    pub fn pivot(&self) -> &Element {
        &self.pivot
    }

    pub fn cached(&self, kind: ElementKind, path: &Identifier) -> Option<&Element> {
        self.cache.get(&kind)?.get(path)
    }

    /// The number of cached resolutions
    pub fn cache_size(&self) -> usize {
        self.cache.values().map(HashMap::len).sum()
    }

    pub fn aliases(&self) -> &HashMap<String, Alias> {
        &self.aliases
    }

    fn store(&mut self, kind: ElementKind, path: Identifier, element: Element) {
        self.cache.entry(kind).or_default().insert(path, element);
    }
}

/// Resolves paths against a schema, from the pivot of the current context
#[derive(Clone, Debug)]
pub struct StructureResolver {
    /// Never empty, the root context comes first
    stack: Vec<ResolverContext>,
}

impl StructureResolver {
    pub fn new<E: Into<Element>>(pivot: E) -> Self {
        StructureResolver {
            stack: vec![ResolverContext::new(pivot)],
        }
    }

    pub fn context(&self) -> &ResolverContext {
        &self.stack[self.stack.len() - 1]
    }

    fn context_mut(&mut self) -> &mut ResolverContext {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    pub fn pivot(&self) -> &Element {
        self.context().pivot()
    }

    /// The number of nested contexts above the root
    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    /// Open a fresh scope resolving from `pivot`
    pub fn push_context<E: Into<Element>>(&mut self, pivot: E) {
        let context = ResolverContext::new(pivot);
        debug!("Push resolver context on {}", context.pivot);
        self.stack.push(context);
    }

    /// Close the current scope.
    /// Panics when called on the root context.
    pub fn pop_context(&mut self) -> ResolverContext {
        assert!(self.stack.len() > 1, "cannot pop the root resolver context");
        let context = self.stack.pop().expect("a nested context");
        debug!("Pop resolver context on {}", context.pivot);
        context
    }

    /// Run `f` in a nested context, popped whatever `f` returns
    pub fn scoped<E: Into<Element>, T, F: FnOnce(&mut Self) -> T>(&mut self, pivot: E, f: F) -> T {
        self.push_context(pivot);
        let result = f(self);
        self.pop_context();
        result
    }

    /// Install an alias in the current context
    pub fn set_alias<S: Into<String>, A: Into<Alias>>(&mut self, name: S, alias: A) {
        let name = name.into();
        debug!("Alias {name}");
        let context = self.context_mut();
        // Paths starting with the alias must not be served from the cache anymore
        for entries in context.cache.values_mut() {
            entries.retain(|path, _| path.first() != Some(&name));
        }
        context.aliases.insert(name, alias.into());
    }

    pub fn is_alias(&self, name: &str) -> bool {
        self.context().aliases.contains_key(name)
    }

    pub fn alias(&self, name: &str) -> Option<&Alias> {
        self.context().aliases.get(name)
    }

    fn aliased_element(&self, name: &str) -> Option<&Element> {
        match self.alias(name)? {
            Alias::Element(element) => Some(element),
            _ => None,
        }
    }

    /// The datasource above the pivot
    fn datasource(&self) -> Option<Rc<Datasource>> {
        let mut element = Some(self.pivot().clone());
        while let Some(current) = element {
            if let Element::Datasource(datasource) = current {
                return Some(datasource);
            }
            element = current.parent();
        }
        None
    }

    /// The namespace of the pivot
    fn namespace(&self) -> Option<Rc<Namespace>> {
        let mut element = Some(self.pivot().clone());
        while let Some(current) = element {
            if let Element::Namespace(namespace) = current {
                return Some(namespace);
            }
            element = current.parent();
        }
        None
    }

    /// The table a bare column name refers to
    pub fn default_table(&self) -> Option<Rc<Table>> {
        match self.pivot() {
            Element::Table(table) => Some(table.clone()),
            Element::Column(column) => column.table(),
            Element::Namespace(namespace) => match namespace.tables() {
                [table] => Some(table.clone()),
                _ => None,
            },
            Element::Datasource(datasource) => {
                let tables = datasource.tables();
                (tables.len() == 1).then(|| tables.values().next().cloned()).flatten()
            }
        }
    }

    fn cached(&self, kind: ElementKind, path: &Identifier) -> Option<Element> {
        let element = self.context().cached(kind, path).cloned();
        if element.is_some() {
            debug!("Cache hit for {kind} {path}");
        }
        element
    }

    /// Cache a structural resolution
    fn store(&mut self, kind: ElementKind, path: &Identifier, element: Element) {
        if path.first().map_or(false, |head| self.is_alias(head)) {
            return;
        }
        debug!("Resolved {kind} {path} to {}", element);
        self.context_mut().store(kind, path.clone(), element);
    }

    pub fn find_namespace<I: Into<Identifier>>(&mut self, path: I) -> Result<Rc<Namespace>> {
        let path = path.into();
        if let Some(Element::Namespace(namespace)) = self.cached(ElementKind::Namespace, &path) {
            return Ok(namespace);
        }
        let namespace = self
            .resolve_namespace(&path)
            .ok_or_else(|| Error::resolution(&path, ElementKind::Namespace))?;
        self.store(ElementKind::Namespace, &path, namespace.clone().into());
        Ok(namespace)
    }

    fn resolve_namespace(&self, path: &Identifier) -> Option<Rc<Namespace>> {
        match path.segments() {
            [name] => {
                if let Some(Element::Namespace(namespace)) = self.aliased_element(name) {
                    return Some(namespace.clone());
                }
                self.datasource()
                    .and_then(|datasource| datasource.namespace(name))
                    .or_else(|| self.namespace().filter(|namespace| namespace.name() == name))
            }
            [datasource, name] => self
                .datasource()
                .filter(|d| d.name() == datasource)?
                .namespace(name),
            _ => None,
        }
    }

    pub fn find_table<I: Into<Identifier>>(&mut self, path: I) -> Result<Rc<Table>> {
        let path = path.into();
        if let Some(Element::Table(table)) = self.cached(ElementKind::Table, &path) {
            return Ok(table);
        }
        let table = match path.segments() {
            [name] => self.resolve_table(name),
            [namespace, name] => self.find_namespace(namespace.as_str())?.table(name),
            [datasource, namespace, name] => self
                .find_namespace([datasource.as_str(), namespace.as_str()])?
                .table(name),
            _ => None,
        }
        .ok_or_else(|| Error::resolution(&path, ElementKind::Table))?;
        self.store(ElementKind::Table, &path, table.clone().into());
        Ok(table)
    }

    fn resolve_table(&self, name: &str) -> Option<Rc<Table>> {
        if let Some(Element::Table(table)) = self.aliased_element(name) {
            return Some(table.clone());
        }
        if let Element::Table(table) = self.pivot() {
            if table.name() == name {
                return Some(table.clone());
            }
        }
        self.namespace()
            .and_then(|namespace| namespace.table(name))
            .or_else(|| {
                // Unambiguous across namespaces
                self.datasource()?
                    .tables()
                    .get(&[name.to_string()])
                    .cloned()
            })
    }

    pub fn find_column<I: Into<Identifier>>(&mut self, path: I) -> Result<Rc<Column>> {
        let path = path.into();
        if let Some(Element::Column(column)) = self.cached(ElementKind::Column, &path) {
            return Ok(column);
        }
        let missing = || Error::resolution(&path, ElementKind::Column);
        let column = match path.segments() {
            [name] => {
                if let Some(Element::Column(column)) = self.aliased_element(name) {
                    return Ok(column.clone());
                }
                self.default_table()
                    .ok_or_else(|| Error::ambiguous(&path, ElementKind::Column))?
                    .column(name)
            }
            [table, name] => self
                .find_table(table.as_str())
                .map_err(|_| missing())?
                .column(name),
            [namespace, table, name] => self
                .find_table([namespace.as_str(), table.as_str()])
                .map_err(|_| missing())?
                .column(name),
            [datasource, namespace, table, name] => self
                .find_table([datasource.as_str(), namespace.as_str(), table.as_str()])
                .map_err(|_| missing())?
                .column(name),
            _ => None,
        }
        .ok_or_else(missing)?;
        self.store(ElementKind::Column, &path, column.clone().into());
        Ok(column)
    }

    /// Resolve `path` as an element of the given kind
    pub fn find<I: Into<Identifier>>(&mut self, kind: ElementKind, path: I) -> Result<Element> {
        let path = path.into();
        match kind {
            ElementKind::Column => self.find_column(path).map(Element::from),
            ElementKind::Table => self.find_table(path).map(Element::from),
            ElementKind::Namespace => self.find_namespace(path).map(Element::from),
            ElementKind::Datasource => self
                .datasource()
                .filter(|d| path.segments() == [d.name().to_string()])
                .map(Element::from)
                .ok_or_else(|| Error::resolution(&path, ElementKind::Datasource)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        builder::{Ready, With},
        schema::{DatasourceBuilder, NamespaceBuilder, TableBuilder},
    };

    fn shop() -> Rc<Datasource> {
        DatasourceBuilder::new()
            .name("main")
            .with(
                NamespaceBuilder::new()
                    .name("shop")
                    .with(
                        TableBuilder::new()
                            .name("orders")
                            .with(("id", DataType::Integer))
                            .with(("customer_id", DataType::Integer))
                            .primary_key(["id"]),
                    )
                    .with(
                        TableBuilder::new()
                            .name("customers")
                            .with(("id", DataType::Integer))
                            .with(("name", DataType::String)),
                    ),
            )
            .with(
                NamespaceBuilder::new().name("audit").with(
                    TableBuilder::new()
                        .name("events")
                        .with(("id", DataType::Integer)),
                ),
            )
            .build()
    }

    #[test]
    fn test_find_column() {
        let datasource = shop();
        let mut resolver = StructureResolver::new(datasource.namespace("shop").unwrap());
        let column = resolver.find_column("orders.customer_id").unwrap();
        assert_eq!(column.identifier().to_string(), "shop.orders.customer_id");
        let column = resolver.find_column("shop.customers.name").unwrap();
        assert_eq!(column.name(), "name");
        let column = resolver.find_column("main.audit.events.id").unwrap();
        assert_eq!(column.identifier().to_string(), "audit.events.id");
        // Tables of other namespaces are reachable when unambiguous
        assert!(resolver.find_column("events.id").is_ok());
        let error = resolver.find_column("orders.total").unwrap_err();
        println!("{error}");
        assert_eq!(error, Error::resolution("orders.total", ElementKind::Column));
        assert!(resolver.find_table("a.b.c.d").is_err());
    }

    #[test]
    fn test_cache_identity() {
        let datasource = shop();
        let mut resolver = StructureResolver::new(datasource.clone());
        assert_eq!(resolver.context().cache_size(), 0);
        let first = resolver.find_column("shop.orders.id").unwrap();
        let path = Identifier::from("shop.orders.id");
        let cached = resolver
            .context()
            .cached(ElementKind::Column, &path)
            .cloned()
            .unwrap();
        assert!(Rc::ptr_eq(cached.as_column().unwrap(), &first));
        let second = resolver.find_column("shop.orders.id").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        // Failures are not cached
        assert!(resolver.find_column("shop.orders.nope").is_err());
        assert!(resolver
            .context()
            .cached(ElementKind::Column, &Identifier::from("shop.orders.nope"))
            .is_none());
    }

    #[test]
    fn test_default_table() {
        let datasource = shop();
        let mut resolver = StructureResolver::new(datasource.namespace("shop").unwrap());
        let error = resolver.find_column("id").unwrap_err();
        assert_eq!(error, Error::ambiguous("id", ElementKind::Column));
        let mut resolver = StructureResolver::new(datasource.namespace("audit").unwrap());
        assert_eq!(
            resolver.find_column("id").unwrap().identifier().to_string(),
            "audit.events.id"
        );
        let orders = datasource.tables()[["shop", "orders"]].clone();
        let mut resolver = StructureResolver::new(orders.column("id").unwrap());
        assert!(resolver.find_column("customer_id").is_ok());
    }

    #[test]
    fn test_context_stack() {
        let datasource = shop();
        let shop = datasource.namespace("shop").unwrap();
        let orders = shop.table("orders").unwrap();
        let mut resolver = StructureResolver::new(shop.clone());
        resolver.find_column("orders.id").unwrap();
        let cache_size = resolver.context().cache_size();
        resolver.push_context(orders.clone());
        assert_eq!(resolver.depth(), 1);
        assert_eq!(resolver.context().cache_size(), 0);
        resolver.set_alias("o", orders.clone());
        assert!(resolver.is_alias("o"));
        // The pivot is a table, bare names are its columns
        assert!(resolver.find_column("customer_id").is_ok());
        assert!(resolver.find_column("o.id").is_ok());
        resolver.pop_context();
        assert!(!resolver.is_alias("o"));
        assert!(resolver.find_column("o.id").is_err());
        assert_eq!(resolver.context().cache_size(), cache_size);
        assert!(resolver.pivot().ptr_eq(&Element::Namespace(shop)));
        // Scoped contexts are popped on errors too
        let result = resolver.scoped(orders, |resolver| resolver.find_column("nope"));
        assert!(result.is_err());
        assert_eq!(resolver.depth(), 0);
    }

    #[test]
    fn test_aliases() {
        let datasource = shop();
        let shop = datasource.namespace("shop").unwrap();
        let mut resolver = StructureResolver::new(shop.clone());
        resolver.set_alias("c", shop.table("customers").unwrap());
        let column = resolver.find_column("c.name").unwrap();
        assert_eq!(column.identifier().to_string(), "shop.customers.name");
        // Aliased paths stay out of the cache
        assert!(resolver
            .context()
            .cached(ElementKind::Column, &Identifier::from("c.name"))
            .is_none());
        resolver.set_alias("total", ColumnReference::new("total", DataType::Integer));
        assert!(matches!(resolver.alias("total"), Some(Alias::Column(_))));
        // An alias shadows a cached table path
        resolver.find_column("orders.id").unwrap();
        resolver.set_alias("orders", shop.table("customers").unwrap());
        assert!(resolver.find_column("orders.id").is_ok());
        assert!(resolver.find_column("orders.customer_id").is_err());
    }

    #[test]
    #[should_panic]
    fn test_pop_root() {
        let mut resolver = StructureResolver::new(shop());
        resolver.pop_context();
    }
}
