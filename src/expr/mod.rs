//! # `Expr` definition and manipulation
//!
//! `Expr` is the typed tree of one SQL expression fragment:
//! literals, bind parameters, column and table references, function calls,
//! operators and `CASE` constructs.
//!
//! An `Expr` renders itself through a [`StatementContext`], which resolves
//! references against the schema and formats literals for one dialect.
//!
pub mod identifier;
pub mod operator;

use itertools::Itertools;
use paste::paste;
use std::{cmp, error, fmt, rc::Rc, result};

use crate::{
    context::{self, StatementContext},
    data_type::{DataType, DataTyped, Value},
};

pub use identifier::Identifier;
pub use operator::{BinaryOperator, Position, UnaryOperator};

// Error management

#[derive(Debug, Clone)]
pub enum Error {
    InvalidExpression(String),
    InvalidConversion(String),
    Other(String),
}

impl Error {
    pub fn invalid_expression(expr: impl fmt::Display) -> Error {
        Error::InvalidExpression(format!("{} is invalid", expr))
    }
    pub fn invalid_conversion(from: impl fmt::Display, to: impl fmt::Display) -> Error {
        Error::InvalidConversion(format!("Invalid conversion from {} to {}", from, to))
    }
    pub fn other<T: fmt::Display>(desc: T) -> Error {
        Error::Other(desc.to_string())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidExpression(desc) => writeln!(f, "InvalidExpression: {}", desc),
            Error::InvalidConversion(desc) => writeln!(f, "InvalidConversion: {}", desc),
            Error::Other(err) => writeln!(f, "{}", err),
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;

/// Each expression variant must comply with this trait
pub trait Variant:
    TryFrom<Expr> + Into<Expr> + Clone + fmt::Debug + fmt::Display + cmp::PartialEq + DataTyped
{
}

/// A literal value with its declared type
#[derive(Clone, Debug, PartialEq)]
pub struct Literal {
    value: Value,
    data_type: DataType,
}

impl Literal {
    /// A literal typed after its value
    pub fn new(value: Value) -> Literal {
        let data_type = value.data_type();
        Literal { value, data_type }
    }

    /// A literal rendered as a value of `data_type`
    pub fn typed(value: Value, data_type: DataType) -> Literal {
        Literal { value, data_type }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

impl DataTyped for Literal {
    fn data_type(&self) -> DataType {
        self.data_type
    }
}

/// A named bind parameter
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    name: String,
}

impl Parameter {
    pub fn new<S: Into<String>>(name: S) -> Parameter {
        Parameter { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.name)
    }
}

impl DataTyped for Parameter {
    fn data_type(&self) -> DataType {
        DataType::Undefined
    }
}

/// A column reference
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    path: Identifier,
}

impl Column {
    pub fn new<I: Into<Identifier>>(path: I) -> Column {
        Column { path: path.into() }
    }

    pub fn path(&self) -> &Identifier {
        &self.path
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.path.fmt(f)
    }
}

impl DataTyped for Column {
    fn data_type(&self) -> DataType {
        DataType::Undefined
    }
}

/// A table reference
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    path: Identifier,
}

impl Table {
    pub fn new<I: Into<Identifier>>(path: I) -> Table {
        Table { path: path.into() }
    }

    pub fn path(&self) -> &Identifier {
        &self.path
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.path.fmt(f)
    }
}

impl DataTyped for Table {
    fn data_type(&self) -> DataType {
        DataType::Undefined
    }
}

/// SQL text emitted verbatim
#[derive(Clone, Debug, PartialEq)]
pub struct Preformatted {
    text: String,
    data_type: DataType,
}

impl Preformatted {
    pub fn new<S: Into<String>>(text: S, data_type: DataType) -> Preformatted {
        Preformatted {
            text: text.into(),
            data_type,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Preformatted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl DataTyped for Preformatted {
    fn data_type(&self) -> DataType {
        self.data_type
    }
}

/// A function call
#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    name: String,
    /// Argumants
    pub arguments: Vec<Rc<Expr>>,
}

impl Function {
    pub fn new<S: Into<String>>(name: S, arguments: Vec<Rc<Expr>>) -> Function {
        Function {
            name: name.into(),
            arguments,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> Vec<&Expr> {
        self.arguments.iter().map(|x| x.as_ref()).collect()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.arguments.iter().join(", "))
    }
}

impl DataTyped for Function {
    fn data_type(&self) -> DataType {
        DataType::Undefined
    }
}

/// A list of expressions joined by a separator
#[derive(Clone, Debug, PartialEq)]
pub struct List {
    pub items: Vec<Rc<Expr>>,
    separator: String,
}

impl List {
    pub const SEPARATOR: &'static str = ", ";

    pub fn new(items: Vec<Rc<Expr>>) -> List {
        List::with_separator(items, List::SEPARATOR)
    }

    pub fn with_separator<S: Into<String>>(items: Vec<Rc<Expr>>, separator: S) -> List {
        List {
            items,
            separator: separator.into(),
        }
    }

    pub fn items(&self) -> Vec<&Expr> {
        self.items.iter().map(|x| x.as_ref()).collect()
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }
}

impl fmt::Display for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.items.iter().join(&self.separator))
    }
}

impl DataTyped for List {
    fn data_type(&self) -> DataType {
        DataType::Undefined
    }
}

/// An expression between parentheses
#[derive(Clone, Debug, PartialEq)]
pub struct Parenthesis {
    inner: Rc<Expr>,
}

impl Parenthesis {
    pub fn new(inner: Rc<Expr>) -> Parenthesis {
        Parenthesis { inner }
    }

    pub fn inner(&self) -> &Expr {
        &self.inner
    }
}

impl fmt::Display for Parenthesis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.inner)
    }
}

impl DataTyped for Parenthesis {
    fn data_type(&self) -> DataType {
        self.inner.data_type()
    }
}

/// A unary operation
#[derive(Clone, Debug, PartialEq)]
pub struct UnaryOp {
    operator: UnaryOperator,
    operand: Rc<Expr>,
    data_type: DataType,
}

impl UnaryOp {
    pub fn new(operator: UnaryOperator, operand: Rc<Expr>, data_type: DataType) -> UnaryOp {
        UnaryOp {
            operator,
            operand,
            data_type,
        }
    }

    pub fn operator(&self) -> UnaryOperator {
        self.operator
    }

    pub fn operand(&self) -> &Expr {
        &self.operand
    }

    /// Whether the rendered operand must be wrapped to keep this operation's meaning
    fn groups(&self, rendered: &str) -> bool {
        let symbolic = !self.operator.is_keyword();
        let binds = self.operand.precedence().map_or(false, |precedence| {
            precedence < self.operator.precedence()
                || precedence == self.operator.precedence()
                    && self.operator.position() == Position::Postfix
                || self.operator == UnaryOperator::Exists
        });
        // `-` followed by `-` opens a comment
        binds || symbolic && rendered.starts_with(['-', '+'])
    }

    /// Write the operation from its operand rendered by `render`
    fn write<E, F: FnMut(&Expr) -> result::Result<String, E>>(
        &self,
        render: &mut F,
    ) -> result::Result<String, E> {
        let operand = render(self.operand())?;
        let operand = if self.groups(&operand) {
            format!("({})", operand)
        } else {
            operand
        };
        Ok(match (self.operator.position(), self.operator.is_keyword()) {
            (Position::Postfix, _) => format!("{} {}", operand, self.operator),
            (_, true) => format!("{} {}", self.operator, operand),
            (_, false) => format!("{}{}", self.operator, operand),
        })
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.write(&mut |e: &Expr| Ok::<_, fmt::Error>(e.to_string()))?)
    }
}

impl DataTyped for UnaryOp {
    fn data_type(&self) -> DataType {
        self.data_type
            .or(self.operator.data_type())
            .or(self.operand.data_type())
    }
}

/// A binary operation
#[derive(Clone, Debug, PartialEq)]
pub struct BinaryOp {
    operator: BinaryOperator,
    left: Rc<Expr>,
    right: Rc<Expr>,
    data_type: DataType,
}

impl BinaryOp {
    pub fn new(
        operator: BinaryOperator,
        left: Rc<Expr>,
        right: Rc<Expr>,
        data_type: DataType,
    ) -> BinaryOp {
        BinaryOp {
            operator,
            left,
            right,
            data_type,
        }
    }

    pub fn operator(&self) -> BinaryOperator {
        self.operator
    }

    pub fn left(&self) -> &Expr {
        &self.left
    }

    pub fn right(&self) -> &Expr {
        &self.right
    }

    /// Whether `operand`, standing on the `right` or the left of `operator`, must be wrapped
    fn groups(operator: BinaryOperator, operand: &Expr, right: bool) -> bool {
        match operand {
            Expr::BinaryOp(inner) => {
                let (outer, inner) = (operator, inner.operator);
                inner.precedence() < outer.precedence()
                    || inner != outer && (inner.is_bitwise() || outer.is_bitwise())
                    || inner.precedence() == outer.precedence()
                        && (outer.is_comparison()
                            || right && !(inner == outer && outer.is_associative()))
            }
            Expr::UnaryOp(inner) => inner.operator.precedence() <= operator.precedence(),
            _ => false,
        }
    }

    /// Write the operation from its operands rendered by `render`
    fn write<E, F: FnMut(&Expr) -> result::Result<String, E>>(
        &self,
        render: &mut F,
    ) -> result::Result<String, E> {
        let mut operand = |operand: &Expr, right: bool| -> result::Result<String, E> {
            let rendered = render(operand)?;
            Ok(if BinaryOp::groups(self.operator, operand, right) {
                format!("({})", rendered)
            } else {
                rendered
            })
        };
        let left = operand(self.left(), false)?;
        let right = match self.right() {
            // The range of a `BETWEEN` is not a conjunction
            Expr::BinaryOp(range)
                if self.operator == BinaryOperator::Between
                    && range.operator == BinaryOperator::And =>
            {
                format!(
                    "{} AND {}",
                    operand(range.left(), true)?,
                    operand(range.right(), true)?
                )
            }
            Expr::List(_) if self.operator.is_membership() => {
                format!("({})", operand(self.right(), true)?)
            }
            right => operand(right, true)?,
        };
        Ok(format!("{} {} {}", left, self.operator, right))
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.write(&mut |e: &Expr| Ok::<_, fmt::Error>(e.to_string()))?)
    }
}

impl DataTyped for BinaryOp {
    fn data_type(&self) -> DataType {
        if self.operator.is_boolean() {
            DataType::Boolean
        } else {
            self.data_type
                .or(self.left.data_type())
                .or(self.right.data_type())
        }
    }
}

/// A `CASE [subject] WHEN .. THEN .. [ELSE ..] END` construct
#[derive(Clone, Debug, PartialEq)]
pub struct CaseWhen {
    subject: Option<Rc<Expr>>,
    arms: Vec<(Rc<Expr>, Rc<Expr>)>,
    else_branch: Option<Rc<Expr>>,
}

impl CaseWhen {
    pub fn new(
        subject: Option<Rc<Expr>>,
        arms: Vec<(Rc<Expr>, Rc<Expr>)>,
        else_branch: Option<Rc<Expr>>,
    ) -> CaseWhen {
        CaseWhen {
            subject,
            arms,
            else_branch,
        }
    }

    pub fn subject(&self) -> Option<&Expr> {
        self.subject.as_deref()
    }

    pub fn arms(&self) -> Vec<(&Expr, &Expr)> {
        self.arms.iter().map(|(w, t)| (w.as_ref(), t.as_ref())).collect()
    }

    pub fn else_branch(&self) -> Option<&Expr> {
        self.else_branch.as_deref()
    }

    fn join(subject: Option<String>, arms: Vec<(String, String)>, else_branch: Option<String>) -> String {
        let mut parts = vec!["CASE".to_string()];
        parts.extend(subject);
        for (when, then) in arms {
            parts.push(format!("WHEN {} THEN {}", when, then));
        }
        parts.extend(else_branch.map(|e| format!("ELSE {}", e)));
        parts.push("END".to_string());
        parts.join(" ")
    }
}

impl fmt::Display for CaseWhen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&CaseWhen::join(
            self.subject.as_ref().map(|s| s.to_string()),
            self.arms
                .iter()
                .map(|(w, t)| (w.to_string(), t.to_string()))
                .collect(),
            self.else_branch.as_ref().map(|e| e.to_string()),
        ))
    }
}

impl DataTyped for CaseWhen {
    fn data_type(&self) -> DataType {
        self.arms
            .iter()
            .map(|(_, then)| then.data_type())
            .chain(self.else_branch.iter().map(|e| e.data_type()))
            .find(|data_type| data_type.is_defined())
            .unwrap_or_default()
    }
}

/// A Expr enum
/// inspired by: https://docs.rs/sqlparser/latest/sqlparser/ast/enum.Expr.html
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Parameter(Parameter),
    Column(Column),
    Table(Table),
    Preformatted(Preformatted),
    Function(Function),
    List(List),
    Parenthesis(Parenthesis),
    UnaryOp(UnaryOp),
    BinaryOp(BinaryOp),
    CaseWhen(CaseWhen),
}

/// Basic constructors
/// They are short because they are supposed to be the primary API for the module
impl Expr {
    pub fn val<V: Into<Value>>(value: V) -> Expr {
        Expr::Literal(Literal::new(value.into()))
    }

    pub fn typed_val<V: Into<Value>>(value: V, data_type: DataType) -> Expr {
        Expr::Literal(Literal::typed(value.into(), data_type))
    }

    pub fn null() -> Expr {
        Expr::val(Value::Null)
    }

    pub fn param<S: Into<String>>(name: S) -> Expr {
        Expr::Parameter(Parameter::new(name))
    }

    pub fn col<I: Into<Identifier>>(path: I) -> Expr {
        Expr::Column(Column::new(path))
    }

    pub fn table<I: Into<Identifier>>(path: I) -> Expr {
        Expr::Table(Table::new(path))
    }

    pub fn raw<S: Into<String>>(text: S) -> Expr {
        Expr::Preformatted(Preformatted::new(text, DataType::Undefined))
    }

    pub fn function<S: Into<String>, E: Into<Expr>>(name: S, arguments: Vec<E>) -> Expr {
        Expr::Function(Function::new(
            name,
            arguments.into_iter().map(|e| Rc::new(e.into())).collect(),
        ))
    }

    pub fn list<E: Into<Expr>>(items: Vec<E>) -> Expr {
        Expr::List(List::new(
            items.into_iter().map(|e| Rc::new(e.into())).collect(),
        ))
    }

    pub fn parenthesis<E: Into<Expr>>(inner: E) -> Expr {
        Expr::Parenthesis(Parenthesis::new(Rc::new(inner.into())))
    }

    pub fn unary<E: Into<Expr>>(operator: UnaryOperator, operand: E) -> Expr {
        Expr::UnaryOp(UnaryOp::new(
            operator,
            Rc::new(operand.into()),
            DataType::Undefined,
        ))
    }

    pub fn binary<L: Into<Expr>, R: Into<Expr>>(
        operator: BinaryOperator,
        left: L,
        right: R,
    ) -> Expr {
        Expr::BinaryOp(BinaryOp::new(
            operator,
            Rc::new(left.into()),
            Rc::new(right.into()),
            DataType::Undefined,
        ))
    }

    pub fn case<S: Into<Expr>, W: Into<Expr>, T: Into<Expr>, E: Into<Expr>>(
        subject: Option<S>,
        arms: Vec<(W, T)>,
        else_branch: Option<E>,
    ) -> Expr {
        Expr::CaseWhen(CaseWhen::new(
            subject.map(|s| Rc::new(s.into())),
            arms.into_iter()
                .map(|(w, t)| (Rc::new(w.into()), Rc::new(t.into())))
                .collect(),
            else_branch.map(|e| Rc::new(e.into())),
        ))
    }

    /// Chain expressions with `AND`, left to right
    pub fn and_iter<I: IntoIterator<Item = Expr>>(exprs: I) -> Option<Expr> {
        exprs.into_iter().reduce(Expr::and)
    }
}

/// Implement unary operator constructors
macro_rules! impl_unary_constructors {
    ($( $Operator:ident ),*) => {
        impl Expr {
            paste! {
                $(pub fn [<$Operator:snake>]<E: Into<Expr>>(operand: E) -> Expr {
                    Expr::unary(UnaryOperator::$Operator, operand)
                }
                )*
            }
        }
    };
}

impl_unary_constructors!(Not, Exists, IsNull, IsNotNull, BitwiseNot);

impl Expr {
    pub fn opposite<E: Into<Expr>>(operand: E) -> Expr {
        Expr::unary(UnaryOperator::Minus, operand)
    }
}

/// Implement binary operator constructors
macro_rules! impl_binary_constructors {
    ($( $Operator:ident ),*) => {
        impl Expr {
            paste! {
                $(
                    pub fn [<$Operator:snake>]<L: Into<Expr>, R: Into<Expr>>(left: L, right: R) -> Expr {
                        Expr::binary(BinaryOperator::$Operator, left, right)
                    }
                )*
            }
        }
    };
}

impl_binary_constructors!(
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
    NotLike,
    NotIn,
    Is,
    IsNot,
    And,
    Or,
    Xor,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    StringConcat,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    ShiftLeft,
    ShiftRight
);

impl Expr {
    pub fn in_list<L: Into<Expr>, R: Into<Expr>>(left: L, right: R) -> Expr {
        Expr::binary(BinaryOperator::In, left, right)
    }

    pub fn between<E: Into<Expr>, L: Into<Expr>, H: Into<Expr>>(expr: E, low: L, high: H) -> Expr {
        Expr::binary(BinaryOperator::Between, expr, Expr::and(low, high))
    }
}

/// Implement basic Variant conversions
macro_rules! impl_conversions {
    ( $Variant:ident ) => {
        impl From<$Variant> for Expr {
            fn from(v: $Variant) -> Self {
                Expr::$Variant(v)
            }
        }

        impl TryFrom<Expr> for $Variant {
            type Error = Error;

            fn try_from(expr: Expr) -> Result<Self> {
                if let Expr::$Variant(v) = expr {
                    Ok(v)
                } else {
                    Err(Error::invalid_conversion(expr, stringify!($Variant)))
                }
            }
        }

        impl Variant for $Variant {}
    };
}

/// Implement Expr traits
macro_rules! impl_traits {
    ( $( $Variant:ident ),* ) => {
        impl fmt::Display for Expr {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Expr::$Variant(variant) => variant.fmt(f),)*
                }
            }
        }

        impl DataTyped for Expr {
            fn data_type(&self) -> DataType {
                match self {
                    $(Expr::$Variant(variant) => variant.data_type(),)*
                }
            }
        }

        $(impl_conversions!($Variant);)*
    }
}

impl_traits!(
    Literal,
    Parameter,
    Column,
    Table,
    Preformatted,
    Function,
    List,
    Parenthesis,
    UnaryOp,
    BinaryOp,
    CaseWhen
);

impl Variant for Expr {}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr::val(value)
    }
}

/// Scalars convert into literals
macro_rules! impl_literal_conversions {
    ( $( $Type:ty ),* ) => {
        $(impl From<$Type> for Expr {
            fn from(value: $Type) -> Self {
                Expr::val(value)
            }
        })*
    };
}

impl_literal_conversions!(bool, i32, i64, f64, &str, String);

impl Expr {
    /// The binding strength of the top operator, `None` for self-delimited expressions
    pub fn precedence(&self) -> Option<u8> {
        match self {
            Expr::UnaryOp(u) => Some(u.operator().precedence()),
            Expr::BinaryOp(b) => Some(b.operator().precedence()),
            _ => None,
        }
    }

    /// The direct sub-expressions, in rendering order
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Literal(_)
            | Expr::Parameter(_)
            | Expr::Column(_)
            | Expr::Table(_)
            | Expr::Preformatted(_) => vec![],
            Expr::Function(f) => f.arguments(),
            Expr::List(l) => l.items(),
            Expr::Parenthesis(p) => vec![p.inner()],
            Expr::UnaryOp(u) => vec![u.operand()],
            Expr::BinaryOp(b) => vec![b.left(), b.right()],
            Expr::CaseWhen(c) => c
                .subject()
                .into_iter()
                .chain(c.arms().into_iter().flat_map(|(w, t)| [w, t]))
                .chain(c.else_branch())
                .collect(),
        }
    }

    /// Depth-first traversal calling `callback` on each node before its children
    pub fn visit<F: FnMut(&Expr)>(&self, callback: &mut F) {
        callback(self);
        for child in self.children() {
            child.visit(callback);
        }
    }

    fn collect_columns<'a>(&'a self, columns: &mut Vec<&'a Identifier>) {
        if let Expr::Column(column) = self {
            columns.push(column.path());
        }
        for child in self.children() {
            child.collect_columns(columns);
        }
    }

    /// Collect the column paths, in order of appearance
    pub fn columns(&self) -> Vec<&Identifier> {
        let mut columns = vec![];
        self.collect_columns(&mut columns);
        columns.into_iter().unique().collect()
    }

    /// Collect the parameter names, in order of appearance
    pub fn parameters(&self) -> Vec<String> {
        let mut parameters = vec![];
        self.visit(&mut |expr| {
            if let Expr::Parameter(parameter) = expr {
                parameters.push(parameter.name().to_string());
            }
        });
        parameters.into_iter().unique().collect()
    }

    /// Render the expression as SQL text for the context's dialect
    pub fn render(&self, context: &mut StatementContext) -> context::Result<String> {
        Ok(match self {
            Expr::Literal(l) => context.literal(l.value(), l.data_type())?,
            Expr::Parameter(p) => context.parameter(p.name())?,
            Expr::Column(c) => context.render_column(c.path())?,
            Expr::Table(t) => context.render_table(t.path())?,
            Expr::Preformatted(p) => p.text().to_string(),
            Expr::Function(f) => format!(
                "{}({})",
                f.name(),
                f.arguments
                    .iter()
                    .map(|a| a.render(context))
                    .collect::<context::Result<Vec<_>>>()?
                    .join(", ")
            ),
            Expr::List(l) => l
                .items
                .iter()
                .map(|i| i.render(context))
                .collect::<context::Result<Vec<_>>>()?
                .join(l.separator()),
            Expr::Parenthesis(p) => format!("({})", p.inner().render(context)?),
            Expr::UnaryOp(u) => u.write(&mut |e: &Expr| e.render(context))?,
            Expr::BinaryOp(b) => b.write(&mut |e: &Expr| e.render(context))?,
            Expr::CaseWhen(c) => {
                let subject = c.subject().map(|s| s.render(context)).transpose()?;
                let arms = c
                    .arms()
                    .into_iter()
                    .map(|(w, t)| Ok((w.render(context)?, t.render(context)?)))
                    .collect::<context::Result<Vec<_>>>()?;
                let else_branch = c.else_branch().map(|e| e.render(context)).transpose()?;
                CaseWhen::join(subject, arms, else_branch)
            }
        })
    }

    /// Fold the tree bottom-up with a visitor
    pub fn accept<T, V: Visitor<T>>(&self, visitor: &V) -> T {
        match self {
            Expr::Literal(l) => visitor.literal(l),
            Expr::Parameter(p) => visitor.parameter(p),
            Expr::Column(c) => visitor.column(c),
            Expr::Table(t) => visitor.table(t),
            Expr::Preformatted(p) => visitor.preformatted(p),
            Expr::Function(f) => visitor.function(
                f,
                f.arguments.iter().map(|a| a.accept(visitor)).collect(),
            ),
            Expr::List(l) => visitor.list(l, l.items.iter().map(|i| i.accept(visitor)).collect()),
            Expr::Parenthesis(p) => visitor.parenthesis(p, p.inner().accept(visitor)),
            Expr::UnaryOp(u) => visitor.unary_op(u, u.operand().accept(visitor)),
            Expr::BinaryOp(b) => {
                visitor.binary_op(b, b.left().accept(visitor), b.right().accept(visitor))
            }
            Expr::CaseWhen(c) => visitor.case_when(
                c,
                c.subject().map(|s| s.accept(visitor)),
                c.arms()
                    .into_iter()
                    .map(|(w, t)| (w.accept(visitor), t.accept(visitor)))
                    .collect(),
                c.else_branch().map(|e| e.accept(visitor)),
            ),
        }
    }
}

// Visitors

/// A Visitor for the type Expr, each node receives the results of its children
pub trait Visitor<T> {
    fn literal(&self, literal: &Literal) -> T;
    fn parameter(&self, parameter: &Parameter) -> T;
    fn column(&self, column: &Column) -> T;
    fn table(&self, table: &Table) -> T;
    fn preformatted(&self, preformatted: &Preformatted) -> T;
    fn function(&self, function: &Function, arguments: Vec<T>) -> T;
    fn list(&self, list: &List, items: Vec<T>) -> T;
    fn parenthesis(&self, parenthesis: &Parenthesis, inner: T) -> T;
    fn unary_op(&self, unary_op: &UnaryOp, operand: T) -> T;
    fn binary_op(&self, binary_op: &BinaryOp, left: T, right: T) -> T;
    fn case_when(
        &self,
        case_when: &CaseWhen,
        subject: Option<T>,
        arms: Vec<(T, T)>,
        else_branch: Option<T>,
    ) -> T;
}

/// Count the nodes by depth
#[derive(Clone, Debug)]
pub struct DepthVisitor;

impl Visitor<usize> for DepthVisitor {
    fn literal(&self, _literal: &Literal) -> usize {
        1
    }

    fn parameter(&self, _parameter: &Parameter) -> usize {
        1
    }

    fn column(&self, _column: &Column) -> usize {
        1
    }

    fn table(&self, _table: &Table) -> usize {
        1
    }

    fn preformatted(&self, _preformatted: &Preformatted) -> usize {
        1
    }

    fn function(&self, _function: &Function, arguments: Vec<usize>) -> usize {
        1 + arguments.into_iter().max().unwrap_or(0)
    }

    fn list(&self, _list: &List, items: Vec<usize>) -> usize {
        1 + items.into_iter().max().unwrap_or(0)
    }

    fn parenthesis(&self, _parenthesis: &Parenthesis, inner: usize) -> usize {
        1 + inner
    }

    fn unary_op(&self, _unary_op: &UnaryOp, operand: usize) -> usize {
        1 + operand
    }

    fn binary_op(&self, _binary_op: &BinaryOp, left: usize, right: usize) -> usize {
        1 + cmp::max(left, right)
    }

    fn case_when(
        &self,
        _case_when: &CaseWhen,
        subject: Option<usize>,
        arms: Vec<(usize, usize)>,
        else_branch: Option<usize>,
    ) -> usize {
        1 + subject
            .into_iter()
            .chain(arms.into_iter().flat_map(|(w, t)| [w, t]))
            .chain(else_branch)
            .max()
            .unwrap_or(0)
    }
}

impl Expr {
    /// The height of the tree
    pub fn depth(&self) -> usize {
        self.accept(&DepthVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let expr = Expr::and(
            Expr::parenthesis(Expr::eq(Expr::col("orders.id"), Expr::param("id"))),
            Expr::is_not_null(Expr::col("customer_id")),
        );
        println!("expr = {expr}");
        assert_eq!(
            expr.to_string(),
            "(orders.id = :id) AND customer_id IS NOT NULL"
        );
        let expr = Expr::in_list(Expr::col("a"), Expr::list(vec![1, 2, 3]));
        assert_eq!(expr.to_string(), "a IN (1, 2, 3)");
        let expr = Expr::not(Expr::opposite(Expr::col("a")));
        assert_eq!(expr.to_string(), "NOT -a");
        let expr = Expr::between(Expr::col("a"), 1, 10);
        assert_eq!(expr.to_string(), "a BETWEEN 1 AND 10");
    }

    #[test]
    fn test_operand_grouping() {
        let (a, b, c) = (Expr::col("a"), Expr::col("b"), Expr::col("c"));
        let expr = Expr::multiply(Expr::plus(a.clone(), 1), 2);
        assert_eq!(expr.to_string(), "(a + 1) * 2");
        let expr = Expr::plus(Expr::multiply(a.clone(), 2), 1);
        assert_eq!(expr.to_string(), "a * 2 + 1");
        let expr = Expr::not(Expr::and(a.clone(), b.clone()));
        assert_eq!(expr.to_string(), "NOT (a AND b)");
        let expr = Expr::and(Expr::not(a.clone()), b.clone());
        assert_eq!(expr.to_string(), "NOT a AND b");
        let expr = Expr::and(a.clone(), Expr::or(b.clone(), c.clone()));
        assert_eq!(expr.to_string(), "a AND (b OR c)");
        let expr = Expr::or(Expr::and(a.clone(), b.clone()), c.clone());
        assert_eq!(expr.to_string(), "a AND b OR c");
        let expr = Expr::minus(a.clone(), Expr::minus(b.clone(), c.clone()));
        assert_eq!(expr.to_string(), "a - (b - c)");
        let expr = Expr::minus(Expr::minus(a.clone(), b.clone()), c.clone());
        assert_eq!(expr.to_string(), "a - b - c");
        let expr = Expr::eq(Expr::eq(a.clone(), b.clone()), true);
        assert_eq!(expr.to_string(), "(a = b) = true");
        let expr = Expr::bitwise_or(Expr::bitwise_xor(a.clone(), b.clone()), c.clone());
        assert_eq!(expr.to_string(), "(a ^ b) | c");
        let expr = Expr::is_null(Expr::plus(a.clone(), 1));
        assert_eq!(expr.to_string(), "a + 1 IS NULL");
        let expr = Expr::is_null(Expr::eq(a.clone(), 1));
        assert_eq!(expr.to_string(), "(a = 1) IS NULL");
        let expr = Expr::between(a.clone(), Expr::minus(b.clone(), 1), Expr::or(c.clone(), 2));
        assert_eq!(expr.to_string(), "a BETWEEN b - 1 AND (c OR 2)");
        let expr = Expr::opposite(Expr::plus(a.clone(), 1));
        assert_eq!(expr.to_string(), "-(a + 1)");
    }

    #[test]
    fn test_signed_operands() {
        // `--` opens a comment
        let expr = Expr::opposite(Expr::val(-5));
        assert_eq!(expr.to_string(), "-(-5)");
        let expr = Expr::opposite(Expr::opposite(Expr::col("a")));
        assert_eq!(expr.to_string(), "-(-a)");
        let expr = Expr::unary(UnaryOperator::Plus, Expr::val(-5));
        assert_eq!(expr.to_string(), "+(-5)");
        let expr = Expr::opposite(Expr::val(5));
        assert_eq!(expr.to_string(), "-5");
        let expr = Expr::minus(Expr::col("a"), -5);
        assert_eq!(expr.to_string(), "a - -5");
    }

    #[test]
    fn test_case_display() {
        let expr = Expr::case(
            Some(Expr::col("status")),
            vec![(Expr::val(1), Expr::val("new")), (Expr::val(2), Expr::val("done"))],
            Some(Expr::val("unknown")),
        );
        assert_eq!(
            expr.to_string(),
            "CASE status WHEN 1 THEN 'new' WHEN 2 THEN 'done' ELSE 'unknown' END"
        );
        let empty = Expr::case(None::<Expr>, Vec::<(Expr, Expr)>::new(), None::<Expr>);
        assert_eq!(empty.to_string(), "CASE END");
    }

    #[test]
    fn test_data_type() {
        assert_eq!(Expr::val(1).data_type(), DataType::Integer);
        assert_eq!(
            Expr::typed_val("2024-01-01", DataType::Timestamp).data_type(),
            DataType::Timestamp
        );
        assert_eq!(Expr::lt(Expr::col("a"), 1).data_type(), DataType::Boolean);
        assert_eq!(Expr::eq(Expr::col("a"), 1).data_type(), DataType::Integer);
        assert_eq!(Expr::plus(Expr::col("a"), 1.5).data_type(), DataType::Float);
        assert_eq!(Expr::plus(Expr::col("a"), Expr::col("b")).data_type(), DataType::Undefined);
        assert_eq!(Expr::opposite(Expr::val(2)).data_type(), DataType::Integer);
        assert_eq!(Expr::is_null(Expr::col("a")).data_type(), DataType::Boolean);
        assert_eq!(Expr::parenthesis(Expr::val(true)).data_type(), DataType::Boolean);
        let case = Expr::case(
            None::<Expr>,
            vec![(Expr::col("a"), Expr::param("x")), (Expr::col("b"), Expr::val(1.))],
            None::<Expr>,
        );
        assert_eq!(case.data_type(), DataType::Float);
        let declared = Expr::BinaryOp(BinaryOp::new(
            BinaryOperator::Plus,
            Rc::new(Expr::val(1)),
            Rc::new(Expr::val(2)),
            DataType::String,
        ));
        assert_eq!(declared.data_type(), DataType::String);
    }

    #[test]
    fn test_visit() {
        let expr = Expr::function(
            "COALESCE",
            vec![Expr::plus(Expr::col("a"), Expr::param("p")), Expr::col("b")],
        );
        let mut names = vec![];
        expr.visit(&mut |e| {
            names.push(match e {
                Expr::Function(_) => "function",
                Expr::BinaryOp(_) => "binary",
                Expr::Column(_) => "column",
                Expr::Parameter(_) => "parameter",
                _ => "other",
            })
        });
        assert_eq!(
            names,
            vec!["function", "binary", "column", "parameter", "column"]
        );
        assert_eq!(expr.depth(), 3);
        assert_eq!(
            expr.columns(),
            vec![&Identifier::from("a"), &Identifier::from("b")]
        );
        assert_eq!(expr.parameters(), vec!["p".to_string()]);
    }

    #[test]
    fn test_conversions() {
        let expr = Expr::col("a.b");
        let column = Column::try_from(expr.clone()).unwrap();
        assert_eq!(column.path().len(), 2);
        assert!(Literal::try_from(expr).is_err());
        let and = Expr::and_iter([Expr::col("a"), Expr::col("b"), Expr::col("c")]).unwrap();
        assert_eq!(and.to_string(), "a AND b AND c");
        assert!(Expr::and_iter(Vec::<Expr>::new()).is_none());
    }
}
