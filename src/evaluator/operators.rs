//! Arity-indexed operator tables
//!
//! The grammar looks operators up by token in the unary and binary tables,
//! the Polish form looks them up by `(token, arity)`.

use itertools::Itertools;
use log::debug;
use paste::paste;
use std::collections::{BTreeMap, HashMap};

use super::{Error, Result};
use crate::expr::{BinaryOperator, Expr, Position, UnaryOperator};

/// Build an expression from its operands
pub type Constructor = fn(Vec<Expr>) -> Result<Expr>;

/// The number of operands an entry accepts
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Any,
}

/// Sides of a token that must be separated from their neighbours by whitespace
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Boundary {
    pub left: bool,
    pub right: bool,
}

impl Boundary {
    pub const NONE: Boundary = Boundary {
        left: false,
        right: false,
    };
    pub const LEFT: Boundary = Boundary {
        left: true,
        right: false,
    };
    pub const RIGHT: Boundary = Boundary {
        left: false,
        right: true,
    };
    pub const BOTH: Boundary = Boundary {
        left: true,
        right: true,
    };
}

/// A grammar operator
#[derive(Clone, Copy, Debug)]
pub struct OperatorEntry {
    pub constructor: Constructor,
    pub position: Position,
    pub boundary: Boundary,
}

impl OperatorEntry {
    pub fn new(constructor: Constructor, position: Position, boundary: Boundary) -> Self {
        OperatorEntry {
            constructor,
            position,
            boundary,
        }
    }
}

fn unary(operator: UnaryOperator, operands: Vec<Expr>) -> Result<Expr> {
    let [operand]: [Expr; 1] = operands.try_into().map_err(|operands: Vec<Expr>| {
        Error::evaluation(format!(
            "{} expects 1 operand, got {}",
            operator,
            operands.len()
        ))
    })?;
    Ok(Expr::unary(operator, operand))
}

fn binary(operator: BinaryOperator, operands: Vec<Expr>) -> Result<Expr> {
    let [left, right]: [Expr; 2] = operands.try_into().map_err(|operands: Vec<Expr>| {
        Error::evaluation(format!(
            "{} expects 2 operands, got {}",
            operator,
            operands.len()
        ))
    })?;
    Ok(Expr::binary(operator, left, right))
}

/// Chain two or more operands left to right
fn chain(operator: BinaryOperator, operands: Vec<Expr>) -> Result<Expr> {
    if operands.len() < 2 {
        return Err(Error::evaluation(format!(
            "{} expects at least 2 operands, got {}",
            operator,
            operands.len()
        )));
    }
    operands
        .into_iter()
        .reduce(|left, right| Expr::binary(operator, left, right))
        .ok_or_else(|| Error::evaluation(operator))
}

/// The first operand tested against the list of the others
fn membership(operator: BinaryOperator, operands: Vec<Expr>) -> Result<Expr> {
    let mut operands = operands.into_iter();
    let subject = operands
        .next()
        .ok_or_else(|| Error::evaluation(format!("{} expects a subject", operator)))?;
    Ok(Expr::binary(operator, subject, Expr::list(operands.collect())))
}

fn between(operands: Vec<Expr>) -> Result<Expr> {
    let [expr, low, high]: [Expr; 3] = operands.try_into().map_err(|operands: Vec<Expr>| {
        Error::evaluation(format!(
            "BETWEEN expects 3 operands, got {}",
            operands.len()
        ))
    })?;
    Ok(Expr::between(expr, low, high))
}

macro_rules! unary_constructors {
    ($( $Operator:ident ),*) => {
        paste! {
            $(fn [<unary_ $Operator:snake>](operands: Vec<Expr>) -> Result<Expr> {
                unary(UnaryOperator::$Operator, operands)
            })*
        }
    };
}

unary_constructors!(Not, Minus, Plus, BitwiseNot, Exists, IsNull, IsNotNull);

macro_rules! binary_constructors {
    ($( $Operator:ident ),*) => {
        paste! {
            $(fn [<binary_ $Operator:snake>](operands: Vec<Expr>) -> Result<Expr> {
                binary(BinaryOperator::$Operator, operands)
            })*
        }
    };
}

binary_constructors!(
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
    NotLike,
    In,
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

macro_rules! variadic_constructors {
    ($( $Operator:ident ),*) => {
        paste! {
            $(fn [<chain_ $Operator:snake>](operands: Vec<Expr>) -> Result<Expr> {
                chain(BinaryOperator::$Operator, operands)
            })*
        }
    };
}

variadic_constructors!(And, Or, Xor, StringConcat);

fn any_in(operands: Vec<Expr>) -> Result<Expr> {
    membership(BinaryOperator::In, operands)
}

fn any_not_in(operands: Vec<Expr>) -> Result<Expr> {
    membership(BinaryOperator::NotIn, operands)
}

/// The operator tables of an evaluator
#[derive(Clone, Debug)]
pub struct Operators {
    unary: BTreeMap<String, OperatorEntry>,
    binary: BTreeMap<String, OperatorEntry>,
    polish: HashMap<(String, Arity), Constructor>,
}

impl Operators {
    /// Tables without any operator
    pub fn empty() -> Self {
        Operators {
            unary: BTreeMap::new(),
            binary: BTreeMap::new(),
            polish: HashMap::new(),
        }
    }

    /// Register a unary grammar operator, also usable in Polish form with one operand
    pub fn with_unary(mut self, token: &str, entry: OperatorEntry) -> Self {
        let token = token.to_lowercase();
        self.polish
            .insert((token.clone(), Arity::Exact(1)), entry.constructor);
        self.unary.insert(token, entry);
        self
    }

    /// Register a binary grammar operator, also usable in Polish form with two operands
    pub fn with_binary(mut self, token: &str, constructor: Constructor, boundary: Boundary) -> Self {
        let token = token.to_lowercase();
        self.polish
            .insert((token.clone(), Arity::Exact(2)), constructor);
        self.binary.insert(
            token,
            OperatorEntry::new(constructor, Position::Infix, boundary),
        );
        self
    }

    /// Register a Polish-only operator
    pub fn with_polish(mut self, token: &str, arity: Arity, constructor: Constructor) -> Self {
        self.polish.insert((token.to_lowercase(), arity), constructor);
        self
    }

    pub fn unary(&self, token: &str) -> Option<&OperatorEntry> {
        self.unary.get(token)
    }

    pub fn binary(&self, token: &str) -> Option<&OperatorEntry> {
        self.binary.get(token)
    }

    /// The unary tokens, longest first
    pub fn unary_tokens(&self) -> Vec<&str> {
        longest_first(self.unary.keys())
    }

    /// The binary tokens, longest first
    pub fn binary_tokens(&self) -> Vec<&str> {
        longest_first(self.binary.keys())
    }

    /// The Polish constructor for `token` applied to `arity` operands.
    /// An exact arity entry wins over a wildcard one.
    pub fn polish(&self, token: &str, arity: usize) -> Option<Constructor> {
        let token = token.to_lowercase();
        if let Some(constructor) = self.polish.get(&(token.clone(), Arity::Exact(arity))) {
            return Some(*constructor);
        }
        let constructor = self.polish.get(&(token.clone(), Arity::Any)).copied();
        if constructor.is_some() {
            debug!("No {arity}-ary entry for `{token}`, falling back to the variadic one");
        }
        constructor
    }
}

fn longest_first<'a, I: Iterator<Item = &'a String>>(tokens: I) -> Vec<&'a str> {
    tokens
        .map(String::as_str)
        .sorted_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)))
        .collect()
}

impl Default for Operators {
    fn default() -> Self {
        let prefix = |constructor: Constructor, boundary: Boundary| {
            OperatorEntry::new(constructor, Position::Prefix, boundary)
        };
        let postfix = |constructor: Constructor| {
            OperatorEntry::new(constructor, Position::Postfix, Boundary::LEFT)
        };
        Operators::empty()
            // Unary
            .with_unary("not", prefix(unary_not, Boundary::RIGHT))
            .with_unary("-", prefix(unary_minus, Boundary::NONE))
            .with_unary("+", prefix(unary_plus, Boundary::NONE))
            .with_unary("~", prefix(unary_bitwise_not, Boundary::NONE))
            .with_unary("exists", prefix(unary_exists, Boundary::RIGHT))
            .with_unary("is null", postfix(unary_is_null))
            .with_unary("is not null", postfix(unary_is_not_null))
            // Symbolic binary
            .with_binary("=", binary_eq, Boundary::NONE)
            .with_binary("<>", binary_not_eq, Boundary::NONE)
            .with_binary("!=", binary_not_eq, Boundary::NONE)
            .with_binary("<", binary_lt, Boundary::NONE)
            .with_binary("<=", binary_lt_eq, Boundary::NONE)
            .with_binary(">", binary_gt, Boundary::NONE)
            .with_binary(">=", binary_gt_eq, Boundary::NONE)
            .with_binary("+", binary_plus, Boundary::NONE)
            .with_binary("-", binary_minus, Boundary::NONE)
            .with_binary("*", binary_multiply, Boundary::NONE)
            .with_binary("/", binary_divide, Boundary::NONE)
            .with_binary("%", binary_modulo, Boundary::NONE)
            .with_binary("||", binary_string_concat, Boundary::NONE)
            .with_binary("&", binary_bitwise_and, Boundary::NONE)
            .with_binary("|", binary_bitwise_or, Boundary::NONE)
            .with_binary("^", binary_bitwise_xor, Boundary::NONE)
            .with_binary("<<", binary_shift_left, Boundary::NONE)
            .with_binary(">>", binary_shift_right, Boundary::NONE)
            // Keyword binary
            .with_binary("and", binary_and, Boundary::BOTH)
            .with_binary("or", binary_or, Boundary::BOTH)
            .with_binary("xor", binary_xor, Boundary::BOTH)
            .with_binary("like", binary_like, Boundary::BOTH)
            .with_binary("not like", binary_not_like, Boundary::BOTH)
            .with_binary("in", binary_in, Boundary::BOTH)
            .with_binary("not in", binary_not_in, Boundary::BOTH)
            .with_binary("is", binary_is, Boundary::BOTH)
            .with_binary("is not", binary_is_not, Boundary::BOTH)
            // Polish only
            .with_polish("between", Arity::Exact(3), between)
            .with_polish("and", Arity::Any, chain_and)
            .with_polish("or", Arity::Any, chain_or)
            .with_polish("xor", Arity::Any, chain_xor)
            .with_polish("||", Arity::Any, chain_string_concat)
            .with_polish("in", Arity::Any, any_in)
            .with_polish("not in", Arity::Any, any_not_in)
    }
}
