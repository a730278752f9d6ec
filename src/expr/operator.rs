use std::fmt;

use crate::data_type::DataType;

/// Where an operator stands relatively to its operands
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Position {
    Prefix,
    Infix,
    Postfix,
}

/// The list of unary operators
/// inspired by: https://docs.rs/sqlparser/latest/sqlparser/ast/enum.UnaryOperator.html
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Minus,
    Plus,
    BitwiseNot,
    Exists,
    IsNull,
    IsNotNull,
}

impl UnaryOperator {
    pub fn position(self) -> Position {
        match self {
            UnaryOperator::IsNull | UnaryOperator::IsNotNull => Position::Postfix,
            _ => Position::Prefix,
        }
    }

    /// Keyword operators are separated from their operand by a space
    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            UnaryOperator::Not
                | UnaryOperator::Exists
                | UnaryOperator::IsNull
                | UnaryOperator::IsNotNull
        )
    }

    /// Binding strength, on the same scale as `BinaryOperator::precedence`
    pub fn precedence(self) -> u8 {
        match self {
            UnaryOperator::Not => 4,
            UnaryOperator::IsNull | UnaryOperator::IsNotNull => 5,
            UnaryOperator::Minus
            | UnaryOperator::Plus
            | UnaryOperator::BitwiseNot
            | UnaryOperator::Exists => 11,
        }
    }

    /// The type of the result, `Undefined` when it is the operand's type
    pub fn data_type(self) -> DataType {
        match self {
            UnaryOperator::Not
            | UnaryOperator::Exists
            | UnaryOperator::IsNull
            | UnaryOperator::IsNotNull => DataType::Boolean,
            UnaryOperator::Minus | UnaryOperator::Plus | UnaryOperator::BitwiseNot => {
                DataType::Undefined
            }
        }
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOperator::Not => "NOT",
            UnaryOperator::Minus => "-",
            UnaryOperator::Plus => "+",
            UnaryOperator::BitwiseNot => "~",
            UnaryOperator::Exists => "EXISTS",
            UnaryOperator::IsNull => "IS NULL",
            UnaryOperator::IsNotNull => "IS NOT NULL",
        })
    }
}

/// The list of binary operators
/// inspired by: https://docs.rs/sqlparser/latest/sqlparser/ast/enum.BinaryOperator.html
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum BinaryOperator {
    // Equality
    Eq,
    NotEq,
    // Comparison
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
    Between,
    // Logic
    And,
    Or,
    Xor,
    // Arithmetic
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
    ShiftRight,
}

impl BinaryOperator {
    /// Comparison and logic operators always produce booleans
    pub fn is_boolean(self) -> bool {
        matches!(
            self,
            BinaryOperator::Lt
                | BinaryOperator::LtEq
                | BinaryOperator::Gt
                | BinaryOperator::GtEq
                | BinaryOperator::Like
                | BinaryOperator::NotLike
                | BinaryOperator::In
                | BinaryOperator::NotIn
                | BinaryOperator::Is
                | BinaryOperator::IsNot
                | BinaryOperator::Between
                | BinaryOperator::And
                | BinaryOperator::Or
                | BinaryOperator::Xor
        )
    }

    pub fn is_membership(self) -> bool {
        matches!(self, BinaryOperator::In | BinaryOperator::NotIn)
    }

    /// Comparisons do not chain: `a = b = c` is never written bare
    pub fn is_comparison(self) -> bool {
        self.precedence() == 5
    }

    /// Dialects disagree on how these bind against other operators
    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            BinaryOperator::BitwiseAnd
                | BinaryOperator::BitwiseOr
                | BinaryOperator::BitwiseXor
                | BinaryOperator::ShiftLeft
                | BinaryOperator::ShiftRight
        )
    }

    /// `a op (b op c)` equals `a op b op c`
    pub fn is_associative(self) -> bool {
        matches!(
            self,
            BinaryOperator::And
                | BinaryOperator::Or
                | BinaryOperator::Xor
                | BinaryOperator::Plus
                | BinaryOperator::Multiply
                | BinaryOperator::StringConcat
                | BinaryOperator::BitwiseAnd
                | BinaryOperator::BitwiseOr
                | BinaryOperator::BitwiseXor
        )
    }

    /// Binding strength, higher binds tighter
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOperator::Or => 1,
            BinaryOperator::Xor => 2,
            BinaryOperator::And => 3,
            BinaryOperator::Eq
            | BinaryOperator::NotEq
            | BinaryOperator::Lt
            | BinaryOperator::LtEq
            | BinaryOperator::Gt
            | BinaryOperator::GtEq
            | BinaryOperator::Like
            | BinaryOperator::NotLike
            | BinaryOperator::In
            | BinaryOperator::NotIn
            | BinaryOperator::Is
            | BinaryOperator::IsNot
            | BinaryOperator::Between => 5,
            BinaryOperator::BitwiseOr | BinaryOperator::BitwiseXor => 6,
            BinaryOperator::BitwiseAnd => 7,
            BinaryOperator::ShiftLeft | BinaryOperator::ShiftRight => 8,
            BinaryOperator::Plus | BinaryOperator::Minus | BinaryOperator::StringConcat => 9,
            BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulo => 10,
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinaryOperator::Eq => "=",
            BinaryOperator::NotEq => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::Like => "LIKE",
            BinaryOperator::NotLike => "NOT LIKE",
            BinaryOperator::In => "IN",
            BinaryOperator::NotIn => "NOT IN",
            BinaryOperator::Is => "IS",
            BinaryOperator::IsNot => "IS NOT",
            BinaryOperator::Between => "BETWEEN",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::Xor => "XOR",
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::StringConcat => "||",
            BinaryOperator::BitwiseAnd => "&",
            BinaryOperator::BitwiseOr => "|",
            BinaryOperator::BitwiseXor => "^",
            BinaryOperator::ShiftLeft => "<<",
            BinaryOperator::ShiftRight => ">>",
        })
    }
}
