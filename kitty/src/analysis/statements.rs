use std::fmt::{Display, Formatter, Result};

use serde::{Deserialize, Serialize};


/// Prefix operators
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum UnaryOp {
    /// Arithmetic negation, `-x`
    Negate,
    /// Logical negation, `!x`
    Not,
}

impl UnaryOp {
    /// Prefix operators bind tighter than any binary operator
    pub const PRECEDENCE: u8 = 6;

    /// The source symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Negate => "-",
            UnaryOp::Not => "!",
        }
    }
}


/// Infix operators
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `%`
    Remainder,
    /// `^`
    Power,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,
    /// `&&`
    And,
    /// `||`
    Or,
    /// `^^` or `xor`
    Xor,
}

impl BinaryOp {
    /// Binding strength, higher binds tighter
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Power => 5,
            BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Remainder => 4,
            BinaryOp::Add | BinaryOp::Subtract => 3,
            BinaryOp::Equal
            | BinaryOp::NotEqual
            | BinaryOp::Less
            | BinaryOp::LessEqual
            | BinaryOp::Greater
            | BinaryOp::GreaterEqual => 2,
            BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => 1,
        }
    }

    /// Only `^` groups from the right
    pub fn is_right_associative(&self) -> bool {
        matches!(self, BinaryOp::Power)
    }

    /// The source symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Remainder => "%",
            BinaryOp::Power => "^",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Xor => "^^",
        }
    }
}


/// An expression tree
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub enum Expression {
    /// Numeric literal
    Number(f64),
    /// Boolean literal
    Bool(bool),
    /// A device read
    Identifier(String),
    /// A prefix operator applied to an operand
    Unary(UnaryOp, Box<Expression>),
    /// An infix operator applied to two operands
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
}

/// Fully parenthesized, so the grouping chosen by the parser is visible
impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Expression::Number(value) => write!(f, "{}", value),
            Expression::Bool(value) => write!(f, "{}", value),
            Expression::Identifier(name) => write!(f, "{}", name),
            Expression::Unary(op, operand) => write!(f, "({}{})", op.symbol(), operand),
            Expression::Binary(op, lhs, rhs) => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
        }
    }
}


/// One item of a `print` statement
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub enum PrintItem {
    /// Quoted text, printed as is
    Text(String),
    /// An expression, printed as its value
    Value(Expression),
}


/// A node of a compiled program.
///
/// The tree owns all of its names and literals and is never changed after parsing,
/// so one compiled program can be executed any number of times.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub enum Instruction {
    /// Evaluate an expression for its value
    Expression(Expression),
    /// Set a device to an absolute value
    SetTo {
        /// Device or group name
        device: String,
        /// The value to set
        value: Expression,
        /// Seconds to hold the action, immediate when absent
        duration: Option<Expression>,
    },
    /// Move a device relative to where it is
    MoveBy {
        /// Device or group name
        device: String,
        /// The amount to move
        amount: Expression,
        /// Seconds to hold the action, immediate when absent
        duration: Option<Expression>,
    },
    /// Run exactly one of two blocks
    If {
        /// Decides the branch
        condition: Expression,
        /// Runs when the condition is truthy
        then_block: Box<Instruction>,
        /// Runs otherwise, if present
        else_block: Option<Box<Instruction>>,
    },
    /// Repeat a block while a condition holds
    While {
        /// Re-evaluated before every iteration
        condition: Expression,
        /// The loop body
        body: Box<Instruction>,
    },
    /// Pause for a number of seconds
    Wait {
        /// Seconds to pause
        duration: Expression,
    },
    /// Write items to the output, separated by spaces
    Print(Vec<PrintItem>),
    /// Describe a device or group on the output
    Info {
        /// Device or group name
        device: String,
    },
    /// Instructions run in order
    Block(Vec<Instruction>),
}

impl Instruction {
    /// Number of instructions directly inside a block, or 1 for anything else
    pub fn len(&self) -> usize {
        match self {
            Instruction::Block(instructions) => instructions.len(),
            _ => 1,
        }
    }

    /// Whether this is a block with nothing in it
    pub fn is_empty(&self) -> bool {
        matches!(self, Instruction::Block(instructions) if instructions.is_empty())
    }
}
