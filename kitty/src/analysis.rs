/// Parsing tokens into an instruction tree
pub mod parser;
/// Low level token representation of the language
pub mod tokens;
/// Tokenizing commands into low level tokens
pub mod tokenizer;
/// Shunting-yard parsing of expressions
pub mod expression;
/// The instruction tree
pub mod statements;
/// Runtime values
pub mod value;
/// Executes instruction trees
pub mod interpreter;

pub use tokenizer::Tokenizer;
pub use tokens::{AnnotatedToken, Operator, Token, TokenType};
pub use expression::ExpressionParser;
pub use parser::Parser;
pub use statements::{BinaryOp, Expression, Instruction, PrintItem, UnaryOp};
pub use value::Value;
pub use interpreter::{CancelHandle, Interpreter, InterpreterOptions};
