//! # Kitty
//!
//! This crate defines a small scripting language for sequencing servo and LED commands,
//! along with the device table it runs against and a line-buffered console.
//!
//! A command goes through three stages: the [`Tokenizer`](analysis::Tokenizer) splits it
//! into tokens, the [`Parser`](analysis::Parser) builds an
//! [`Instruction`](analysis::Instruction) tree and the
//! [`Interpreter`](analysis::Interpreter) walks that tree, handing device actions to a
//! driver from the `kitty_driver` crate. Text a program prints is collected by the
//! interpreter for the caller to show.
#![warn(missing_docs)]

/// Tokenizer, parser and interpreter
pub mod analysis;
/// Registered devices and groups
pub mod devices;
/// Host configuration files
pub mod config;
/// Line-buffered command console
pub mod console;
/// Defines error types
pub mod error;

use kitty_driver::ActionSink;

use crate::analysis::{Instruction, Interpreter, Parser, Tokenizer, Value};
use crate::devices::DeviceTable;
use crate::error::KittyError;


/// Tokenize and parse a complete program
pub fn compile(source: &str) -> Result<Instruction, KittyError> {
    let tokens = Tokenizer::new().tokenize(source)?;
    Ok(Parser::new(tokens).parse()?)
}

/// Compile and execute a program once with default interpreter options.
///
/// Returns the value of the last bare expression statement, if there was one.
pub fn run<S: ActionSink>(source: &str, devices: &DeviceTable, sink: S) -> Result<Option<Value>, KittyError> {
    let program = compile(source)?;
    let mut interpreter = Interpreter::new(sink);
    interpreter.execute(&program, devices)?;
    Ok(interpreter.last_value())
}
