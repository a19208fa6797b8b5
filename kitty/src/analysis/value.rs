use std::fmt::{Display, Formatter, Result};

use serde::{Deserialize, Serialize};

use crate::error::RuntimeError;


/// The result of evaluating an expression
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub enum Value {
    /// A floating point number
    Number(f64),
    /// A boolean
    Bool(bool),
}

impl Value {
    /// Conditions and logical operators accept both types: any non-zero number is true
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(value) => *value,
            Value::Number(value) => *value != 0.0,
        }
    }

    /// The number inside, or a type mismatch naming the operation
    pub fn as_number(&self, operation: &str) -> std::result::Result<f64, RuntimeError> {
        match self {
            Value::Number(value) => Ok(*value),
            Value::Bool(_) => Err(RuntimeError::TypeMismatch {
                operation: operation.to_string(),
                found: self.type_name().to_string(),
            }),
        }
    }

    /// Name of the value's type, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Value::Number(value) => write!(f, "{}", value),
            Value::Bool(value) => write!(f, "{}", value),
        }
    }
}
