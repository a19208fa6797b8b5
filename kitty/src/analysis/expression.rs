use crate::analysis::statements::{BinaryOp, Expression, UnaryOp};
use crate::analysis::tokens::{AnnotatedToken, Operator, Token};
use crate::error::ParseError;


/// An operator waiting on the operator stack
#[derive(Clone, Copy, Debug)]
enum PendingOperator {
    Unary(UnaryOp),
    Binary(BinaryOp),
}

impl PendingOperator {
    fn precedence(&self) -> u8 {
        match self {
            PendingOperator::Unary(_) => UnaryOp::PRECEDENCE,
            PendingOperator::Binary(op) => op.precedence(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum StackEntry {
    Operator { operator: PendingOperator, position: usize },
    LeftParen { position: usize },
}


fn unary_operator(operator: Operator) -> Option<UnaryOp> {
    match operator {
        Operator::Minus => Some(UnaryOp::Negate),
        Operator::Not => Some(UnaryOp::Not),
        _ => None,
    }
}

fn binary_operator(operator: Operator) -> Option<BinaryOp> {
    let op = match operator {
        Operator::Plus => BinaryOp::Add,
        Operator::Minus => BinaryOp::Subtract,
        Operator::Star => BinaryOp::Multiply,
        Operator::Slash => BinaryOp::Divide,
        Operator::Percent => BinaryOp::Remainder,
        Operator::Caret => BinaryOp::Power,
        Operator::Equal => BinaryOp::Equal,
        Operator::NotEqual => BinaryOp::NotEqual,
        Operator::Less => BinaryOp::Less,
        Operator::LessEqual => BinaryOp::LessEqual,
        Operator::Greater => BinaryOp::Greater,
        Operator::GreaterEqual => BinaryOp::GreaterEqual,
        Operator::And => BinaryOp::And,
        Operator::Or => BinaryOp::Or,
        Operator::Xor => BinaryOp::Xor,
        Operator::Not => return None,
    };
    Some(op)
}

fn unexpected(expected: &str, token: Option<&AnnotatedToken>, fallback_position: usize) -> ParseError {
    match token {
        Some(token) => ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: token.describe(),
            position: token.position,
        },
        None => ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: "end of input".to_string(),
            position: fallback_position,
        },
    }
}


/// Operator precedence parsing of a single expression.
///
/// This is the two-stack shunting-yard algorithm: operands go on one stack, operators and
/// open parentheses on the other, and an operator is reduced into the operand stack once an
/// incoming operator no longer binds tighter. Everything is iterative, so nesting depth is
/// bounded by the stacks and not by the call stack.
pub struct ExpressionParser<'a> {
    tokens: &'a [AnnotatedToken],
    current_token: usize,
    operands: Vec<Expression>,
    operators: Vec<StackEntry>,
}

impl<'a> ExpressionParser<'a> {
    /// Prepare to parse an expression starting at `start`
    pub fn new(tokens: &'a [AnnotatedToken], start: usize) -> ExpressionParser<'a> {
        ExpressionParser { tokens, current_token: start, operands: vec![], operators: vec![] }
    }

    /// Parse one expression.
    ///
    /// The expression ends at the first token that cannot continue it. Returns the
    /// expression and the index of that token.
    pub fn parse(mut self) -> Result<(Expression, usize), ParseError> {
        let tokens = self.tokens;
        let mut expect_operand = true;
        while let Some(annotated) = tokens.get(self.current_token) {
            let position = annotated.position;
            if expect_operand {
                match &annotated.token {
                    Token::Number(value) => {
                        self.operands.push(Expression::Number(*value));
                        expect_operand = false;
                    },
                    Token::Bool(value) => {
                        self.operands.push(Expression::Bool(*value));
                        expect_operand = false;
                    },
                    Token::Identifier(name) => {
                        self.operands.push(Expression::Identifier(name.clone()));
                        expect_operand = false;
                    },
                    Token::LeftParen => self.operators.push(StackEntry::LeftParen { position }),
                    Token::Operator(operator) => match unary_operator(*operator) {
                        Some(op) => self.operators.push(StackEntry::Operator {
                            operator: PendingOperator::Unary(op),
                            position,
                        }),
                        None => return Err(unexpected("an operand", Some(annotated), position)),
                    },
                    Token::RightParen if !self.has_open_paren() => {
                        return Err(ParseError::UnbalancedParens { position })
                    },
                    _ => return Err(unexpected("an operand", Some(annotated), position)),
                }
            } else {
                match &annotated.token {
                    Token::Operator(operator) => {
                        let op = match binary_operator(*operator) {
                            Some(op) => op,
                            None => return Err(unexpected("a binary operator", Some(annotated), position)),
                        };
                        self.push_binary(op, position)?;
                        expect_operand = true;
                    },
                    Token::RightParen => self.close_paren(position)?,
                    _ => break,
                }
            }
            self.current_token += 1;
        }
        if expect_operand {
            return Err(unexpected("an operand", None, self.end_position()));
        }
        while let Some(entry) = self.operators.pop() {
            match entry {
                StackEntry::LeftParen { position } => return Err(ParseError::UnbalancedParens { position }),
                StackEntry::Operator { operator, position } => self.reduce(operator, position)?,
            }
        }
        match (self.operands.pop(), self.operands.is_empty()) {
            (Some(expression), true) => Ok((expression, self.current_token)),
            _ => Err(unexpected("a single expression", tokens.get(self.current_token), self.end_position())),
        }
    }

    /// Reduce everything that binds at least as tightly, then push the incoming operator
    fn push_binary(&mut self, incoming: BinaryOp, position: usize) -> Result<(), ParseError> {
        while let Some(StackEntry::Operator { operator, position: top_position }) = self.operators.last().copied() {
            let binds_first = if incoming.is_right_associative() {
                operator.precedence() > incoming.precedence()
            } else {
                operator.precedence() >= incoming.precedence()
            };
            if !binds_first {
                break;
            }
            self.operators.pop();
            self.reduce(operator, top_position)?;
        }
        self.operators.push(StackEntry::Operator { operator: PendingOperator::Binary(incoming), position });
        Ok(())
    }

    /// Reduce operators down to the matching `(`
    fn close_paren(&mut self, position: usize) -> Result<(), ParseError> {
        loop {
            match self.operators.pop() {
                None => return Err(ParseError::UnbalancedParens { position }),
                Some(StackEntry::LeftParen { .. }) => return Ok(()),
                Some(StackEntry::Operator { operator, position }) => self.reduce(operator, position)?,
            }
        }
    }

    /// Pop the operands of an operator and push the combined expression
    fn reduce(&mut self, operator: PendingOperator, position: usize) -> Result<(), ParseError> {
        let missing = || ParseError::UnexpectedToken {
            expected: "an operand".to_string(),
            found: "nothing".to_string(),
            position,
        };
        let expression = match operator {
            PendingOperator::Unary(op) => {
                let operand = self.operands.pop().ok_or_else(missing)?;
                Expression::Unary(op, Box::new(operand))
            },
            PendingOperator::Binary(op) => {
                let rhs = self.operands.pop().ok_or_else(missing)?;
                let lhs = self.operands.pop().ok_or_else(missing)?;
                Expression::Binary(op, Box::new(lhs), Box::new(rhs))
            },
        };
        self.operands.push(expression);
        Ok(())
    }

    fn has_open_paren(&self) -> bool {
        self.operators.iter().any(|entry| matches!(entry, StackEntry::LeftParen { .. }))
    }

    /// Position just past the last token, used when input runs out
    fn end_position(&self) -> usize {
        match self.tokens.last() {
            Some(token) => token.position + token.lexeme.chars().count(),
            None => 0,
        }
    }
}
