use tracing::debug;

use crate::analysis::expression::ExpressionParser;
use crate::analysis::statements::{Expression, Instruction, PrintItem};
use crate::analysis::tokens::{AnnotatedToken, Token, TokenType};
use crate::error::ParseError;


/// Parsing tokens into an instruction tree.
///
/// Statements are handled by recursive descent over a small grammar:
///
/// ```text
/// statement := move_by IDENT by EXPR [for EXPR]
///            | set_to IDENT to EXPR [for EXPR]
///            | if EXPR then block {else if EXPR then block} [else block] end
///            | while EXPR do block end
///            | wait EXPR
///            | print (STRING | EXPR) {, (STRING | EXPR)}
///            | info IDENT
///            | EXPR
/// ```
///
/// Expressions are handed to the [`ExpressionParser`]. `if` and `while` blocks may nest
/// at most [`MAX_NESTING_DEPTH`] deep; an `else if` chain of any length counts once.
pub struct Parser {
    /// The tokens to parse
    tokens: Vec<AnnotatedToken>,
    /// The current location at this point in parsing
    current_token: usize,
    /// Number of `if`/`while` blocks around the current token
    depth: usize,
}

/// Deepest nesting of `if` and `while` blocks a program may use
pub const MAX_NESTING_DEPTH: usize = 64;

impl Parser {
    /// Construct a new parser
    pub fn new(tokens: Vec<AnnotatedToken>) -> Parser {
        Parser { tokens, current_token: 0, depth: 0 }
    }

    /// Parse the whole token sequence into a root block
    pub fn parse(&mut self) -> Result<Instruction, ParseError> {
        self.current_token = 0;
        self.depth = 0;
        let instructions = self.block()?;
        if let Some(token) = self.view() {
            // Only `else` and `end` stop a block early
            return Err(ParseError::UnknownKeywordUsage {
                keyword: token.lexeme.clone(),
                position: token.position,
            });
        }
        debug!(statements = instructions.len(), "parsed program");
        Ok(Instruction::Block(instructions))
    }

    /// Check if we are at the end and need to stop parsing
    fn is_at_end(&self) -> bool {
        self.current_token >= self.tokens.len()
    }

    /// Look at the current token
    fn view(&self) -> Option<&AnnotatedToken> {
        self.tokens.get(self.current_token)
    }

    fn view_type(&self) -> Option<TokenType> {
        self.view().map(|token| token.token.token_type())
    }

    /// Consume a token and advance
    fn advance(&mut self) {
        self.current_token += 1;
    }

    /// Remove any successive command terminators at the current position
    fn strip_separators(&mut self) {
        while self.view_type() == Some(TokenType::EndOfCommand) {
            self.advance();
        }
    }

    /// The error for the current token when something else was expected
    fn unexpected(&self, expected: &str) -> ParseError {
        match self.view() {
            Some(token) => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: token.describe(),
                position: token.position,
            },
            None => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: "end of input".to_string(),
                position: self.end_position(),
            },
        }
    }

    fn end_position(&self) -> usize {
        match self.tokens.last() {
            Some(token) => token.position + token.lexeme.chars().count(),
            None => 0,
        }
    }

    /// Consume a token of the given type or fail
    fn expect(&mut self, token_type: TokenType, expected: &str) -> Result<(), ParseError> {
        if self.view_type() == Some(token_type) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// Consume a connective like `then`, allowing line breaks before it
    fn expect_connective(&mut self, token_type: TokenType, expected: &str) -> Result<(), ParseError> {
        self.strip_separators();
        self.expect(token_type, expected)
    }

    fn device_name(&mut self) -> Result<String, ParseError> {
        match self.view() {
            Some(AnnotatedToken { token: Token::Identifier(name), .. }) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            },
            _ => Err(self.unexpected("a device name")),
        }
    }

    fn expression(&mut self) -> Result<Expression, ParseError> {
        let (expression, next) = ExpressionParser::new(&self.tokens, self.current_token).parse()?;
        self.current_token = next;
        Ok(expression)
    }

    /// An optional `for EXPR` clause
    fn duration(&mut self) -> Result<Option<Expression>, ParseError> {
        if self.view_type() == Some(TokenType::For) {
            self.advance();
            Ok(Some(self.expression()?))
        } else {
            Ok(None)
        }
    }

    /// Statements separated by terminators, up to `else`, `end` or the end of input
    fn block(&mut self) -> Result<Vec<Instruction>, ParseError> {
        let mut instructions = vec![];
        loop {
            self.strip_separators();
            match self.view_type() {
                None | Some(TokenType::Else) | Some(TokenType::End) => break,
                _ => {},
            }
            instructions.push(self.statement()?);
            match self.view_type() {
                None | Some(TokenType::Else) | Some(TokenType::End) | Some(TokenType::EndOfCommand) => {},
                _ => return Err(self.unexpected("end of command")),
            }
        }
        Ok(instructions)
    }

    fn statement(&mut self) -> Result<Instruction, ParseError> {
        let token = match self.view() {
            Some(token) => token,
            None => return Err(self.unexpected("a statement")),
        };
        if token.token.is_keyword() {
            let keyword = token.lexeme.clone();
            let position = token.position;
            match token.token.token_type() {
                TokenType::MoveBy => self.move_by(),
                TokenType::SetTo => self.set_to(),
                TokenType::If => self.nested(position, Parser::if_chain),
                TokenType::While => self.nested(position, Parser::while_loop),
                TokenType::Wait => self.wait(),
                TokenType::Print => self.print(),
                TokenType::Info => {
                    self.advance();
                    Ok(Instruction::Info { device: self.device_name()? })
                },
                _ => Err(ParseError::UnknownKeywordUsage { keyword, position }),
            }
        } else {
            Ok(Instruction::Expression(self.expression()?))
        }
    }

    fn move_by(&mut self) -> Result<Instruction, ParseError> {
        self.advance();
        let device = self.device_name()?;
        self.expect(TokenType::By, "'by'")?;
        let amount = self.expression()?;
        let duration = self.duration()?;
        Ok(Instruction::MoveBy { device, amount, duration })
    }

    fn set_to(&mut self) -> Result<Instruction, ParseError> {
        self.advance();
        let device = self.device_name()?;
        self.expect(TokenType::To, "'to'")?;
        let value = self.expression()?;
        let duration = self.duration()?;
        Ok(Instruction::SetTo { device, value, duration })
    }

    /// Parse a block statement one level deeper, refusing to go past the nesting limit
    fn nested(
        &mut self,
        position: usize,
        parse: fn(&mut Parser) -> Result<Instruction, ParseError>,
    ) -> Result<Instruction, ParseError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::NestingTooDeep { limit: MAX_NESTING_DEPTH, position });
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// `if` with any number of `else if` arms sharing one closing `end`.
    ///
    /// The arms are collected in a loop and folded into nested `If` instructions from the
    /// last one back, so a long chain does not deepen the parser's own call stack.
    fn if_chain(&mut self) -> Result<Instruction, ParseError> {
        let mut arms = vec![];
        let mut otherwise = None;
        loop {
            self.advance();
            let condition = self.expression()?;
            self.expect_connective(TokenType::Then, "'then'")?;
            arms.push((condition, Instruction::Block(self.block()?)));
            if self.view_type() != Some(TokenType::Else) {
                break;
            }
            self.advance();
            if self.view_type() != Some(TokenType::If) {
                otherwise = Some(Box::new(Instruction::Block(self.block()?)));
                break;
            }
        }
        self.expect_connective(TokenType::End, "'end'")?;
        debug!(arms = arms.len(), "parsed if chain");
        let mut folded = otherwise;
        while let Some((condition, then_block)) = arms.pop() {
            let arm = Instruction::If { condition, then_block: Box::new(then_block), else_block: folded };
            folded = Some(Box::new(arm));
        }
        match folded {
            Some(instruction) => Ok(*instruction),
            None => Err(self.unexpected("'if'")),
        }
    }

    fn while_loop(&mut self) -> Result<Instruction, ParseError> {
        self.advance();
        let condition = self.expression()?;
        self.expect_connective(TokenType::Do, "'do'")?;
        let body = Box::new(Instruction::Block(self.block()?));
        self.expect_connective(TokenType::End, "'end'")?;
        Ok(Instruction::While { condition, body })
    }

    fn wait(&mut self) -> Result<Instruction, ParseError> {
        self.advance();
        let duration = self.expression()?;
        Ok(Instruction::Wait { duration })
    }

    fn print(&mut self) -> Result<Instruction, ParseError> {
        self.advance();
        let mut items = vec![];
        loop {
            match self.view() {
                Some(AnnotatedToken { token: Token::Str(text), .. }) => {
                    items.push(PrintItem::Text(text.clone()));
                    self.advance();
                },
                _ => items.push(PrintItem::Value(self.expression()?)),
            }
            if self.view_type() != Some(TokenType::Comma) {
                break;
            }
            self.advance();
        }
        Ok(Instruction::Print(items))
    }
}
