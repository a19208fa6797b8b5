use tracing::debug;

use crate::analysis::tokens::{keyword_token, AnnotatedToken, Operator, Token, TokenType};
use crate::error::LexError;


fn is_identifier_start_char(c: char) -> bool {
    c.is_ascii_alphabetic() | (c == '_')
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() | (c == '_')
}

/// Characters that cannot be glued onto the end of a number literal
fn is_literal_glue_char(c: char) -> bool {
    is_identifier_char(c) | (c == '.')
}


/// Splits commands into tokens and tracks whether a command is complete.
///
/// The same tokenizer can be reused for any number of commands. Completeness refers
/// to the most recently scanned command: parentheses must be balanced, the last token
/// must not be waiting for an operand and every `if`/`while` needs its `end`.
pub struct Tokenizer {
    command: Vec<char>,
    current_index: usize,
    token_start_index: usize,
    paren_depth: usize,
    open_blocks: Vec<&'static str>,
    /// Last token other than a terminator
    last_token: Option<Token>,
    /// The token just before the current one, terminators included
    previous_type: Option<TokenType>,
}


impl Tokenizer {
    /// Build a new tokenizer
    pub fn new() -> Tokenizer {
        Tokenizer {
            command: vec![],
            current_index: 0,
            token_start_index: 0,
            paren_depth: 0,
            open_blocks: vec![],
            last_token: None,
            previous_type: None,
        }
    }

    /// Tokenize a command, failing with [`LexError::Incomplete`] if it needs more input
    pub fn tokenize(&mut self, command: &str) -> Result<Vec<AnnotatedToken>, LexError> {
        let tokens = self.scan(command)?;
        if !self.is_complete() {
            debug!(tokens = tokens.len(), "command is incomplete");
            return Err(LexError::Incomplete);
        }
        Ok(tokens)
    }

    /// Scan the text of a command for tokens without checking completeness
    pub fn scan(&mut self, command: &str) -> Result<Vec<AnnotatedToken>, LexError> {
        self.reset(command);
        let mut tokens: Vec<AnnotatedToken> = vec![];
        while let Some(token) = self.get_next_token()? {
            self.track(&token);
            tokens.push(AnnotatedToken {
                token,
                position: self.token_start_index,
                lexeme: self.command[self.token_start_index..self.current_index].iter().collect(),
            });
        }
        debug!(tokens = tokens.len(), "scanned command");
        Ok(tokens)
    }

    /// Whether the last scanned command can be parsed as it is
    pub fn is_complete(&self) -> bool {
        let dangling = match &self.last_token {
            Some(token) => token.awaits_operand(),
            None => false,
        };
        (self.paren_depth == 0) && !dangling && self.open_blocks.is_empty()
    }

    /// The innermost `if` or `while` still waiting for its `end`
    pub fn open_block(&self) -> Option<&'static str> {
        self.open_blocks.last().copied()
    }

    fn reset(&mut self, command: &str) {
        self.command = command.chars().collect();
        self.current_index = 0;
        self.token_start_index = 0;
        self.paren_depth = 0;
        self.open_blocks.clear();
        self.last_token = None;
        self.previous_type = None;
    }

    /// Update nesting state with a token that was just produced
    fn track(&mut self, token: &Token) {
        match token {
            Token::LeftParen => self.paren_depth += 1,
            // A surplus `)` is left for the parser to report
            Token::RightParen => self.paren_depth = self.paren_depth.saturating_sub(1),
            // Only an `if` right after `else` continues a chain closed by a single `end`
            Token::If if self.previous_type != Some(TokenType::Else) => self.open_blocks.push("if"),
            Token::While => self.open_blocks.push("while"),
            Token::End => {
                self.open_blocks.pop();
            },
            _ => {},
        }
        if *token != Token::EndOfCommand {
            self.last_token = Some(token.clone());
        }
        self.previous_type = Some(token.token_type());
    }

    /// Whether a line break at this point continues the command
    fn line_continues(&self) -> bool {
        if self.paren_depth > 0 {
            return true;
        }
        match &self.last_token {
            Some(token) => token.awaits_operand(),
            None => false,
        }
    }

    /// Retrieve the next token, or `None` once the command is exhausted
    fn get_next_token(&mut self) -> Result<Option<Token>, LexError> {
        loop {
            self.skip_blanks();
            if self.is_at_end() {
                return Ok(None);
            }
            self.token_start_index = self.current_index;
            let next_char = self.advance();
            let token = match next_char {
                '#' => {
                    self.skip_comment();
                    continue;
                },
                '\n' if self.line_continues() => continue,
                '\n' | ';' => Token::EndOfCommand,
                '(' => Token::LeftParen,
                ')' => Token::RightParen,
                ',' => Token::Comma,
                '"' => self.get_string()?,
                '+' => Token::Operator(Operator::Plus),
                '-' => Token::Operator(Operator::Minus),
                '*' => Token::Operator(Operator::Star),
                '/' => Token::Operator(Operator::Slash),
                '%' => Token::Operator(Operator::Percent),
                '^' => self.one_or_two('^', Operator::Xor, Operator::Caret),
                '=' => {
                    self.match_char('=');
                    Token::Operator(Operator::Equal)
                },
                '!' => self.one_or_two('=', Operator::NotEqual, Operator::Not),
                '<' => self.one_or_two('=', Operator::LessEqual, Operator::Less),
                '>' => self.one_or_two('=', Operator::GreaterEqual, Operator::Greater),
                '&' => self.pair('&', Operator::And)?,
                '|' => self.pair('|', Operator::Or)?,
                c if c.is_ascii_digit() => self.get_numeric()?,
                c if is_identifier_start_char(c) => self.get_identifier(),
                other => {
                    return Err(LexError::UnrecognizedCharacter {
                        character: other,
                        position: self.token_start_index,
                    })
                },
            };
            return Ok(Some(token));
        }
    }

    /// Check if we are at the end of the command
    fn is_at_end(&self) -> bool {
        self.current_index >= self.command.len()
    }

    /// Look at the current character without consuming it
    fn view(&self) -> Option<char> {
        self.command.get(self.current_index).copied()
    }

    /// Consume a character, move to the next one, and return
    fn advance(&mut self) -> char {
        self.current_index += 1;
        self.command[self.current_index - 1]
    }

    /// Consume the next character if it is the expected one
    fn match_char(&mut self, expected: char) -> bool {
        if self.view() == Some(expected) {
            self.current_index += 1;
            true
        } else {
            false
        }
    }

    fn one_or_two(&mut self, second: char, long: Operator, short: Operator) -> Token {
        if self.match_char(second) {
            Token::Operator(long)
        } else {
            Token::Operator(short)
        }
    }

    /// Operators that only exist as a doubled character, like `&&`
    fn pair(&mut self, second: char, operator: Operator) -> Result<Token, LexError> {
        if self.match_char(second) {
            Ok(Token::Operator(operator))
        } else {
            Err(LexError::UnrecognizedCharacter {
                character: self.command[self.token_start_index],
                position: self.token_start_index,
            })
        }
    }

    /// Skip spaces and tabs but not line breaks, which end commands
    fn skip_blanks(&mut self) {
        while let Some(c) = self.view() {
            if c.is_whitespace() && c != '\n' {
                self.current_index += 1;
            } else {
                break;
            }
        }
    }

    /// Skip to the end of the line, leaving the line break in place
    fn skip_comment(&mut self) {
        while let Some(c) = self.view() {
            if c == '\n' {
                break;
            }
            self.current_index += 1;
        }
    }

    fn consume_digits(&mut self) -> usize {
        let start = self.current_index;
        while let Some(c) = self.view() {
            if !c.is_ascii_digit() {
                break;
            }
            self.current_index += 1;
        }
        self.current_index - start
    }

    /// Get a numeric literal: digits with an optional fraction
    fn get_numeric(&mut self) -> Result<Token, LexError> {
        self.consume_digits();
        let mut malformed = false;
        if self.match_char('.') && self.consume_digits() == 0 {
            malformed = true;
        }
        if let Some(c) = self.view() {
            if is_literal_glue_char(c) {
                malformed = true;
            }
        }
        if malformed {
            while let Some(c) = self.view() {
                if !is_literal_glue_char(c) {
                    break;
                }
                self.current_index += 1;
            }
            return Err(self.malformed_literal());
        }
        let text: String = self.command[self.token_start_index..self.current_index].iter().collect();
        match text.parse::<f64>() {
            Ok(value) => Ok(Token::Number(value)),
            Err(_) => Err(self.malformed_literal()),
        }
    }

    fn malformed_literal(&self) -> LexError {
        LexError::UnterminatedLiteral {
            lexeme: self.command[self.token_start_index..self.current_index].iter().collect(),
            position: self.token_start_index,
        }
    }

    /// Get quoted text. `\"`, `\\` and `\n` are the only escapes and the text must end on
    /// the line it starts.
    fn get_string(&mut self) -> Result<Token, LexError> {
        let mut text = String::new();
        loop {
            match self.view() {
                None | Some('\n') => return Err(self.malformed_literal()),
                Some('"') => {
                    self.current_index += 1;
                    return Ok(Token::Str(text));
                },
                Some('\\') => {
                    self.current_index += 1;
                    match self.view() {
                        Some(c @ ('"' | '\\')) => {
                            text.push(c);
                            self.current_index += 1;
                        },
                        Some('n') => {
                            text.push('\n');
                            self.current_index += 1;
                        },
                        _ => text.push('\\'),
                    }
                },
                Some(c) => {
                    text.push(c);
                    self.current_index += 1;
                },
            }
        }
    }

    /// Get an identifier or keyword
    fn get_identifier(&mut self) -> Token {
        while let Some(c) = self.view() {
            if !is_identifier_char(c) {
                break;
            }
            self.current_index += 1;
        }
        let word: String = self.command[self.token_start_index..self.current_index].iter().collect();
        match keyword_token(&word) {
            Some(keyword) => keyword,
            None => Token::Identifier(word),
        }
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Tokenizer::new()
    }
}
