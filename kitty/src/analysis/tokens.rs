use std::fmt::{Display, Formatter, Result};


/// Look up the token for a reserved word, if the word is one.
pub fn keyword_token(word: &str) -> Option<Token> {
    let token = match word {
        "if" => Token::If,
        "else" => Token::Else,
        "while" => Token::While,
        "move_by" => Token::MoveBy,
        "set_to" => Token::SetTo,
        "for" => Token::For,
        "by" => Token::By,
        "to" => Token::To,
        "then" => Token::Then,
        "do" => Token::Do,
        "end" => Token::End,
        "wait" => Token::Wait,
        "print" => Token::Print,
        "info" => Token::Info,
        "xor" => Token::Operator(Operator::Xor),
        "true" => Token::Bool(true),
        "false" => Token::Bool(false),
        _ => return None,
    };
    Some(token)
}

/// Check if a word is reserved by the language
pub fn is_keyword(word: &str) -> bool {
    keyword_token(word).is_some()
}


/// A token with some extra annotations needed for error handling
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotatedToken {
    /// The token to process
    pub token: Token,
    /// The character offset in the input
    pub position: usize,
    /// The string of the current value
    pub lexeme: String,
}

impl AnnotatedToken {
    /// Describe the token for a diagnostic
    pub fn describe(&self) -> String {
        match self.token {
            Token::EndOfCommand => "end of command".to_string(),
            _ => format!("'{}'", self.lexeme),
        }
    }
}


/// Operator symbols.
///
/// Whether `-` is a negation or a subtraction is decided by the parser from its position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `^`
    Caret,
    /// `==` or a lone `=`
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
    /// `!`
    Not,
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let symbol = match self {
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Star => "*",
            Operator::Slash => "/",
            Operator::Percent => "%",
            Operator::Caret => "^",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::Less => "<",
            Operator::LessEqual => "<=",
            Operator::Greater => ">",
            Operator::GreaterEqual => ">=",
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Xor => "^^",
            Operator::Not => "!",
        };
        write!(f, "{}", symbol)
    }
}


/// Basic tokens that a command might include
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    /// Numeric literal
    Number(f64),
    /// Boolean literal, `true` or `false`
    Bool(bool),
    /// A device name
    Identifier(String),
    /// Quoted text, only accepted by `print`
    Str(String),
    /// An arithmetic, comparison or logical operator
    Operator(Operator),
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// Separates the items of a `print`
    Comma,
    /// Start a conditional
    If,
    /// Alternative branch of a conditional
    Else,
    /// Start a loop
    While,
    /// Relative device move
    MoveBy,
    /// Absolute device set
    SetTo,
    /// Introduces the duration of a device action
    For,
    /// Introduces the amount of a move
    By,
    /// Introduces the value of a set
    To,
    /// Ends the condition of an `if`
    Then,
    /// Ends the condition of a `while`
    Do,
    /// Closes an `if` or `while` block
    End,
    /// Pause before the next statement
    Wait,
    /// Write text and values to the console
    Print,
    /// Describe a device or group
    Info,
    /// A `;` or a line break
    EndOfCommand,
}

/// The kind of a token without its payload
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenType {
    /// Numeric literal
    Number,
    /// Boolean literal
    Bool,
    /// A device name
    Identifier,
    /// Quoted text
    Str,
    /// Any operator
    Operator,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `,`
    Comma,
    /// `if`
    If,
    /// `else`
    Else,
    /// `while`
    While,
    /// `move_by`
    MoveBy,
    /// `set_to`
    SetTo,
    /// `for`
    For,
    /// `by`
    By,
    /// `to`
    To,
    /// `then`
    Then,
    /// `do`
    Do,
    /// `end`
    End,
    /// `wait`
    Wait,
    /// `print`
    Print,
    /// `info`
    Info,
    /// `;` or a line break
    EndOfCommand,
}

impl Token {
    /// The payload-free kind of this token
    pub fn token_type(&self) -> TokenType {
        match self {
            Token::Number(_) => TokenType::Number,
            Token::Bool(_) => TokenType::Bool,
            Token::Identifier(_) => TokenType::Identifier,
            Token::Str(_) => TokenType::Str,
            Token::Operator(_) => TokenType::Operator,
            Token::LeftParen => TokenType::LeftParen,
            Token::RightParen => TokenType::RightParen,
            Token::Comma => TokenType::Comma,
            Token::If => TokenType::If,
            Token::Else => TokenType::Else,
            Token::While => TokenType::While,
            Token::MoveBy => TokenType::MoveBy,
            Token::SetTo => TokenType::SetTo,
            Token::For => TokenType::For,
            Token::By => TokenType::By,
            Token::To => TokenType::To,
            Token::Then => TokenType::Then,
            Token::Do => TokenType::Do,
            Token::End => TokenType::End,
            Token::Wait => TokenType::Wait,
            Token::Print => TokenType::Print,
            Token::Info => TokenType::Info,
            Token::EndOfCommand => TokenType::EndOfCommand,
        }
    }

    /// Whether the token is a reserved word other than a boolean literal
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Token::If | Token::Else | Token::While | Token::MoveBy | Token::SetTo
                | Token::For | Token::By | Token::To | Token::Then | Token::Do | Token::End
                | Token::Wait | Token::Print | Token::Info
        )
    }

    /// Whether something must follow this token before the command can end.
    ///
    /// A line break after one of these continues the command instead of ending it.
    pub fn awaits_operand(&self) -> bool {
        matches!(
            self,
            Token::Operator(_) | Token::LeftParen | Token::Comma | Token::If | Token::Else
                | Token::While | Token::MoveBy | Token::SetTo | Token::For | Token::By | Token::To
                | Token::Then | Token::Do | Token::Wait | Token::Print | Token::Info
        )
    }
}
