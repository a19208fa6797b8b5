use kitty_driver::DriverError;
use thiserror::Error;


/// Errors found while splitting a command into tokens.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum LexError {
    /// A character that does not start any token
    #[error("Unrecognized character '{character}' at position {position}")]
    UnrecognizedCharacter {
        /// The offending character
        character: char,
        /// Character offset into the command
        position: usize,
    },
    /// A malformed number like `1.` or `5abc`, or a string missing its closing quote
    #[error("Malformed literal '{lexeme}' at position {position}")]
    UnterminatedLiteral {
        /// The text of the literal as far as it could be read
        lexeme: String,
        /// Character offset into the command
        position: usize,
    },
    /// The command cannot be finished without more input
    #[error("Command is incomplete")]
    Incomplete,
}

impl LexError {
    /// Whether this only means more input is needed.
    ///
    /// This is the one lexing outcome a line-buffered caller should not report as a failure.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, LexError::Incomplete)
    }
}


/// Errors found while building the instruction tree.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ParseError {
    /// A `)` without its `(` or the other way around
    #[error("Unbalanced parenthesis at position {position}")]
    UnbalancedParens {
        /// Position of the parenthesis that has no partner
        position: usize,
    },
    /// The grammar expected one kind of token and found another
    #[error("Expected {expected}, found {found} at position {position}")]
    UnexpectedToken {
        /// A description of what would have been accepted
        expected: String,
        /// The token that was found instead
        found: String,
        /// Position of the found token
        position: usize,
    },
    /// A keyword appearing where no rule accepts it
    #[error("Keyword '{keyword}' cannot be used at position {position}")]
    UnknownKeywordUsage {
        /// The misplaced keyword
        keyword: String,
        /// Position of the keyword
        position: usize,
    },
    /// Blocks nested deeper than the parser accepts
    #[error("Blocks nested more than {limit} deep at position {position}")]
    NestingTooDeep {
        /// The deepest nesting accepted
        limit: usize,
        /// Position of the keyword opening the block that went too deep
        position: usize,
    },
}


/// Errors raised while executing a program.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum RuntimeError {
    /// `/` or `%` with a zero right hand side
    #[error("Division by zero")]
    DivisionByZero,
    /// An operation applied to a value of the wrong type
    #[error("Type mismatch: '{operation}' cannot be applied to {found}")]
    TypeMismatch {
        /// The operation being evaluated
        operation: String,
        /// What it was given
        found: String,
    },
    /// A name inside an expression that is not a device
    #[error("Unknown identifier '{0}'")]
    UnknownIdentifier(String),
    /// A device statement naming something that is not registered
    #[error("Unknown device '{0}'")]
    UnknownDevice(String),
    /// The driver cannot report the state of a device that was read
    #[error("State of device '{0}' is not available from the driver")]
    StateUnavailable(String),
    /// A device amount that is not a finite number
    #[error("Invalid amount {0}")]
    InvalidAmount(f64),
    /// The driver refused or failed an action
    #[error("Action on device '{device}' failed: {source}")]
    DeviceActionFailed {
        /// The leaf device the action was for
        device: String,
        /// What the driver reported
        source: DriverError,
    },
    /// The driver failed a pause
    #[error("Wait failed: {0}")]
    WaitFailed(#[source] DriverError),
    /// A duration that is negative or not finite
    #[error("Invalid duration {0}")]
    InvalidDuration(f64),
    /// The configured step limit was reached
    #[error("Step limit of {0} exceeded")]
    StepLimitExceeded(u64),
    /// Execution was cancelled from outside
    #[error("Execution cancelled")]
    Cancelled,
}


/// Errors registering devices or loading host configuration.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A device name that is empty, not identifier shaped or a keyword
    #[error("Invalid device name '{0}'")]
    InvalidName(String),
    /// A name that is already taken
    #[error("Device '{0}' is already registered")]
    DuplicateDevice(String),
    /// A group member that has not been registered
    #[error("Group '{group}' has unknown member '{member}'")]
    UnknownMember {
        /// The group being registered
        group: String,
        /// The missing member
        member: String,
    },
    /// A group with no members
    #[error("Group '{0}' has no members")]
    EmptyGroup(String),
    /// A group that would end up containing itself
    #[error("Group '{group}' would contain itself through {}", .path.join(" -> "))]
    CyclicGroup {
        /// The group being registered
        group: String,
        /// The chain of names leading back to the group
        path: Vec<String>,
    },
    /// The configuration file could not be read
    #[error("IO error: {0}")]
    Io(String),
    /// The configuration file is not valid
    #[error("TOML error: {0}")]
    Toml(String),
}


/// Any error the kitty pipeline can produce.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum KittyError {
    /// Tokenizing failed
    #[error("LexError: {0}")]
    Lex(#[from] LexError),
    /// Parsing failed
    #[error("ParseError: {0}")]
    Parse(#[from] ParseError),
    /// Execution failed
    #[error("RuntimeError: {0}")]
    Runtime(#[from] RuntimeError),
    /// Device registration or configuration failed
    #[error("ConfigError: {0}")]
    Config(#[from] ConfigError),
}
