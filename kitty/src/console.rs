use std::io::{self, BufRead, Write};

use kitty_driver::ActionSink;
use tracing::{debug, info};

use crate::analysis::{Interpreter, Parser, Tokenizer, Value};
use crate::devices::DeviceTable;
use crate::error::KittyError;


const PROMPT: &str = "kitty> ";
const CONTINUATION_PROMPT: &str = "... ";


/// What happened to a line fed to the console
#[derive(Clone, Debug, PartialEq)]
pub enum LineOutcome {
    /// The command is not finished yet
    NeedMore,
    /// The command ran, with the value of its last bare expression if any
    Executed(Option<Value>),
    /// The command failed and was discarded
    Failed(KittyError),
    /// The user asked to leave
    Quit,
}


/// A line-buffered console.
///
/// Lines are accumulated until they form a complete command, which is then compiled and
/// run against the device table. Errors are reported and the console carries on.
/// Output lines from `print`, `info` and action echoes are written before the result.
pub struct Console<S: ActionSink> {
    interpreter: Interpreter<S>,
    devices: DeviceTable,
    tokenizer: Tokenizer,
    buffer: String,
}

impl<S: ActionSink> Console<S> {
    /// Create a console around an interpreter and the devices it may drive
    pub fn new(interpreter: Interpreter<S>, devices: DeviceTable) -> Console<S> {
        Console { interpreter, devices, tokenizer: Tokenizer::new(), buffer: String::new() }
    }

    /// The interpreter running commands
    pub fn interpreter(&self) -> &Interpreter<S> {
        &self.interpreter
    }

    /// Take output lines the last command produced
    pub fn take_output(&mut self) -> Vec<String> {
        self.interpreter.take_output()
    }

    /// The prompt to show before reading the next line.
    ///
    /// Continuation lines show the innermost open block, like `(if) ... `.
    pub fn prompt(&self) -> String {
        if self.buffer.is_empty() {
            return PROMPT.to_string();
        }
        match self.tokenizer.open_block() {
            Some(keyword) => format!("({}) {}", keyword, CONTINUATION_PROMPT),
            None => CONTINUATION_PROMPT.to_string(),
        }
    }

    /// Check if a partial command is waiting for more lines
    pub fn is_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Feed one line of input
    pub fn feed_line(&mut self, line: &str) -> LineOutcome {
        if self.buffer.is_empty() && matches!(line.trim(), "quit" | "exit") {
            return LineOutcome::Quit;
        }
        self.buffer.push_str(line);
        self.buffer.push('\n');
        let tokens = match self.tokenizer.tokenize(&self.buffer) {
            Ok(tokens) => tokens,
            Err(err) if err.is_incomplete() => return LineOutcome::NeedMore,
            Err(err) => {
                self.buffer.clear();
                return LineOutcome::Failed(err.into());
            },
        };
        self.buffer.clear();
        let program = match Parser::new(tokens).parse() {
            Ok(program) => program,
            Err(err) => return LineOutcome::Failed(err.into()),
        };
        // An interrupt while idle belongs to no command
        self.interpreter.cancel_handle().reset();
        match self.interpreter.execute(&program, &self.devices) {
            Ok(()) => LineOutcome::Executed(self.interpreter.last_value()),
            Err(err) => LineOutcome::Failed(err.into()),
        }
    }

    /// Compile a whole script once and run it
    pub fn run_script(&mut self, source: &str) -> Result<Option<Value>, KittyError> {
        let program = crate::compile(source)?;
        debug!(statements = program.len(), "running script");
        self.interpreter.cancel_handle().reset();
        self.interpreter.execute(&program, &self.devices)?;
        Ok(self.interpreter.last_value())
    }

    /// Read commands until the input ends or the user quits
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        info!(devices = self.devices.len(), "console started");
        write!(output, "{}", self.prompt())?;
        output.flush()?;
        for line in input.lines() {
            let line = line?;
            let outcome = self.feed_line(&line);
            for text in self.take_output() {
                writeln!(output, "{}", text)?;
            }
            match outcome {
                LineOutcome::NeedMore => {},
                LineOutcome::Executed(Some(value)) => writeln!(output, "{}", value)?,
                LineOutcome::Executed(None) => {},
                LineOutcome::Failed(err) => writeln!(output, "{}", err)?,
                LineOutcome::Quit => break,
            }
            write!(output, "{}", self.prompt())?;
            output.flush()?;
        }
        if self.is_pending() {
            writeln!(output, "Discarding incomplete command at end of input")?;
            self.buffer.clear();
        }
        info!("console stopped");
        Ok(())
    }
}
