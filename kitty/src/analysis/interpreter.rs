use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use kitty_driver::{ActionKind, ActionSink, DeviceAction};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::analysis::statements::{BinaryOp, Expression, Instruction, PrintItem, UnaryOp};
use crate::analysis::value::Value;
use crate::devices::{DeviceTable, DeviceType};
use crate::error::RuntimeError;


/// Settings for an interpreter
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct InterpreterOptions {
    /// Upper bound on executed statements plus loop iterations per program run
    pub max_steps: Option<u64>,
    /// Add a line to the output for every action handed to the driver
    pub echo_actions: bool,
}


/// A flag that stops a running program before its next statement or loop iteration.
///
/// Clones share the flag, so a handle can be moved to a signal handler or another thread.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Create a handle that is not cancelled
    pub fn new() -> CancelHandle {
        CancelHandle::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Clear a previous cancellation
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Check if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}


/// Pending work for the expression evaluator
enum Work<'a> {
    Visit(&'a Expression),
    Unary(UnaryOp),
    Binary(BinaryOp),
}


/// A tree-walking interpreter emitting device actions to a driver.
///
/// Expressions are evaluated with an explicit value stack. Device actions and pauses all
/// go through the [`ActionSink`]. Text for the user (`print`, `info` and optional action
/// echoes) is collected as output lines for the caller to show.
pub struct Interpreter<S: ActionSink> {
    sink: S,
    options: InterpreterOptions,
    cancel: CancelHandle,
    steps: u64,
    last_value: Option<Value>,
    output: Vec<String>,
}

impl<S: ActionSink> Interpreter<S> {
    /// Create a new interpreter for the driver with default options
    pub fn new(sink: S) -> Interpreter<S> {
        Interpreter::with_options(sink, InterpreterOptions::default())
    }

    /// Create a new interpreter with explicit options
    pub fn with_options(sink: S, options: InterpreterOptions) -> Interpreter<S> {
        Interpreter {
            sink,
            options,
            cancel: CancelHandle::new(),
            steps: 0,
            last_value: None,
            output: vec![],
        }
    }

    /// A handle that can cancel programs run by this interpreter
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Steps used by the current or most recent run
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// The value of the last bare expression statement of the most recent run
    pub fn last_value(&self) -> Option<Value> {
        self.last_value
    }

    /// Output lines of the most recent run that have not been taken yet
    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Take the pending output lines
    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    /// The options in use
    pub fn options(&self) -> &InterpreterOptions {
        &self.options
    }

    /// The driver
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The driver, mutably
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Give the driver back
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Run a program against a device table.
    ///
    /// The first error aborts the run. Actions already handed to the driver stay applied,
    /// and output produced before the error is kept.
    pub fn execute(&mut self, program: &Instruction, devices: &DeviceTable) -> Result<(), RuntimeError> {
        self.steps = 0;
        self.last_value = None;
        self.output.clear();
        let result = self.run(program, devices);
        if let Err(err) = &result {
            debug!(steps = self.steps, error = %err, "program aborted");
        }
        result
    }

    /// Evaluate one expression.
    ///
    /// Device names read the current value of the device from the driver.
    pub fn evaluate(&mut self, expression: &Expression, devices: &DeviceTable) -> Result<Value, RuntimeError> {
        let mut work = vec![Work::Visit(expression)];
        let mut values: Vec<Value> = vec![];
        while let Some(item) = work.pop() {
            match item {
                Work::Visit(Expression::Number(value)) => values.push(Value::Number(*value)),
                Work::Visit(Expression::Bool(value)) => values.push(Value::Bool(*value)),
                Work::Visit(Expression::Identifier(name)) => values.push(self.read_device(name, devices)?),
                Work::Visit(Expression::Unary(op, operand)) => {
                    work.push(Work::Unary(*op));
                    work.push(Work::Visit(operand));
                },
                Work::Visit(Expression::Binary(op, lhs, rhs)) => {
                    work.push(Work::Binary(*op));
                    work.push(Work::Visit(rhs));
                    work.push(Work::Visit(lhs));
                },
                Work::Unary(op) => {
                    let operand = pop_operand(&mut values, op.symbol())?;
                    values.push(apply_unary(op, operand)?);
                },
                Work::Binary(op) => {
                    let rhs = pop_operand(&mut values, op.symbol())?;
                    let lhs = pop_operand(&mut values, op.symbol())?;
                    values.push(apply_binary(op, lhs, rhs)?);
                },
            }
        }
        pop_operand(&mut values, "evaluate")
    }

    /// Process a single instruction.
    fn run(&mut self, instruction: &Instruction, devices: &DeviceTable) -> Result<(), RuntimeError> {
        match instruction {
            Instruction::Block(instructions) => {
                for instruction in instructions {
                    self.run(instruction, devices)?;
                }
                Ok(())
            },
            Instruction::Expression(expression) => {
                self.tick()?;
                let value = self.evaluate(expression, devices)?;
                self.last_value = Some(value);
                Ok(())
            },
            Instruction::MoveBy { device, amount, duration } => {
                self.tick()?;
                self.device_action(ActionKind::RelativeMove, device, amount, duration.as_ref(), devices)
            },
            Instruction::SetTo { device, value, duration } => {
                self.tick()?;
                self.device_action(ActionKind::AbsoluteSet, device, value, duration.as_ref(), devices)
            },
            Instruction::If { .. } => {
                // Walk `else if` chains in a loop, they can be arbitrarily long
                let mut current = instruction;
                while let Instruction::If { condition, then_block, else_block } = current {
                    self.tick()?;
                    if self.evaluate(condition, devices)?.is_truthy() {
                        return self.run(then_block, devices);
                    }
                    match else_block {
                        Some(else_block) => current = else_block,
                        None => return Ok(()),
                    }
                }
                self.run(current, devices)
            },
            Instruction::While { condition, body } => {
                self.tick()?;
                loop {
                    self.check_cancelled()?;
                    if !self.evaluate(condition, devices)?.is_truthy() {
                        break;
                    }
                    self.tick()?;
                    self.run(body, devices)?;
                }
                Ok(())
            },
            Instruction::Wait { duration } => {
                self.tick()?;
                let duration = self.duration(duration, "wait", devices)?;
                trace!(?duration, "waiting");
                self.sink.wait(duration).map_err(RuntimeError::WaitFailed)
            },
            Instruction::Print(items) => {
                self.tick()?;
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        PrintItem::Text(text) => parts.push(text.clone()),
                        PrintItem::Value(expression) => parts.push(self.evaluate(expression, devices)?.to_string()),
                    }
                }
                self.output.push(parts.join(" "));
                Ok(())
            },
            Instruction::Info { device } => {
                self.tick()?;
                let line = self.describe(device, devices)?;
                self.output.push(line);
                Ok(())
            },
        }
    }

    /// Evaluate a number of seconds into a duration
    fn duration(&mut self, expression: &Expression, operation: &str, devices: &DeviceTable) -> Result<Duration, RuntimeError> {
        let seconds = self.evaluate(expression, devices)?.as_number(operation)?;
        Duration::try_from_secs_f64(seconds).map_err(|_| RuntimeError::InvalidDuration(seconds))
    }

    /// One line describing a device and its state, or a group and its members
    fn describe(&mut self, name: &str, devices: &DeviceTable) -> Result<String, RuntimeError> {
        let device = devices.get(name).ok_or_else(|| RuntimeError::UnknownDevice(name.to_string()))?;
        let kind = match &device.device_type {
            DeviceType::Servo => "servo",
            DeviceType::Led => "LED",
            DeviceType::Group(members) => return Ok(format!("{}: group of {}", name, members.join(", "))),
        };
        let state = self.sink.read_state(name).map_err(|source| RuntimeError::DeviceActionFailed {
            device: name.to_string(),
            source,
        })?;
        Ok(match state {
            Some(value) => format!("{}: {} at {}", name, kind, value),
            None => format!("{}: {}, state unavailable", name, kind),
        })
    }

    fn check_cancelled(&self) -> Result<(), RuntimeError> {
        if self.cancel.is_cancelled() {
            return Err(RuntimeError::Cancelled);
        }
        Ok(())
    }

    /// Count a statement or loop iteration against the step limit
    fn tick(&mut self) -> Result<(), RuntimeError> {
        self.check_cancelled()?;
        self.steps += 1;
        match self.options.max_steps {
            Some(limit) if self.steps > limit => Err(RuntimeError::StepLimitExceeded(limit)),
            _ => Ok(()),
        }
    }

    /// Read the current value of a leaf device from the driver
    fn read_device(&mut self, name: &str, devices: &DeviceTable) -> Result<Value, RuntimeError> {
        let device = devices.get(name).ok_or_else(|| RuntimeError::UnknownIdentifier(name.to_string()))?;
        if device.is_group() {
            return Err(RuntimeError::TypeMismatch { operation: "read".to_string(), found: "group".to_string() });
        }
        let state = self.sink.read_state(name).map_err(|source| RuntimeError::DeviceActionFailed {
            device: name.to_string(),
            source,
        })?;
        match state {
            Some(value) => Ok(Value::Number(value)),
            None => Err(RuntimeError::StateUnavailable(name.to_string())),
        }
    }

    /// Issue one action per leaf device behind `device`.
    ///
    /// Every expression is evaluated before the first action is issued, so an evaluation
    /// error leaves the devices untouched.
    fn device_action(
        &mut self,
        kind: ActionKind,
        device: &str,
        amount: &Expression,
        duration: Option<&Expression>,
        devices: &DeviceTable,
    ) -> Result<(), RuntimeError> {
        let verb = match kind {
            ActionKind::RelativeMove => "move_by",
            ActionKind::AbsoluteSet => "set_to",
        };
        let leaves = devices.resolve(device)?;
        let amount = self.evaluate(amount, devices)?.as_number(verb)?;
        if !amount.is_finite() {
            return Err(RuntimeError::InvalidAmount(amount));
        }
        let duration = match duration {
            Some(expression) => self.duration(expression, "for", devices)?,
            None => Duration::ZERO,
        };
        for leaf in leaves {
            let device_kind = match leaf.device_type.leaf_kind() {
                Some(device_kind) => device_kind,
                None => continue,
            };
            let action = DeviceAction { device: leaf.name.clone(), device_kind, kind, amount, duration };
            trace!(action = %action, "issuing device action");
            if self.options.echo_actions {
                self.output.push(format!("-> {}", action));
            }
            if let Err(source) = self.sink.apply_action(&action) {
                warn!(device = %leaf.name, error = %source, "device action failed");
                return Err(RuntimeError::DeviceActionFailed { device: leaf.name.clone(), source });
            }
        }
        Ok(())
    }
}


fn pop_operand(values: &mut Vec<Value>, operation: &str) -> Result<Value, RuntimeError> {
    values.pop().ok_or_else(|| RuntimeError::TypeMismatch {
        operation: operation.to_string(),
        found: "a missing operand".to_string(),
    })
}

fn apply_unary(op: UnaryOp, operand: Value) -> Result<Value, RuntimeError> {
    match op {
        UnaryOp::Negate => Ok(Value::Number(-operand.as_number(op.symbol())?)),
        UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
    }
}

fn apply_binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, RuntimeError> {
    let symbol = op.symbol();
    let value = match op {
        BinaryOp::And => Value::Bool(lhs.is_truthy() && rhs.is_truthy()),
        BinaryOp::Or => Value::Bool(lhs.is_truthy() || rhs.is_truthy()),
        BinaryOp::Xor => Value::Bool(lhs.is_truthy() != rhs.is_truthy()),
        BinaryOp::Equal | BinaryOp::NotEqual => {
            let equal = match (lhs, rhs) {
                (Value::Number(a), Value::Number(b)) => a == b,
                (Value::Bool(a), Value::Bool(b)) => a == b,
                _ => {
                    return Err(RuntimeError::TypeMismatch {
                        operation: symbol.to_string(),
                        found: format!("{} and {}", lhs.type_name(), rhs.type_name()),
                    })
                },
            };
            Value::Bool(equal == (op == BinaryOp::Equal))
        },
        _ => {
            let a = lhs.as_number(symbol)?;
            let b = rhs.as_number(symbol)?;
            match op {
                BinaryOp::Add => Value::Number(a + b),
                BinaryOp::Subtract => Value::Number(a - b),
                BinaryOp::Multiply => Value::Number(a * b),
                BinaryOp::Divide if b == 0.0 => return Err(RuntimeError::DivisionByZero),
                BinaryOp::Divide => Value::Number(a / b),
                BinaryOp::Remainder if b == 0.0 => return Err(RuntimeError::DivisionByZero),
                BinaryOp::Remainder => Value::Number(a % b),
                BinaryOp::Power => Value::Number(a.powf(b)),
                BinaryOp::Less => Value::Bool(a < b),
                BinaryOp::LessEqual => Value::Bool(a <= b),
                BinaryOp::Greater => Value::Bool(a > b),
                _ => Value::Bool(a >= b),
            }
        },
    };
    Ok(value)
}


#[cfg(test)]
mod tests {
    use kitty_driver::{DeviceKind, DriverError, RecordingSink, SimulatedDriver};

    use super::*;
    use crate::devices::DeviceType;
    use crate::analysis::{ExpressionParser, Tokenizer};
    use crate::compile;

    fn devices() -> DeviceTable {
        let mut table = DeviceTable::new();
        table.register_device("s1", DeviceType::Servo).unwrap();
        table.register_device("s2", DeviceType::Servo).unwrap();
        table.register_device("l1", DeviceType::Led).unwrap();
        table.register_group("arms", &["s1", "s2"]).unwrap();
        table
    }

    fn eval(command: &str) -> Result<Value, RuntimeError> {
        let tokens = Tokenizer::new().scan(command).unwrap();
        let (expression, _) = ExpressionParser::new(&tokens, 0).parse().unwrap();
        Interpreter::new(RecordingSink::new()).evaluate(&expression, &devices())
    }

    fn run(source: &str) -> (Result<(), RuntimeError>, Vec<DeviceAction>) {
        let program = compile(source).unwrap();
        let mut interpreter = Interpreter::new(RecordingSink::new());
        let result = interpreter.execute(&program, &devices());
        (result, interpreter.into_sink().take())
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("1 + 2 * 3"), Ok(Value::Number(7.0)));
        assert_eq!(eval("10 - 3 - 2"), Ok(Value::Number(5.0)));
        assert_eq!(eval("( 1 + 2 ) * 3"), Ok(Value::Number(9.0)));
        assert_eq!(eval("2 ^ 3 ^ 2"), Ok(Value::Number(512.0)));
        assert_eq!(eval("-2 ^ 2"), Ok(Value::Number(4.0)));
        assert_eq!(eval("7 % 4"), Ok(Value::Number(3.0)));
        assert_eq!(eval("-(3 - 5)"), Ok(Value::Number(2.0)));
    }

    #[test]
    fn test_comparisons_and_logic() {
        assert_eq!(eval("1 + 1 == 2"), Ok(Value::Bool(true)));
        assert_eq!(eval("3 = 4"), Ok(Value::Bool(false)));
        assert_eq!(eval("true != false"), Ok(Value::Bool(true)));
        assert_eq!(eval("2 <= 2 && 3 > 4"), Ok(Value::Bool(false)));
        assert_eq!(eval("0 || 5"), Ok(Value::Bool(true)));
        assert_eq!(eval("!0"), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(eval("1 / (2 - 2)"), Err(RuntimeError::DivisionByZero));
        assert_eq!(eval("1 % 0"), Err(RuntimeError::DivisionByZero));
    }

    #[test]
    fn test_type_mismatch() {
        assert!(matches!(eval("true + 1"), Err(RuntimeError::TypeMismatch { .. })));
        assert!(matches!(eval("-false"), Err(RuntimeError::TypeMismatch { .. })));
        assert!(matches!(eval("1 == true"), Err(RuntimeError::TypeMismatch { .. })));
        assert!(matches!(eval("true < 2"), Err(RuntimeError::TypeMismatch { .. })));
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(eval("nothing + 1"), Err(RuntimeError::UnknownIdentifier("nothing".to_string())));
        assert!(matches!(eval("arms"), Err(RuntimeError::TypeMismatch { .. })));
        assert_eq!(eval("s1"), Err(RuntimeError::StateUnavailable("s1".to_string())));
        let mut interpreter = Interpreter::new(SimulatedDriver::new());
        let program = compile("set_to s1 to 40; s1 / 2").unwrap();
        interpreter.execute(&program, &devices()).unwrap();
        assert_eq!(interpreter.last_value(), Some(Value::Number(20.0)));
    }

    #[test]
    fn test_move_and_set() {
        let (result, actions) = run("move_by s1 by 5 for 1.5; set_to l1 to 20");
        assert_eq!(result, Ok(()));
        assert_eq!(
            actions,
            vec![
                DeviceAction::relative_move("s1", DeviceKind::Servo, 5.0, Duration::from_millis(1500)),
                DeviceAction::absolute_set("l1", DeviceKind::Led, 20.0, Duration::ZERO),
            ]
        );
    }

    #[test]
    fn test_group_broadcast() {
        let (result, actions) = run("set_to arms to 10");
        assert_eq!(result, Ok(()));
        let targets: Vec<&str> = actions.iter().map(|action| action.device.as_str()).collect();
        assert_eq!(targets, vec!["s1", "s2"]);
        assert!(actions.iter().all(|action| action.kind == ActionKind::AbsoluteSet && action.amount == 10.0));
    }

    #[test]
    fn test_unknown_device() {
        let (result, actions) = run("move_by nonexistent_device by 1 / 0");
        assert_eq!(result, Err(RuntimeError::UnknownDevice("nonexistent_device".to_string())));
        assert!(actions.is_empty());
    }

    #[test]
    fn test_evaluation_before_actions() {
        let (result, actions) = run("move_by arms by 1 / 0");
        assert_eq!(result, Err(RuntimeError::DivisionByZero));
        assert!(actions.is_empty());
        let (result, actions) = run("set_to arms to 1 for 0 - 1");
        assert_eq!(result, Err(RuntimeError::InvalidDuration(-1.0)));
        assert!(actions.is_empty());
        let (result, _) = run("set_to l1 to true");
        assert!(matches!(result, Err(RuntimeError::TypeMismatch { .. })));
        let (result, _) = run("set_to l1 to 10 ^ 400");
        assert_eq!(result, Err(RuntimeError::InvalidAmount(f64::INFINITY)));
    }

    #[test]
    fn test_if_else() {
        let (_, actions) = run("if 2 > 1 then set_to s1 to 1 else set_to s1 to 2 end");
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].amount, 1.0);
        let (_, actions) = run("if 0 then set_to s1 to 1 else if false then set_to s1 to 2 else set_to s1 to 3 end");
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].amount, 3.0);
        let (_, actions) = run("if 0 then set_to s1 to 1 end");
        assert!(actions.is_empty());
    }

    #[test]
    fn test_while_reads_state() {
        let program = compile("while s1 < 30 do move_by s1 by 10 end").unwrap();
        let mut interpreter = Interpreter::new(SimulatedDriver::new());
        interpreter.execute(&program, &devices()).unwrap();
        assert_eq!(interpreter.sink().value("s1"), Some(30.0));
        assert_eq!(interpreter.sink().history().len(), 3);
        // while statement plus three iterations plus three moves
        assert_eq!(interpreter.steps(), 7);
    }

    #[test]
    fn test_step_limit() {
        let program = compile("while true do end").unwrap();
        let options = InterpreterOptions { max_steps: Some(100), ..InterpreterOptions::default() };
        let mut interpreter = Interpreter::with_options(RecordingSink::new(), options);
        assert_eq!(interpreter.execute(&program, &devices()), Err(RuntimeError::StepLimitExceeded(100)));
        assert_eq!(interpreter.steps(), 101);
    }

    #[test]
    fn test_cancel() {
        let program = compile("move_by s1 by 1; move_by s1 by 1").unwrap();
        let mut interpreter = Interpreter::new(RecordingSink::new());
        let handle = interpreter.cancel_handle();
        handle.cancel();
        assert_eq!(interpreter.execute(&program, &devices()), Err(RuntimeError::Cancelled));
        assert!(interpreter.sink().actions().is_empty());
        handle.reset();
        assert_eq!(interpreter.execute(&program, &devices()), Ok(()));
        assert_eq!(interpreter.sink().actions().len(), 2);
    }

    #[test]
    fn test_driver_failure_aborts() {
        let program = compile("set_to arms to 5; set_to l1 to 5").unwrap();
        let mut interpreter = Interpreter::new(RecordingSink::failing_on("s2"));
        let result = interpreter.execute(&program, &devices());
        assert_eq!(
            result,
            Err(RuntimeError::DeviceActionFailed {
                device: "s2".to_string(),
                source: DriverError::Rejected { device: "s2".to_string(), reason: "configured to fail".to_string() },
            })
        );
        let targets: Vec<String> = interpreter.sink().actions().iter().map(|action| action.device.clone()).collect();
        assert_eq!(targets, vec!["s1".to_string()]);
    }

    #[test]
    fn test_reexecute() {
        let program = compile("move_by s1 by 2").unwrap();
        let table = devices();
        let mut interpreter = Interpreter::new(SimulatedDriver::new());
        for _ in 0..3 {
            interpreter.execute(&program, &table).unwrap();
        }
        assert_eq!(interpreter.sink().value("s1"), Some(6.0));
    }

    /// Cancels the run once a number of actions went through
    struct CancelAfter {
        remaining: usize,
        handle: CancelHandle,
        applied: usize,
    }

    impl ActionSink for CancelAfter {
        fn apply_action(&mut self, _action: &DeviceAction) -> Result<(), DriverError> {
            self.applied += 1;
            self.remaining = self.remaining.saturating_sub(1);
            if self.remaining == 0 {
                self.handle.cancel();
            }
            Ok(())
        }
    }

    #[test]
    fn test_cancel_inside_loop() {
        let program = compile("while 1 do move_by s1 by 1 end").unwrap();
        let sink = CancelAfter { remaining: 3, handle: CancelHandle::new(), applied: 0 };
        let mut interpreter = Interpreter::new(sink);
        let handle = interpreter.cancel_handle();
        interpreter.sink_mut().handle = handle;
        assert_eq!(interpreter.execute(&program, &devices()), Err(RuntimeError::Cancelled));
        assert_eq!(interpreter.sink().applied, 3);
    }

    #[test]
    fn test_xor() {
        assert_eq!(eval("1 ^^ 0"), Ok(Value::Bool(true)));
        assert_eq!(eval("true xor true"), Ok(Value::Bool(false)));
        assert_eq!(eval("0 xor 0 || 1"), Ok(Value::Bool(true)));
        assert_eq!(eval("1 < 2 ^^ 2 < 3"), Ok(Value::Bool(false)));
    }

    #[test]
    fn test_long_else_if_chain() {
        let mut source = String::from("if 0 then 0");
        for _ in 0..2999 {
            source.push_str(" else if 0 then 1");
        }
        source.push_str(" else if 1 then 42 end");
        let program = compile(&source).unwrap();
        let mut interpreter = Interpreter::new(RecordingSink::new());
        interpreter.execute(&program, &devices()).unwrap();
        assert_eq!(interpreter.last_value(), Some(Value::Number(42.0)));
        // one step per condition tested plus the chosen expression
        assert_eq!(interpreter.steps(), 3002);
    }

    #[test]
    fn test_wait() {
        let program = compile("move_by s1 by 1; wait 0.25; wait 1 + 1").unwrap();
        let mut interpreter = Interpreter::new(RecordingSink::new());
        interpreter.execute(&program, &devices()).unwrap();
        assert_eq!(interpreter.sink().waits(), [Duration::from_millis(250), Duration::from_secs(2)]);
        assert_eq!(interpreter.sink().actions().len(), 1);

        let mut interpreter = Interpreter::new(SimulatedDriver::new());
        interpreter.execute(&compile("wait 3").unwrap(), &devices()).unwrap();
        assert_eq!(interpreter.sink().elapsed(), Duration::from_secs(3));

        let (result, _) = run("wait 0 - 1");
        assert_eq!(result, Err(RuntimeError::InvalidDuration(-1.0)));
        let (result, _) = run("wait true");
        assert!(matches!(result, Err(RuntimeError::TypeMismatch { .. })));
    }

    #[test]
    fn test_print_and_info() {
        let program = compile(r#"set_to s1 to 35; print "s1 is", s1, s1 > 30; info s1; info l1; info arms"#).unwrap();
        let mut interpreter = Interpreter::new(SimulatedDriver::new());
        interpreter.execute(&program, &devices()).unwrap();
        assert_eq!(
            interpreter.output(),
            ["s1 is 35 true", "s1: servo at 35", "l1: LED at 0", "arms: group of s1, s2"]
        );
        assert_eq!(interpreter.take_output().len(), 4);
        assert!(interpreter.output().is_empty());

        let mut interpreter = Interpreter::new(RecordingSink::new());
        interpreter.execute(&compile("info s2").unwrap(), &devices()).unwrap();
        assert_eq!(interpreter.output(), ["s2: servo, state unavailable"]);
        let result = interpreter.execute(&compile("info ghost").unwrap(), &devices());
        assert_eq!(result, Err(RuntimeError::UnknownDevice("ghost".to_string())));
        assert!(interpreter.output().is_empty());
    }

    #[test]
    fn test_output_kept_on_error() {
        let program = compile(r#"print "before"; 1 / 0; print "after""#).unwrap();
        let mut interpreter = Interpreter::new(RecordingSink::new());
        assert_eq!(interpreter.execute(&program, &devices()), Err(RuntimeError::DivisionByZero));
        assert_eq!(interpreter.output(), ["before"]);
    }

    #[test]
    fn test_echo_actions() {
        let options = InterpreterOptions { echo_actions: true, ..InterpreterOptions::default() };
        let mut interpreter = Interpreter::with_options(RecordingSink::new(), options);
        interpreter.execute(&compile("set_to arms to 10").unwrap(), &devices()).unwrap();
        let expected: Vec<String> = interpreter.sink().actions().iter().map(|action| format!("-> {}", action)).collect();
        assert_eq!(expected.len(), 2);
        assert_eq!(interpreter.output(), expected.as_slice());

        let mut interpreter = Interpreter::new(RecordingSink::new());
        interpreter.execute(&compile("set_to arms to 10").unwrap(), &devices()).unwrap();
        assert!(interpreter.output().is_empty());
    }
}
