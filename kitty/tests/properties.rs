use kitty::analysis::{Interpreter, Parser, Tokenizer, Value};
use kitty::compile;
use kitty::devices::DeviceTable;
use kitty_driver::RecordingSink;
use proptest::prelude::*;


fn evaluate(source: &str) -> Option<Value> {
    let program = compile(source).ok()?;
    let mut interpreter = Interpreter::new(RecordingSink::new());
    interpreter.execute(&program, &DeviceTable::new()).ok()?;
    interpreter.last_value()
}

proptest! {
    #[test]
    fn test_tokenizer_never_panics(s in "\\PC*") {
        let mut tokenizer = Tokenizer::new();
        let _ = tokenizer.tokenize(&s);
        let _ = tokenizer.is_complete();
    }

    #[test]
    fn test_parser_never_panics(s in "[a-z0-9_ ()+*/%^<>=!&|;\\n-]{0,64}") {
        if let Ok(tokens) = Tokenizer::new().scan(&s) {
            let _ = Parser::new(tokens).parse();
        }
    }

    #[test]
    fn test_parse_is_idempotent(s in "[a-z0-9 ()+*/<>=;\\n-]{0,48}") {
        prop_assert_eq!(compile(&s), compile(&s));
    }

    #[test]
    fn test_left_associative_subtraction(a in 0i32..1000, b in 0i32..1000, c in 0i32..1000) {
        let source = format!("{} - {} - {}", a, b, c);
        prop_assert_eq!(evaluate(&source), Some(Value::Number(f64::from(a - b - c))));
    }

    #[test]
    fn test_precedence_matches_arithmetic(a in 0i32..1000, b in 0i32..1000, c in 0i32..1000) {
        let source = format!("{} + {} * {}", a, b, c);
        prop_assert_eq!(evaluate(&source), Some(Value::Number(f64::from(a + b * c))));
        let source = format!("({} + {}) * {}", a, b, c);
        prop_assert_eq!(evaluate(&source), Some(Value::Number(f64::from((a + b) * c))));
    }
}
