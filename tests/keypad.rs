use sci_kalk::keypad::{ANGLE_UNIT_KEY, HISTORY_KEY, MEMORY_KEY};
use sci_kalk::*;

fn keypad() -> Keypad<MemoryStore> {
    Keypad::load(MemoryStore::new())
}

// A helper to press the keys that spell out `text`
fn type_text<S: Store>(keypad: &mut Keypad<S>, text: &str) {
    for key in Action::keys_for(text).unwrap() {
        keypad.handle(key).unwrap();
    }
}

#[test]
fn test_equals_records_result_and_history() {
    let mut keypad = keypad();
    type_text(&mut keypad, "2+2");
    assert!(keypad.handle(Action::Equals).is_ok());

    assert_eq!(keypad.result(), Some("4"));
    assert_eq!(keypad.display(), "4");
    let latest = keypad.history().latest().unwrap();
    assert_eq!(latest.expression, "2+2");
    assert_eq!(latest.result, "4");
}

#[test]
fn test_degree_mode_is_default() {
    let mut keypad = keypad();
    type_text(&mut keypad, "sin(90)");
    keypad.handle(Action::Equals).unwrap();
    assert_eq!(keypad.result(), Some("1"));

    keypad.handle(Action::SetAngleUnit(AngleUnit::Radians)).unwrap();
    type_text(&mut keypad, "cos(0)");
    keypad.handle(Action::Equals).unwrap();
    assert_eq!(keypad.result(), Some("1"));
}

#[test]
fn test_paren_counter() {
    let mut keypad = keypad();
    keypad.handle(Action::Parenthesis(Paren::Open)).unwrap();
    keypad.handle(Action::Parenthesis(Paren::Open)).unwrap();
    keypad.handle(Action::Parenthesis(Paren::Close)).unwrap();
    assert_eq!(keypad.open_parens(), 1);

    // Unclosed: rejected before evaluation, nothing recorded
    assert_eq!(
        keypad.handle(Action::Equals),
        Err(KeypadError::Eval(EvalError::UnclosedParenthesis))
    );
    assert!(keypad.is_error());
    assert_eq!(keypad.display(), "Error: Unclosed Parenthesis");
    assert!(keypad.history().is_empty());
    assert_eq!(keypad.expression(), "(()");
}

#[test]
fn test_close_without_open_is_rejected() {
    let mut keypad = keypad();
    type_text(&mut keypad, "5");
    assert_eq!(
        keypad.handle(Action::Parenthesis(Paren::Close)),
        Err(KeypadError::NoMatchingParenthesis)
    );
    assert_eq!(keypad.expression(), "5");
    assert_eq!(keypad.open_parens(), 0);
}

#[test]
fn test_function_key_opens_paren() {
    let mut keypad = keypad();
    keypad.handle(Action::Function("sqrt".into())).unwrap();
    assert_eq!(keypad.expression(), "sqrt(");
    assert_eq!(keypad.open_parens(), 1);

    assert_eq!(
        keypad.handle(Action::Function("frobnicate".into())),
        Err(KeypadError::Eval(EvalError::InvalidFunction("frobnicate".into())))
    );
    assert_eq!(keypad.expression(), "sqrt(");
}

#[test]
fn test_history_is_bounded() {
    let mut keypad = keypad();
    for i in 1..=21 {
        type_text(&mut keypad, &format!("{}+1", i));
        keypad.handle(Action::Equals).unwrap();
    }

    let history = keypad.history();
    assert_eq!(history.len(), MAX_HISTORY_LENGTH);
    assert_eq!(history.latest().unwrap().expression, "21+1");
    assert_eq!(history.latest().unwrap().result, "22");
    // The two oldest entries were dropped
    assert_eq!(history.get(19).unwrap().expression, "2+1");

    // Newest first, ids strictly decreasing
    let ids: Vec<u64> = history.iter().map(|e| e.id).collect();
    assert!(ids.windows(2).all(|w| w[0] > w[1]));
}

#[test]
fn test_memory_accumulates() {
    let mut keypad = keypad();
    type_text(&mut keypad, "5");
    keypad.handle(Action::Memory(MemoryOp::Add)).unwrap();
    keypad.handle(Action::Memory(MemoryOp::Add)).unwrap();
    assert_eq!(keypad.memory(), 10.0);

    keypad.handle(Action::Memory(MemoryOp::Subtract)).unwrap();
    assert_eq!(keypad.memory(), 5.0);

    keypad.handle(Action::Memory(MemoryOp::Clear)).unwrap();
    assert_eq!(keypad.memory(), 0.0);
}

#[test]
fn test_memory_uses_shown_result() {
    let mut keypad = keypad();
    type_text(&mut keypad, "2+3");
    keypad.handle(Action::Equals).unwrap();
    keypad.handle(Action::Memory(MemoryOp::Add)).unwrap();
    assert_eq!(keypad.memory(), 5.0);
}

#[test]
fn test_memory_recall_appends() {
    let mut keypad = keypad();
    type_text(&mut keypad, "5");
    keypad.handle(Action::Memory(MemoryOp::Add)).unwrap();
    keypad.handle(Action::Clear).unwrap();

    type_text(&mut keypad, "2*");
    keypad.handle(Action::Memory(MemoryOp::Recall)).unwrap();
    assert_eq!(keypad.expression(), "2*5");
}

#[test]
fn test_memory_rejects_non_numeric_text() {
    let mut keypad = keypad();
    type_text(&mut keypad, "2+");
    assert_eq!(
        keypad.handle(Action::Memory(MemoryOp::Add)),
        Err(KeypadError::InvalidMemoryValue(MemoryOp::Add))
    );
    assert_eq!(keypad.memory(), 0.0);
}

#[test]
fn test_operator_replacement() {
    let mut keypad = keypad();

    // Only minus may start an expression
    keypad.handle(Action::Operator(Operator::Mul)).unwrap();
    assert_eq!(keypad.expression(), "");
    keypad.handle(Action::Operator(Operator::Sub)).unwrap();
    assert_eq!(keypad.expression(), "-");

    keypad.handle(Action::Clear).unwrap();
    type_text(&mut keypad, "5+");
    keypad.handle(Action::Operator(Operator::Mul)).unwrap();
    assert_eq!(keypad.expression(), "5*");

    // Minus after an operator is a sign, not a replacement
    keypad.handle(Action::Operator(Operator::Sub)).unwrap();
    assert_eq!(keypad.expression(), "5*-");

    // Another operator replaces both
    keypad.handle(Action::Operator(Operator::Add)).unwrap();
    assert_eq!(keypad.expression(), "5+");
}

#[test]
fn test_percent_is_replaced_like_other_operators() {
    let mut keypad = keypad();
    type_text(&mut keypad, "5%");
    keypad.handle(Action::Operator(Operator::Mul)).unwrap();
    assert_eq!(keypad.expression(), "5*");

    // A minus after `%` is a sign, not a replacement.
    keypad.handle(Action::Clear).unwrap();
    type_text(&mut keypad, "50%");
    keypad.handle(Action::Operator(Operator::Sub)).unwrap();
    assert_eq!(keypad.expression(), "50%-");
    type_text(&mut keypad, "1");
    keypad.handle(Action::Equals).unwrap();
    assert_eq!(keypad.result(), Some("-0.5"));
}

#[test]
fn test_exponent_results_feed_back_in() {
    let mut keypad = keypad();
    type_text(&mut keypad, "10^21");
    keypad.handle(Action::Equals).unwrap();
    assert_eq!(keypad.result(), Some("1e21"));

    keypad.handle(Action::Operator(Operator::Add)).unwrap();
    keypad.handle(Action::Digit('1')).unwrap();
    assert_eq!(keypad.expression(), "1e21+1");
    keypad.handle(Action::Equals).unwrap();
    assert_eq!(keypad.result(), Some("1e21"));
}

#[test]
fn test_memory_recall_of_tiny_value() {
    let mut keypad = keypad();
    type_text(&mut keypad, "1/100000000");
    keypad.handle(Action::Equals).unwrap();
    keypad.handle(Action::Memory(MemoryOp::Add)).unwrap();
    assert_eq!(keypad.memory(), 1e-8);

    type_text(&mut keypad, "2*");
    keypad.handle(Action::Memory(MemoryOp::Recall)).unwrap();
    assert_eq!(keypad.expression(), "2*1e-8");
    keypad.handle(Action::Equals).unwrap();
    assert_eq!(keypad.result(), Some("2e-8"));
}

#[test]
fn test_result_continuation_and_fresh_start() {
    let mut keypad = keypad();
    type_text(&mut keypad, "2+3");
    keypad.handle(Action::Equals).unwrap();

    // Operator continues from the result
    keypad.handle(Action::Operator(Operator::Mul)).unwrap();
    assert_eq!(keypad.expression(), "5*");
    assert_eq!(keypad.result(), None);
    type_text(&mut keypad, "2");
    keypad.handle(Action::Equals).unwrap();
    assert_eq!(keypad.result(), Some("10"));

    // A digit starts over
    keypad.handle(Action::Digit('7')).unwrap();
    assert_eq!(keypad.expression(), "7");
}

#[test]
fn test_decimal_once_per_number() {
    let mut keypad = keypad();
    type_text(&mut keypad, "1.5");
    keypad.handle(Action::Decimal).unwrap();
    assert_eq!(keypad.expression(), "1.5");

    keypad.handle(Action::Operator(Operator::Add)).unwrap();
    keypad.handle(Action::Decimal).unwrap();
    assert_eq!(keypad.expression(), "1.5+.");
}

#[test]
fn test_backspace_tracks_parens() {
    let mut keypad = keypad();
    type_text(&mut keypad, "(1)");
    assert_eq!(keypad.open_parens(), 0);
    keypad.handle(Action::Backspace).unwrap();
    assert_eq!(keypad.expression(), "(1");
    assert_eq!(keypad.open_parens(), 1);

    keypad.handle(Action::Backspace).unwrap();
    keypad.handle(Action::Backspace).unwrap();
    assert_eq!(keypad.expression(), "");
    assert_eq!(keypad.open_parens(), 0);

    // Multi-byte symbols go in one step
    keypad.handle(Action::Constant(Constant::Pi)).unwrap();
    keypad.handle(Action::Backspace).unwrap();
    assert_eq!(keypad.expression(), "");
}

#[test]
fn test_backspace_clears_result() {
    let mut keypad = keypad();
    type_text(&mut keypad, "12+3");
    keypad.handle(Action::Equals).unwrap();
    keypad.handle(Action::Backspace).unwrap();
    assert_eq!(keypad.result(), None);
    assert_eq!(keypad.expression(), "12+");
}

#[test]
fn test_toggle_sign() {
    let mut keypad = keypad();
    type_text(&mut keypad, "5");
    keypad.handle(Action::ToggleSign).unwrap();
    assert_eq!(keypad.expression(), "-5");
    keypad.handle(Action::ToggleSign).unwrap();
    assert_eq!(keypad.expression(), "5");

    type_text(&mut keypad, "+1");
    keypad.handle(Action::Equals).unwrap();
    keypad.handle(Action::ToggleSign).unwrap();
    assert_eq!(keypad.expression(), "-6");
    assert_eq!(keypad.result(), None);
}

#[test]
fn test_load_history_recounts_parens() {
    let mut keypad = keypad();
    keypad
        .handle(Action::LoadHistory("((1+2)".into()))
        .unwrap();
    assert_eq!(keypad.expression(), "((1+2)");
    assert_eq!(keypad.open_parens(), 1);

    keypad.handle(Action::LoadHistory("1))".into())).unwrap();
    assert_eq!(keypad.open_parens(), 0);
}

#[test]
fn test_errors_clear_on_next_input() {
    let mut keypad = keypad();
    type_text(&mut keypad, "1/0");
    assert_eq!(
        keypad.handle(Action::Equals),
        Err(KeypadError::Eval(EvalError::CalculationFailed))
    );
    assert!(keypad.is_error());
    assert_eq!(keypad.display(), "Error: Calculation Failed");

    // Equals while an error is shown does not evaluate again
    assert!(keypad.handle(Action::Equals).is_ok());
    assert!(!keypad.is_error());
    assert!(keypad.history().is_empty());

    keypad.handle(Action::Clear).unwrap();
    type_text(&mut keypad, "1/4");
    keypad.handle(Action::Equals).unwrap();
    assert_eq!(keypad.result(), Some("0.25"));
}

#[test]
fn test_clear_resets_everything_but_memory() {
    let mut keypad = keypad();
    type_text(&mut keypad, "7");
    keypad.handle(Action::Memory(MemoryOp::Add)).unwrap();
    type_text(&mut keypad, "+(");
    keypad.handle(Action::Clear).unwrap();

    assert_eq!(keypad.expression(), "");
    assert_eq!(keypad.open_parens(), 0);
    assert_eq!(keypad.result(), None);
    assert!(!keypad.is_error());
    assert_eq!(keypad.memory(), 7.0);
}

#[test]
fn test_keys_for() {
    assert_eq!(
        Action::keys_for("sin(30)+2!").unwrap(),
        vec![
            Action::Function("sin".into()),
            Action::Digit('3'),
            Action::Digit('0'),
            Action::Parenthesis(Paren::Close),
            Action::Operator(Operator::Add),
            Action::Digit('2'),
            Action::Factorial,
        ]
    );
    assert_eq!(
        Action::keys_for("2*e").unwrap().last(),
        Some(&Action::Constant(Constant::E))
    );
    assert!(Action::keys_for("2 & 3").is_err());
}

#[test]
fn test_state_round_trips_through_store() {
    let mut keypad = keypad();
    keypad.handle(Action::SetAngleUnit(AngleUnit::Radians)).unwrap();
    type_text(&mut keypad, "3*3");
    keypad.handle(Action::Equals).unwrap();
    keypad.handle(Action::Memory(MemoryOp::Add)).unwrap();

    let store = keypad.into_store();
    assert_eq!(store.load(ANGLE_UNIT_KEY).as_deref(), Some("rad"));
    assert_eq!(store.load(MEMORY_KEY).as_deref(), Some("9"));
    assert!(store.load(HISTORY_KEY).unwrap().contains("3*3"));

    let restored = Keypad::load(store);
    assert_eq!(restored.angle_unit(), AngleUnit::Radians);
    assert_eq!(restored.memory(), 9.0);
    assert_eq!(restored.history().latest().unwrap().result, "9");
    assert_eq!(restored.expression(), "");
}

#[test]
fn test_unreadable_store_values_fall_back() {
    let mut store = MemoryStore::new();
    store.save(HISTORY_KEY, "not json").unwrap();
    store.save(MEMORY_KEY, "lots").unwrap();
    store.save(ANGLE_UNIT_KEY, "gradians").unwrap();

    let keypad = Keypad::load(store);
    assert!(keypad.history().is_empty());
    assert_eq!(keypad.memory(), 0.0);
    assert_eq!(keypad.angle_unit(), AngleUnit::Degrees);
}
