//! The interaction state machine behind the calculator keys.
//!
//! [`Keypad`] owns the expression being typed, the last shown result or error,
//! the open-parenthesis counter, the history, the memory cell and the angle
//! unit. Every key press arrives as an [`Action`]; `=` hands the text to
//! [`evaluate`](crate::evaluate). History, memory and angle unit are loaded from
//! the injected [`Store`] once and saved back whenever they change.

use std::fmt;

use tracing::{debug, warn};

use crate::{
    AngleUnit, EvalError, History, HistoryEntry, KeypadError, Store, evaluate, format_number,
    is_constant, is_function,
};

pub const HISTORY_KEY: &str = "history";
pub const MEMORY_KEY: &str = "memory";
pub const ANGLE_UNIT_KEY: &str = "angle_unit";

/// Operators that replace one another instead of stacking up.
const REPLACEABLE: [char; 6] = ['+', '-', '*', '/', '^', '%'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    /// Postfix: `N%` reads as `N / 100`.
    Percent,
}

impl Operator {
    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '*',
            Operator::Div => '/',
            Operator::Pow => '^',
            Operator::Percent => '%',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Operator::Add),
            '-' => Some(Operator::Sub),
            '*' => Some(Operator::Mul),
            '/' => Some(Operator::Div),
            '^' => Some(Operator::Pow),
            '%' => Some(Operator::Percent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paren {
    Open,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constant {
    Pi,
    E,
}

impl Constant {
    pub fn symbol(self) -> &'static str {
        match self {
            Constant::Pi => "π",
            Constant::E => "e",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryOp {
    Add,
    Subtract,
    Recall,
    Clear,
}

impl fmt::Display for MemoryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MemoryOp::Add => "M+",
            MemoryOp::Subtract => "M-",
            MemoryOp::Recall => "MR",
            MemoryOp::Clear => "MC",
        })
    }
}

/// A single key press or UI event.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Digit(char),
    Operator(Operator),
    Decimal,
    Parenthesis(Paren),
    /// A function key such as `sin`; typed as `sin(`.
    Function(String),
    Constant(Constant),
    /// Postfix `!`.
    Factorial,
    ToggleSign,
    Backspace,
    Clear,
    Equals,
    Memory(MemoryOp),
    /// Replace the text with a past expression.
    LoadHistory(String),
    SetAngleUnit(AngleUnit),
}

impl Action {
    /// Splits typed text into the key presses that would produce it.
    ///
    /// A function name must be followed by `(`, which becomes part of the
    /// function key. `=` is not appended.
    pub fn keys_for(text: &str) -> Result<Vec<Action>, EvalError> {
        let mut keys = Vec::new();
        let mut chars = text.char_indices().peekable();

        while let Some((start, c)) = chars.next() {
            let key = match c {
                c if c.is_whitespace() => continue,
                '0'..='9' => Action::Digit(c),
                '.' => Action::Decimal,
                '(' => Action::Parenthesis(Paren::Open),
                ')' => Action::Parenthesis(Paren::Close),
                'π' => Action::Constant(Constant::Pi),
                c if c.is_ascii_alphabetic() => {
                    let mut end = start + 1;
                    while let Some(&(i, next)) = chars.peek() {
                        if next.is_ascii_alphanumeric() {
                            end = i + 1;
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    let name = &text[start..end];
                    if is_function(name) && chars.peek().map(|&(_, c)| c) == Some('(') {
                        chars.next();
                        Action::Function(name.to_string())
                    } else if is_constant(name) {
                        match name {
                            "e" => Action::Constant(Constant::E),
                            _ => Action::Constant(Constant::Pi),
                        }
                    } else {
                        return Err(EvalError::InvalidFunction(name.to_string()));
                    }
                }
                c => match Operator::from_char(c) {
                    Some(op) => Action::Operator(op),
                    None if c == '!' => Action::Factorial,
                    None => return Err(EvalError::InvalidInput),
                },
            };
            keys.push(key);
        }

        Ok(keys)
    }
}

/// Calculator state driven by [`Action`]s.
pub struct Keypad<S: Store> {
    expression: String,
    result: Option<String>,
    error: Option<EvalError>,
    open_parens: usize,
    history: History,
    memory: f64,
    angle_unit: AngleUnit,
    store: S,
}

impl<S: Store> Keypad<S> {
    /// Builds a keypad, restoring history, memory and angle unit from `store`.
    /// Values that fail to decode are skipped.
    pub fn load(store: S) -> Self {
        let history = match store.load(HISTORY_KEY) {
            Some(text) => match serde_json::from_str::<Vec<HistoryEntry>>(&text) {
                Ok(entries) => History::from_entries(entries),
                Err(e) => {
                    warn!(error = %e, "ignoring unreadable stored history");
                    History::new()
                }
            },
            None => History::new(),
        };

        let memory = store
            .load(MEMORY_KEY)
            .and_then(|text| match text.trim().parse::<f64>() {
                Ok(value) if value.is_finite() => Some(value),
                _ => {
                    warn!(value = %text, "ignoring unreadable stored memory");
                    None
                }
            })
            .unwrap_or(0.0);

        let angle_unit = store
            .load(ANGLE_UNIT_KEY)
            .and_then(|text| match text.parse::<AngleUnit>() {
                Ok(unit) => Some(unit),
                Err(e) => {
                    warn!(error = %e, "ignoring unreadable stored angle unit");
                    None
                }
            })
            .unwrap_or_default();

        debug!(
            entries = history.len(),
            memory,
            %angle_unit,
            "restored keypad state"
        );

        Self {
            expression: String::new(),
            result: None,
            error: None,
            open_parens: 0,
            history,
            memory,
            angle_unit,
            store,
        }
    }

    /// Applies one action. Any shown error is cleared first.
    ///
    /// Errors are also kept as display state (see [`Keypad::error`]) until the
    /// next action.
    pub fn handle(&mut self, action: Action) -> Result<(), KeypadError> {
        let was_error = self.error.take().is_some();

        match action {
            Action::Digit(d) => {
                if d.is_ascii_digit() {
                    self.push_input(d.encode_utf8(&mut [0; 4]));
                } else {
                    warn!(key = %d, "ignoring non-digit digit key");
                }
            }
            Action::Operator(op) => self.press_operator(op),
            Action::Decimal => {
                let segment = self
                    .expression
                    .rsplit(|c: char| REPLACEABLE.contains(&c) || "%()".contains(c))
                    .next()
                    .unwrap_or("");
                if self.result.is_some() || !segment.contains('.') {
                    self.push_input(".");
                }
            }
            Action::Parenthesis(Paren::Open) => {
                self.push_input("(");
                self.open_parens += 1;
            }
            Action::Parenthesis(Paren::Close) => {
                if self.open_parens == 0 {
                    return Err(KeypadError::NoMatchingParenthesis);
                }
                self.push_input(")");
                self.open_parens -= 1;
            }
            Action::Function(name) => {
                if !is_function(&name) {
                    return Err(EvalError::InvalidFunction(name).into());
                }
                self.push_input(&format!("{}(", name));
                self.open_parens += 1;
            }
            Action::Constant(c) => self.push_input(c.symbol()),
            Action::Factorial => self.push_input("!"),
            Action::ToggleSign => self.toggle_sign(),
            Action::Backspace => {
                match self.expression.pop() {
                    Some('(') => self.open_parens = self.open_parens.saturating_sub(1),
                    Some(')') => self.open_parens += 1,
                    _ => {}
                }
                self.result = None;
            }
            Action::Clear => {
                self.expression.clear();
                self.result = None;
                self.error = None;
                self.open_parens = 0;
            }
            Action::Equals => {
                if self.expression.trim().is_empty() || was_error {
                    return Ok(());
                }
                return self.equals();
            }
            Action::Memory(op) => return self.memory_op(op),
            Action::LoadHistory(expression) => {
                let depth = expression.chars().fold(0i64, |depth, c| match c {
                    '(' => depth + 1,
                    ')' => depth - 1,
                    _ => depth,
                });
                self.open_parens = depth.max(0) as usize;
                self.expression = expression;
                self.result = None;
            }
            Action::SetAngleUnit(unit) => {
                self.angle_unit = unit;
                self.persist(ANGLE_UNIT_KEY, unit.as_str().to_string());
            }
        }

        Ok(())
    }

    /// Appends typed input. After a shown result, operators continue from the
    /// result and anything else starts a fresh expression.
    fn push_input(&mut self, value: &str) {
        match self.result.take() {
            Some(result) if value.chars().all(|c| Operator::from_char(c).is_some()) => {
                self.expression = result + value;
                self.open_parens = 0;
            }
            Some(_) if !self.expression.ends_with('(') => {
                self.expression = value.to_string();
                self.open_parens = 0;
            }
            _ => self.expression.push_str(value),
        }
    }

    fn press_operator(&mut self, op: Operator) {
        if self.result.is_some() {
            self.push_input(op.symbol().encode_utf8(&mut [0; 4]));
            return;
        }
        if self.expression.is_empty() && op != Operator::Sub {
            return;
        }

        let mut tail = self.expression.chars().rev();
        let last = tail.next();
        let before = tail.next();
        let symbol = op.symbol();

        match (last, before) {
            (Some('-'), before) if op != Operator::Sub => match before {
                // `5*-` then `+` gives `5+`.
                Some(b) if REPLACEABLE.contains(&b) => {
                    self.expression.pop();
                    self.expression.pop();
                    self.expression.push(symbol);
                }
                // A lone leading sign cannot take a binary operator.
                None | Some('(') => {}
                Some(_) => {
                    self.expression.pop();
                    self.expression.push(symbol);
                }
            },
            (Some(l), _) if REPLACEABLE.contains(&l) && op != Operator::Sub => {
                self.expression.pop();
                self.expression.push(symbol);
            }
            _ => self.expression.push(symbol),
        }
    }

    fn toggle_sign(&mut self) {
        if let Some(result) = self.result.take() {
            if let Ok(value) = result.parse::<f64>() {
                self.expression = format_number(-value);
                self.open_parens = 0;
                return;
            }
        }
        if self.expression.starts_with('-') {
            self.expression.remove(0);
        } else {
            self.expression.insert(0, '-');
        }
    }

    fn equals(&mut self) -> Result<(), KeypadError> {
        if self.open_parens > 0 {
            self.error = Some(EvalError::UnclosedParenthesis);
            return Err(EvalError::UnclosedParenthesis.into());
        }

        match evaluate(&self.expression, self.angle_unit) {
            Ok(value) => {
                let shown = format_number(value);
                self.history.push(&self.expression, &shown);
                self.result = Some(shown);
                self.save_history();
                Ok(())
            }
            Err(err) => {
                self.error = Some(err.clone());
                Err(err.into())
            }
        }
    }

    fn memory_op(&mut self, op: MemoryOp) -> Result<(), KeypadError> {
        match op {
            MemoryOp::Add | MemoryOp::Subtract => {
                let value = self.displayed_value().ok_or(KeypadError::InvalidMemoryValue(op))?;
                if op == MemoryOp::Add {
                    self.memory += value;
                } else {
                    self.memory -= value;
                }
                self.persist(MEMORY_KEY, format_number(self.memory));
            }
            MemoryOp::Recall => {
                let text = format_number(self.memory);
                self.push_input(&text);
            }
            MemoryOp::Clear => {
                self.memory = 0.0;
                self.persist(MEMORY_KEY, format_number(self.memory));
            }
        }
        Ok(())
    }

    /// The shown result if there is one, else the typed text read as a number.
    pub fn displayed_value(&self) -> Option<f64> {
        let text = self.result.as_deref().unwrap_or(&self.expression);
        text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }

    fn save_history(&mut self) {
        let entries: Vec<&HistoryEntry> = self.history.iter().collect();
        match serde_json::to_string(&entries) {
            Ok(text) => self.persist(HISTORY_KEY, text),
            Err(e) => warn!(error = %e, "could not encode history"),
        }
    }

    fn persist(&mut self, key: &str, value: String) {
        if let Err(e) = self.store.save(key, &value) {
            warn!(key, error = %e, "could not save keypad state");
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn error(&self) -> Option<&EvalError> {
        self.error.as_ref()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// What the main display line shows: error, result, or the typed text.
    pub fn display(&self) -> String {
        match (&self.error, &self.result) {
            (Some(err), _) => err.to_string(),
            (None, Some(result)) => result.clone(),
            (None, None) => self.expression.clone(),
        }
    }

    pub fn open_parens(&self) -> usize {
        self.open_parens
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn memory(&self) -> f64 {
        self.memory
    }

    pub fn angle_unit(&self) -> AngleUnit {
        self.angle_unit
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}
