use thiserror::Error;

use crate::keypad::MemoryOp;

/// Why an expression could not be turned into a number.
///
/// Every `Display` string starts with `"Error"` so callers can branch on the
/// prefix when all they have is the rendered text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// A character outside the calculator alphabet.
    #[error("Error: Invalid Input")]
    InvalidInput,
    /// An identifier that is neither a known function nor a constant.
    #[error("Error: Invalid Function")]
    InvalidFunction(String),
    /// The value came out as NaN or infinite.
    #[error("Error: Calculation Failed")]
    CalculationFailed,
    /// `=` was pressed while parentheses were still open.
    #[error("Error: Unclosed Parenthesis")]
    UnclosedParenthesis,
    /// Malformed expression; the payload is a diagnostic for logs only.
    #[error("Error")]
    Generic(String),
}

/// Errors reported by the keypad state machine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KeypadError {
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error("No matching open parenthesis.")]
    NoMatchingParenthesis,
    #[error("Invalid value for {0}")]
    InvalidMemoryValue(MemoryOp),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("state file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExplainError {
    #[error("Enter an expression to explain.")]
    EmptyExpression,
    #[error("Could not fetch explanation: {0}")]
    Backend(String),
    #[error("The explanation service returned no text.")]
    EmptyResponse,
}
