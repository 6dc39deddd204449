use phf::{Map, phf_map};
use std::collections::HashMap;
use std::f64::consts;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Type alias for a function that operates on one f64 and returns an f64.
type UnaryHandler = fn(f64) -> f64;
/// Type alias for a function that operates on two f64s and returns an f64.
type BinaryHandler = fn(f64, f64) -> f64;

mod binary;
pub mod error;
mod eval;
pub mod explain;
pub mod history;
pub mod keypad;
mod lexer;
mod parser;
mod special;
pub mod store;
mod unary;

pub use error::{EvalError, ExplainError, KeypadError, StoreError};
pub use explain::{Explainer, Explanation, ExplanationState, Ticket};
pub use history::{History, HistoryEntry, MAX_HISTORY_LENGTH};
pub use keypad::{Action, Constant, Keypad, MemoryOp, Operator, Paren};
pub use store::{JsonFileStore, MemoryStore, Store};

/// Number of significant digits kept in every successful result.
pub const SIGNIFICANT_DIGITS: usize = 12;

/// Whether trigonometric arguments and inverse results are degrees or radians.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AngleUnit {
    #[default]
    #[serde(rename = "deg")]
    Degrees,
    #[serde(rename = "rad")]
    Radians,
}

impl AngleUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            AngleUnit::Degrees => "deg",
            AngleUnit::Radians => "rad",
        }
    }
}

impl fmt::Display for AngleUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AngleUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deg" | "degrees" => Ok(AngleUnit::Degrees),
            "rad" | "radians" => Ok(AngleUnit::Radians),
            other => Err(format!("unknown angle unit '{}' (expected deg or rad)", other)),
        }
    }
}

// --- Centralized Function Data Structures ---

/// Represents the execution logic for a named function.
/// This allows the static map to hold heterogeneous handler types.
enum FunctionAction {
    /// Plain single-argument function, independent of the angle unit.
    Unary(UnaryHandler),
    /// Direct trigonometry: the argument is read in the active angle unit.
    Trig(UnaryHandler),
    /// Inverse trigonometry: the result is reported in the active angle unit.
    InverseTrig(UnaryHandler),
    /// Functions with their own domain rules (see `special`).
    Special(&'static str),
}

/// The centralized, static map containing ALL function information:
/// 1. Name (Key)
/// 2. Help Group (&'static str)
/// 3. Usage String (&'static str)
/// 4. Execution Action (FunctionAction enum)
static FUNCTION_DATA: Map<&'static str, (&'static str, &'static str, FunctionAction)> = phf_map! {
    // Trigonometry (angle unit aware)
    "sin" => ("Trigonometry", "sin(x) | Sine", FunctionAction::Trig(f64::sin)),
    "cos" => ("Trigonometry", "cos(x) | Cosine", FunctionAction::Trig(f64::cos)),
    "tan" => ("Trigonometry", "tan(x) | Tangent", FunctionAction::Trig(f64::tan)),
    "asin" => ("Trigonometry", "asin(x) | Arc sine", FunctionAction::InverseTrig(f64::asin)),
    "acos" => ("Trigonometry", "acos(x) | Arc cosine", FunctionAction::InverseTrig(f64::acos)),
    "atan" => ("Trigonometry", "atan(x) | Arc tangent", FunctionAction::InverseTrig(f64::atan)),

    // Hyperbolic
    "sinh" => ("Hyperbolic", "sinh(x) | Hyperbolic sine", FunctionAction::Unary(f64::sinh)),
    "cosh" => ("Hyperbolic", "cosh(x) | Hyperbolic cosine", FunctionAction::Unary(f64::cosh)),
    "tanh" => ("Hyperbolic", "tanh(x) | Hyperbolic tangent", FunctionAction::Unary(f64::tanh)),
    "asinh" => ("Hyperbolic", "asinh(x) | Inverse hyperbolic sine", FunctionAction::Unary(f64::asinh)),
    "acosh" => ("Hyperbolic", "acosh(x) | Inverse hyperbolic cosine", FunctionAction::Unary(f64::acosh)),
    "atanh" => ("Hyperbolic", "atanh(x) | Inverse hyperbolic tangent", FunctionAction::Unary(f64::atanh)),

    // Roots, powers and logarithms
    "sqrt" => ("Roots & Logs", "sqrt(x) | Square root", FunctionAction::Unary(f64::sqrt)),
    "cbrt" => ("Roots & Logs", "cbrt(x) | Cube root", FunctionAction::Unary(f64::cbrt)),
    "log" => ("Roots & Logs", "log(x) | Base-10 logarithm", FunctionAction::Unary(f64::log10)),
    "log10" => ("Roots & Logs", "log10(x) | Base-10 logarithm", FunctionAction::Unary(f64::log10)),
    "log2" => ("Roots & Logs", "log2(x) | Base-2 logarithm", FunctionAction::Unary(f64::log2)),
    "ln" => ("Roots & Logs", "ln(x) | Natural logarithm", FunctionAction::Unary(f64::ln)),
    "log1p" => ("Roots & Logs", "log1p(x) | ln(1 + x)", FunctionAction::Unary(f64::ln_1p)),
    "exp" => ("Roots & Logs", "exp(x) | e raised to the power of x", FunctionAction::Unary(f64::exp)),
    "expm1" => ("Roots & Logs", "expm1(x) | e^x - 1", FunctionAction::Unary(f64::exp_m1)),

    // Rounding and sign
    "abs" => ("Rounding", "abs(x) | Absolute value", FunctionAction::Unary(f64::abs)),
    "floor" => ("Rounding", "floor(x) | Rounds down", FunctionAction::Unary(f64::floor)),
    "ceil" => ("Rounding", "ceil(x) | Rounds up", FunctionAction::Unary(f64::ceil)),
    "round" => ("Rounding", "round(x) | Rounds to the nearest integer", FunctionAction::Unary(unary::round_half_up)),
    "trunc" => ("Rounding", "trunc(x) | Drops the fractional part", FunctionAction::Unary(f64::trunc)),
    "sign" => ("Rounding", "sign(x) | -1, 0 or 1", FunctionAction::Unary(unary::sign)),

    // Special/Custom Logic (Handled explicitly in eval's Special match)
    "factorial" => ("Combinatorics", "factorial(n) | Same as n!", FunctionAction::Special("factorial")),
};

/// Named constants. `e` is only ever matched as a whole identifier, so it never
/// collides with `exp`.
static CONSTANT_DATA: Map<&'static str, f64> = phf_map! {
    "pi" => consts::PI,
    "π" => consts::PI,
    "e" => consts::E,
};

/// Returns true when `name` is a function known to the evaluator.
pub fn is_function(name: &str) -> bool {
    FUNCTION_DATA.contains_key(name)
}

/// Returns true when `name` is a named constant (`pi`, `π`, `e`).
pub fn is_constant(name: &str) -> bool {
    CONSTANT_DATA.contains_key(name)
}

/// Renders help for all functions or a specific function, reading from the centralized map.
pub fn help_text(name: &str) -> Result<String, &'static str> {
    if name.is_empty() {
        // Use a standard HashMap for runtime grouping
        let mut grouped_help: HashMap<&'static str, Vec<(&'static str, &'static str)>> =
            HashMap::new();
        for (func, (group, usage, _action)) in FUNCTION_DATA.entries() {
            grouped_help.entry(*group).or_default().push((*func, *usage));
        }

        let groups = [
            "Trigonometry",
            "Hyperbolic",
            "Roots & Logs",
            "Rounding",
            "Combinatorics",
        ];

        let mut out = String::from("--- Available Functions ---\n");
        for group in groups {
            if let Some(items) = grouped_help.get_mut(group) {
                items.sort_unstable();
                out.push_str(&format!("\n  {}:\n", group));
                for (func, usage) in items.iter() {
                    out.push_str(&format!("    - {:<9} | {}\n", func, usage));
                }
            }
        }
        out.push_str("\n  Constants: pi (π), e\n");
        out.push_str("  Operators: + - * / ^, postfix % (divide by 100) and ! (factorial)\n");
        Ok(out)
    } else if let Some((group, usage, _action)) = FUNCTION_DATA.get(name) {
        Ok(format!(
            "--- Help for '{}' ---\n  Type: {}\n  Usage: {}\n",
            name, group, usage
        ))
    } else {
        Err("Function not found. Type 'help' for a full list.")
    }
}

/// Evaluates a calculator expression under the given angle unit.
///
/// The text is tokenized, every identifier is checked against the function and
/// constant tables, the tokens are parsed into an expression tree and the tree
/// is walked. Non-finite values are rejected; finite ones are rounded to
/// [`SIGNIFICANT_DIGITS`] significant digits.
pub fn evaluate(text: &str, unit: AngleUnit) -> Result<f64, EvalError> {
    let outcome = lexer::tokenize(text)
        .and_then(|tokens| parser::parse(&tokens))
        .and_then(|tree| eval::eval(&tree, unit));

    match outcome {
        Ok(value) if value.is_finite() => {
            let value = round_significant(value, SIGNIFICANT_DIGITS);
            debug!(expression = text, %unit, value, "evaluated expression");
            Ok(value)
        }
        Ok(value) => {
            warn!(expression = text, value, "expression did not produce a finite number");
            Err(EvalError::CalculationFailed)
        }
        Err(err) => {
            warn!(expression = text, error = ?err, "rejected expression");
            Err(err)
        }
    }
}

/// Rounds `value` to `digits` significant decimal digits.
pub fn round_significant(value: f64, digits: usize) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let precision = digits.saturating_sub(1);
    let rounded = format!("{:.*e}", precision, value)
        .parse::<f64>()
        .unwrap_or(value);
    // Folds -0 into 0.
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Formats a result the way it is shown and stored: shortest round-trip digits,
/// switching to exponent notation for very large or very small magnitudes.
pub fn format_number(value: f64) -> String {
    let magnitude = value.abs();
    if value == 0.0 {
        "0".to_string()
    } else if (1e-7..1e21).contains(&magnitude) {
        format!("{}", value)
    } else {
        format!("{:e}", value)
    }
}
