use super::BinaryHandler;
use crate::parser::BinaryOp;

pub fn power_op(a: f64, b: f64) -> f64 {
    a.powf(b)
}

/// Maps a parsed operator to the function that computes it.
pub fn handler(op: BinaryOp) -> BinaryHandler {
    match op {
        BinaryOp::Add => |a, b| a + b,
        BinaryOp::Sub => |a, b| a - b,
        BinaryOp::Mul => |a, b| a * b,
        BinaryOp::Div => |a, b| a / b,
        BinaryOp::Pow => power_op,
    }
}

/// Binary function for two-operand operations (e.g., +, -, *, /).
/// Division by zero is left to IEEE semantics; the caller rejects non-finite results.
pub fn calculate(op: BinaryOp, a: f64, b: f64) -> f64 {
    handler(op)(a, b)
}
