use crate::parser::{Expr, UnaryOp};
use crate::{AngleUnit, EvalError, FUNCTION_DATA, FunctionAction};
use crate::{binary, special, unary};

/// Walks the tree. The angle unit only matters at trig call nodes.
///
/// NaN and infinities are returned as values; rejecting them is the caller's job.
pub fn eval(expr: &Expr, unit: AngleUnit) -> Result<f64, EvalError> {
    let value = match expr {
        Expr::Literal(value) => *value,
        Expr::Constant(value) => *value,
        Expr::Unary(UnaryOp::Neg, inner) => -eval(inner, unit)?,
        Expr::Unary(UnaryOp::Plus, inner) => eval(inner, unit)?,
        Expr::Binary(op, lhs, rhs) => binary::calculate(*op, eval(lhs, unit)?, eval(rhs, unit)?),
        Expr::Percent(inner) => special::percent(eval(inner, unit)?),
        Expr::Factorial(inner) => special::factorial(eval(inner, unit)?),
        Expr::Call { name, arg } => {
            let arg = eval(arg, unit)?;
            let Some((_group, _usage, action)) = FUNCTION_DATA.get(*name) else {
                return Err(EvalError::InvalidFunction(name.to_string()));
            };
            match action {
                FunctionAction::Unary(handler) => handler(arg),
                FunctionAction::Trig(handler) => unary::trig(*handler, arg, unit),
                FunctionAction::InverseTrig(handler) => unary::inverse_trig(*handler, arg, unit),
                FunctionAction::Special(special_name) => match *special_name {
                    "factorial" => special::factorial(arg),
                    _ => {
                        return Err(EvalError::Generic(format!(
                            "internal function error ('{}' missing handler)",
                            special_name
                        )));
                    }
                },
            }
        }
    };
    Ok(value)
}
