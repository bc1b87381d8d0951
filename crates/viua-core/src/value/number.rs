// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Numeric capability of values.
//!
//! Integer, Float, Boolean and Bits widen to a common numeric type;
//! arithmetic and comparison operators promote to Float when either side
//! is a Float and stay in 64-bit integers otherwise. All other value
//! types reject numeric use with a `TypeMismatch` exception.

use super::{Exception, Value};
use num_traits::ToPrimitive;

/// A value widened to its numeric form.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Numeric {
    /// Integer-domain number.
    Int(i64),
    /// Float-domain number.
    Float(f64),
}

impl Numeric {
    /// Widen to f64, used when either operand of a binary op is a Float.
    #[must_use]
    pub fn widen(self) -> f64 {
        match self {
            // i64 -> f64 may round for magnitudes beyond 2^53; that is the
            // documented promotion semantics.
            Self::Int(n) => n.to_f64().unwrap_or(f64::NAN),
            Self::Float(f) => f,
        }
    }
}

/// Extract the numeric form of a value.
///
/// Booleans widen to 0/1, bit strings to their unsigned integer value
/// (when they fit into 64 bits).
pub fn numeric_of(value: &Value) -> Result<Numeric, Exception> {
    match value {
        Value::Integer(n) => Ok(Numeric::Int(*n)),
        Value::Float(f) => Ok(Numeric::Float(*f)),
        Value::Boolean(b) => Ok(Numeric::Int(i64::from(*b))),
        Value::Bits(bits) => bits.as_u64().and_then(|u| u.to_i64()).map_or_else(
            || {
                Err(Exception::new(
                    "TypeMismatch",
                    "bit string too wide for numeric use",
                ))
            },
            |n| Ok(Numeric::Int(n)),
        ),
        other => Err(Exception::new(
            "TypeMismatch",
            format!("expected a number, got {}", other.type_name()),
        )),
    }
}

/// Binary arithmetic operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithOp {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
}

/// Binary comparison operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Strictly greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Equal.
    Eq,
}

/// Apply an arithmetic operator with Integer/Float promotion.
///
/// Integer arithmetic wraps on overflow; division checks for zero in both
/// domains and rejects it with an `ArithmeticError` exception.
pub fn arithmetic(op: ArithOp, lhs: &Value, rhs: &Value) -> Result<Value, Exception> {
    let a = numeric_of(lhs)?;
    let b = numeric_of(rhs)?;

    if let (Numeric::Int(x), Numeric::Int(y)) = (a, b) {
        let out = match op {
            ArithOp::Add => x.wrapping_add(y),
            ArithOp::Sub => x.wrapping_sub(y),
            ArithOp::Mul => x.wrapping_mul(y),
            ArithOp::Div => {
                if y == 0 {
                    return Err(Exception::new("ArithmeticError", "division by zero"));
                }
                x.wrapping_div(y)
            }
        };
        return Ok(Value::Integer(out));
    }

    let x = a.widen();
    let y = b.widen();
    let out = match op {
        ArithOp::Add => x + y,
        ArithOp::Sub => x - y,
        ArithOp::Mul => x * y,
        ArithOp::Div => {
            if y == 0.0 {
                return Err(Exception::new("ArithmeticError", "division by zero"));
            }
            x / y
        }
    };
    Ok(Value::Float(out))
}

/// Apply a comparison operator with Integer/Float promotion.
pub fn compare(op: CmpOp, lhs: &Value, rhs: &Value) -> Result<Value, Exception> {
    let a = numeric_of(lhs)?;
    let b = numeric_of(rhs)?;

    let out = if let (Numeric::Int(x), Numeric::Int(y)) = (a, b) {
        match op {
            CmpOp::Lt => x < y,
            CmpOp::Lte => x <= y,
            CmpOp::Gt => x > y,
            CmpOp::Gte => x >= y,
            CmpOp::Eq => x == y,
        }
    } else {
        let x = a.widen();
        let y = b.widen();
        match op {
            CmpOp::Lt => x < y,
            CmpOp::Lte => x <= y,
            CmpOp::Gt => x > y,
            CmpOp::Gte => x >= y,
            // Bitwise float equality; NaN != NaN as usual.
            CmpOp::Eq => x == y,
        }
    };
    Ok(Value::Boolean(out))
}

/// Convert a value to a Float (`itof`).
pub fn to_float(value: &Value) -> Result<Value, Exception> {
    Ok(Value::Float(numeric_of(value)?.widen()))
}

/// Convert a value to an Integer (`ftoi`), truncating toward zero.
///
/// Rejects floats outside the i64 range.
pub fn to_integer(value: &Value) -> Result<Value, Exception> {
    match numeric_of(value)? {
        Numeric::Int(n) => Ok(Value::Integer(n)),
        Numeric::Float(f) => f.trunc().to_i64().map(Value::Integer).ok_or_else(|| {
            Exception::new(
                "ArithmeticError",
                format!("float {f} cannot be represented as an integer"),
            )
        }),
    }
}
