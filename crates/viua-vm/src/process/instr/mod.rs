// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Instruction handlers, one file per instruction family.
//!
//! Handlers are methods on [`super::Process`]. Each decodes its operands
//! from the cursor, mutates process state and reports where execution
//! continues. Failures are returned as [`super::Fault`] values and never
//! panic the host.

mod arithmetic;
mod atom;
mod bits;
mod calls;
mod cast;
mod closure;
mod concurrency;
mod float;
mod general;
mod int;
mod linking;
mod object;
mod prototype;
mod registers;
mod structs;
mod tcmechanism;
mod text;
mod vector;

use super::Fault;
use viua_core::{Value, ValueCell};

/// Read an Integer out of a cell.
pub(crate) fn integer_of(cell: &ValueCell) -> Result<i64, Fault> {
    let value = cell.borrow();
    match &*value {
        Value::Integer(n) => Ok(*n),
        other => Err(Fault::exception(
            "TypeMismatch",
            format!("expected Integer, got {}", other.type_name()),
        )),
    }
}

/// Read a Text out of a cell.
pub(crate) fn text_of(cell: &ValueCell) -> Result<String, Fault> {
    let value = cell.borrow();
    match &*value {
        Value::Text(t) => Ok(t.clone()),
        other => Err(Fault::exception(
            "TypeMismatch",
            format!("expected Text, got {}", other.type_name()),
        )),
    }
}

/// Read an Atom out of a cell.
pub(crate) fn atom_of(cell: &ValueCell) -> Result<String, Fault> {
    let value = cell.borrow();
    match &*value {
        Value::Atom(a) => Ok(a.clone()),
        other => Err(Fault::exception(
            "TypeMismatch",
            format!("expected Atom, got {}", other.type_name()),
        )),
    }
}
