// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Integer store and in-place update instructions.

use crate::bytecode::operands::Cursor;
use crate::process::{Fault, Process, Step};
use viua_core::Value;

impl Process {
    pub(crate) fn op_izero(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        self.store(&target, Value::Integer(0))?;
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_istore(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let literal = cur.fetch_int()?;
        self.store(&target, Value::Integer(i64::from(literal)))?;
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_iinc(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        self.increment(cur, 1)
    }

    pub(crate) fn op_idec(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        self.increment(cur, -1)
    }

    fn increment(&mut self, cur: &mut Cursor, delta: i64) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let held = self.fetch_cell(&target)?;
        let mut value = held.borrow_mut();
        match &mut *value {
            Value::Integer(n) => {
                *n = n.wrapping_add(delta);
                drop(value);
                Ok(Step::Next(cur.ip()))
            }
            other => Err(Fault::exception(
                "TypeMismatch",
                format!("expected Integer, got {}", other.type_name()),
            )),
        }
    }
}
