// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Float store instruction.

use crate::bytecode::operands::Cursor;
use crate::process::{Fault, Process, Step};
use viua_core::Value;

impl Process {
    pub(crate) fn op_fstore(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let literal = cur.fetch_float()?;
        self.store(&target, Value::Float(literal))?;
        Ok(Step::Next(cur.ip()))
    }
}
