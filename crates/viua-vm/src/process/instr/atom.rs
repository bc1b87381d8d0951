// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Atom instructions.

use super::atom_of;
use crate::bytecode::operands::Cursor;
use crate::process::{Fault, Process, Step};
use viua_core::Value;

impl Process {
    pub(crate) fn op_atom(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let literal = cur.fetch_atom()?;
        self.store(&target, Value::Atom(literal))?;
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_atomeq(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let lhs = cur.fetch_register()?;
        let rhs = cur.fetch_register()?;

        let lhs_atom = atom_of(&self.fetch_cell(&lhs)?)?;
        let rhs_atom = atom_of(&self.fetch_cell(&rhs)?)?;

        self.store(&target, Value::Boolean(lhs_atom == rhs_atom))?;
        Ok(Step::Next(cur.ip()))
    }
}
