// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Bit string instructions.

use crate::bytecode::operands::Cursor;
use crate::process::{Fault, Process, Step};
use viua_core::Value;
use viua_core::value::Bits;

impl Process {
    pub(crate) fn op_bits(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let bytes = cur.fetch_bits()?;
        self.store(&target, Value::Bits(Bits::from_bytes(bytes)))?;
        Ok(Step::Next(cur.ip()))
    }
}
