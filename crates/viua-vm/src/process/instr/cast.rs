// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Numeric and textual conversion instructions.

use super::text_of;
use crate::bytecode::operands::Cursor;
use crate::process::{Fault, Process, Step};
use viua_core::Value;
use viua_core::value::number;

impl Process {
    pub(crate) fn op_itof(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let source = cur.fetch_register()?;
        let held = self.fetch_cell(&source)?;
        let converted = number::to_float(&held.borrow())?;
        self.store(&target, converted)?;
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_ftoi(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let source = cur.fetch_register()?;
        let held = self.fetch_cell(&source)?;
        let converted = number::to_integer(&held.borrow())?;
        self.store(&target, converted)?;
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_stoi(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let source = cur.fetch_register()?;
        let held = self.fetch_cell(&source)?;
        let text = text_of(&held)?;
        let parsed: i64 = text.trim().parse().map_err(|_| {
            Fault::exception(
                "ConversionFailure",
                format!("cannot convert to Integer: {text:?}"),
            )
        })?;
        self.store(&target, Value::Integer(parsed))?;
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_stof(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let source = cur.fetch_register()?;
        let held = self.fetch_cell(&source)?;
        let text = text_of(&held)?;
        let parsed: f64 = text.trim().parse().map_err(|_| {
            Fault::exception(
                "ConversionFailure",
                format!("cannot convert to Float: {text:?}"),
            )
        })?;
        self.store(&target, Value::Float(parsed))?;
        Ok(Step::Next(cur.ip()))
    }
}
