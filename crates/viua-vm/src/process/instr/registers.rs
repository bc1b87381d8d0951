// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Register manipulation instructions.

use crate::bytecode::operands::Cursor;
use crate::process::{Fault, Process, Step};
use viua_core::{RegisterSetId, Value};

impl Process {
    pub(crate) fn op_move(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let source = cur.fetch_register()?;
        let value = self.take_cell(&source)?;
        self.store_cell(&target, value)?;
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_copy(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let source = cur.fetch_register()?;
        let held = self.fetch_cell(&source)?;
        let copy = held.borrow().deep_copy();
        self.store(&target, copy)?;
        Ok(Step::Next(cur.ip()))
    }

    /// `ptr target source` stores a pointer to the value owned by the
    /// source register; the pointer is tagged with this process.
    pub(crate) fn op_ptr(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let source = cur.fetch_register()?;
        let held = self.fetch_cell(&source)?;
        let pointer = Value::pointer_to(&held, self.pid());
        self.store(&target, pointer)?;
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_swap(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let lhs = cur.fetch_register()?;
        let rhs = cur.fetch_register()?;

        let (lhs_set, lhs_index) = self.resolve_operand(&lhs)?;
        let (rhs_set, rhs_index) = self.resolve_operand(&rhs)?;

        if lhs_set == rhs_set {
            self.with_set(lhs_set, |s| s.swap(lhs_index, rhs_index))??;
        } else {
            // Cross-set swap: release both slots, cross-store.
            let lhs_value = self.with_set(lhs_set, |s| {
                s.register_at(lhs_index).map(|r| r.release())
            })??;
            let rhs_value = self.with_set(rhs_set, |s| {
                s.register_at(rhs_index).map(|r| r.release())
            })??;
            if let Some(value) = rhs_value {
                self.with_set(lhs_set, |s| s.put(lhs_index, value))??;
            }
            if let Some(value) = lhs_value {
                self.with_set(rhs_set, |s| s.put(rhs_index, value))??;
            }
        }
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_delete(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let (set, index) = self.resolve_operand(&target)?;
        let released = self.with_set(set, |s| {
            s.register_at(index).map(|r| r.release())
        })??;
        if released.is_none() {
            return Err(Fault::exception(
                "EmptyRegister",
                format!("delete of empty register: {index}"),
            ));
        }
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_isnull(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let source = cur.fetch_register()?;
        let (set, index) = self.resolve_operand(&source)?;
        let empty = self.with_set(set, |s| s.is_empty_at(index))??;
        self.store(&target, Value::Boolean(empty))?;
        Ok(Step::Next(cur.ip()))
    }

    /// `ress` switches what `Current` designates for subsequent operands.
    pub(crate) fn op_ress(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let marker = cur.fetch_uint()?;
        let id = u8::try_from(marker)
            .ok()
            .and_then(RegisterSetId::from_marker)
            .filter(|id| *id != RegisterSetId::Current)
            .ok_or_else(|| {
                Fault::exception(
                    "Exception",
                    format!("invalid register set designation: {marker}"),
                )
            })?;
        self.current_set = id;
        Ok(Step::Next(cur.ip()))
    }
}
