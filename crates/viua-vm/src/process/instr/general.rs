// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Output, control flow and boolean instructions.

#![allow(clippy::print_stdout)]

use crate::bytecode::operands::{Cursor, OperandType};
use crate::process::{Fault, Process, Step};
use viua_core::Value;

impl Process {
    pub(crate) fn op_print(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let source = cur.fetch_register()?;
        let held = self.fetch_cell(&source)?;
        println!("{}", held.borrow().to_text());
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_echo(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let source = cur.fetch_register()?;
        let held = self.fetch_cell(&source)?;
        print!("{}", held.borrow().to_text());
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_jump(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_address()?;
        Ok(Step::Next(target as usize))
    }

    pub(crate) fn op_if(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let condition = cur.fetch_register()?;
        let when_true = cur.fetch_address()?;
        let when_false = cur.fetch_address()?;

        let held = self.fetch_cell(&condition)?;
        let truthy = held.borrow().truthy();

        Ok(Step::Next(if truthy {
            when_true as usize
        } else {
            when_false as usize
        }))
    }

    /// `bool` stores a boolean literal, or converts whatever a register
    /// holds to its truthiness.
    pub(crate) fn op_bool(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let value = match cur.peek_type()? {
            OperandType::True | OperandType::False => cur.fetch_bool()?,
            _ => {
                let source = cur.fetch_register()?;
                let held = self.fetch_cell(&source)?;
                let truthy = held.borrow().truthy();
                truthy
            }
        };
        self.store(&target, Value::Boolean(value))?;
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_not(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let source = cur.fetch_register()?;
        let held = self.fetch_cell(&source)?;
        let negated = !held.borrow().truthy();
        self.store(&target, Value::Boolean(negated))?;
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_and(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let lhs = cur.fetch_register()?;
        let rhs = cur.fetch_register()?;
        let lhs_truthy = self.fetch_cell(&lhs)?.borrow().truthy();
        let rhs_truthy = self.fetch_cell(&rhs)?.borrow().truthy();
        self.store(&target, Value::Boolean(lhs_truthy && rhs_truthy))?;
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_or(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let lhs = cur.fetch_register()?;
        let rhs = cur.fetch_register()?;
        let lhs_truthy = self.fetch_cell(&lhs)?.borrow().truthy();
        let rhs_truthy = self.fetch_cell(&rhs)?.borrow().truthy();
        self.store(&target, Value::Boolean(lhs_truthy || rhs_truthy))?;
        Ok(Step::Next(cur.ip()))
    }
}
