// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Arithmetic and comparison over the numeric capability.

use crate::bytecode::operands::Cursor;
use crate::process::{Fault, Process, Step};
use viua_core::value::number::{ArithOp, CmpOp, arithmetic, compare};

impl Process {
    fn binary_arithmetic(&mut self, cur: &mut Cursor, op: ArithOp) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let lhs = cur.fetch_register()?;
        let rhs = cur.fetch_register()?;

        let lhs_cell = self.fetch_cell(&lhs)?;
        let rhs_cell = self.fetch_cell(&rhs)?;
        let result = arithmetic(op, &lhs_cell.borrow(), &rhs_cell.borrow())?;

        self.store(&target, result)?;
        Ok(Step::Next(cur.ip()))
    }

    fn binary_comparison(&mut self, cur: &mut Cursor, op: CmpOp) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let lhs = cur.fetch_register()?;
        let rhs = cur.fetch_register()?;

        let lhs_cell = self.fetch_cell(&lhs)?;
        let rhs_cell = self.fetch_cell(&rhs)?;
        let result = compare(op, &lhs_cell.borrow(), &rhs_cell.borrow())?;

        self.store(&target, result)?;
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_add(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        self.binary_arithmetic(cur, ArithOp::Add)
    }

    pub(crate) fn op_sub(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        self.binary_arithmetic(cur, ArithOp::Sub)
    }

    pub(crate) fn op_mul(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        self.binary_arithmetic(cur, ArithOp::Mul)
    }

    pub(crate) fn op_div(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        self.binary_arithmetic(cur, ArithOp::Div)
    }

    pub(crate) fn op_lt(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        self.binary_comparison(cur, CmpOp::Lt)
    }

    pub(crate) fn op_lte(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        self.binary_comparison(cur, CmpOp::Lte)
    }

    pub(crate) fn op_gt(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        self.binary_comparison(cur, CmpOp::Gt)
    }

    pub(crate) fn op_gte(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        self.binary_comparison(cur, CmpOp::Gte)
    }

    pub(crate) fn op_eq(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        self.binary_comparison(cur, CmpOp::Eq)
    }
}
