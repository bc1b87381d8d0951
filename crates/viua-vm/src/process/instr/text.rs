// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Text and byte-string instructions.
//!
//! All text indexes count Unicode scalar values.

use super::{integer_of, text_of};
use crate::bytecode::operands::{Cursor, OperandType};
use crate::process::{Fault, Process, Step};
use viua_core::Value;
use viua_core::value::text;

impl Process {
    pub(crate) fn op_strstore(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let literal = cur.fetch_string()?;
        self.store(&target, Value::String(literal))?;
        Ok(Step::Next(cur.ip()))
    }

    /// `text` stores a literal, or stringifies whatever a register holds.
    pub(crate) fn op_text(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let value = if cur.peek_type()? == OperandType::Text {
            cur.fetch_text()?
        } else {
            let source = cur.fetch_register()?;
            let held = self.fetch_cell(&source)?;
            let rendered = held.borrow().to_text();
            rendered
        };
        self.store(&target, Value::Text(value))?;
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_texteq(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let lhs = cur.fetch_register()?;
        let rhs = cur.fetch_register()?;

        let lhs_text = text_of(&self.fetch_cell(&lhs)?)?;
        let rhs_text = text_of(&self.fetch_cell(&rhs)?)?;

        self.store(&target, Value::Boolean(lhs_text == rhs_text))?;
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_textat(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let source = cur.fetch_register()?;
        let index = cur.fetch_register()?;

        let source_text = text_of(&self.fetch_cell(&source)?)?;
        let index = integer_of(&self.fetch_cell(&index)?)?;
        let scalar = text::at(&source_text, index)?;

        self.store(&target, Value::Text(scalar.to_string()))?;
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_textsub(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let source = cur.fetch_register()?;
        let begin = cur.fetch_register()?;
        let end = cur.fetch_register_or_void()?;

        let source_text = text_of(&self.fetch_cell(&source)?)?;
        let begin = integer_of(&self.fetch_cell(&begin)?)?;
        let end = match end {
            Some(operand) => Some(integer_of(&self.fetch_cell(&operand)?)?),
            None => None,
        };
        let sub = text::sub(&source_text, begin, end)?;

        self.store(&target, Value::Text(sub))?;
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_textlength(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let source = cur.fetch_register()?;

        let source_text = text_of(&self.fetch_cell(&source)?)?;
        let length = text::length(&source_text);

        self.store(&target, Value::Integer(length as i64))?;
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_textcommonprefix(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let lhs = cur.fetch_register()?;
        let rhs = cur.fetch_register()?;

        let lhs_text = text_of(&self.fetch_cell(&lhs)?)?;
        let rhs_text = text_of(&self.fetch_cell(&rhs)?)?;
        let count = text::common_prefix(&lhs_text, &rhs_text);

        self.store(&target, Value::Integer(count as i64))?;
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_textcommonsuffix(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let lhs = cur.fetch_register()?;
        let rhs = cur.fetch_register()?;

        let lhs_text = text_of(&self.fetch_cell(&lhs)?)?;
        let rhs_text = text_of(&self.fetch_cell(&rhs)?)?;
        let count = text::common_suffix(&lhs_text, &rhs_text);

        self.store(&target, Value::Integer(count as i64))?;
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_textconcat(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let lhs = cur.fetch_register()?;
        let rhs = cur.fetch_register()?;

        let lhs_text = text_of(&self.fetch_cell(&lhs)?)?;
        let rhs_text = text_of(&self.fetch_cell(&rhs)?)?;

        self.store(&target, Value::Text(text::concat(&lhs_text, &rhs_text)))?;
        Ok(Step::Next(cur.ip()))
    }
}
