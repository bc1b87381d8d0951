// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Vector instructions.

use super::integer_of;
use crate::bytecode::operands::{Cursor, RegisterOperand};
use crate::process::{Fault, Process, Step};
use viua_core::{Value, ValueCell};

/// Run `f` on the vector items behind an already fetched cell.
fn with_vector<R>(
    held: &ValueCell,
    f: impl FnOnce(&mut Vec<ValueCell>) -> Result<R, Fault>,
) -> Result<R, Fault> {
    let mut value = held.borrow_mut();
    match &mut *value {
        Value::Vector(items) => f(items),
        other => Err(Fault::exception(
            "TypeMismatch",
            format!("expected Vector, got {}", other.type_name()),
        )),
    }
}

fn out_of_bounds(index: i64, len: usize) -> Fault {
    Fault::exception(
        "OutOfBounds",
        format!("vector index {index} out of range for length {len}"),
    )
}

impl Process {
    /// `vec target start <count>` packs a run of registers into a vector,
    /// emptying them.
    pub(crate) fn op_vec(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let start = cur.fetch_register()?;
        let count = cur.fetch_uint()? as usize;

        let (pack_set, pack_start) = self.resolve_operand(&start)?;
        let (target_set, target_index) = self.resolve_operand(&target)?;
        if target_set == pack_set
            && target_index > pack_start
            && target_index < pack_start + count
        {
            return Err(Fault::exception(
                "Exception",
                "vec would pack its own target register",
            ));
        }

        // All packed registers must be occupied before any is emptied.
        for i in 0..count {
            let empty = self.with_set(pack_set, |s| s.is_empty_at(pack_start + i))??;
            if empty {
                return Err(Fault::exception(
                    "EmptyRegister",
                    format!("vec: cannot pack empty register {}", pack_start + i),
                ));
            }
        }

        let mut items = Vec::with_capacity(count);
        for i in 0..count {
            let source = RegisterOperand {
                access: crate::bytecode::operands::RegisterAccess::Direct,
                set: pack_set,
                index: (pack_start + i) as u32,
            };
            items.push(self.take_cell(&source)?);
        }

        self.store(&target, Value::Vector(items))?;
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_vinsert(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let vector = cur.fetch_register()?;
        let source = cur.fetch_register()?;
        let position = cur.fetch_uint()? as usize;

        let value = self.take_or_copy(&source)?;
        let held = self.fetch_cell(&vector)?;
        with_vector(&held, |items| {
            if position > items.len() {
                return Err(out_of_bounds(position as i64, items.len()));
            }
            items.insert(position, value);
            Ok(())
        })?;
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_vpush(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let vector = cur.fetch_register()?;
        let source = cur.fetch_register()?;

        let value = self.take_or_copy(&source)?;
        let held = self.fetch_cell(&vector)?;
        with_vector(&held, |items| {
            items.push(value);
            Ok(())
        })?;
        Ok(Step::Next(cur.ip()))
    }

    /// `vpop target|void vector index|void` removes an element; a void
    /// index pops the last one.
    pub(crate) fn op_vpop(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register_or_void()?;
        let vector = cur.fetch_register()?;
        let index = cur.fetch_register_or_void()?;

        let index = match index {
            Some(operand) => Some(integer_of(&self.fetch_cell(&operand)?)?),
            None => None,
        };

        let held = self.fetch_cell(&vector)?;
        let popped = with_vector(&held, |items| {
            let effective = match index {
                None => {
                    if items.is_empty() {
                        return Err(out_of_bounds(-1, 0));
                    }
                    items.len() - 1
                }
                Some(i) if i < 0 => return Err(out_of_bounds(i, items.len())),
                Some(i) => {
                    let i = i as usize;
                    if i >= items.len() {
                        return Err(out_of_bounds(i as i64, items.len()));
                    }
                    i
                }
            };
            Ok(items.remove(effective))
        })?;

        if let Some(target) = target {
            self.store_cell(&target, popped)?;
        }
        Ok(Step::Next(cur.ip()))
    }

    /// `vat target vector index` stores a pointer to the element.
    pub(crate) fn op_vat(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let vector = cur.fetch_register()?;
        let index = cur.fetch_register()?;

        let index = integer_of(&self.fetch_cell(&index)?)?;
        let held = self.fetch_cell(&vector)?;
        let element = with_vector(&held, |items| {
            if index < 0 || index as usize >= items.len() {
                return Err(out_of_bounds(index, items.len()));
            }
            Ok(items[index as usize].clone())
        })?;

        let pointer = Value::pointer_to(&element, self.pid());
        self.store(&target, pointer)?;
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_vlen(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let vector = cur.fetch_register()?;

        let held = self.fetch_cell(&vector)?;
        let length = with_vector(&held, |items| Ok(items.len()))?;

        self.store(&target, Value::Integer(length as i64))?;
        Ok(Step::Next(cur.ip()))
    }
}
