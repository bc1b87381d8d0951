// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Closure construction and capture instructions.

use crate::bytecode::operands::Cursor;
use crate::kernel::Kernel;
use crate::process::{Fault, Process, Step};
use core::cell::RefCell;
use std::rc::Rc;
use viua_core::value::Closure;
use viua_core::{RegisterSet, Value, ValueCell, cell};

/// Extract the captured set handle from a closure cell.
fn captured_set_of(held: &ValueCell) -> Result<Rc<RefCell<RegisterSet>>, Fault> {
    let value = held.borrow();
    match &*value {
        Value::Closure(closure) => Ok(closure.captured.clone()),
        other => Err(Fault::exception(
            "TypeMismatch",
            format!("expected Closure, got {}", other.type_name()),
        )),
    }
}

impl Process {
    /// `closure target <function> <captures>` builds a closure over
    /// `function` with a fresh captured set of the declared capacity.
    pub(crate) fn op_closure(&mut self, cur: &mut Cursor, kernel: &Kernel) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let function = cur.fetch_atom()?;
        let captures = cur.fetch_uint()? as usize;

        if !kernel.is_function(&function) {
            return Err(Fault::exception(
                "UnknownFunction",
                format!("closure over undefined function: {function}"),
            ));
        }

        let closure = Closure {
            function,
            captured: Rc::new(RefCell::new(RegisterSet::new(captures))),
        };
        self.store(&target, Value::Closure(closure))?;
        Ok(Step::Next(cur.ip()))
    }

    /// `capture` shares the source value: closure and register both see
    /// the same underlying object afterwards.
    pub(crate) fn op_capture(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let closure = cur.fetch_register()?;
        let index = cur.fetch_uint()? as usize;
        let source = cur.fetch_register()?;

        let captured = captured_set_of(&self.fetch_cell(&closure)?)?;
        let shared = self.fetch_cell(&source)?;
        captured
            .borrow_mut()
            .put(index, shared)
            .map_err(Fault::from)?;
        Ok(Step::Next(cur.ip()))
    }

    /// `capturecopy` captures a deep copy of the source value.
    pub(crate) fn op_capturecopy(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let closure = cur.fetch_register()?;
        let index = cur.fetch_uint()? as usize;
        let source = cur.fetch_register()?;

        let captured = captured_set_of(&self.fetch_cell(&closure)?)?;
        let copy = {
            let held = self.fetch_cell(&source)?;
            let copied = held.borrow().deep_copy();
            cell(copied)
        };
        captured
            .borrow_mut()
            .put(index, copy)
            .map_err(Fault::from)?;
        Ok(Step::Next(cur.ip()))
    }

    /// `capturemove` transfers ownership into the closure, emptying the
    /// source register.
    pub(crate) fn op_capturemove(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let closure = cur.fetch_register()?;
        let index = cur.fetch_uint()? as usize;
        let source = cur.fetch_register()?;

        let captured = captured_set_of(&self.fetch_cell(&closure)?)?;
        let moved = self.take_cell(&source)?;
        captured
            .borrow_mut()
            .put(index, moved)
            .map_err(Fault::from)?;
        Ok(Step::Next(cur.ip()))
    }

    /// `function target <function>` stores a first-class function handle.
    pub(crate) fn op_function(&mut self, cur: &mut Cursor, kernel: &Kernel) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let function = cur.fetch_atom()?;

        if !kernel.is_function(&function) {
            return Err(Fault::exception(
                "UnknownFunction",
                format!("undefined function: {function}"),
            ));
        }

        self.store(&target, Value::Function(function))?;
        Ok(Step::Next(cur.ip()))
    }
}
