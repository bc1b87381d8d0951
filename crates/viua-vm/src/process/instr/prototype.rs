// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Prototype construction and registration.

use crate::bytecode::operands::Cursor;
use crate::kernel::Kernel;
use crate::process::{Fault, Process, Step};
use viua_core::Value;
use viua_core::value::Prototype;

impl Process {
    /// `class target <name>` creates a fresh prototype.
    pub(crate) fn op_class(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let name = cur.fetch_atom()?;
        self.store(&target, Value::Prototype(Prototype::new(name)))?;
        Ok(Step::Next(cur.ip()))
    }

    /// `derive target <base>` appends a registered class to the
    /// prototype's inheritance list.
    pub(crate) fn op_derive(&mut self, cur: &mut Cursor, kernel: &Kernel) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let base = cur.fetch_atom()?;

        if !kernel.is_class(&base) {
            return Err(Fault::exception(
                "UnknownClass",
                format!("cannot derive from unregistered type: {base}"),
            ));
        }

        let held = self.fetch_cell(&target)?;
        let mut value = held.borrow_mut();
        match &mut *value {
            Value::Prototype(prototype) => {
                prototype.derive(base);
                drop(value);
                Ok(Step::Next(cur.ip()))
            }
            other => Err(Fault::exception(
                "TypeMismatch",
                format!("expected Prototype, got {}", other.type_name()),
            )),
        }
    }

    /// `attach target <function> <method>` binds a defined function as a
    /// method of the prototype.
    pub(crate) fn op_attach(&mut self, cur: &mut Cursor, kernel: &Kernel) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let function = cur.fetch_atom()?;
        let method = cur.fetch_atom()?;

        if !kernel.is_function(&function) {
            return Err(Fault::exception(
                "UnknownFunction",
                format!("cannot attach undefined function '{function}' as method '{method}'"),
            ));
        }

        let held = self.fetch_cell(&target)?;
        let mut value = held.borrow_mut();
        match &mut *value {
            Value::Prototype(prototype) => {
                prototype.attach(function, method);
                drop(value);
                Ok(Step::Next(cur.ip()))
            }
            other => Err(Fault::exception(
                "TypeMismatch",
                format!("expected Prototype, got {}", other.type_name()),
            )),
        }
    }

    /// `register source` installs the prototype into the kernel's
    /// typesystem, consuming it. Registering a name twice fails with
    /// `DuplicateClass`.
    pub(crate) fn op_register(&mut self, cur: &mut Cursor, kernel: &Kernel) -> Result<Step, Fault> {
        let source = cur.fetch_register()?;
        let held = self.take_cell(&source)?;
        let prototype = {
            let value = held.borrow();
            match &*value {
                Value::Prototype(prototype) => prototype.clone(),
                other => {
                    return Err(Fault::exception(
                        "TypeMismatch",
                        format!("expected Prototype, got {}", other.type_name()),
                    ));
                }
            }
        };
        kernel.register_prototype(prototype)?;
        Ok(Step::Next(cur.ip()))
    }
}
