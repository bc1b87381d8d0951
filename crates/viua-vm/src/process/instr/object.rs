// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Object instantiation, dynamic dispatch and attribute access.

use crate::bytecode::operands::{Cursor, OperandType};
use crate::kernel::Kernel;
use crate::process::instr::calls::Callable;
use crate::process::{Fault, Process, Step};
use viua_core::value::Object;
use viua_core::{Value, ValueCell};

/// Attribute keys may be Text or Atom values.
fn key_of(held: &ValueCell) -> Result<String, Fault> {
    let value = held.borrow();
    match &*value {
        Value::Text(t) => Ok(t.clone()),
        Value::Atom(a) => Ok(a.clone()),
        other => Err(Fault::exception(
            "TypeMismatch",
            format!("attribute key must be Text or Atom, got {}", other.type_name()),
        )),
    }
}

impl Process {
    /// `new target <class>` instantiates a registered class.
    pub(crate) fn op_new(&mut self, cur: &mut Cursor, kernel: &Kernel) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let class = cur.fetch_atom()?;

        if !kernel.is_class(&class) {
            return Err(Fault::exception(
                "UnknownClass",
                format!("cannot create new instance of unregistered type: {class}"),
            ));
        }

        self.store(&target, Value::Object(Object::new(class)))?;
        Ok(Step::Next(cur.ip()))
    }

    /// `msg target|void <method>|source` performs dynamic dispatch on
    /// the receiver in argument slot 0 of the prepared frame: the
    /// receiver's inheritance chain is walked depth-first, self first,
    /// and the first class declaring the method wins.
    pub(crate) fn op_msg(&mut self, cur: &mut Cursor, kernel: &Kernel) -> Result<Step, Fault> {
        let target = cur.fetch_register_or_void()?;

        // The method is either named by an atom, or read from a Function
        // or Closure value whose name doubles as the method name.
        let (method, captured) = if cur.peek_type()? == OperandType::Atom {
            (cur.fetch_atom()?, None)
        } else {
            let callable = self.fetch_callable(cur)?;
            (callable.name, callable.captured)
        };

        let receiver = {
            let frame = self.frame_new.as_ref().ok_or_else(|| {
                Fault::exception("Exception", "msg without a prepared frame")
            })?;
            frame
                .arguments
                .get(0)
                .map_err(|_| {
                    Fault::exception("Exception", "msg without a receiver in argument 0")
                })?
                .clone()
        };

        // Dispatch on the referent when the receiver is a pointer; the
        // origin token is authenticated as on any dereference.
        let receiver_type = {
            let pointer = {
                let value = receiver.borrow();
                match &*value {
                    Value::Pointer(p) => Some(p.clone()),
                    _ => None,
                }
            };
            match pointer {
                Some(p) => {
                    let referent = p.dereference(self.pid())?;
                    let name = referent.borrow().type_name().to_owned();
                    name
                }
                None => receiver.borrow().type_name().to_owned(),
            }
        };

        if !kernel.is_class(&receiver_type) {
            return Err(Fault::exception(
                "UnknownClass",
                format!("unregistered type cannot be used for dynamic dispatch: {receiver_type}"),
            ));
        }

        let mut chain = vec![receiver_type.clone()];
        chain.extend(kernel.inheritance_chain_of(&receiver_type));

        let mut function = None;
        for class in &chain {
            if !kernel.is_class(class) {
                return Err(Fault::exception(
                    "UnknownClass",
                    format!(
                        "unavailable base type in inheritance hierarchy of {receiver_type}: {class}"
                    ),
                ));
            }
            if let Some(resolved) = kernel.resolve_method(class, &method) {
                function = Some(resolved);
                break;
            }
        }
        let Some(function) = function else {
            return Err(Fault::exception(
                "MethodNotFound",
                format!("class '{receiver_type}' does not accept method '{method}'"),
            ));
        };

        let target = match target {
            Some(operand) => Some(self.resolve_target(&operand)?),
            None => None,
        };
        self.invoke(
            kernel,
            Callable {
                name: function,
                captured,
            },
            target,
            cur.ip(),
        )
    }

    /// `insert object key source` sets an attribute, replacing any
    /// previous value.
    pub(crate) fn op_insert(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let object = cur.fetch_register()?;
        let key = cur.fetch_register()?;
        let source = cur.fetch_register()?;

        let key = key_of(&self.fetch_cell(&key)?)?;
        let value = self.take_or_copy(&source)?;
        let held = self.fetch_cell(&object)?;
        let mut borrowed = held.borrow_mut();
        match &mut *borrowed {
            Value::Object(object) => {
                object.attributes.insert(key, value);
                drop(borrowed);
                Ok(Step::Next(cur.ip()))
            }
            other => Err(Fault::exception(
                "TypeMismatch",
                format!("expected Object, got {}", other.type_name()),
            )),
        }
    }

    /// `remove target|void object key` takes an attribute out of the
    /// object; a missing key fails with `MissingKey`.
    pub(crate) fn op_remove(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register_or_void()?;
        let object = cur.fetch_register()?;
        let key = cur.fetch_register()?;

        let key = key_of(&self.fetch_cell(&key)?)?;
        let held = self.fetch_cell(&object)?;
        let removed = {
            let mut borrowed = held.borrow_mut();
            match &mut *borrowed {
                Value::Object(object) => object.attributes.remove(&key).ok_or_else(|| {
                    Fault::exception("MissingKey", format!("object has no attribute '{key}'"))
                })?,
                other => {
                    let message = format!("expected Object, got {}", other.type_name());
                    return Err(Fault::exception("TypeMismatch", message));
                }
            }
        };

        if let Some(target) = target {
            self.store_cell(&target, removed)?;
        }
        Ok(Step::Next(cur.ip()))
    }
}
