// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Struct instructions.
//!
//! Structs map atoms to owned values; inserting over an existing key
//! replaces the value, removing a missing key fails with `MissingKey`.

use super::atom_of;
use crate::bytecode::operands::Cursor;
use crate::process::{Fault, Process, Step};
use std::collections::BTreeMap;
use viua_core::{Value, ValueCell, cell};

fn with_struct<R>(
    held: &ValueCell,
    f: impl FnOnce(&mut BTreeMap<String, ValueCell>) -> Result<R, Fault>,
) -> Result<R, Fault> {
    let mut value = held.borrow_mut();
    match &mut *value {
        Value::Struct(fields) => f(fields),
        other => Err(Fault::exception(
            "TypeMismatch",
            format!("expected Struct, got {}", other.type_name()),
        )),
    }
}

impl Process {
    pub(crate) fn op_struct(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        self.store(&target, Value::Struct(BTreeMap::new()))?;
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_structinsert(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let key = cur.fetch_register()?;
        let source = cur.fetch_register()?;

        let key = atom_of(&self.fetch_cell(&key)?)?;
        let value = self.take_or_copy(&source)?;
        let held = self.fetch_cell(&target)?;
        with_struct(&held, |fields| {
            fields.insert(key, value);
            Ok(())
        })?;
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_structremove(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register_or_void()?;
        let source = cur.fetch_register()?;
        let key = cur.fetch_register()?;

        let key = atom_of(&self.fetch_cell(&key)?)?;
        let held = self.fetch_cell(&source)?;
        let removed = with_struct(&held, |fields| {
            fields.remove(&key).ok_or_else(|| {
                Fault::exception("MissingKey", format!("struct has no key '{key}'"))
            })
        })?;

        if let Some(target) = target {
            self.store_cell(&target, removed)?;
        }
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_structkeys(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let source = cur.fetch_register()?;

        let held = self.fetch_cell(&source)?;
        let keys = with_struct(&held, |fields| {
            Ok(fields
                .keys()
                .map(|k| cell(Value::Atom(k.clone())))
                .collect::<Vec<_>>())
        })?;

        self.store(&target, Value::Vector(keys))?;
        Ok(Step::Next(cur.ip()))
    }
}
