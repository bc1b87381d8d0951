// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Try/catch scopes, throwing and drawing caught values.

use crate::bytecode::operands::Cursor;
use crate::kernel::Kernel;
use crate::process::frame::{Catcher, TryScope};
use crate::process::{Fault, Process, Step};

impl Process {
    /// `try` opens the scope the following `catch` instructions fill.
    pub(crate) fn op_try(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        self.try_new = Some(TryScope::default());
        Ok(Step::Next(cur.ip()))
    }

    /// `catch <type> <block>` registers a catcher on the pending scope.
    pub(crate) fn op_catch(&mut self, cur: &mut Cursor, kernel: &Kernel) -> Result<Step, Fault> {
        let type_name = cur.fetch_atom()?;
        let block = cur.fetch_atom()?;

        let entry = kernel.block_entry(&block).ok_or_else(|| {
            Fault::exception("UnknownBlock", format!("catch with undefined block: {block}"))
        })?;
        let scope = self.try_new.as_mut().ok_or_else(|| {
            Fault::exception("Exception", "catch without a prepared try scope")
        })?;
        scope.catchers.push(Catcher {
            type_name,
            block,
            entry,
        });
        Ok(Step::Next(cur.ip()))
    }

    /// `enter <block>` activates the pending scope and jumps into the
    /// guarded block. Execution resumes past the enter on `leave`.
    pub(crate) fn op_enter(&mut self, cur: &mut Cursor, kernel: &Kernel) -> Result<Step, Fault> {
        let block = cur.fetch_atom()?;
        let entry = kernel.block_entry(&block).ok_or_else(|| {
            Fault::exception("UnknownBlock", format!("enter of undefined block: {block}"))
        })?;

        let mut scope = self.try_new.take().unwrap_or_default();
        scope.resume_address = cur.ip();
        self.top_frame_mut()?.scopes.push(scope);
        Ok(Step::Next(entry))
    }

    /// `leave` closes the innermost scope, resuming just past its enter.
    pub(crate) fn op_leave(&mut self, _cur: &mut Cursor) -> Result<Step, Fault> {
        let scope = self.top_frame_mut()?.scopes.pop().ok_or_else(|| {
            Fault::exception("Exception", "leave without an entered block")
        })?;
        Ok(Step::Next(scope.resume_address))
    }

    /// `throw source` throws the value owned by the source register.
    pub(crate) fn op_throw(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let source = cur.fetch_register()?;
        let value = self.take_cell(&source)?;
        Err(Fault::Throw(value))
    }

    /// `draw target` moves the caught value into a register.
    pub(crate) fn op_draw(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let caught = self.top_frame_mut()?.caught.take().ok_or_else(|| {
            Fault::exception("Exception", "no caught object to draw")
        })?;
        self.store_cell(&target, caught)?;
        Ok(Step::Next(cur.ip()))
    }
}
