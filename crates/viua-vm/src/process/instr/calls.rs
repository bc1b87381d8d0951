// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Frame preparation, calls, tail calls, deferred calls and returns.

use crate::bytecode::operands::{Cursor, OperandType};
use crate::kernel::{FfiRequest, Kernel};
use crate::process::frame::{Frame, ResolvedTarget};
use crate::process::{Fault, Process, ProcessState, Step};
use core::cell::RefCell;
use std::rc::Rc;
use viua_core::{RegisterSet, Value, cell};

/// A resolved callable: the function name plus, for closures, the
/// captured set to install as the callee's locals.
pub(crate) struct Callable {
    pub name: String,
    pub captured: Option<Rc<RefCell<RegisterSet>>>,
}

impl Process {
    /// Decode a callable operand: an atom naming a function, or a
    /// register holding a Function or Closure value.
    pub(crate) fn fetch_callable(&mut self, cur: &mut Cursor) -> Result<Callable, Fault> {
        if cur.peek_type()? == OperandType::Atom {
            return Ok(Callable {
                name: cur.fetch_atom()?,
                captured: None,
            });
        }
        let operand = cur.fetch_register()?;
        let held = self.fetch_cell(&operand)?;
        let value = held.borrow();
        match &*value {
            Value::Function(name) => Ok(Callable {
                name: name.clone(),
                captured: None,
            }),
            Value::Closure(closure) => Ok(Callable {
                name: closure.function.clone(),
                captured: Some(closure.captured.clone()),
            }),
            other => Err(Fault::exception(
                "TypeMismatch",
                format!("expected Function or Closure, got {}", other.type_name()),
            )),
        }
    }

    /// Common tail of `call` and `msg`: route the prepared frame either
    /// onto the stack (native) or into the FFI queue (foreign).
    pub(crate) fn invoke(
        &mut self,
        kernel: &Kernel,
        callable: Callable,
        target: Option<ResolvedTarget>,
        return_address: usize,
    ) -> Result<Step, Fault> {
        let is_native = kernel.is_native_function(&callable.name);
        let is_foreign = kernel.is_foreign_function(&callable.name);
        if !is_native && !is_foreign {
            return Err(Fault::exception(
                "UnknownFunction",
                format!("call to undefined function: {}", callable.name),
            ));
        }

        let mut frame = self.take_frame_new()?;
        frame.function_name = callable.name.clone();
        if let Some(captured) = callable.captured {
            frame.install_locals(captured);
        }

        if is_foreign {
            // Offload; the process yields until the executor completes
            // the call and the scheduler applies the outcome.
            kernel.request_foreign_call(FfiRequest {
                function: callable.name,
                frame,
                caller: self.pid(),
                target,
            });
            self.state = ProcessState::AwaitingFfi;
            return Ok(Step::Next(return_address));
        }

        let entry = kernel
            .function_entry(&callable.name)
            .ok_or_else(|| {
                Fault::exception(
                    "UnknownFunction",
                    format!("native function has no entry: {}", callable.name),
                )
            })?;
        frame.return_address = return_address;
        frame.return_target = target;
        self.stack_mut().push(frame);
        Ok(Step::Next(entry))
    }

    /// Pop one deferred frame of the top frame onto the stack, arranging
    /// for the current instruction to re-execute when it returns.
    ///
    /// Returns `None` when no runnable deferred call remains.
    fn run_deferred_before(&mut self, kernel: &Kernel) -> Result<Option<Step>, Fault> {
        loop {
            let Some(mut frame) = self.top_frame_mut()?.deferred.pop() else {
                return Ok(None);
            };
            if let Some(entry) = kernel.function_entry(&frame.function_name) {
                frame.return_address = self.ip;
                frame.return_target = None;
                self.stack_mut().push(frame);
                return Ok(Some(Step::Next(entry)));
            }
            log::warn!(
                "process {}: deferred function {} has no entry, skipping",
                self.pid(),
                frame.function_name
            );
        }
    }

    /// `frame <argc> <locals>` allocates the pending frame consumed by
    /// the next call instruction.
    pub(crate) fn op_frame(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let argc = cur.fetch_uint()? as usize;
        let locals = cur.fetch_uint()? as usize;
        self.frame_new = Some(Frame::new(argc, locals));
        Ok(Step::Next(cur.ip()))
    }

    /// `param <index> source` passes a deep copy.
    pub(crate) fn op_param(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let index = cur.fetch_uint()? as usize;
        let source = cur.fetch_register()?;

        let copy = {
            let held = self.fetch_cell(&source)?;
            let copied = held.borrow().deep_copy();
            cell(copied)
        };
        let frame = self.frame_new.as_mut().ok_or_else(|| {
            Fault::exception("Exception", "param without a prepared frame")
        })?;
        frame.arguments.put(index, copy).map_err(Fault::from)?;
        Ok(Step::Next(cur.ip()))
    }

    /// `pamv <index> source` passes by move, emptying the source.
    pub(crate) fn op_pamv(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let index = cur.fetch_uint()? as usize;
        let source = cur.fetch_register()?;

        let moved = self.take_cell(&source)?;
        let frame = self.frame_new.as_mut().ok_or_else(|| {
            Fault::exception("Exception", "pamv without a prepared frame")
        })?;
        frame.arguments.put(index, moved).map_err(Fault::from)?;
        Ok(Step::Next(cur.ip()))
    }

    /// `arg target|void <index>` moves an argument out of the frame.
    pub(crate) fn op_arg(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register_or_void()?;
        let index = cur.fetch_uint()? as usize;

        let value = self
            .top_frame_mut()?
            .arguments
            .pop(index)
            .map_err(Fault::from)?;
        if let Some(target) = target {
            self.store_cell(&target, value)?;
        }
        Ok(Step::Next(cur.ip()))
    }

    /// `argc target` stores the number of supplied arguments.
    pub(crate) fn op_argc(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let argc = self.top_frame()?.argument_count();
        self.store(&target, Value::Integer(argc as i64))?;
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_call(&mut self, cur: &mut Cursor, kernel: &Kernel) -> Result<Step, Fault> {
        let target = cur.fetch_register_or_void()?;
        let callable = self.fetch_callable(cur)?;
        let target = match target {
            Some(operand) => Some(self.resolve_target(&operand)?),
            None => None,
        };
        self.invoke(kernel, callable, target, cur.ip())
    }

    /// `tailcall` replaces the current frame; stack depth is unchanged.
    pub(crate) fn op_tailcall(&mut self, cur: &mut Cursor, kernel: &Kernel) -> Result<Step, Fault> {
        // Deferred calls of the replaced frame run first; the tail call
        // re-executes once they have returned.
        if let Some(step) = self.run_deferred_before(kernel)? {
            return Ok(step);
        }

        let callable = self.fetch_callable(cur)?;
        if !kernel.is_native_function(&callable.name) {
            return Err(Fault::exception(
                "UnknownFunction",
                format!("tail call to undefined or foreign function: {}", callable.name),
            ));
        }
        let entry = kernel
            .function_entry(&callable.name)
            .ok_or_else(|| {
                Fault::exception(
                    "UnknownFunction",
                    format!("native function has no entry: {}", callable.name),
                )
            })?;

        let mut frame = self.take_frame_new()?;
        frame.function_name = callable.name;
        if let Some(captured) = callable.captured {
            frame.install_locals(captured);
        }

        // The replacement inherits the caller linkage of the replaced
        // frame.
        let replaced = self.stack_mut().pop().ok_or_else(|| {
            Fault::exception("Exception", "tail call without an active frame")
        })?;
        frame.return_address = replaced.return_address;
        frame.return_target = replaced.return_target;
        self.stack_mut().push(frame);
        Ok(Step::Next(entry))
    }

    /// `defer <function>` attaches the prepared frame to the current
    /// frame; it runs when the frame returns, in reverse registration
    /// order, even on exception unwind.
    pub(crate) fn op_defer(&mut self, cur: &mut Cursor, kernel: &Kernel) -> Result<Step, Fault> {
        let callable = self.fetch_callable(cur)?;
        if !kernel.is_native_function(&callable.name) {
            return Err(Fault::exception(
                "UnknownFunction",
                format!("deferred call to undefined or foreign function: {}", callable.name),
            ));
        }

        let mut frame = self.take_frame_new()?;
        frame.function_name = callable.name;
        if let Some(captured) = callable.captured {
            frame.install_locals(captured);
        }
        self.top_frame_mut()?.deferred.push(frame);
        Ok(Step::Next(cur.ip()))
    }

    /// `return` runs deferred calls, pops the frame, transfers the
    /// return value and resumes the caller. Returning from the outermost
    /// frame terminates the process with local register 0 as its result.
    pub(crate) fn op_return(&mut self, _cur: &mut Cursor, kernel: &Kernel) -> Result<Step, Fault> {
        if let Some(step) = self.run_deferred_before(kernel)? {
            return Ok(step);
        }

        let frame = self.stack_mut().pop().ok_or_else(|| {
            Fault::exception("Exception", "return without an active frame")
        })?;

        // Calling convention: the return value is the callee's local
        // register 0.
        let value = {
            let mut locals = frame.locals.borrow_mut();
            locals.register_at(0).ok().and_then(|r| r.release())
        };

        if self.stack().is_empty() {
            self.terminate_returned(value);
            return Ok(Step::Next(frame.return_address));
        }

        if let (Some(target), Some(value)) = (frame.return_target, value) {
            self.store_resolved(target, value)?;
        }

        // If this was a deferred frame running during an unwind, the
        // parked exception resumes its journey now.
        if self.parked_throw.is_some() && self.top_frame()?.unwinding {
            self.thrown = self.parked_throw.take();
        }

        Ok(Step::Next(frame.return_address))
    }
}
