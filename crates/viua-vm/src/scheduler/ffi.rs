// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! FFI executor workers.
//!
//! Foreign calls never run on a process scheduler: the calling process
//! yields, its prepared frame travels through the kernel's foreign-call
//! queue to one of these workers, and the outcome travels back to
//! whichever scheduler owns the caller.

use crate::kernel::{FfiOutcome, Kernel};
use viua_core::{Value, cell};

/// Run one FFI executor until the kernel shuts the pool down.
pub fn worker(id: usize, kernel: &Kernel) {
    log::debug!("ffi scheduler {id}: starting");
    while let Some(mut request) = kernel.next_foreign_call() {
        let caller = request.caller;
        let function = request.function.clone();
        log::trace!("ffi scheduler {id}: calling {function} for {caller}");

        let result = match kernel.foreign_function(&function) {
            Some(callee) => match callee(&mut request.frame, kernel) {
                Ok(()) => {
                    // Calling convention: the return value, if any, is in
                    // the frame's local register 0.
                    let value = {
                        let mut locals = request.frame.locals.borrow_mut();
                        locals.register_at(0).ok().and_then(|r| r.release())
                    };
                    Ok(value)
                }
                Err(exception) => Err(cell(Value::Exception(exception))),
            },
            None => Err(cell(Value::Exception(viua_core::value::Exception::new(
                "UnknownFunction",
                format!("call to unregistered foreign function: {function}"),
            )))),
        };

        kernel.post_ffi_outcome(
            caller,
            FfiOutcome {
                target: request.target,
                result,
            },
        );
    }
    log::debug!("ffi scheduler {id}: stopping");
}
