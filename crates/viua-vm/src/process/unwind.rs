// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Stack unwinding.
//!
//! When an instruction throws, the exception lands in the process's
//! transient slot and the scheduler invokes [`handle_thrown`] between
//! instructions. Unwinding proceeds frame by frame, innermost first:
//!
//! 1. Catchers of the frame's active try scopes are tested innermost
//!    first against the exception's inheritance chain. Within a scope
//!    the catcher naming the earliest chain entry (the most specific
//!    type) wins, regardless of registration order. A match transfers
//!    the exception into the frame's caught slot and jumps to the
//!    handling block.
//! 2. With no matching catcher, the frame's deferred calls run, most
//!    recently registered first. The exception is parked while a deferred
//!    frame executes and restored when it returns.
//! 3. Once the deferred calls are exhausted the frame is popped and
//!    unwinding continues in the caller.
//!
//! An exception that leaves the outermost frame terminates the process.

use super::{Process, ProcessState};
use crate::kernel::Kernel;
use viua_core::{Value, ValueCell};

/// The dynamic inheritance chain of a thrown value.
///
/// For objects the registered prototype ancestry extends the intrinsic
/// chain, so a catcher naming any ancestor class claims the throw.
fn exception_chain(value: &ValueCell, kernel: &Kernel) -> Vec<String> {
    let value = value.borrow();
    let mut chain = value.inheritance_chain();
    if let Value::Object(object) = &*value {
        let ancestry = kernel.inheritance_chain_of(&object.type_name);
        // Insert the prototype ancestry right after the class name.
        for (i, base) in ancestry.into_iter().enumerate() {
            chain.insert(1 + i, base);
        }
    }
    chain
}

/// Drive unwinding until the exception is caught, parked behind a
/// deferred call, or the process dies.
pub fn handle_thrown(process: &mut Process, kernel: &Kernel) {
    let Some(exception) = process.thrown.take() else {
        return;
    };
    let chain = exception_chain(&exception, kernel);
    let pid = process.pid();

    loop {
        if process.stack().is_empty() {
            // Uncaught: the process dies with the exception as its result.
            log::error!(
                "process {pid}: uncaught exception: {}",
                exception.borrow().to_text()
            );
            process.terminate_crashed(exception);
            return;
        }

        // Phase 1: test catchers, innermost scope first. A frame already
        // marked as unwinding had its chance.
        let matched = {
            let frame = process
                .stack_mut()
                .last_mut()
                .expect("stack emptiness checked above");
            if frame.unwinding {
                None
            } else {
                // A throw of a value whose chain is [T, U, V] goes to a
                // catcher for T over one for U or V, whatever order the
                // catchers were registered in.
                let matched = frame
                    .scopes
                    .iter()
                    .enumerate()
                    .rev()
                    .find_map(|(depth, scope)| {
                        scope
                            .catchers
                            .iter()
                            .filter_map(|catcher| {
                                chain
                                    .iter()
                                    .position(|t| *t == catcher.type_name)
                                    .map(|priority| (priority, catcher.entry))
                            })
                            .min_by_key(|(priority, _)| *priority)
                            .map(|(_, entry)| (depth, entry))
                    });
                if matched.is_none() {
                    frame.unwinding = true;
                    frame.scopes.clear();
                }
                matched
            }
        };

        if let Some((depth, entry)) = matched {
            let frame = process
                .stack_mut()
                .last_mut()
                .expect("stack emptiness checked above");
            // Scopes inside the matching one are consumed by the unwind;
            // the matching scope stays and is closed by the handler's
            // leave.
            frame.scopes.truncate(depth + 1);
            frame.caught = Some(exception);
            process.ip = entry;
            process.state = ProcessState::Ready;
            return;
        }

        // Phase 2: run the frame's deferred calls, last registered first.
        let deferred = process
            .stack_mut()
            .last_mut()
            .expect("stack emptiness checked above")
            .deferred
            .pop();
        match deferred {
            Some(mut frame) => match kernel.function_entry(&frame.function_name) {
                Some(entry) => {
                    // Park the exception; op_return restores it when the
                    // deferred frame finishes.
                    frame.return_address = process.ip;
                    frame.return_target = None;
                    process.parked_throw = Some(exception);
                    process.ip = entry;
                    process.stack_mut().push(frame);
                    process.state = ProcessState::Ready;
                    return;
                }
                None => {
                    log::warn!(
                        "process {pid}: deferred function {} vanished during unwind",
                        frame.function_name
                    );
                }
            },
            // Phase 3: nothing left in this frame, continue outward.
            None => {
                process.stack_mut().pop();
            }
        }
    }
}
