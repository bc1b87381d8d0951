// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Call frames and try scopes.

use core::cell::RefCell;
use std::rc::Rc;
use viua_core::{RegisterSet, RegisterSetId, ValueCell};

/// A concrete register destination in the caller, resolved at call time.
///
/// `Current` is resolved away before a target is stored, so only the
/// three concrete sets appear here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// The concrete register set.
    pub set: RegisterSetId,
    /// Register index within the set.
    pub index: usize,
}

/// A catcher registered on a try scope.
#[derive(Clone, Debug)]
pub struct Catcher {
    /// Exception type name this catcher claims.
    pub type_name: String,
    /// Name of the handling block.
    pub block: String,
    /// Entry offset of the handling block.
    pub entry: usize,
}

/// An entered try scope.
///
/// Built up by `try`/`catch`, activated by `enter` and consumed by
/// exactly one `leave` or one exception unwind.
#[derive(Clone, Debug, Default)]
pub struct TryScope {
    /// Catchers registered before the block was entered.
    pub catchers: Vec<Catcher>,
    /// Where execution resumes after `leave`: just past the `enter`.
    pub resume_address: usize,
}

/// Activation record for one call.
pub struct Frame {
    /// Name of the function executing in this frame.
    pub function_name: String,
    /// Local register set. Shared so a closure's captured set can be
    /// installed here without reallocation.
    pub locals: Rc<RefCell<RegisterSet>>,
    /// Arguments, filled by the caller before the call.
    pub arguments: RegisterSet,
    /// Where the return value goes in the caller, if anywhere.
    pub return_target: Option<ResolvedTarget>,
    /// Byte offset the caller resumes at.
    pub return_address: usize,
    /// Active try scopes, innermost last.
    pub scopes: Vec<TryScope>,
    /// Deferred calls, executed in reverse order when the frame returns.
    pub deferred: Vec<Frame>,
    /// Exception claimed by a catcher of this frame, awaiting `draw`.
    pub caught: Option<ValueCell>,
    /// Set once unwinding decided no catcher of this frame matches.
    pub unwinding: bool,
}

impl Frame {
    /// Create a frame with `argc` argument slots and `local_capacity`
    /// local registers.
    #[must_use]
    pub fn new(argc: usize, local_capacity: usize) -> Self {
        Self {
            function_name: String::new(),
            locals: Rc::new(RefCell::new(RegisterSet::new(local_capacity))),
            arguments: RegisterSet::new(argc),
            return_target: None,
            return_address: 0,
            scopes: Vec::new(),
            deferred: Vec::new(),
            caught: None,
            unwinding: false,
        }
    }

    /// Replace the local set with a closure's captured set.
    pub fn install_locals(&mut self, captured: Rc<RefCell<RegisterSet>>) {
        self.locals = captured;
    }

    /// Number of argument slots the caller provided.
    #[must_use]
    pub fn argument_count(&self) -> usize {
        self.arguments.capacity()
    }
}

impl core::fmt::Debug for Frame {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Frame")
            .field("function", &self.function_name)
            .field("arguments", &self.arguments.capacity())
            .field("scopes", &self.scopes.len())
            .field("deferred", &self.deferred.len())
            .field("unwinding", &self.unwinding)
            .finish_non_exhaustive()
    }
}
