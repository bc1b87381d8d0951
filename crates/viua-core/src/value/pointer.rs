// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Non-owning value references with a process-of-origin safety token.

use super::{Value, ValueCell};
use crate::types::Pid;
use core::cell::RefCell;
use core::fmt;
use std::rc::{Rc, Weak};

/// Why a pointer dereference was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerError {
    /// The referent has been freed.
    Stale,
    /// The dereference was attempted outside the pointer's origin process.
    CrossProcess {
        /// Process the pointer was taken in.
        origin: Pid,
        /// Process that attempted the dereference.
        asking: Pid,
    },
}

impl fmt::Display for PointerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stale => write!(f, "pointer to freed value"),
            Self::CrossProcess { origin, asking } => write!(
                f,
                "pointer of origin {origin} dereferenced in process {asking}"
            ),
        }
    }
}

impl std::error::Error for PointerError {}

/// A non-owning reference to a value owned by some register.
///
/// The origin PID is a parallelism-safety token: pointers may only be
/// dereferenced inside the process that created them. The VM employs
/// shared-nothing concurrency, so a cross-process dereference is illegal
/// by definition, whether or not the referent is still alive. The origin
/// is authenticated on every use.
#[derive(Clone)]
pub struct Pointer {
    target: Weak<RefCell<Value>>,
    origin: Pid,
}

impl Pointer {
    /// Create a pointer to the value held by `target`, owned by `origin`.
    #[must_use]
    pub fn new(target: &ValueCell, origin: Pid) -> Self {
        Self {
            target: Rc::downgrade(target),
            origin,
        }
    }

    /// The process this pointer was taken in.
    #[must_use]
    pub const fn origin(&self) -> Pid {
        self.origin
    }

    /// Check whether the referent has been freed.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.target.strong_count() == 0
    }

    /// Dereference on behalf of process `asking`.
    ///
    /// Authenticates the origin first: a live referent does not make a
    /// cross-process dereference legal.
    pub fn dereference(&self, asking: Pid) -> Result<ValueCell, PointerError> {
        if asking != self.origin {
            return Err(PointerError::CrossProcess {
                origin: self.origin,
                asking,
            });
        }
        self.target.upgrade().ok_or(PointerError::Stale)
    }

    /// Render the pointer for printing.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self.target.upgrade() {
            Some(target) => format!("Pointer({})", target.borrow().type_name()),
            None => "Pointer(expired)".to_owned(),
        }
    }
}
