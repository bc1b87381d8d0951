// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! # Viua core
//!
//! Thread-free foundations of the Viua virtual machine:
//!
//! - `Pid` and other small identifier types
//! - The polymorphic [`Value`] model with its capability surface
//!   (type name, textual rendering, truthiness, deep copy, inheritance)
//! - Registers and register sets, the only places that own values
//!
//! Everything that involves OS threads (processes, schedulers, the kernel)
//! lives in the `viua-vm` crate on top of this one.

pub mod registers;
pub mod types;
pub mod value;

// Re-export commonly used types at crate root
pub use registers::{Register, RegisterError, RegisterSet, RegisterSetId};
pub use types::Pid;
pub use value::{Value, ValueCell, cell};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
