// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! # Viua VM
//!
//! Runtime for Viua bytecode. This crate provides:
//!
//! - Bytecode format: opcode table, operand decoder, image loader and an
//!   in-memory program builder
//! - Frames, processes and the instruction handlers
//! - The cooperative virtual-process scheduler over a fixed OS-thread pool
//! - The FFI executor pool for offloaded foreign calls
//! - The kernel: loaded code, symbol tables, typesystem, mailboxes and the
//!   lifecycle API (`load`, `register_*`, `run`)
//!
//! Processes are shared-nothing: each owns its registers and messages, and
//! values cross process boundaries only by ownership transfer through
//! mailboxes. Within one process execution is strictly sequential; the
//! schedulers only interleave whole quanta of different processes.

pub mod bytecode;
pub mod kernel;
pub mod process;
pub mod scheduler;

// Re-export commonly used types at crate root
pub use kernel::{Config, Kernel};
pub use process::{Process, ProcessState};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
