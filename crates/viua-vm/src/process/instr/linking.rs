// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Module linking at runtime.

use crate::bytecode::operands::Cursor;
use crate::kernel::Kernel;
use crate::process::{Fault, Process, Step};

impl Process {
    /// `import <module>` activates a foreign module previously
    /// registered with the kernel, making its functions callable.
    pub(crate) fn op_import(&mut self, cur: &mut Cursor, kernel: &Kernel) -> Result<Step, Fault> {
        let module = cur.fetch_atom()?;
        kernel.import_module(&module)?;
        Ok(Step::Next(cur.ip()))
    }
}
