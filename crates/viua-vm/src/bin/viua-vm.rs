// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Viua VM runner: load a bytecode image, run it, exit with the VM's
//! exit code.

use std::process::ExitCode;
use std::sync::Arc;
use viua_vm::{Config, Kernel};

fn usage() -> ExitCode {
    eprintln!("usage: viua-vm <image> [args...]");
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        return usage();
    };

    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("viua-vm: cannot read {path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut kernel = Kernel::new(Config::from_env());
    if let Err(e) = kernel.load(&bytes) {
        eprintln!("viua-vm: cannot load {path}: {e}");
        return ExitCode::FAILURE;
    }
    kernel.set_arguments(args.collect());

    match Arc::new(kernel).run() {
        Ok(code) => ExitCode::from(u8::try_from(code.rem_euclid(256)).unwrap_or(1)),
        Err(e) => {
            eprintln!("viua-vm: {e}");
            ExitCode::FAILURE
        }
    }
}
