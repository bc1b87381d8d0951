// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Kernel configuration.
//!
//! Read once at kernel construction; there are no hidden globals. The
//! environment variables `VIUA_VP_SCHEDULERS`, `VIUA_FFI_SCHEDULERS` and
//! `VIUA_QUANTUM` override the defaults, and malformed values are logged
//! and ignored.

/// Default number of virtual-process scheduler threads.
pub const DEFAULT_VP_SCHEDULERS: usize = 2;

/// Default number of FFI executor threads.
pub const DEFAULT_FFI_SCHEDULERS: usize = 2;

/// Default number of instructions a process may run before the scheduler
/// reclaims control.
pub const DEFAULT_QUANTUM: usize = 256;

/// Tunables of a kernel instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Size of the virtual-process scheduler pool.
    pub vp_schedulers: usize,
    /// Size of the FFI executor pool.
    pub ffi_schedulers: usize,
    /// Instructions per scheduling quantum.
    pub quantum: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vp_schedulers: DEFAULT_VP_SCHEDULERS,
            ffi_schedulers: DEFAULT_FFI_SCHEDULERS,
            quantum: DEFAULT_QUANTUM,
        }
    }
}

impl Config {
    /// Build a config from explicit variable lookups.
    ///
    /// Exposed separately from [`Config::from_env`] so the parsing rules
    /// can be tested without touching the real environment.
    #[must_use]
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            vp_schedulers: parsed(&lookup, "VIUA_VP_SCHEDULERS", defaults.vp_schedulers),
            ffi_schedulers: parsed(&lookup, "VIUA_FFI_SCHEDULERS", defaults.ffi_schedulers),
            quantum: parsed(&lookup, "VIUA_QUANTUM", defaults.quantum),
        }
    }

    /// Build a config from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }
}

fn parsed(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: usize) -> usize {
    match lookup(name) {
        None => default,
        Some(raw) => match raw.parse::<usize>() {
            Ok(value) if value > 0 => value,
            _ => {
                log::warn!("ignoring malformed {name}={raw:?}, using {default}");
                default
            }
        },
    }
}
