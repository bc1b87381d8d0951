// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for configuration parsing.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::config::{
    Config, DEFAULT_FFI_SCHEDULERS, DEFAULT_QUANTUM, DEFAULT_VP_SCHEDULERS,
};

#[test]
fn defaults() {
    let config = Config::default();
    assert_eq!(config.vp_schedulers, DEFAULT_VP_SCHEDULERS);
    assert_eq!(config.ffi_schedulers, DEFAULT_FFI_SCHEDULERS);
    assert_eq!(config.quantum, DEFAULT_QUANTUM);
}

#[test]
fn variables_override_defaults() {
    let config = Config::from_vars(|name| match name {
        "VIUA_VP_SCHEDULERS" => Some("4".to_owned()),
        "VIUA_FFI_SCHEDULERS" => Some("8".to_owned()),
        "VIUA_QUANTUM" => Some("1024".to_owned()),
        _ => None,
    });
    assert_eq!(config.vp_schedulers, 4);
    assert_eq!(config.ffi_schedulers, 8);
    assert_eq!(config.quantum, 1024);
}

#[test]
fn malformed_values_fall_back_to_defaults() {
    let config = Config::from_vars(|name| match name {
        "VIUA_VP_SCHEDULERS" => Some("many".to_owned()),
        "VIUA_QUANTUM" => Some("0".to_owned()),
        _ => None,
    });
    assert_eq!(config.vp_schedulers, DEFAULT_VP_SCHEDULERS);
    assert_eq!(config.quantum, DEFAULT_QUANTUM);
}

#[test]
fn unset_variables_keep_defaults() {
    let config = Config::from_vars(|_| None);
    assert_eq!(config, Config::default());
}
