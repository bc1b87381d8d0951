// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the value model's capability surface.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::types::Pid;
use core::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

#[test]
fn type_names() {
    assert_eq!(Value::Integer(1).type_name(), "Integer");
    assert_eq!(Value::Float(1.0).type_name(), "Float");
    assert_eq!(Value::Boolean(true).type_name(), "Boolean");
    assert_eq!(Value::Text("x".into()).type_name(), "Text");
    assert_eq!(Value::Atom("x".into()).type_name(), "Atom");
    assert_eq!(Value::Vector(vec![]).type_name(), "Vector");
    assert_eq!(Value::Struct(BTreeMap::new()).type_name(), "Struct");
    assert_eq!(Value::Object(Object::new("Point")).type_name(), "Point");
    assert_eq!(
        Value::Exception(Exception::new("Timeout", "late")).type_name(),
        "Timeout"
    );
}

#[test]
fn to_text_rendering() {
    assert_eq!(Value::Integer(42).to_text(), "42");
    assert_eq!(Value::Float(2.0).to_text(), "2.0");
    assert_eq!(Value::Float(2.5).to_text(), "2.5");
    assert_eq!(Value::Boolean(false).to_text(), "false");
    assert_eq!(Value::Text("hello".into()).to_text(), "hello");
    assert_eq!(Value::Atom("ok".into()).to_text(), "'ok");

    let v = Value::Vector(vec![cell(Value::Integer(1)), cell(Value::Text("a".into()))]);
    assert_eq!(v.to_text(), "[1, a]");

    let mut fields = BTreeMap::new();
    fields.insert("x".to_owned(), cell(Value::Integer(7)));
    assert_eq!(Value::Struct(fields).to_text(), "{x: 7}");
}

#[test]
fn bits_rendering_and_numeric() {
    let bits = Bits::from_bytes(vec![0b0000_0101]);
    assert_eq!(bits.width, 8);
    assert_eq!(bits.as_u64(), Some(5));
    assert_eq!(Value::Bits(bits).to_text(), "0b00000101");

    let wide = Bits {
        bytes: vec![0; 9],
        width: 72,
    };
    assert_eq!(wide.as_u64(), None);
}

#[test]
fn truthiness() {
    assert!(Value::Integer(1).truthy());
    assert!(!Value::Integer(0).truthy());
    assert!(!Value::Float(0.0).truthy());
    assert!(!Value::Boolean(false).truthy());
    assert!(!Value::Text(String::new()).truthy());
    assert!(Value::Text("x".into()).truthy());
    assert!(!Value::Vector(vec![]).truthy());
    assert!(Value::Vector(vec![cell(Value::Integer(0))]).truthy());
    assert!(Value::Function("f/0".into()).truthy());
}

#[test]
fn deep_copy_renders_identically() {
    let mut fields = BTreeMap::new();
    fields.insert(
        "items".to_owned(),
        cell(Value::Vector(vec![
            cell(Value::Integer(1)),
            cell(Value::Text("two".into())),
        ])),
    );
    let original = Value::Struct(fields);
    let copy = original.deep_copy();
    assert_eq!(copy.to_text(), original.to_text());
}

#[test]
fn deep_copy_does_not_alias() {
    let inner = cell(Value::Integer(1));
    let original = Value::Vector(vec![inner.clone()]);

    let copy = original.deep_copy();
    *inner.borrow_mut() = Value::Integer(99);

    assert_eq!(original.to_text(), "[99]");
    assert_eq!(copy.to_text(), "[1]");
}

#[test]
fn pointer_tracks_referent_lifetime() {
    let origin = Pid::from_raw(7);
    let target = cell(Value::Integer(5));
    let pointer = Value::pointer_to(&target, origin);

    let Value::Pointer(p) = &pointer else {
        panic!("expected a pointer");
    };
    assert!(!p.expired());
    assert_eq!(
        p.dereference(origin).unwrap().borrow().to_text(),
        "5"
    );

    drop(target);
    assert!(p.expired());
    assert_eq!(p.dereference(origin).unwrap_err(), PointerError::Stale);
}

#[test]
fn pointer_rejects_foreign_process_even_when_alive() {
    let origin = Pid::from_raw(1);
    let foreign = Pid::from_raw(2);
    let target = cell(Value::Integer(5));
    let p = Pointer::new(&target, origin);

    assert_eq!(
        p.dereference(foreign).unwrap_err(),
        PointerError::CrossProcess {
            origin,
            asking: foreign
        }
    );
    // The referent is still alive; rejection is purely about origin.
    assert!(!p.expired());
}

#[test]
fn pointer_deep_copy_shares_referent() {
    let origin = Pid::from_raw(1);
    let target = cell(Value::Integer(5));
    let p = Value::Pointer(Pointer::new(&target, origin));

    let copy = p.deep_copy();
    drop(p);

    let Value::Pointer(copied) = copy else {
        panic!("expected a pointer");
    };
    assert_eq!(copied.dereference(origin).unwrap().borrow().to_text(), "5");
}

#[test]
fn inheritance_chains() {
    assert_eq!(
        Value::Integer(1).inheritance_chain(),
        vec!["Integer", "Number", "Value"]
    );
    assert_eq!(
        Value::Exception(Exception::new("Timeout", "late")).inheritance_chain(),
        vec!["Timeout", "Exception", "Value"]
    );
    assert_eq!(
        Value::Exception(Exception::plain("boom")).inheritance_chain(),
        vec!["Exception", "Value"]
    );
    assert_eq!(
        Value::Object(Object::new("B")).inheritance_chain(),
        vec!["B", "Object", "Value"]
    );
}

#[test]
fn closure_deep_copy_clones_captured_set() {
    use crate::registers::RegisterSet;

    let captured = Rc::new(RefCell::new(RegisterSet::new(2)));
    captured
        .borrow_mut()
        .put(0, cell(Value::Integer(10)))
        .unwrap();

    let closure = Value::Closure(Closure {
        function: "f/0".into(),
        captured: captured.clone(),
    });
    let copy = closure.deep_copy();

    // Mutate the original captured set; the copy must be unaffected.
    captured
        .borrow_mut()
        .put(0, cell(Value::Integer(99)))
        .unwrap();

    let Value::Closure(copied) = copy else {
        panic!("expected a closure");
    };
    let set = copied.captured.borrow();
    assert_eq!(set.get(0).unwrap().borrow().to_text(), "10");
}

#[test]
fn process_handles_compare_by_pid() {
    let a = Value::Process(ProcessHandle {
        pid: Pid::from_raw(3),
    });
    let Value::Process(ha) = &a else { unreachable!() };
    assert_eq!(
        *ha,
        ProcessHandle {
            pid: Pid::from_raw(3)
        }
    );
}
