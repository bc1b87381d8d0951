// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Value representation for the Viua VM.
//!
//! Values are the runtime representation of everything a program can hold
//! in a register: numbers, text, containers, callables, process handles,
//! pointers, prototypes and exceptions. Every variant answers the same
//! capability surface:
//!
//! - [`Value::type_name`] - dynamic type name, used for dispatch and catch
//!   matching
//! - [`Value::to_text`] - human readable rendering
//! - [`Value::truthy`] - boolean interpretation
//! - [`Value::deep_copy`] - structural copy that never aliases the original
//! - [`Value::bases`] / [`Value::inheritance_chain`] - static ancestry for
//!   exception matching (prototype ancestry of objects is resolved by the
//!   kernel on top of this)
//!
//! Ownership model: a value lives in exactly one register, frame slot,
//! message or queue at a time. Registers own values through [`ValueCell`]
//! (`Rc<RefCell<Value>>`); transferring ownership transfers the sole strong
//! reference. Pointers hold a `Weak` reference which goes dead the moment
//! the owning slot drops the value, so stale pointers are detected without
//! any garbage collector.

#[cfg(test)]
mod mod_test;
#[cfg(test)]
mod text_test;

mod exception;
pub mod number;
mod pointer;
mod prototype;
pub mod text;

pub use exception::Exception;
pub use number::Numeric;
pub use pointer::{Pointer, PointerError};
pub use prototype::Prototype;

use crate::registers::RegisterSet;
use crate::types::Pid;
use core::cell::RefCell;
// Struct fields and object attributes are kept ordered so that textual
// rendering is deterministic.
use std::collections::BTreeMap;
use std::rc::Rc;

/// A shared handle to an owned value.
///
/// The register (or frame slot, or message) holding the cell is the owner;
/// additional strong references exist only for values deliberately shared
/// by reference (closure captures).
pub type ValueCell = Rc<RefCell<Value>>;

/// Wrap a value into a fresh cell.
#[must_use]
pub fn cell(value: Value) -> ValueCell {
    Rc::new(RefCell::new(value))
}

/// An arbitrary-width bit string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bits {
    /// Raw bits, least significant byte first.
    pub bytes: Vec<u8>,
    /// Number of significant bits.
    pub width: usize,
}

impl Bits {
    /// Create a bit string from raw bytes; every bit of every byte counts.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let width = bytes.len() * 8;
        Self { bytes, width }
    }

    /// Interpret the bits as an unsigned integer, if they fit into 64 bits.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        if self.width > 64 {
            return None;
        }
        let mut out = 0u64;
        for (i, byte) in self.bytes.iter().enumerate() {
            out |= u64::from(*byte) << (8 * i);
        }
        Some(out)
    }
}

/// A closure: a function bundled with a captured register set.
///
/// The captured set is shared; invoking the closure installs it as the
/// frame's local set instead of allocating a fresh one.
#[derive(Clone)]
pub struct Closure {
    /// Name of the function the closure invokes.
    pub function: String,
    /// Captured registers, installed as frame locals on invocation.
    pub captured: Rc<RefCell<RegisterSet>>,
}

/// An instance of a user-registered class.
#[derive(Clone)]
pub struct Object {
    /// Name of the class this object was constructed from.
    pub type_name: String,
    /// Named attributes, each owned by the object.
    pub attributes: BTreeMap<String, ValueCell>,
}

impl Object {
    /// Create an attribute-less instance of the named class.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            attributes: BTreeMap::new(),
        }
    }
}

/// A handle to a spawned process.
///
/// Handles are weak: they identify the process by PID and never keep it
/// alive. Two handles compare equal exactly when their PIDs do.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ProcessHandle {
    /// PID of the referenced process.
    pub pid: Pid,
}

/// A Viua value.
pub enum Value {
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit floating point number.
    Float(f64),
    /// Boolean.
    Boolean(bool),
    /// UTF-8 text; indexes count Unicode scalar values.
    Text(String),
    /// Opaque byte sequence.
    String(Vec<u8>),
    /// Arbitrary-width bit string.
    Bits(Bits),
    /// Interned-by-content symbol.
    Atom(String),
    /// Ordered sequence of owned values.
    Vector(Vec<ValueCell>),
    /// Mapping from atom to owned value.
    Struct(BTreeMap<String, ValueCell>),
    /// Instance of a registered class.
    Object(Object),
    /// Function with a captured register set.
    Closure(Closure),
    /// First-class function handle.
    Function(String),
    /// Weak handle to a spawned process.
    Process(ProcessHandle),
    /// Non-owning reference to another value, tagged with its process of
    /// origin.
    Pointer(Pointer),
    /// Runtime class descriptor.
    Prototype(Prototype),
    /// Exception payload.
    Exception(Exception),
}

impl Value {
    /// Dynamic type name of this value.
    ///
    /// Objects report their class name and exceptions their tag, which is
    /// what dynamic dispatch and catch matching key on.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Integer(_) => "Integer",
            Self::Float(_) => "Float",
            Self::Boolean(_) => "Boolean",
            Self::Text(_) => "Text",
            Self::String(_) => "String",
            Self::Bits(_) => "Bits",
            Self::Atom(_) => "Atom",
            Self::Vector(_) => "Vector",
            Self::Struct(_) => "Struct",
            Self::Object(o) => &o.type_name,
            Self::Closure(_) => "Closure",
            Self::Function(_) => "Function",
            Self::Process(_) => "Process",
            Self::Pointer(_) => "Pointer",
            Self::Prototype(_) => "Prototype",
            Self::Exception(e) => e.tag(),
        }
    }

    /// Static base types of this value.
    ///
    /// The ancestry of objects beyond their own class name is recorded in
    /// the kernel's prototype registry, not here.
    #[must_use]
    pub fn bases(&self) -> Vec<String> {
        match self {
            Self::Integer(_) | Self::Float(_) | Self::Boolean(_) | Self::Bits(_) => {
                vec!["Number".into(), "Value".into()]
            }
            Self::Exception(e) => e.bases(),
            Self::Object(_) => vec!["Object".into(), "Value".into()],
            _ => vec!["Value".into()],
        }
    }

    /// The full static inheritance chain: own type name first, then bases.
    #[must_use]
    pub fn inheritance_chain(&self) -> Vec<String> {
        let mut chain = vec![self.type_name().to_owned()];
        chain.extend(self.bases());
        chain
    }

    /// Human readable rendering of this value.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Integer(n) => n.to_string(),
            Self::Float(f) => format_float(*f),
            Self::Boolean(b) => b.to_string(),
            Self::Text(t) => t.clone(),
            Self::String(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            Self::Bits(bits) => format_bits(bits),
            Self::Atom(a) => format!("'{a}"),
            Self::Vector(items) => {
                let rendered: Vec<String> =
                    items.iter().map(|i| i.borrow().to_text()).collect();
                format!("[{}]", rendered.join(", "))
            }
            Self::Struct(fields) => {
                let rendered: Vec<String> = fields
                    .iter()
                    .map(|(k, v)| format!("{k}: {}", v.borrow().to_text()))
                    .collect();
                format!("{{{}}}", rendered.join(", "))
            }
            Self::Object(o) => {
                let rendered: Vec<String> = o
                    .attributes
                    .iter()
                    .map(|(k, v)| format!("{k}: {}", v.borrow().to_text()))
                    .collect();
                format!("{}{{{}}}", o.type_name, rendered.join(", "))
            }
            Self::Closure(c) => format!("Closure: {}", c.function),
            Self::Function(name) => format!("Function: {name}"),
            Self::Process(handle) => format!("Process: {}", handle.pid),
            Self::Pointer(p) => p.to_text(),
            Self::Prototype(p) => format!("Prototype({})", p.name),
            Self::Exception(e) => e.to_text(),
        }
    }

    /// Boolean interpretation of this value.
    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Self::Integer(n) => *n != 0,
            Self::Float(f) => *f != 0.0,
            Self::Boolean(b) => *b,
            Self::Text(t) => !t.is_empty(),
            Self::String(bytes) => !bytes.is_empty(),
            Self::Bits(bits) => bits.bytes.iter().any(|b| *b != 0),
            Self::Atom(_) => true,
            Self::Vector(items) => !items.is_empty(),
            Self::Struct(fields) => !fields.is_empty(),
            Self::Pointer(p) => !p.expired(),
            _ => true,
        }
    }

    /// Structural copy of this value.
    ///
    /// Containers clone their children into fresh cells, closures clone
    /// their captured set, pointers clone the reference and origin token
    /// without touching the referent. Mutating the copy never affects the
    /// original.
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        match self {
            Self::Integer(n) => Self::Integer(*n),
            Self::Float(f) => Self::Float(*f),
            Self::Boolean(b) => Self::Boolean(*b),
            Self::Text(t) => Self::Text(t.clone()),
            Self::String(bytes) => Self::String(bytes.clone()),
            Self::Bits(bits) => Self::Bits(bits.clone()),
            Self::Atom(a) => Self::Atom(a.clone()),
            Self::Vector(items) => Self::Vector(
                items
                    .iter()
                    .map(|i| cell(i.borrow().deep_copy()))
                    .collect(),
            ),
            Self::Struct(fields) => Self::Struct(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), cell(v.borrow().deep_copy())))
                    .collect(),
            ),
            Self::Object(o) => Self::Object(Object {
                type_name: o.type_name.clone(),
                attributes: o
                    .attributes
                    .iter()
                    .map(|(k, v)| (k.clone(), cell(v.borrow().deep_copy())))
                    .collect(),
            }),
            Self::Closure(c) => Self::Closure(Closure {
                function: c.function.clone(),
                captured: Rc::new(RefCell::new(c.captured.borrow().deep_copy())),
            }),
            Self::Function(name) => Self::Function(name.clone()),
            Self::Process(handle) => Self::Process(*handle),
            Self::Pointer(p) => Self::Pointer(p.clone()),
            Self::Prototype(p) => Self::Prototype(p.clone()),
            Self::Exception(e) => Self::Exception(e.clone()),
        }
    }

    /// Create a pointer to the value held by `target`, owned by `origin`.
    #[must_use]
    pub fn pointer_to(target: &ValueCell, origin: Pid) -> Self {
        Self::Pointer(Pointer::new(target, origin))
    }
}

impl core::fmt::Debug for Value {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}({})", self.type_name(), self.to_text())
    }
}

/// Render a float the way the VM prints it: always with a decimal point.
fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.is_finite() {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

/// Render a bit string most significant bit first.
fn format_bits(bits: &Bits) -> String {
    let mut out = String::with_capacity(bits.width + 2);
    out.push_str("0b");
    for i in (0..bits.width).rev() {
        let byte = bits.bytes.get(i / 8).copied().unwrap_or(0);
        out.push(if byte & (1 << (i % 8)) != 0 { '1' } else { '0' });
    }
    out
}
