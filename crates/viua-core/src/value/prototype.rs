// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Runtime class descriptors.

/// A prototype describes a class at runtime: its name, the classes it
/// derives from (in declaration order) and its method table.
///
/// Prototypes are built up by a program (`class`, `derive`, `attach`) and
/// become part of the VM's typesystem once registered with the kernel;
/// dynamic dispatch then walks the ancestry recorded here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prototype {
    /// Class name.
    pub name: String,
    /// Direct ancestors, in declaration order.
    pub bases: Vec<String>,
    /// Method name to function name bindings.
    pub methods: Vec<(String, String)>,
}

impl Prototype {
    /// Create a base-less, method-less prototype.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bases: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Append a direct ancestor.
    pub fn derive(&mut self, base: impl Into<String>) {
        self.bases.push(base.into());
    }

    /// Bind `function` as method `method`, replacing any previous binding.
    pub fn attach(&mut self, function: impl Into<String>, method: impl Into<String>) {
        let method = method.into();
        let function = function.into();
        if let Some(slot) = self.methods.iter_mut().find(|(m, _)| *m == method) {
            slot.1 = function;
        } else {
            self.methods.push((method, function));
        }
    }

    /// Check whether this class declares the named method.
    #[must_use]
    pub fn accepts(&self, method: &str) -> bool {
        self.methods.iter().any(|(m, _)| m == method)
    }

    /// Resolve a declared method to its function name.
    #[must_use]
    pub fn resolve(&self, method: &str) -> Option<&str> {
        self.methods
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, f)| f.as_str())
    }
}
