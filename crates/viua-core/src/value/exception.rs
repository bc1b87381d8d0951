// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Exception values.
//!
//! Runtime failures (type mismatches, bad indexes, dispatch errors,
//! timeouts) are materialised as `Exception` values and thrown into the
//! offending process. User programs may also throw any value they like;
//! this type only covers the machine-generated ones.

/// Exception payload: a tag naming the error kind plus a message.
///
/// The tag is the exception's dynamic type name; every tagged exception
/// derives from the base type `Exception`, so `catch "Exception" ...`
/// claims all machine-generated failures while `catch "Timeout" ...`
/// claims only timeouts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exception {
    tag: String,
    message: String,
}

impl Exception {
    /// Base type name all tagged exceptions derive from.
    pub const BASE: &'static str = "Exception";

    /// Create an exception with an explicit tag.
    #[must_use]
    pub fn new(tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            message: message.into(),
        }
    }

    /// Create an untagged exception (type name `Exception`).
    #[must_use]
    pub fn plain(message: impl Into<String>) -> Self {
        Self::new(Self::BASE, message)
    }

    /// The exception's dynamic type name.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The human readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Base types for catch matching.
    #[must_use]
    pub fn bases(&self) -> Vec<String> {
        if self.tag == Self::BASE {
            vec!["Value".into()]
        } else {
            vec![Self::BASE.into(), "Value".into()]
        }
    }

    /// Render the exception for printing and crash reports.
    #[must_use]
    pub fn to_text(&self) -> String {
        format!("{}: {}", self.tag, self.message)
    }
}

impl core::fmt::Display for Exception {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.tag, self.message)
    }
}
