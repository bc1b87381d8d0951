// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for Unicode-scalar text operations.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::text;
use proptest::prelude::*;

#[test]
fn length_counts_scalars_not_bytes() {
    assert_eq!(text::length(""), 0);
    assert_eq!(text::length("abc"), 3);
    // Two-byte and three-byte scalars each count as one.
    assert_eq!(text::length("äöü"), 3);
    assert_eq!(text::length("☺☺"), 2);
}

#[test]
fn at_indexes_scalars() {
    assert_eq!(text::at("aäb", 0).unwrap(), 'a');
    assert_eq!(text::at("aäb", 1).unwrap(), 'ä');
    assert_eq!(text::at("aäb", 2).unwrap(), 'b');
}

#[test]
fn at_rejects_negative_and_out_of_range() {
    assert_eq!(text::at("ab", -1).unwrap_err().tag(), "InvalidIndex");
    assert_eq!(text::at("ab", 2).unwrap_err().tag(), "InvalidIndex");
}

#[test]
fn sub_extracts_scalar_range() {
    assert_eq!(text::sub("hello", 1, Some(4)).unwrap(), "ell");
    assert_eq!(text::sub("hello", 2, None).unwrap(), "llo");
    assert_eq!(text::sub("äöüß", 1, Some(3)).unwrap(), "öü");
    assert_eq!(text::sub("abc", 2, Some(2)).unwrap(), "");
}

#[test]
fn sub_rejects_bad_ranges() {
    assert_eq!(text::sub("abc", -1, None).unwrap_err().tag(), "InvalidIndex");
    assert_eq!(
        text::sub("abc", 0, Some(-2)).unwrap_err().tag(),
        "InvalidIndex"
    );
    assert_eq!(
        text::sub("abc", 0, Some(4)).unwrap_err().tag(),
        "InvalidIndex"
    );
    assert_eq!(text::sub("abc", 4, None).unwrap_err().tag(), "InvalidIndex");
}

#[test]
fn common_prefix_and_suffix() {
    assert_eq!(text::common_prefix("monitor", "monotone"), 3);
    assert_eq!(text::common_prefix("", "abc"), 0);
    assert_eq!(text::common_suffix("reading", "bleeding"), 5);
    assert_eq!(text::common_suffix("abc", "xyz"), 0);
    assert_eq!(text::common_prefix("ää", "äö"), 1);
}

#[test]
fn concat_appends() {
    assert_eq!(text::concat("foo", "bar"), "foobar");
    assert_eq!(text::concat("", "x"), "x");
}

proptest! {
    #[test]
    fn concat_length_is_sum(a in ".*", b in ".*") {
        let joined = text::concat(&a, &b);
        prop_assert_eq!(text::length(&joined), text::length(&a) + text::length(&b));
    }

    #[test]
    fn common_prefix_bounded_by_shorter(a in ".*", b in ".*") {
        let n = text::common_prefix(&a, &b);
        prop_assert!(n <= text::length(&a).min(text::length(&b)));
    }

    #[test]
    fn full_sub_is_identity(a in ".*") {
        prop_assert_eq!(text::sub(&a, 0, None).unwrap(), a.clone());
    }
}
