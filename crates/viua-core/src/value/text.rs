// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Text operations over Unicode scalar values.
//!
//! All indexes and lengths count Unicode scalar values, never bytes.
//! Negative indexes are not permitted and fail with `InvalidIndex`.

use super::Exception;

fn invalid_index(index: i64, len: usize) -> Exception {
    Exception::new(
        "InvalidIndex",
        format!("text index {index} out of range for length {len}"),
    )
}

/// Number of Unicode scalar values in `text`.
#[must_use]
pub fn length(text: &str) -> usize {
    text.chars().count()
}

/// The scalar at position `index`.
pub fn at(text: &str, index: i64) -> Result<char, Exception> {
    let len = length(text);
    if index < 0 {
        return Err(invalid_index(index, len));
    }
    text.chars()
        .nth(index as usize)
        .ok_or_else(|| invalid_index(index, len))
}

/// Copy of the scalars in `[begin, end)`; `end = None` means to the end.
pub fn sub(text: &str, begin: i64, end: Option<i64>) -> Result<String, Exception> {
    let len = length(text);
    if begin < 0 {
        return Err(invalid_index(begin, len));
    }
    let begin = begin as usize;
    let end = match end {
        Some(e) if e < 0 => return Err(invalid_index(e, len)),
        Some(e) => e as usize,
        None => len,
    };
    if begin > len || end > len {
        return Err(invalid_index(end.max(begin) as i64, len));
    }
    if end <= begin {
        return Ok(String::new());
    }
    Ok(text.chars().skip(begin).take(end - begin).collect())
}

/// Number of leading scalars shared by `lhs` and `rhs`.
#[must_use]
pub fn common_prefix(lhs: &str, rhs: &str) -> usize {
    lhs.chars()
        .zip(rhs.chars())
        .take_while(|(a, b)| a == b)
        .count()
}

/// Number of trailing scalars shared by `lhs` and `rhs`.
#[must_use]
pub fn common_suffix(lhs: &str, rhs: &str) -> usize {
    lhs.chars()
        .rev()
        .zip(rhs.chars().rev())
        .take_while(|(a, b)| a == b)
        .count()
}

/// Concatenation of two texts.
#[must_use]
pub fn concat(lhs: &str, rhs: &str) -> String {
    let mut out = String::with_capacity(lhs.len() + rhs.len());
    out.push_str(lhs);
    out.push_str(rhs);
    out
}
