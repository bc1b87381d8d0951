// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Per-process mailboxes.
//!
//! A mailbox is created when its process is spawned, drained into the
//! process's own queue on receive, and destroyed when the process is
//! reaped. Each mailbox is guarded by its own mutex; senders and the
//! receiving scheduler thread contend only on that one lock.

use std::collections::VecDeque;
use std::sync::Mutex;
use viua_core::ValueCell;

/// A value in transit between processes.
///
/// Ownership of the whole cell graph moves with the envelope: the sender
/// gave the value up before the envelope was created and the receiver
/// becomes its sole owner.
pub struct Envelope(ValueCell);

// SAFETY: the cell graph inside an envelope is owned exclusively by the
// envelope while in transit; no other thread holds a reference to it.
// See the matching impl on `Process` for the ownership discipline.
unsafe impl Send for Envelope {}

impl Envelope {
    /// Seal a value for transit.
    #[must_use]
    pub fn new(value: ValueCell) -> Self {
        Self(value)
    }

    /// Hand the value to its new owner.
    #[must_use]
    pub fn open(self) -> ValueCell {
        self.0
    }
}

/// A per-PID FIFO of owned messages.
#[derive(Default)]
pub struct Mailbox {
    messages: Mutex<VecDeque<Envelope>>,
}

impl Mailbox {
    /// Create an empty mailbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message.
    pub fn send(&self, message: Envelope) {
        self.messages
            .lock()
            .expect("mailbox mutex poisoned")
            .push_back(message);
    }

    /// Move all queued messages into `target`, preserving order.
    pub fn receive_into(&self, target: &mut VecDeque<ValueCell>) {
        let mut messages = self.messages.lock().expect("mailbox mutex poisoned");
        while let Some(envelope) = messages.pop_front() {
            target.push_back(envelope.open());
        }
    }

    /// Whether any message is queued.
    #[must_use]
    pub fn has_messages(&self) -> bool {
        !self
            .messages
            .lock()
            .expect("mailbox mutex poisoned")
            .is_empty()
    }

    /// Number of queued messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.lock().expect("mailbox mutex poisoned").len()
    }

    /// Whether the mailbox is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
