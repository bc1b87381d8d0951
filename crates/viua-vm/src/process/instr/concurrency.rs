// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Process spawning, joining and message passing.

use crate::bytecode::operands::{Cursor, Timeout};
use crate::kernel::{Kernel, ProcessResult};
use crate::process::{Fault, Process, ProcessState, Step};
use std::time::{Duration, Instant};
use viua_core::value::ProcessHandle;
use viua_core::{Pid, Value, ValueCell};

fn deadline_of(timeout: Timeout) -> Option<Instant> {
    timeout
        .0
        .map(|ms| Instant::now() + Duration::from_millis(u64::from(ms)))
}

fn handle_of(held: &ValueCell) -> Result<Pid, Fault> {
    let value = held.borrow();
    match &*value {
        Value::Process(handle) => Ok(handle.pid),
        other => Err(Fault::exception(
            "TypeMismatch",
            format!("expected Process, got {}", other.type_name()),
        )),
    }
}

impl Process {
    /// `process target|void <function>` posts the prepared frame as the
    /// seed of a fresh process. A void target disowns the child: no
    /// handle exists and its result is discarded.
    pub(crate) fn op_process(&mut self, cur: &mut Cursor, kernel: &Kernel) -> Result<Step, Fault> {
        let target = cur.fetch_register_or_void()?;
        let callable = self.fetch_callable(cur)?;

        // Spawned processes start executing bytecode directly, so the
        // seed must be a native function.
        if !kernel.is_native_function(&callable.name) {
            return Err(Fault::exception(
                "UnknownFunction",
                format!("cannot spawn process from undefined function: {}", callable.name),
            ));
        }
        let entry = kernel
            .function_entry(&callable.name)
            .ok_or_else(|| {
                Fault::exception(
                    "UnknownFunction",
                    format!("native function has no entry: {}", callable.name),
                )
            })?;

        let mut frame = self.take_frame_new()?;
        frame.function_name = callable.name;
        if let Some(captured) = callable.captured {
            frame.install_locals(captured);
        }

        let disown = target.is_none();
        let pid = kernel.spawn(frame, entry, disown, false);
        if let Some(target) = target {
            self.store(&target, Value::Process(ProcessHandle { pid }))?;
        }

        // Give the child a chance to run before the parent's quantum
        // continues.
        self.yield_hint = true;
        Ok(Step::Next(cur.ip()))
    }

    pub(crate) fn op_self(&mut self, cur: &mut Cursor) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let handle = ProcessHandle { pid: self.pid() };
        self.store(&target, Value::Process(handle))?;
        Ok(Step::Next(cur.ip()))
    }

    /// `join target|void source <timeout>` blocks until the joined
    /// process terminates, transferring its return value or re-raising
    /// its exception.
    pub(crate) fn op_join(&mut self, cur: &mut Cursor, kernel: &Kernel) -> Result<Step, Fault> {
        let target = cur.fetch_register_or_void()?;
        let source = cur.fetch_register()?;
        let timeout = cur.fetch_timeout()?;

        let joined = handle_of(&self.fetch_cell(&source)?)?;

        if let Some(result) = kernel.take_result(joined) {
            self.state = ProcessState::Ready;
            return match result {
                ProcessResult::Returned(value) => {
                    if let (Some(target), Some(value)) = (target, value) {
                        self.store_cell(&target, value)?;
                    }
                    Ok(Step::Next(cur.ip()))
                }
                // Join synchronises: the exception of the joined process
                // is raised in the joiner.
                ProcessResult::Crashed(exception) => Err(Fault::Throw(exception)),
            };
        }

        // First execution computes the deadline; re-polls keep it.
        let deadline = match &self.state {
            ProcessState::Joining { pid, deadline } if *pid == joined => *deadline,
            _ => deadline_of(timeout),
        };
        if deadline.is_some_and(|d| Instant::now() >= d) {
            self.state = ProcessState::Ready;
            return Err(Fault::exception("Timeout", "process did not join"));
        }

        self.state = ProcessState::Joining {
            pid: joined,
            deadline,
        };
        Ok(Step::Repoll)
    }

    /// `send target source` transfers ownership of the message into the
    /// recipient's mailbox. Messages to reaped processes are dropped.
    pub(crate) fn op_send(&mut self, cur: &mut Cursor, kernel: &Kernel) -> Result<Step, Fault> {
        let target = cur.fetch_register()?;
        let source = cur.fetch_register()?;

        let recipient = handle_of(&self.fetch_cell(&target)?)?;
        let message = self.take_cell(&source)?;
        kernel.send(recipient, message);
        Ok(Step::Next(cur.ip()))
    }

    /// `receive target|void <timeout>` takes the oldest queued message,
    /// or suspends until one arrives or the deadline expires.
    pub(crate) fn op_receive(&mut self, cur: &mut Cursor, kernel: &Kernel) -> Result<Step, Fault> {
        let target = cur.fetch_register_or_void()?;
        let timeout = cur.fetch_timeout()?;

        // Hidden (watchdog) processes never receive messages.
        if !self.is_hidden() {
            let pid = self.pid();
            kernel.drain_mailbox(pid, &mut self.queue);
        }

        if let Some(message) = self.queue.pop_front() {
            self.state = ProcessState::Ready;
            if let Some(target) = target {
                self.store_cell(&target, message)?;
            }
            return Ok(Step::Next(cur.ip()));
        }

        let deadline = match &self.state {
            ProcessState::AwaitingMessage { deadline } => *deadline,
            _ => deadline_of(timeout),
        };
        if deadline.is_some_and(|d| Instant::now() >= d) {
            self.state = ProcessState::Ready;
            return Err(Fault::exception("Timeout", "no message received"));
        }

        self.state = ProcessState::AwaitingMessage { deadline };
        Ok(Step::Repoll)
    }

    /// `watchdog <function>` registers the function seeded into a fresh
    /// process when this one terminates abnormally.
    pub(crate) fn op_watchdog(&mut self, cur: &mut Cursor, kernel: &Kernel) -> Result<Step, Fault> {
        let function = cur.fetch_atom()?;

        if kernel.is_foreign_function(&function) {
            return Err(Fault::exception(
                "Exception",
                format!("watchdog process must be a native function, used foreign {function}"),
            ));
        }
        if !kernel.is_native_function(&function) {
            return Err(Fault::exception(
                "UnknownFunction",
                format!("watchdog process from undefined function: {function}"),
            ));
        }

        self.watchdog = Some(function);
        Ok(Step::Next(cur.ip()))
    }
}
