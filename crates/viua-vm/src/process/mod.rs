// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Lightweight virtual processes.
//!
//! A process owns a stack of frames, its global and static register sets,
//! a queue of received messages, a transient exception slot and its
//! suspension state. Execution is strictly sequential within a process;
//! only the scheduler thread currently owning a process may touch it.
//!
//! Instruction handlers live in [`instr`], one file per instruction
//! family, and are dispatched by [`dispatch`]. Failures are reified as
//! [`Fault`] values: catchable exceptions begin stack unwinding (see
//! [`unwind`]), decode faults kill the process.

pub mod dispatch;
pub mod frame;
pub mod instr;
pub mod unwind;

#[cfg(test)]
mod execution_test;

pub use frame::{Catcher, Frame, ResolvedTarget, TryScope};

use crate::bytecode::operands::{
    Cursor, DecodeError, RegisterAccess, RegisterOperand,
};
use crate::kernel::Kernel;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::time::Instant;
use viua_core::value::{Exception, PointerError};
use viua_core::{Pid, RegisterError, RegisterSet, RegisterSetId, Value, ValueCell, cell};

/// Capacity of lazily created static register sets.
pub const STATIC_REGISTER_COUNT: usize = 16;

/// Where execution continues after a handler ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Continue at the given byte offset.
    Next(usize),
    /// Re-execute the same instruction when the process is next resumed.
    Repoll,
    /// The VM is to stop entirely.
    Halted,
}

/// A failed instruction.
#[derive(Debug)]
pub enum Fault {
    /// A catchable in-program exception.
    Throw(ValueCell),
    /// Malformed bytecode; kills the process without unwinding.
    Fatal(DecodeError),
}

impl Fault {
    /// A catchable exception with the given tag and message.
    #[must_use]
    pub fn exception(tag: &str, message: impl Into<String>) -> Self {
        Self::Throw(cell(Value::Exception(Exception::new(tag, message))))
    }
}

impl From<DecodeError> for Fault {
    fn from(e: DecodeError) -> Self {
        Self::Fatal(e)
    }
}

impl From<Exception> for Fault {
    fn from(e: Exception) -> Self {
        Self::Throw(cell(Value::Exception(e)))
    }
}

impl From<RegisterError> for Fault {
    fn from(e: RegisterError) -> Self {
        match e {
            RegisterError::OutOfBounds { .. } => Self::exception("InvalidIndex", e.to_string()),
            RegisterError::Empty { .. } => Self::exception("EmptyRegister", e.to_string()),
        }
    }
}

impl From<PointerError> for Fault {
    fn from(e: PointerError) -> Self {
        match e {
            PointerError::Stale => Self::exception("StalePointer", e.to_string()),
            PointerError::CrossProcess { .. } => {
                Self::exception("CrossProcessPointer", e.to_string())
            }
        }
    }
}

/// How a process finished.
#[derive(Debug)]
pub enum Termination {
    /// The outermost frame returned; carries local register 0, if set.
    Returned(Option<ValueCell>),
    /// An exception left the outermost frame uncaught.
    Crashed(ValueCell),
}

/// Suspension state of a process.
#[derive(Debug)]
pub enum ProcessState {
    /// Runnable.
    Ready,
    /// Waiting for a message, optionally until a deadline.
    AwaitingMessage {
        /// When the wait turns into a `Timeout` exception.
        deadline: Option<Instant>,
    },
    /// Waiting for another process to terminate.
    Joining {
        /// The process being joined.
        pid: Pid,
        /// When the wait turns into a `Timeout` exception.
        deadline: Option<Instant>,
    },
    /// Waiting for an offloaded foreign call to complete.
    AwaitingFfi,
    /// Finished.
    Terminated(Termination),
}

/// What a single step did, from the scheduler's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepResult {
    /// The process can keep running.
    Continue,
    /// The process suspended itself; yield the quantum.
    Yielded,
    /// The process finished.
    Terminated,
    /// The whole VM is to stop.
    Halt,
}

/// A virtual process.
pub struct Process {
    pid: Pid,
    /// Call stack, outermost frame first.
    stack: Vec<Frame>,
    /// The frame being prepared by the next call.
    pub(crate) frame_new: Option<Frame>,
    /// The try scope being prepared by the next `enter`.
    pub(crate) try_new: Option<TryScope>,
    /// What `Current` resolves to in operands.
    pub(crate) current_set: RegisterSetId,
    /// Per-process global registers.
    globals: RegisterSet,
    /// Per-function static registers, created on first use.
    statics: FxHashMap<String, RegisterSet>,
    /// Messages drained from the mailbox, oldest first.
    pub(crate) queue: VecDeque<ValueCell>,
    /// In-flight exception, inspected between instructions.
    pub(crate) thrown: Option<ValueCell>,
    /// Exception parked while a deferred call runs during unwinding.
    pub(crate) parked_throw: Option<ValueCell>,
    /// Suspension state.
    pub(crate) state: ProcessState,
    /// Function seeded into a fresh process when this one crashes.
    pub(crate) watchdog: Option<String>,
    /// Watchdog processes are hidden: they do not receive messages and
    /// never seed another watchdog.
    hidden: bool,
    /// No handle to this process exists; its result is discarded.
    disowned: bool,
    /// Ask the scheduler to end the quantum after this instruction.
    pub(crate) yield_hint: bool,
    /// Instruction pointer: byte offset into the kernel's code.
    pub(crate) ip: usize,
}

// SAFETY: a process's cell graph (Rc/RefCell) is reachable only through
// this process. Processes migrate between scheduler threads as whole
// units and the scheduler guarantees that exactly one thread runs a
// process at any time, so the non-atomic reference counts are never
// raced. The same pattern is used for messages in transit (see
// `kernel::mailbox::Envelope`).
unsafe impl Send for Process {}

impl Process {
    /// Create a process seeded with `frame`, entering at `entry`.
    #[must_use]
    pub fn new(pid: Pid, mut frame: Frame, entry: usize, disowned: bool, hidden: bool) -> Self {
        frame.return_address = entry;
        let mut stack = Vec::with_capacity(8);
        let function = frame.function_name.clone();
        stack.push(frame);
        log::debug!("process {pid}: spawned running {function}");
        Self {
            pid,
            stack,
            frame_new: None,
            try_new: None,
            current_set: RegisterSetId::Local,
            globals: RegisterSet::new(STATIC_REGISTER_COUNT),
            statics: FxHashMap::default(),
            queue: VecDeque::new(),
            thrown: None,
            parked_throw: None,
            state: ProcessState::Ready,
            watchdog: None,
            hidden,
            disowned,
            yield_hint: false,
            ip: entry,
        }
    }

    /// This process's PID.
    #[must_use]
    pub const fn pid(&self) -> Pid {
        self.pid
    }

    /// Current suspension state.
    #[must_use]
    pub const fn state(&self) -> &ProcessState {
        &self.state
    }

    /// Whether this is a hidden (watchdog) process.
    #[must_use]
    pub const fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Whether the result of this process is discarded on termination.
    #[must_use]
    pub const fn is_disowned(&self) -> bool {
        self.disowned
    }

    /// Registered watchdog function, if any.
    #[must_use]
    pub fn watchdog(&self) -> Option<&str> {
        self.watchdog.as_deref()
    }

    /// Current call stack depth.
    #[must_use]
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Take the termination out of a finished process.
    ///
    /// # Panics
    /// Panics when the process has not terminated; the scheduler only
    /// calls this after observing [`StepResult::Terminated`].
    #[must_use]
    pub fn into_termination(self) -> Termination {
        match self.state {
            ProcessState::Terminated(t) => t,
            other => panic!("process {} has not terminated: {other:?}", self.pid),
        }
    }

    // --- frame access ---

    pub(crate) fn top_frame(&self) -> Result<&Frame, Fault> {
        self.stack
            .last()
            .ok_or_else(|| Fault::exception("Exception", "no active frame"))
    }

    pub(crate) fn top_frame_mut(&mut self) -> Result<&mut Frame, Fault> {
        self.stack
            .last_mut()
            .ok_or_else(|| Fault::exception("Exception", "no active frame"))
    }

    pub(crate) fn stack_mut(&mut self) -> &mut Vec<Frame> {
        &mut self.stack
    }

    pub(crate) fn stack(&self) -> &[Frame] {
        &self.stack
    }

    /// Take the pending frame, failing when no `frame` preceded the call.
    pub(crate) fn take_frame_new(&mut self) -> Result<Frame, Fault> {
        self.frame_new
            .take()
            .ok_or_else(|| Fault::exception("Exception", "no frame prepared for call"))
    }

    // --- register set access ---

    fn resolve_set_id(&self, id: RegisterSetId) -> RegisterSetId {
        if id == RegisterSetId::Current {
            self.current_set
        } else {
            id
        }
    }

    /// Run `f` against the register set designated by `id`.
    pub(crate) fn with_set<R>(
        &mut self,
        id: RegisterSetId,
        f: impl FnOnce(&mut RegisterSet) -> R,
    ) -> Result<R, Fault> {
        match self.resolve_set_id(id) {
            RegisterSetId::Global => Ok(f(&mut self.globals)),
            RegisterSetId::Static => {
                let name = self.top_frame()?.function_name.clone();
                let set = self
                    .statics
                    .entry(name)
                    .or_insert_with(|| RegisterSet::new(STATIC_REGISTER_COUNT));
                Ok(f(set))
            }
            _ => {
                let locals = self.top_frame()?.locals.clone();
                let mut set = locals.borrow_mut();
                Ok(f(&mut set))
            }
        }
    }

    /// Resolve an operand to a concrete set and index, following
    /// indirection.
    pub(crate) fn resolve_operand(
        &mut self,
        operand: &RegisterOperand,
    ) -> Result<(RegisterSetId, usize), Fault> {
        let set = self.resolve_set_id(operand.set);
        match operand.access {
            RegisterAccess::Direct | RegisterAccess::PointerDereference => {
                Ok((set, operand.index as usize))
            }
            RegisterAccess::Indirect => {
                let referent =
                    self.with_set(set, |s| s.get(operand.index as usize).cloned())??;
                let value = referent.borrow();
                match &*value {
                    Value::Integer(n) if *n >= 0 => Ok((set, *n as usize)),
                    Value::Integer(n) => Err(Fault::exception(
                        "InvalidIndex",
                        format!("register indexes cannot be negative: {n}"),
                    )),
                    other => Err(Fault::exception(
                        "TypeMismatch",
                        format!("register index must be an Integer, got {}", other.type_name()),
                    )),
                }
            }
        }
    }

    /// Resolve a write destination; pointer dereference is not a storable
    /// location for call results.
    pub(crate) fn resolve_target(
        &mut self,
        operand: &RegisterOperand,
    ) -> Result<ResolvedTarget, Fault> {
        if operand.access == RegisterAccess::PointerDereference {
            return Err(Fault::exception(
                "TypeMismatch",
                "cannot use a pointer dereference as a call return target",
            ));
        }
        let (set, index) = self.resolve_operand(operand)?;
        Ok(ResolvedTarget { set, index })
    }

    /// Fetch the cell an operand designates, without transferring
    /// ownership. Pointer operands are authenticated and dereferenced.
    pub(crate) fn fetch_cell(&mut self, operand: &RegisterOperand) -> Result<ValueCell, Fault> {
        let (set, index) = self.resolve_operand(operand)?;
        let held = self.with_set(set, |s| s.get(index).cloned())??;
        if operand.access != RegisterAccess::PointerDereference {
            return Ok(held);
        }
        let pointer = {
            let value = held.borrow();
            match &*value {
                Value::Pointer(p) => p.clone(),
                other => {
                    return Err(Fault::exception(
                        "TypeMismatch",
                        format!("dereferenced type is not a pointer: {}", other.type_name()),
                    ));
                }
            }
        };
        Ok(pointer.dereference(self.pid)?)
    }

    /// Take the cell out of the operand's register, transferring
    /// ownership to the caller.
    pub(crate) fn take_cell(&mut self, operand: &RegisterOperand) -> Result<ValueCell, Fault> {
        if operand.access == RegisterAccess::PointerDereference {
            return Err(Fault::exception(
                "TypeMismatch",
                "cannot move a value out through a pointer",
            ));
        }
        let (set, index) = self.resolve_operand(operand)?;
        Ok(self.with_set(set, |s| s.pop(index))??)
    }

    /// Obtain a value for ownership transfer: moves from registers,
    /// copies through pointers (the referent stays where it is).
    pub(crate) fn take_or_copy(&mut self, operand: &RegisterOperand) -> Result<ValueCell, Fault> {
        if operand.access == RegisterAccess::PointerDereference {
            let referent = self.fetch_cell(operand)?;
            let copy = referent.borrow().deep_copy();
            Ok(cell(copy))
        } else {
            self.take_cell(operand)
        }
    }

    /// Store a freshly produced value into the operand's destination.
    ///
    /// A pointer-dereference destination replaces the referent in place,
    /// so every pointer to it observes the new value.
    pub(crate) fn store(&mut self, operand: &RegisterOperand, value: Value) -> Result<(), Fault> {
        if operand.access == RegisterAccess::PointerDereference {
            let referent = self.fetch_cell(operand)?;
            *referent.borrow_mut() = value;
            return Ok(());
        }
        self.store_cell(operand, cell(value))
    }

    /// Store an owned cell into the operand's destination.
    pub(crate) fn store_cell(
        &mut self,
        operand: &RegisterOperand,
        value: ValueCell,
    ) -> Result<(), Fault> {
        if operand.access == RegisterAccess::PointerDereference {
            let referent = self.fetch_cell(operand)?;
            let inner = match std::rc::Rc::try_unwrap(value) {
                Ok(only) => only.into_inner(),
                Err(shared) => shared.borrow().deep_copy(),
            };
            *referent.borrow_mut() = inner;
            return Ok(());
        }
        let (set, index) = self.resolve_operand(operand)?;
        self.with_set(set, |s| s.put(index, value))??;
        Ok(())
    }

    /// Store a cell into a target resolved earlier (call returns, FFI
    /// completions).
    pub(crate) fn store_resolved(
        &mut self,
        target: ResolvedTarget,
        value: ValueCell,
    ) -> Result<(), Fault> {
        self.with_set(target.set, |s| s.put(target.index, value))??;
        Ok(())
    }

    // --- messaging ---

    /// Append a message to the process's drained queue (used by tests and
    /// the receive handler after draining the mailbox).
    #[allow(dead_code)]
    pub(crate) fn enqueue_message(&mut self, message: ValueCell) {
        self.queue.push_back(message);
    }

    // --- termination ---

    pub(crate) fn terminate_returned(&mut self, value: Option<ValueCell>) {
        log::debug!("process {}: terminated normally", self.pid);
        self.state = ProcessState::Terminated(Termination::Returned(value));
    }

    pub(crate) fn terminate_crashed(&mut self, exception: ValueCell) {
        log::debug!(
            "process {}: terminated by exception {}",
            self.pid,
            exception.borrow().to_text()
        );
        self.state = ProcessState::Terminated(Termination::Crashed(exception));
    }

    // --- scheduling interface ---

    /// Test whether a suspended process would make progress if resumed.
    ///
    /// The scheduler calls this before spending a quantum; the resumed
    /// instruction re-checks the same condition itself, so a false
    /// positive only costs one re-poll.
    #[must_use]
    pub fn wake_ready(&self, kernel: &Kernel) -> bool {
        match &self.state {
            ProcessState::Ready => true,
            ProcessState::AwaitingMessage { deadline } => {
                !self.queue.is_empty()
                    || kernel.mailbox_has_messages(self.pid)
                    || deadline.is_some_and(|d| Instant::now() >= d)
            }
            ProcessState::Joining { pid, deadline } => {
                kernel.has_result(*pid) || deadline.is_some_and(|d| Instant::now() >= d)
            }
            ProcessState::AwaitingFfi => kernel.has_ffi_outcome(self.pid),
            ProcessState::Terminated(_) => false,
        }
    }

    /// Take and clear the end-of-quantum hint set by spawning
    /// instructions.
    pub fn take_yield_hint(&mut self) -> bool {
        core::mem::take(&mut self.yield_hint)
    }

    /// Apply the outcome of a completed foreign call and resume.
    pub fn apply_ffi_outcome(
        &mut self,
        target: Option<ResolvedTarget>,
        result: Result<Option<ValueCell>, ValueCell>,
    ) {
        self.state = ProcessState::Ready;
        match result {
            Ok(value) => {
                if let (Some(target), Some(value)) = (target, value) {
                    if let Err(Fault::Throw(exception)) = self.store_resolved(target, value) {
                        self.thrown = Some(exception);
                    }
                }
            }
            Err(exception) => self.thrown = Some(exception),
        }
    }

    fn step_result(&self) -> StepResult {
        match self.state {
            ProcessState::Terminated(_) => StepResult::Terminated,
            ProcessState::Ready => StepResult::Continue,
            _ => StepResult::Yielded,
        }
    }

    /// Execute one instruction.
    pub fn step(&mut self, kernel: &Kernel) -> StepResult {
        if matches!(self.state, ProcessState::Terminated(_)) {
            return StepResult::Terminated;
        }

        // An exception raised outside the instruction loop (a failed
        // foreign call) unwinds before anything else executes.
        if self.thrown.is_some() {
            unwind::handle_thrown(self, kernel);
            return self.step_result();
        }

        // Waiting states are left in place: the suspension-causing
        // instruction is about to re-execute and needs its recorded
        // deadline. It either completes (and resets to Ready) or re-polls.
        let mut cursor = Cursor::new(kernel.code(), self.ip);
        let outcome = match cursor.fetch_opcode() {
            Ok(opcode) => dispatch::dispatch(self, opcode, &mut cursor, kernel),
            Err(e) => Err(Fault::Fatal(e)),
        };

        match outcome {
            Ok(Step::Next(ip)) => self.ip = ip,
            Ok(Step::Repoll) => {}
            Ok(Step::Halted) => return StepResult::Halt,
            Err(Fault::Throw(exception)) => self.thrown = Some(exception),
            Err(Fault::Fatal(e)) => {
                log::error!("process {}: fatal decode error: {e}", self.pid);
                self.terminate_crashed(cell(Value::Exception(Exception::new(
                    "FatalError",
                    e.to_string(),
                ))));
                return StepResult::Terminated;
            }
        }

        // The transient exception slot is inspected between instructions;
        // a process never suspends mid-unwind.
        if self.thrown.is_some() {
            unwind::handle_thrown(self, kernel);
        }

        self.step_result()
    }
}

impl core::fmt::Debug for Process {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid)
            .field("state", &self.state)
            .field("stack_depth", &self.stack.len())
            .field("queued_messages", &self.queue.len())
            .field("hidden", &self.hidden)
            .finish_non_exhaustive()
    }
}
