// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Virtual-process scheduler workers.
//!
//! Each worker owns a private FIFO run queue and shares the kernel's
//! free list with its peers. A quantum is a bounded number of
//! instructions; a process additionally yields when it suspends
//! (receive, join, foreign call) or terminates.
//!
//! Suspended processes stay in the run queue; before spending a quantum
//! on one, the worker tests its wake condition. When every local process
//! is waiting the worker parks briefly on the free-list condvar instead
//! of spinning; message sends and process terminations notify it.

use crate::kernel::Kernel;
use crate::process::{Process, StepResult};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Local queue length beyond which runnable processes are shed to the
/// kernel's free list for idle workers to adopt.
const SHED_THRESHOLD: usize = 4;

/// How long an idle worker parks before re-checking for work.
const IDLE_PARK: Duration = Duration::from_millis(1);

/// What a quantum did to a process.
enum QuantumOutcome {
    /// Still live; keep it queued.
    KeepRunning,
    /// Terminated and reaped.
    Finished,
    /// Executed `halt`.
    Halted,
}

/// One virtual-process scheduler worker.
pub struct VpScheduler {
    id: usize,
    kernel: Arc<Kernel>,
    queue: VecDeque<Box<Process>>,
}

impl VpScheduler {
    /// Create a worker bound to the kernel.
    #[must_use]
    pub fn new(id: usize, kernel: Arc<Kernel>) -> Self {
        Self {
            id,
            kernel,
            queue: VecDeque::new(),
        }
    }

    /// Run until the VM halts or every process has drained.
    pub fn run(mut self) {
        log::debug!("vp scheduler {}: starting", self.id);
        // Consecutive picks that made no progress; when it reaches the
        // queue length every local process is waiting.
        let mut stalled = 0usize;

        loop {
            if self.kernel.is_halted() {
                self.discard_local_processes();
                break;
            }

            let Some(mut process) = self.next_process(stalled) else {
                if self.queue.is_empty() && self.kernel.running_processes() == 0 {
                    break;
                }
                continue;
            };

            if !process.wake_ready(&self.kernel) {
                self.queue.push_back(process);
                stalled += 1;
                if stalled > self.queue.len() {
                    // Everything local is waiting; park until a send,
                    // termination or FFI completion wakes us, or a timer
                    // deadline needs re-checking.
                    if let Some(adopted) = self.kernel.next_free_process(IDLE_PARK) {
                        self.queue.push_back(adopted);
                    }
                    stalled = 0;
                }
                continue;
            }
            stalled = 0;

            match self.run_quantum(&mut process) {
                QuantumOutcome::KeepRunning => {
                    if self.queue.len() >= SHED_THRESHOLD {
                        // Overloaded: let idle workers steal this one.
                        self.kernel.post_free_process(process);
                    } else {
                        self.queue.push_back(process);
                    }
                }
                QuantumOutcome::Finished => self.kernel.reap(process),
                QuantumOutcome::Halted => {
                    // The halting process never terminates normally; it
                    // is discarded along with everything else.
                    self.kernel.begin_halt();
                    self.kernel.delete_mailbox(process.pid());
                    self.kernel.process_finished();
                }
            }
        }
        log::debug!("vp scheduler {}: stopping", self.id);
    }

    /// Next process to consider: local queue first, then the free list.
    fn next_process(&mut self, stalled: usize) -> Option<Box<Process>> {
        if let Some(process) = self.queue.pop_front() {
            // Opportunistically adopt shed work while we are busy.
            if stalled == 0 {
                if let Some(adopted) = self.kernel.next_free_process(Duration::ZERO) {
                    self.queue.push_back(adopted);
                }
            }
            return Some(process);
        }
        self.kernel.next_free_process(IDLE_PARK)
    }

    /// Run a process for one quantum.
    fn run_quantum(&self, process: &mut Process) -> QuantumOutcome {
        for _ in 0..self.kernel.config().quantum {
            if self.kernel.is_halted() {
                break;
            }

            // Completed foreign calls are applied before the process
            // resumes; the call's return value or exception must be
            // visible to the next instruction.
            if matches!(process.state(), crate::process::ProcessState::AwaitingFfi) {
                let Some(outcome) = self.kernel.take_ffi_outcome(process.pid()) else {
                    return QuantumOutcome::KeepRunning;
                };
                process.apply_ffi_outcome(outcome.target, outcome.result);
            }

            match process.step(&self.kernel) {
                StepResult::Continue => {
                    if process.take_yield_hint() {
                        return QuantumOutcome::KeepRunning;
                    }
                }
                StepResult::Yielded => return QuantumOutcome::KeepRunning,
                StepResult::Terminated => return QuantumOutcome::Finished,
                StepResult::Halt => return QuantumOutcome::Halted,
            }
        }
        QuantumOutcome::KeepRunning
    }

    /// Drop local processes after a halt, keeping the live count sane.
    fn discard_local_processes(&mut self) {
        while let Some(process) = self.queue.pop_front() {
            log::debug!(
                "vp scheduler {}: discarding process {} after halt",
                self.id,
                process.pid()
            );
            self.kernel.delete_mailbox(process.pid());
            self.kernel.process_finished();
        }
    }
}
