// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The kernel: process-wide registry and lifecycle.
//!
//! A kernel owns the loaded code image, the function and block address
//! tables, the typesystem, the foreign-function registry, all mailboxes
//! and the queues both scheduler pools work from. It is passed around as
//! an explicit `Arc<Kernel>` handle; there is no global state.
//!
//! Lifecycle: [`Kernel::load`] installs an executable image,
//! `register_*` and `load_*_library` populate the registries, and
//! [`Kernel::run`] launches the scheduler pools, blocks until every
//! process has drained and returns the exit code taken from the initial
//! process's return register.

pub mod config;
pub mod mailbox;

#[cfg(test)]
mod config_test;

pub use config::Config;
pub use mailbox::{Envelope, Mailbox};

use crate::bytecode::image::{Image, ImageKind, LoadError, load};
use crate::process::frame::{Frame, ResolvedTarget};
use crate::process::{Process, Termination};
use crate::scheduler;
use core::fmt;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use viua_core::value::{Exception, Prototype};
use viua_core::{Pid, Value, ValueCell, cell};

/// Signature of a foreign function.
///
/// The callee reads its arguments from the frame's arguments set, places
/// its return value into the frame's local register 0, and reifies
/// failure as an exception value.
pub type ForeignFunction = fn(&mut Frame, &Kernel) -> Result<(), Exception>;

/// A foreign call waiting for an FFI executor.
pub struct FfiRequest {
    /// Name of the foreign function.
    pub function: String,
    /// The prepared frame carrying the arguments.
    pub frame: Frame,
    /// The process that yielded for this call.
    pub caller: Pid,
    /// Where the result goes in the caller.
    pub target: Option<ResolvedTarget>,
}

// SAFETY: the frame's cell graph is owned exclusively by the request
// while it travels to an FFI worker and back; the caller is suspended
// the whole time.
unsafe impl Send for FfiRequest {}

/// The result of a terminated process, awaiting its joiner.
pub enum ProcessResult {
    /// Normal return; carries the process's return register, if set.
    Returned(Option<ValueCell>),
    /// Uncaught exception.
    Crashed(ValueCell),
}

struct ResultSlot(ProcessResult);

// SAFETY: the cells inside a posted result are owned exclusively by the
// slot until a joiner claims them.
unsafe impl Send for ResultSlot {}

/// The outcome of a completed foreign call, awaiting the caller's
/// scheduler.
pub struct FfiOutcome {
    /// Where the result goes in the caller.
    pub target: Option<ResolvedTarget>,
    /// The value produced, or the exception to raise in the caller.
    pub result: Result<Option<ValueCell>, ValueCell>,
}

struct OutcomeSlot(FfiOutcome);

// SAFETY: as with `ResultSlot`, exclusively owned until claimed.
unsafe impl Send for OutcomeSlot {}

/// A registered loadable module.
enum ModuleState {
    /// Registered but not yet linked by an `import`.
    Registered(Vec<(String, ForeignFunction)>),
    /// Already linked; importing again is a no-op.
    Linked,
}

/// Errors that prevent [`Kernel::run`] from starting any process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunError {
    /// `load` was never called.
    NoCode,
    /// The image defines neither `main/0` nor `main/1`.
    NoEntryFunction,
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCode => write!(f, "no bytecode loaded"),
            Self::NoEntryFunction => write!(f, "no entry function (main/0 or main/1)"),
        }
    }
}

impl std::error::Error for RunError {}

/// The kernel. See the module documentation.
pub struct Kernel {
    config: Config,

    // Immutable after load and library linking, both of which happen
    // before `run`.
    code: Vec<u8>,
    functions: FxHashMap<String, usize>,
    blocks: FxHashMap<String, usize>,
    arguments: Vec<String>,

    foreign_functions: Mutex<FxHashMap<String, ForeignFunction>>,
    modules: Mutex<FxHashMap<String, ModuleState>>,
    prototypes: Mutex<FxHashMap<String, Prototype>>,

    mailboxes: Mutex<FxHashMap<Pid, Arc<Mailbox>>>,
    results: Mutex<FxHashMap<Pid, ResultSlot>>,

    free_processes: Mutex<Vec<Box<Process>>>,
    free_cv: Condvar,

    ffi_queue: Mutex<VecDeque<FfiRequest>>,
    ffi_cv: Condvar,
    ffi_outcomes: Mutex<FxHashMap<Pid, OutcomeSlot>>,
    ffi_shutdown: AtomicBool,

    running: AtomicU64,
    next_pid: AtomicU64,
    halted: AtomicBool,
}

impl Kernel {
    /// Create a kernel with the given configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            code: Vec::new(),
            functions: FxHashMap::default(),
            blocks: FxHashMap::default(),
            arguments: Vec::new(),
            foreign_functions: Mutex::new(FxHashMap::default()),
            modules: Mutex::new(FxHashMap::default()),
            prototypes: Mutex::new(FxHashMap::default()),
            mailboxes: Mutex::new(FxHashMap::default()),
            results: Mutex::new(FxHashMap::default()),
            free_processes: Mutex::new(Vec::new()),
            free_cv: Condvar::new(),
            ffi_queue: Mutex::new(VecDeque::new()),
            ffi_cv: Condvar::new(),
            ffi_outcomes: Mutex::new(FxHashMap::default()),
            ffi_shutdown: AtomicBool::new(false),
            running: AtomicU64::new(0),
            next_pid: AtomicU64::new(0),
            halted: AtomicBool::new(false),
        }
    }

    /// The kernel's configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    // --- loading and linking ---

    /// Install an executable code image.
    pub fn load(&mut self, bytes: &[u8]) -> Result<&mut Self, LoadError> {
        let image = load(bytes)?;
        if image.kind != ImageKind::Executable {
            return Err(LoadError::BadKind(image.kind as u8));
        }
        for (key, value) in &image.meta {
            log::debug!("image meta: {key} = {value}");
        }
        self.code = image.code;
        self.functions = image
            .functions
            .into_iter()
            .map(|(name, offset)| (name, offset as usize))
            .collect();
        self.blocks = image
            .blocks
            .into_iter()
            .map(|(name, offset)| (name, offset as usize))
            .collect();
        Ok(self)
    }

    /// Link a native (bytecode) module into the loaded image.
    ///
    /// The module's code is appended, its jump table entries rebased and
    /// its symbols merged into the address tables.
    pub fn load_native_module(&mut self, image: Image) -> Result<&mut Self, LoadError> {
        if image.kind != ImageKind::Linkable {
            return Err(LoadError::BadKind(image.kind as u8));
        }
        let base = self.code.len() as u64;

        let mut code = image.code;
        for site in &image.jump_table {
            let site = *site as usize;
            let end = site
                .checked_add(8)
                .filter(|end| *end <= code.len())
                .ok_or(LoadError::Truncated(crate::bytecode::image::Section::JumpTable))?;
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&code[site..end]);
            let rebased = u64::from_le_bytes(buf).wrapping_add(base);
            code[site..end].copy_from_slice(&rebased.to_le_bytes());
        }

        for (name, offset) in image.functions {
            if self.functions.contains_key(&name) {
                return Err(LoadError::DuplicateSymbol(name));
            }
            self.functions.insert(name, (offset + base) as usize);
        }
        for (name, offset) in image.blocks {
            if self.blocks.contains_key(&name) {
                return Err(LoadError::DuplicateSymbol(name));
            }
            self.blocks.insert(name, (offset + base) as usize);
        }
        self.code.extend_from_slice(&code);
        Ok(self)
    }

    /// Read a native module from a file and link it.
    pub fn load_native_library(&mut self, path: &std::path::Path) -> Result<&mut Self, LoadError> {
        let bytes = std::fs::read(path).map_err(|_| LoadError::BadMagic)?;
        self.load_native_module(load(&bytes)?)
    }

    /// Register a foreign module; its functions become callable after an
    /// `import` links the module.
    pub fn register_foreign_module(
        &mut self,
        name: impl Into<String>,
        exports: Vec<(String, ForeignFunction)>,
    ) -> &mut Self {
        self.modules
            .lock()
            .expect("module registry mutex poisoned")
            .insert(name.into(), ModuleState::Registered(exports));
        self
    }

    /// Register a single foreign function, immediately callable.
    pub fn register_external_function(
        &mut self,
        name: impl Into<String>,
        function: ForeignFunction,
    ) -> &mut Self {
        self.foreign_functions
            .lock()
            .expect("foreign function registry mutex poisoned")
            .insert(name.into(), function);
        self
    }

    /// Set the command line arguments passed to `main/1`.
    pub fn set_arguments(&mut self, arguments: Vec<String>) -> &mut Self {
        self.arguments = arguments;
        self
    }

    /// Link a registered foreign module, making its functions callable.
    pub fn import_module(&self, name: &str) -> Result<(), Exception> {
        let mut modules = self.modules.lock().expect("module registry mutex poisoned");
        match modules.get_mut(name) {
            None => Err(Exception::new(
                "LinkFailure",
                format!("failed to link module: {name}"),
            )),
            Some(state @ ModuleState::Registered(_)) => {
                let ModuleState::Registered(exports) =
                    core::mem::replace(state, ModuleState::Linked)
                else {
                    unreachable!("matched Registered above");
                };
                let mut functions = self
                    .foreign_functions
                    .lock()
                    .expect("foreign function registry mutex poisoned");
                for (name, function) in exports {
                    functions.insert(name, function);
                }
                Ok(())
            }
            Some(ModuleState::Linked) => Ok(()),
        }
    }

    // --- symbol lookups (read-only while running) ---

    /// The loaded code image.
    #[must_use]
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Entry offset of a native function.
    #[must_use]
    pub fn function_entry(&self, name: &str) -> Option<usize> {
        self.functions.get(name).copied()
    }

    /// Entry offset of a block.
    #[must_use]
    pub fn block_entry(&self, name: &str) -> Option<usize> {
        self.blocks.get(name).copied()
    }

    /// Whether `name` is a native (bytecode) function.
    #[must_use]
    pub fn is_native_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Whether `name` is a registered foreign function.
    #[must_use]
    pub fn is_foreign_function(&self, name: &str) -> bool {
        self.foreign_functions
            .lock()
            .expect("foreign function registry mutex poisoned")
            .contains_key(name)
    }

    /// Whether `name` is callable at all.
    #[must_use]
    pub fn is_function(&self, name: &str) -> bool {
        self.is_native_function(name) || self.is_foreign_function(name)
    }

    /// Look up a registered foreign function.
    #[must_use]
    pub fn foreign_function(&self, name: &str) -> Option<ForeignFunction> {
        self.foreign_functions
            .lock()
            .expect("foreign function registry mutex poisoned")
            .get(name)
            .copied()
    }

    // --- typesystem ---

    /// Install a prototype; a second registration of the same name fails
    /// with `DuplicateClass`.
    pub fn register_prototype(&self, prototype: Prototype) -> Result<(), Exception> {
        let mut prototypes = self.prototypes.lock().expect("typesystem mutex poisoned");
        if prototypes.contains_key(&prototype.name) {
            return Err(Exception::new(
                "DuplicateClass",
                format!("class already registered: {}", prototype.name),
            ));
        }
        log::debug!("registered class {}", prototype.name);
        prototypes.insert(prototype.name.clone(), prototype);
        Ok(())
    }

    /// Whether `name` is a registered class.
    #[must_use]
    pub fn is_class(&self, name: &str) -> bool {
        self.prototypes
            .lock()
            .expect("typesystem mutex poisoned")
            .contains_key(name)
    }

    /// Transitive ancestry of a class, depth first in declaration order.
    /// The class itself is not included.
    #[must_use]
    pub fn inheritance_chain_of(&self, name: &str) -> Vec<String> {
        let prototypes = self.prototypes.lock().expect("typesystem mutex poisoned");
        let mut chain = Vec::new();
        let mut seen = vec![name.to_owned()];
        walk_bases(&prototypes, name, &mut chain, &mut seen);
        chain
    }

    /// Resolve a method on one class (not its ancestry).
    #[must_use]
    pub fn resolve_method(&self, class: &str, method: &str) -> Option<String> {
        self.prototypes
            .lock()
            .expect("typesystem mutex poisoned")
            .get(class)?
            .resolve(method)
            .map(str::to_owned)
    }

    // --- processes and mailboxes ---

    /// Spawn a process seeded with `frame`, entering the code at `entry`.
    ///
    /// The process is posted to the shared free list for any scheduler to
    /// adopt. PIDs are never reused within one kernel run.
    pub fn spawn(&self, mut frame: Frame, entry: usize, disowned: bool, hidden: bool) -> Pid {
        let pid = Pid::from_raw(self.next_pid.fetch_add(1, Ordering::SeqCst));
        frame.return_address = entry;

        self.mailboxes
            .lock()
            .expect("mailbox map mutex poisoned")
            .insert(pid, Arc::new(Mailbox::new()));
        self.running.fetch_add(1, Ordering::SeqCst);

        let process = Box::new(Process::new(pid, frame, entry, disowned, hidden));
        self.free_processes
            .lock()
            .expect("free process list mutex poisoned")
            .push(process);
        self.free_cv.notify_all();
        pid
    }

    /// Deliver a message. Messages to reaped processes are dropped
    /// silently.
    pub fn send(&self, to: Pid, message: ValueCell) {
        let mailbox = self
            .mailboxes
            .lock()
            .expect("mailbox map mutex poisoned")
            .get(&to)
            .cloned();
        match mailbox {
            Some(mailbox) => {
                mailbox.send(Envelope::new(message));
                // Wake schedulers polling a waiting receiver.
                self.free_cv.notify_all();
            }
            None => log::trace!("dropping message to reaped process {to}"),
        }
    }

    /// Drain a process's mailbox into its own queue.
    pub fn drain_mailbox(&self, pid: Pid, into: &mut VecDeque<ValueCell>) {
        let mailbox = self
            .mailboxes
            .lock()
            .expect("mailbox map mutex poisoned")
            .get(&pid)
            .cloned();
        if let Some(mailbox) = mailbox {
            mailbox.receive_into(into);
        }
    }

    /// Whether a mailbox holds undelivered messages.
    #[must_use]
    pub fn mailbox_has_messages(&self, pid: Pid) -> bool {
        self.mailboxes
            .lock()
            .expect("mailbox map mutex poisoned")
            .get(&pid)
            .is_some_and(|mailbox| mailbox.has_messages())
    }

    /// Destroy a process's mailbox, discarding queued messages.
    pub fn delete_mailbox(&self, pid: Pid) {
        self.mailboxes
            .lock()
            .expect("mailbox map mutex poisoned")
            .remove(&pid);
    }

    /// Post a terminated process's result for its joiner.
    pub fn post_result(&self, pid: Pid, result: ProcessResult) {
        self.results
            .lock()
            .expect("result map mutex poisoned")
            .insert(pid, ResultSlot(result));
        self.free_cv.notify_all();
    }

    /// Whether a process has terminated and its result is unclaimed.
    #[must_use]
    pub fn has_result(&self, pid: Pid) -> bool {
        self.results
            .lock()
            .expect("result map mutex poisoned")
            .contains_key(&pid)
    }

    /// Claim a terminated process's result.
    #[must_use]
    pub fn take_result(&self, pid: Pid) -> Option<ProcessResult> {
        self.results
            .lock()
            .expect("result map mutex poisoned")
            .remove(&pid)
            .map(|slot| slot.0)
    }

    /// Number of live (not yet terminated) processes.
    #[must_use]
    pub fn running_processes(&self) -> u64 {
        self.running.load(Ordering::SeqCst)
    }

    /// Mark one process as finished.
    pub fn process_finished(&self) {
        self.running.fetch_sub(1, Ordering::SeqCst);
        // Wake everything so idle schedulers can re-check the drain
        // condition and joiners can claim results.
        self.free_cv.notify_all();
        self.ffi_cv.notify_all();
    }

    /// Post a runnable process to the shared free list.
    pub fn post_free_process(&self, process: Box<Process>) {
        self.free_processes
            .lock()
            .expect("free process list mutex poisoned")
            .push(process);
        self.free_cv.notify_all();
    }

    /// Adopt a process from the free list, waiting up to `wait` for one
    /// to appear. Returns `None` on timeout, halt or full drain.
    #[must_use]
    pub fn next_free_process(&self, wait: Duration) -> Option<Box<Process>> {
        let mut free = self
            .free_processes
            .lock()
            .expect("free process list mutex poisoned");
        if let Some(process) = free.pop() {
            return Some(process);
        }
        if self.is_halted() || self.running_processes() == 0 {
            return None;
        }
        let (mut free, _) = self
            .free_cv
            .wait_timeout(free, wait)
            .expect("free process list mutex poisoned");
        free.pop()
    }

    // --- foreign call offloading ---

    /// Enqueue a foreign call for the FFI executor pool.
    pub fn request_foreign_call(&self, request: FfiRequest) {
        self.ffi_queue
            .lock()
            .expect("foreign call queue mutex poisoned")
            .push_back(request);
        self.ffi_cv.notify_one();
    }

    /// Dequeue a foreign call, blocking until one arrives or the pool is
    /// shut down.
    #[must_use]
    pub fn next_foreign_call(&self) -> Option<FfiRequest> {
        let mut queue = self
            .ffi_queue
            .lock()
            .expect("foreign call queue mutex poisoned");
        loop {
            if let Some(request) = queue.pop_front() {
                return Some(request);
            }
            if self.ffi_shutdown.load(Ordering::SeqCst) || self.is_halted() {
                return None;
            }
            queue = self
                .ffi_cv
                .wait_timeout(queue, Duration::from_millis(50))
                .expect("foreign call queue mutex poisoned")
                .0;
        }
    }

    /// Post the outcome of a completed foreign call.
    pub fn post_ffi_outcome(&self, caller: Pid, outcome: FfiOutcome) {
        self.ffi_outcomes
            .lock()
            .expect("foreign outcome map mutex poisoned")
            .insert(caller, OutcomeSlot(outcome));
        self.free_cv.notify_all();
    }

    /// Whether a caller's foreign call has completed.
    #[must_use]
    pub fn has_ffi_outcome(&self, pid: Pid) -> bool {
        self.ffi_outcomes
            .lock()
            .expect("foreign outcome map mutex poisoned")
            .contains_key(&pid)
    }

    /// Claim a completed foreign call's outcome.
    #[must_use]
    pub fn take_ffi_outcome(&self, pid: Pid) -> Option<FfiOutcome> {
        self.ffi_outcomes
            .lock()
            .expect("foreign outcome map mutex poisoned")
            .remove(&pid)
            .map(|slot| slot.0)
    }

    // --- halt ---

    /// Collapse the whole VM: pending processes and foreign calls are
    /// skipped.
    pub fn begin_halt(&self) {
        log::info!("halt: collapsing the VM");
        self.halted.store(true, Ordering::SeqCst);
        self.free_cv.notify_all();
        self.ffi_cv.notify_all();
    }

    /// Whether `halt` was executed.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    // --- lifecycle ---

    /// Launch the scheduler pools, block until all processes drain and
    /// return the exit code from the initial process's return register
    /// (0 if unset).
    pub fn run(self: Arc<Self>) -> Result<i64, RunError> {
        if self.code.is_empty() {
            return Err(RunError::NoCode);
        }

        // Entry resolution: main/1 takes the command line arguments,
        // main/0 takes nothing.
        let (entry_name, entry, wants_arguments) = ["main/1", "main/0"]
            .iter()
            .find_map(|name| {
                self.function_entry(name)
                    .map(|entry| (*name, entry, *name == "main/1"))
            })
            .ok_or(RunError::NoEntryFunction)?;

        let argc = usize::from(wants_arguments);
        let mut frame = Frame::new(argc, 16);
        frame.function_name = entry_name.to_owned();
        if wants_arguments {
            let arguments = self
                .arguments
                .iter()
                .map(|a| cell(Value::Text(a.clone())))
                .collect();
            frame
                .arguments
                .put(0, cell(Value::Vector(arguments)))
                .expect("argument slot 0 exists");
        }

        let main_pid = self.spawn(frame, entry, false, false);
        log::info!(
            "running {entry_name} with {} vp scheduler(s), {} ffi scheduler(s), quantum {}",
            self.config.vp_schedulers,
            self.config.ffi_schedulers,
            self.config.quantum
        );

        let mut vp_threads = Vec::with_capacity(self.config.vp_schedulers);
        for id in 0..self.config.vp_schedulers {
            let kernel = Arc::clone(&self);
            let thread = std::thread::Builder::new()
                .name(format!("viua-vp-{id}"))
                .spawn(move || scheduler::vps::VpScheduler::new(id, kernel).run())
                .expect("failed to spawn vp scheduler thread");
            vp_threads.push(thread);
        }

        let mut ffi_threads = Vec::with_capacity(self.config.ffi_schedulers);
        for id in 0..self.config.ffi_schedulers {
            let kernel = Arc::clone(&self);
            let thread = std::thread::Builder::new()
                .name(format!("viua-ffi-{id}"))
                .spawn(move || scheduler::ffi::worker(id, &kernel))
                .expect("failed to spawn ffi scheduler thread");
            ffi_threads.push(thread);
        }

        for thread in vp_threads {
            let _ = thread.join();
        }
        self.ffi_shutdown.store(true, Ordering::SeqCst);
        self.ffi_cv.notify_all();
        for thread in ffi_threads {
            let _ = thread.join();
        }

        let exit_code = match self.take_result(main_pid) {
            Some(ProcessResult::Returned(Some(value))) => match &*value.borrow() {
                Value::Integer(n) => *n,
                _ => 0,
            },
            Some(ProcessResult::Returned(None)) | None => 0,
            Some(ProcessResult::Crashed(exception)) => {
                log::error!(
                    "initial process crashed: {}",
                    exception.borrow().to_text()
                );
                1
            }
        };
        Ok(exit_code)
    }

    // --- termination bookkeeping used by the schedulers ---

    /// Reap a terminated process: destroy its mailbox, post its result
    /// (unless disowned) and spawn its watchdog if it crashed.
    pub fn reap(&self, process: Box<Process>) {
        let pid = process.pid();
        let disowned = process.is_disowned();
        let hidden = process.is_hidden();
        let watchdog = process.watchdog().map(str::to_owned);
        self.delete_mailbox(pid);

        match process.into_termination() {
            Termination::Returned(value) => {
                if !disowned {
                    self.post_result(pid, ProcessResult::Returned(value));
                }
            }
            Termination::Crashed(exception) => {
                // The exception goes to the joiner when one can exist;
                // otherwise a registered watchdog takes over. A crashing
                // watchdog never seeds another watchdog.
                let seeded = if disowned && !hidden {
                    watchdog.and_then(|name| {
                        self.function_entry(&name).map(|entry| (name, entry))
                    })
                } else {
                    None
                };
                match seeded {
                    Some((name, entry)) => {
                        log::debug!("process {pid}: seeding watchdog {name}");
                        let mut frame = Frame::new(1, 16);
                        frame.function_name = name;
                        frame
                            .arguments
                            .put(0, exception)
                            .expect("watchdog argument slot 0 exists");
                        let _ = self.spawn(frame, entry, true, true);
                    }
                    None => {
                        if disowned {
                            log::error!(
                                "disowned process {pid} died: {}",
                                exception.borrow().to_text()
                            );
                        } else {
                            self.post_result(pid, ProcessResult::Crashed(exception));
                        }
                    }
                }
            }
        }
        self.process_finished();
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("code_bytes", &self.code.len())
            .field("functions", &self.functions.len())
            .field("blocks", &self.blocks.len())
            .field("running", &self.running_processes())
            .field("halted", &self.is_halted())
            .finish_non_exhaustive()
    }
}

fn walk_bases(
    prototypes: &FxHashMap<String, Prototype>,
    name: &str,
    chain: &mut Vec<String>,
    seen: &mut Vec<String>,
) {
    let Some(prototype) = prototypes.get(name) else {
        return;
    };
    for base in &prototype.bases {
        if seen.iter().any(|s| s == base) {
            continue;
        }
        seen.push(base.clone());
        chain.push(base.clone());
        walk_bases(prototypes, base, chain, seen);
    }
}
