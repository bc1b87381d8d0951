// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Bytecode format for the Viua VM.
//!
//! Instructions are variable length: a 1-byte opcode followed by typed
//! operands. Every operand begins with a 1-byte operand-type tag (see
//! [`operands`]); register operands carry a u32 index and a register-set
//! marker, numeric operands carry their payload little-endian, and
//! Text/Atom/String payloads are nul-terminated.


pub mod builder;
pub mod image;
pub mod operands;

/// Bytecode opcodes.
pub mod op {
    /// Do nothing, advance one byte.
    pub const NOP: u8 = 0;

    // Integer instructions
    /// Store integer zero: `izero target`
    pub const IZERO: u8 = 1;
    /// Store an integer literal: `istore target <int>`
    pub const ISTORE: u8 = 2;
    /// Increment in place: `iinc target`
    pub const IINC: u8 = 3;
    /// Decrement in place: `idec target`
    pub const IDEC: u8 = 4;

    // Float instructions
    /// Store a float literal: `fstore target <float>`
    pub const FSTORE: u8 = 5;

    // Numeric conversions
    /// Convert to float: `itof target source`
    pub const ITOF: u8 = 6;
    /// Convert to integer: `ftoi target source`
    pub const FTOI: u8 = 7;
    /// Parse text as integer: `stoi target source`
    pub const STOI: u8 = 8;
    /// Parse text as float: `stof target source`
    pub const STOF: u8 = 9;

    // Arithmetic and comparison (numeric capability, Integer/Float promotion)
    /// `add target lhs rhs`
    pub const ADD: u8 = 10;
    /// `sub target lhs rhs`
    pub const SUB: u8 = 11;
    /// `mul target lhs rhs`
    pub const MUL: u8 = 12;
    /// `div target lhs rhs`
    pub const DIV: u8 = 13;
    /// `lt target lhs rhs`
    pub const LT: u8 = 14;
    /// `lte target lhs rhs`
    pub const LTE: u8 = 15;
    /// `gt target lhs rhs`
    pub const GT: u8 = 16;
    /// `gte target lhs rhs`
    pub const GTE: u8 = 17;
    /// `eq target lhs rhs`
    pub const EQ: u8 = 18;

    // String and text instructions
    /// Store a byte-string literal: `strstore target <string>`
    pub const STRSTORE: u8 = 19;
    /// Store a text literal or stringify a register: `text target <text>|source`
    pub const TEXT: u8 = 20;
    /// Text equality: `texteq target lhs rhs`
    pub const TEXTEQ: u8 = 21;
    /// Scalar at index: `textat target source index`
    pub const TEXTAT: u8 = 22;
    /// Scalar range copy: `textsub target source begin end|void`
    pub const TEXTSUB: u8 = 23;
    /// Length in scalars: `textlength target source`
    pub const TEXTLENGTH: u8 = 24;
    /// Length of common prefix: `textcommonprefix target lhs rhs`
    pub const TEXTCOMMONPREFIX: u8 = 25;
    /// Length of common suffix: `textcommonsuffix target lhs rhs`
    pub const TEXTCOMMONSUFFIX: u8 = 26;
    /// Concatenation: `textconcat target lhs rhs`
    pub const TEXTCONCAT: u8 = 27;

    // Atoms
    /// Store an atom literal: `atom target <atom>`
    pub const ATOM: u8 = 28;
    /// Atom equality: `atomeq target lhs rhs`
    pub const ATOMEQ: u8 = 29;

    // Bit strings
    /// Store a bits literal: `bits target <bits>`
    pub const BITS: u8 = 30;

    // Vectors
    /// Pack registers into a vector: `vec target start <count>`
    pub const VEC: u8 = 31;
    /// Insert at position, shifting the tail: `vinsert vector source <position>`
    pub const VINSERT: u8 = 32;
    /// Append: `vpush vector source`
    pub const VPUSH: u8 = 33;
    /// Remove and return: `vpop target|void vector index|void`
    pub const VPOP: u8 = 34;
    /// Pointer to element: `vat target vector index`
    pub const VAT: u8 = 35;
    /// Length: `vlen target vector`
    pub const VLEN: u8 = 36;

    // Structs
    /// Create an empty struct: `struct target`
    pub const STRUCT: u8 = 37;
    /// Insert a field: `structinsert struct key source`
    pub const STRUCTINSERT: u8 = 38;
    /// Remove a field: `structremove target|void struct key`
    pub const STRUCTREMOVE: u8 = 39;
    /// Vector of field keys: `structkeys target struct`
    pub const STRUCTKEYS: u8 = 40;

    // Booleans
    /// Store a boolean literal or the truthiness of a register:
    /// `bool target <bool>|source`
    pub const BOOL: u8 = 41;
    /// Logical negation: `not target source`
    pub const NOT: u8 = 42;
    /// Logical conjunction: `and target lhs rhs`
    pub const AND: u8 = 43;
    /// Logical disjunction: `or target lhs rhs`
    pub const OR: u8 = 44;

    // Register manipulation
    /// Move between registers: `move target source`
    pub const MOVE: u8 = 45;
    /// Deep copy between registers: `copy target source`
    pub const COPY: u8 = 46;
    /// Take a pointer: `ptr target source`
    pub const PTR: u8 = 47;
    /// Swap two registers: `swap lhs rhs`
    pub const SWAP: u8 = 48;
    /// Empty a register, freeing the value: `delete target`
    pub const DELETE: u8 = 49;
    /// Emptiness check: `isnull target source`
    pub const ISNULL: u8 = 50;
    /// Switch the current register set designation: `ress <marker>`
    pub const RESS: u8 = 51;

    // Output
    /// Print with trailing newline: `print source`
    pub const PRINT: u8 = 52;
    /// Print without newline: `echo source`
    pub const ECHO: u8 = 53;

    // Closures
    /// Capture by reference: `capture closure <index> source`
    pub const CAPTURE: u8 = 54;
    /// Capture a deep copy: `capturecopy closure <index> source`
    pub const CAPTURECOPY: u8 = 55;
    /// Capture by move: `capturemove closure <index> source`
    pub const CAPTUREMOVE: u8 = 56;
    /// Construct a closure: `closure target <function> <captures>`
    pub const CLOSURE: u8 = 57;
    /// First-class function handle: `function target <function>`
    pub const FUNCTION: u8 = 58;

    // Calls
    /// Allocate the pending frame: `frame <argc> <locals>`
    pub const FRAME: u8 = 59;
    /// Pass by copy: `param <index> source`
    pub const PARAM: u8 = 60;
    /// Pass by move: `pamv <index> source`
    pub const PAMV: u8 = 61;
    /// Move an argument into a register: `arg target|void <index>`
    pub const ARG: u8 = 62;
    /// Number of supplied arguments: `argc target`
    pub const ARGC: u8 = 63;
    /// Call a function or closure: `call target|void <function>|source`
    pub const CALL: u8 = 64;
    /// Replace the current frame: `tailcall <function>|source`
    pub const TAILCALL: u8 = 65;
    /// Defer a call to frame exit: `defer <function>`
    pub const DEFER: u8 = 66;

    // Concurrency
    /// Spawn a process: `process target|void <function>`
    pub const PROCESS: u8 = 67;
    /// Own PID: `self target`
    pub const SELF: u8 = 68;
    /// Join a process: `join target|void source <timeout>`
    pub const JOIN: u8 = 69;
    /// Send a message: `send target source`
    pub const SEND: u8 = 70;
    /// Receive a message: `receive target <timeout>`
    pub const RECEIVE: u8 = 71;
    /// Register a watchdog function: `watchdog <function>`
    pub const WATCHDOG: u8 = 72;

    // Control flow
    /// Unconditional jump: `jump <address>`
    pub const JUMP: u8 = 73;
    /// Conditional jump: `if condition <then> <else>`
    pub const IF: u8 = 74;

    // Exceptions
    /// Throw a value: `throw source`
    pub const THROW: u8 = 75;
    /// Register a catcher on the pending try scope: `catch <type> <block>`
    pub const CATCH: u8 = 76;
    /// Move the caught value into a register: `draw target`
    pub const DRAW: u8 = 77;
    /// Open a try scope: `try`
    pub const TRY: u8 = 78;
    /// Enter a guarded block: `enter <block>`
    pub const ENTER: u8 = 79;
    /// Leave a block, resuming past its enter: `leave`
    pub const LEAVE: u8 = 80;

    // Linking
    /// Link a registered module: `import <module>`
    pub const IMPORT: u8 = 81;

    // Typesystem
    /// Create a prototype: `class target <name>`
    pub const CLASS: u8 = 82;
    /// Append an ancestor: `derive target <base>`
    pub const DERIVE: u8 = 83;
    /// Bind a method: `attach target <function> <method>`
    pub const ATTACH: u8 = 84;
    /// Install the prototype into the typesystem: `register source`
    pub const REGISTER: u8 = 85;

    // Objects
    /// Instantiate a registered class: `new target <class>`
    pub const NEW: u8 = 86;
    /// Dynamic dispatch: `msg target|void <method>|source`
    pub const MSG: u8 = 87;
    /// Set an attribute: `insert object key source`
    pub const INSERT: u8 = 88;
    /// Remove an attribute: `remove target|void object key`
    pub const REMOVE: u8 = 89;

    /// Return from the current frame.
    pub const RETURN: u8 = 90;
    /// Stop the entire VM.
    pub const HALT: u8 = 91;
}

/// Number of defined opcodes.
pub const OPCODE_COUNT: u8 = 92;

/// Mnemonic of an opcode, for diagnostics.
#[must_use]
pub fn opcode_name(opcode: u8) -> Option<&'static str> {
    const NAMES: [&str; crate::bytecode::OPCODE_COUNT as usize] = [
        "nop",
        "izero",
        "istore",
        "iinc",
        "idec",
        "fstore",
        "itof",
        "ftoi",
        "stoi",
        "stof",
        "add",
        "sub",
        "mul",
        "div",
        "lt",
        "lte",
        "gt",
        "gte",
        "eq",
        "strstore",
        "text",
        "texteq",
        "textat",
        "textsub",
        "textlength",
        "textcommonprefix",
        "textcommonsuffix",
        "textconcat",
        "atom",
        "atomeq",
        "bits",
        "vec",
        "vinsert",
        "vpush",
        "vpop",
        "vat",
        "vlen",
        "struct",
        "structinsert",
        "structremove",
        "structkeys",
        "bool",
        "not",
        "and",
        "or",
        "move",
        "copy",
        "ptr",
        "swap",
        "delete",
        "isnull",
        "ress",
        "print",
        "echo",
        "capture",
        "capturecopy",
        "capturemove",
        "closure",
        "function",
        "frame",
        "param",
        "pamv",
        "arg",
        "argc",
        "call",
        "tailcall",
        "defer",
        "process",
        "self",
        "join",
        "send",
        "receive",
        "watchdog",
        "jump",
        "if",
        "throw",
        "catch",
        "draw",
        "try",
        "enter",
        "leave",
        "import",
        "class",
        "derive",
        "attach",
        "register",
        "new",
        "msg",
        "insert",
        "remove",
        "return",
        "halt",
    ];
    NAMES.get(opcode as usize).copied()
}
