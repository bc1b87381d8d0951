// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Typed operand decoding from a byte cursor.
//!
//! Every operand begins with a 1-byte [`OperandType`] tag. Register
//! operands carry a u32 index (little-endian) and a 1-byte register-set
//! marker; numeric operands carry their payload little-endian; Text, Atom
//! and String payloads are nul-terminated; Bits payloads are
//! length-prefixed.
//!
//! Decode errors are fatal to the process executing the malformed code -
//! they are bugs in the image, not recoverable program states.

use core::fmt;
use viua_core::RegisterSetId;

/// Operand type tags as they appear on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum OperandType {
    /// Direct register index.
    RegisterIndex = 0,
    /// Indirect register index (read the effective index from a register).
    RegisterReference = 1,
    /// Register holding a pointer to dereference.
    PointerDereference = 2,
    /// The abstract concept of "nothing".
    Void = 3,
    /// Nul-terminated symbol.
    Atom = 4,
    /// Nul-terminated UTF-8 text.
    Text = 5,
    /// Nul-terminated byte string.
    String = 6,
    /// Length-prefixed bit string.
    Bits = 7,
    /// Default-width signed integer (32-bit on the wire).
    Int = 8,
    /// 8-bit signed integer.
    Int8 = 9,
    /// 16-bit signed integer.
    Int16 = 10,
    /// 32-bit signed integer.
    Int32 = 11,
    /// 64-bit signed integer.
    Int64 = 12,
    /// Default-width unsigned integer (32-bit on the wire).
    Uint = 13,
    /// 8-bit unsigned integer.
    Uint8 = 14,
    /// 16-bit unsigned integer.
    Uint16 = 15,
    /// 32-bit unsigned integer.
    Uint32 = 16,
    /// 64-bit unsigned integer.
    Uint64 = 17,
    /// Default-width float (64-bit on the wire).
    Float = 18,
    /// 32-bit float.
    Float32 = 19,
    /// 64-bit float.
    Float64 = 20,
    /// Literal true.
    True = 21,
    /// Literal false.
    False = 22,
}

impl OperandType {
    /// Decode a tag byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::RegisterIndex),
            1 => Some(Self::RegisterReference),
            2 => Some(Self::PointerDereference),
            3 => Some(Self::Void),
            4 => Some(Self::Atom),
            5 => Some(Self::Text),
            6 => Some(Self::String),
            7 => Some(Self::Bits),
            8 => Some(Self::Int),
            9 => Some(Self::Int8),
            10 => Some(Self::Int16),
            11 => Some(Self::Int32),
            12 => Some(Self::Int64),
            13 => Some(Self::Uint),
            14 => Some(Self::Uint8),
            15 => Some(Self::Uint16),
            16 => Some(Self::Uint32),
            17 => Some(Self::Uint64),
            18 => Some(Self::Float),
            19 => Some(Self::Float32),
            20 => Some(Self::Float64),
            21 => Some(Self::True),
            22 => Some(Self::False),
            _ => None,
        }
    }

    /// Encode this tag as its wire byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// How a register operand reaches its register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegisterAccess {
    /// The register at the encoded index.
    Direct,
    /// The encoded index names a register holding the effective index.
    Indirect,
    /// The register holds a pointer whose referent is the operand.
    PointerDereference,
}

/// A decoded register operand: access mode, set and index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterOperand {
    /// Access mode.
    pub access: RegisterAccess,
    /// Which register set the index refers to.
    pub set: RegisterSetId,
    /// Encoded register index.
    pub index: u32,
}

/// A decoded timeout: `None` is infinity.
///
/// On the wire a timeout of 0 means infinity and N > 0 means N-1
/// milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeout(pub Option<u32>);

impl Timeout {
    /// The infinite timeout.
    pub const INFINITE: Self = Self(None);

    /// A timeout of `ms` milliseconds.
    #[must_use]
    pub const fn milliseconds(ms: u32) -> Self {
        Self(Some(ms))
    }
}

/// Malformed bytecode encountered while decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// The code ended in the middle of an instruction.
    UnexpectedEnd {
        /// Byte offset of the failed read.
        at: usize,
    },
    /// Unknown opcode byte.
    IllegalInstruction {
        /// Byte offset of the opcode.
        at: usize,
        /// The offending byte.
        opcode: u8,
    },
    /// Unknown operand-type tag.
    InvalidOperandType {
        /// Byte offset of the tag.
        at: usize,
        /// The offending byte.
        tag: u8,
    },
    /// An operand of a different type than the handler expects.
    UnexpectedOperand {
        /// Byte offset of the tag.
        at: usize,
        /// Decoded operand type.
        found: OperandType,
        /// What the handler expected.
        expected: &'static str,
    },
    /// Unknown register-set marker.
    InvalidRegisterSet {
        /// Byte offset of the marker.
        at: usize,
        /// The offending byte.
        marker: u8,
    },
    /// A Text or Atom payload that is not valid UTF-8.
    InvalidUtf8 {
        /// Byte offset of the payload.
        at: usize,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEnd { at } => {
                write!(f, "bytecode ends mid-instruction at offset {at}")
            }
            Self::IllegalInstruction { at, opcode } => {
                write!(f, "unrecognised instruction (byte value {opcode}) at offset {at}")
            }
            Self::InvalidOperandType { at, tag } => {
                write!(f, "invalid operand type tag {tag} at offset {at}")
            }
            Self::UnexpectedOperand { at, found, expected } => {
                write!(f, "decoded {found:?} at offset {at}, expected {expected}")
            }
            Self::InvalidRegisterSet { at, marker } => {
                write!(f, "invalid register set marker {marker} at offset {at}")
            }
            Self::InvalidUtf8 { at } => {
                write!(f, "operand payload at offset {at} is not valid UTF-8")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// A byte cursor over a code image.
///
/// Handlers decode their operands through the cursor and the position
/// after the last operand is the next instruction pointer.
pub struct Cursor<'a> {
    code: &'a [u8],
    ip: usize,
}

impl<'a> Cursor<'a> {
    /// Create a cursor positioned at byte offset `ip`.
    #[must_use]
    pub const fn new(code: &'a [u8], ip: usize) -> Self {
        Self { code, ip }
    }

    /// Current byte offset.
    #[must_use]
    pub const fn ip(&self) -> usize {
        self.ip
    }

    /// Whether the cursor is past the end of the code.
    #[must_use]
    pub const fn at_end(&self) -> bool {
        self.ip >= self.code.len()
    }

    fn read_byte(&mut self) -> Result<u8, DecodeError> {
        let byte = *self
            .code
            .get(self.ip)
            .ok_or(DecodeError::UnexpectedEnd { at: self.ip })?;
        self.ip += 1;
        Ok(byte)
    }

    fn read_exact<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let end = self.ip.checked_add(N).filter(|end| *end <= self.code.len());
        let end = end.ok_or(DecodeError::UnexpectedEnd { at: self.ip })?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.code[self.ip..end]);
        self.ip = end;
        Ok(out)
    }

    /// Read the opcode byte of the next instruction.
    pub fn fetch_opcode(&mut self) -> Result<u8, DecodeError> {
        let at = self.ip;
        let opcode = self.read_byte()?;
        if opcode >= super::OPCODE_COUNT {
            return Err(DecodeError::IllegalInstruction { at, opcode });
        }
        Ok(opcode)
    }

    /// Look at the next operand's type tag without consuming it.
    pub fn peek_type(&self) -> Result<OperandType, DecodeError> {
        let byte = *self
            .code
            .get(self.ip)
            .ok_or(DecodeError::UnexpectedEnd { at: self.ip })?;
        OperandType::from_byte(byte).ok_or(DecodeError::InvalidOperandType {
            at: self.ip,
            tag: byte,
        })
    }

    /// Whether the next operand is void.
    pub fn next_is_void(&self) -> Result<bool, DecodeError> {
        Ok(self.peek_type()? == OperandType::Void)
    }

    fn fetch_type(&mut self) -> Result<OperandType, DecodeError> {
        let at = self.ip;
        let byte = self.read_byte()?;
        OperandType::from_byte(byte).ok_or(DecodeError::InvalidOperandType { at, tag: byte })
    }

    /// Consume a void operand.
    pub fn fetch_void(&mut self) -> Result<(), DecodeError> {
        let at = self.ip;
        match self.fetch_type()? {
            OperandType::Void => Ok(()),
            found => Err(DecodeError::UnexpectedOperand {
                at,
                found,
                expected: "void",
            }),
        }
    }

    /// Consume a register operand.
    pub fn fetch_register(&mut self) -> Result<RegisterOperand, DecodeError> {
        let at = self.ip;
        let access = match self.fetch_type()? {
            OperandType::RegisterIndex => RegisterAccess::Direct,
            OperandType::RegisterReference => RegisterAccess::Indirect,
            OperandType::PointerDereference => RegisterAccess::PointerDereference,
            found => {
                return Err(DecodeError::UnexpectedOperand {
                    at,
                    found,
                    expected: "register index, register reference or pointer dereference",
                });
            }
        };
        let index = u32::from_le_bytes(self.read_exact::<4>()?);
        let marker_at = self.ip;
        let marker = self.read_byte()?;
        let set = RegisterSetId::from_marker(marker).ok_or(DecodeError::InvalidRegisterSet {
            at: marker_at,
            marker,
        })?;
        Ok(RegisterOperand { access, set, index })
    }

    /// Consume a register operand or a void.
    pub fn fetch_register_or_void(&mut self) -> Result<Option<RegisterOperand>, DecodeError> {
        if self.next_is_void()? {
            self.fetch_void()?;
            Ok(None)
        } else {
            Ok(Some(self.fetch_register()?))
        }
    }

    fn fetch_cstr(&mut self, expected: OperandType) -> Result<Vec<u8>, DecodeError> {
        let at = self.ip;
        let found = self.fetch_type()?;
        if found != expected {
            return Err(DecodeError::UnexpectedOperand {
                at,
                found,
                expected: "nul-terminated payload",
            });
        }
        let start = self.ip;
        let nul = self.code[start..]
            .iter()
            .position(|b| *b == 0)
            .ok_or(DecodeError::UnexpectedEnd { at: start })?;
        let bytes = self.code[start..start + nul].to_vec();
        self.ip = start + nul + 1;
        Ok(bytes)
    }

    fn fetch_utf8(&mut self, expected: OperandType) -> Result<String, DecodeError> {
        let at = self.ip;
        String::from_utf8(self.fetch_cstr(expected)?)
            .map_err(|_| DecodeError::InvalidUtf8 { at })
    }

    /// Consume an atom operand.
    pub fn fetch_atom(&mut self) -> Result<String, DecodeError> {
        self.fetch_utf8(OperandType::Atom)
    }

    /// Consume a text operand.
    pub fn fetch_text(&mut self) -> Result<String, DecodeError> {
        self.fetch_utf8(OperandType::Text)
    }

    /// Consume a byte-string operand.
    pub fn fetch_string(&mut self) -> Result<Vec<u8>, DecodeError> {
        self.fetch_cstr(OperandType::String)
    }

    /// Consume a bits operand; returns the raw bytes, least significant
    /// byte first.
    pub fn fetch_bits(&mut self) -> Result<Vec<u8>, DecodeError> {
        let at = self.ip;
        let found = self.fetch_type()?;
        if found != OperandType::Bits {
            return Err(DecodeError::UnexpectedOperand {
                at,
                found,
                expected: "bits",
            });
        }
        let len = u64::from_le_bytes(self.read_exact::<8>()?) as usize;
        let start = self.ip;
        let end = start
            .checked_add(len)
            .filter(|end| *end <= self.code.len())
            .ok_or(DecodeError::UnexpectedEnd { at: start })?;
        let bytes = self.code[start..end].to_vec();
        self.ip = end;
        Ok(bytes)
    }

    /// Consume a default-width signed integer operand.
    pub fn fetch_int(&mut self) -> Result<i32, DecodeError> {
        let at = self.ip;
        let found = self.fetch_type()?;
        if found != OperandType::Int {
            return Err(DecodeError::UnexpectedOperand {
                at,
                found,
                expected: "int",
            });
        }
        Ok(i32::from_le_bytes(self.read_exact::<4>()?))
    }

    /// Consume a default-width unsigned integer operand.
    pub fn fetch_uint(&mut self) -> Result<u32, DecodeError> {
        let at = self.ip;
        let found = self.fetch_type()?;
        if found != OperandType::Uint {
            return Err(DecodeError::UnexpectedOperand {
                at,
                found,
                expected: "uint",
            });
        }
        Ok(u32::from_le_bytes(self.read_exact::<4>()?))
    }

    /// Consume a 64-bit unsigned operand (jump targets).
    pub fn fetch_address(&mut self) -> Result<u64, DecodeError> {
        let at = self.ip;
        let found = self.fetch_type()?;
        if found != OperandType::Uint64 {
            return Err(DecodeError::UnexpectedOperand {
                at,
                found,
                expected: "uint64",
            });
        }
        Ok(u64::from_le_bytes(self.read_exact::<8>()?))
    }

    /// Consume a default-width float operand.
    pub fn fetch_float(&mut self) -> Result<f64, DecodeError> {
        let at = self.ip;
        let found = self.fetch_type()?;
        if found != OperandType::Float {
            return Err(DecodeError::UnexpectedOperand {
                at,
                found,
                expected: "float",
            });
        }
        Ok(f64::from_le_bytes(self.read_exact::<8>()?))
    }

    /// Consume a boolean literal operand.
    pub fn fetch_bool(&mut self) -> Result<bool, DecodeError> {
        let at = self.ip;
        match self.fetch_type()? {
            OperandType::True => Ok(true),
            OperandType::False => Ok(false),
            found => Err(DecodeError::UnexpectedOperand {
                at,
                found,
                expected: "true or false",
            }),
        }
    }

    /// Consume a timeout operand.
    pub fn fetch_timeout(&mut self) -> Result<Timeout, DecodeError> {
        let at = self.ip;
        let found = self.fetch_type()?;
        if found != OperandType::Int {
            return Err(DecodeError::UnexpectedOperand {
                at,
                found,
                expected: "timeout",
            });
        }
        let raw = u32::from_le_bytes(self.read_exact::<4>()?);
        if raw == 0 {
            Ok(Timeout::INFINITE)
        } else {
            Ok(Timeout::milliseconds(raw - 1))
        }
    }
}
