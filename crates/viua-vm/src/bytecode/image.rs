// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Bytecode image format.
//!
//! A loadable image is laid out as:
//!
//! ```text
//! [magic: 5 bytes "\x13VIUA"]
//! [kind: 1 byte, 0 = linkable, 1 = executable]
//! [meta: u64 byte length, nul-terminated key/value string pairs]
//! [jump table (linkable only): u64 count, count x u64 offsets]
//! [external function signatures: u64 byte length, nul-terminated names]
//! [external block signatures:    u64 byte length, nul-terminated names]
//! [block address table:    u64 byte length, (name\0, u64 offset) entries]
//! [function address table: u64 byte length, (name\0, u64 offset) entries]
//! [code: u64 size, code bytes]
//! ```
//!
//! All integers are little-endian. The jump table of a linkable image
//! lists the code offsets of absolute addresses that must be rebased when
//! the module is linked at a non-zero base.

use core::fmt;

/// Magic identifier opening every image.
pub const MAGIC: &[u8; 5] = b"\x13VIUA";

/// Whether an image is directly executable or a linkable module.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ImageKind {
    /// A module to be linked into a running kernel.
    Linkable = 0,
    /// A program with its own entry function.
    Executable = 1,
}

/// A parsed bytecode image.
#[derive(Debug, Clone)]
pub struct Image {
    /// Executable or linkable.
    pub kind: ImageKind,
    /// Meta-information key/value pairs.
    pub meta: Vec<(String, String)>,
    /// Offsets of absolute addresses inside `code` (linkable only).
    pub jump_table: Vec<u64>,
    /// Names of functions this image expects the kernel to provide.
    pub external_functions: Vec<String>,
    /// Names of blocks this image expects the kernel to provide.
    pub external_blocks: Vec<String>,
    /// Block name to code offset.
    pub blocks: Vec<(String, u64)>,
    /// Function name to code offset.
    pub functions: Vec<(String, u64)>,
    /// The code bytes.
    pub code: Vec<u8>,
}

/// Image sections named in load errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    /// The meta-information block.
    Meta,
    /// The jump table.
    JumpTable,
    /// The external function signature block.
    ExternalFunctions,
    /// The external block signature block.
    ExternalBlocks,
    /// The block address table.
    Blocks,
    /// The function address table.
    Functions,
    /// The code block.
    Code,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Meta => "meta information",
            Self::JumpTable => "jump table",
            Self::ExternalFunctions => "external function signatures",
            Self::ExternalBlocks => "external block signatures",
            Self::Blocks => "block address table",
            Self::Functions => "function address table",
            Self::Code => "code",
        };
        f.write_str(name)
    }
}

/// A malformed image. Fatal to the kernel: no processes ever start.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadError {
    /// The image does not begin with the magic identifier.
    BadMagic,
    /// Unknown image kind byte.
    BadKind(u8),
    /// A section runs past the end of the image.
    Truncated(Section),
    /// A name in the given section is not valid UTF-8.
    InvalidName(Section),
    /// Two entries of an address table share a name.
    DuplicateSymbol(String),
    /// An address table entry points outside the code.
    AddressOutOfCode {
        /// The offending symbol.
        name: String,
        /// Its recorded offset.
        offset: u64,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadMagic => write!(f, "not a Viua bytecode image"),
            Self::BadKind(kind) => write!(f, "unknown image kind {kind}"),
            Self::Truncated(section) => write!(f, "image truncated in {section} section"),
            Self::InvalidName(section) => {
                write!(f, "non-UTF-8 name in {section} section")
            }
            Self::DuplicateSymbol(name) => write!(f, "duplicate symbol: {name}"),
            Self::AddressOutOfCode { name, offset } => {
                write!(f, "symbol {name} points outside code (offset {offset})")
            }
        }
    }
}

impl std::error::Error for LoadError {}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize, section: Section) -> Result<&'a [u8], LoadError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(LoadError::Truncated(section))?;
        let out = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn u64(&mut self, section: Section) -> Result<u64, LoadError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8, section)?);
        Ok(u64::from_le_bytes(buf))
    }
}

fn split_names(block: &[u8], section: Section) -> Result<Vec<String>, LoadError> {
    let mut names = Vec::new();
    let mut rest = block;
    while !rest.is_empty() {
        let nul = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or(LoadError::Truncated(section))?;
        let name = core::str::from_utf8(&rest[..nul])
            .map_err(|_| LoadError::InvalidName(section))?;
        names.push(name.to_owned());
        rest = &rest[nul + 1..];
    }
    Ok(names)
}

fn split_address_table(block: &[u8], section: Section) -> Result<Vec<(String, u64)>, LoadError> {
    let mut entries: Vec<(String, u64)> = Vec::new();
    let mut rest = block;
    while !rest.is_empty() {
        let nul = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or(LoadError::Truncated(section))?;
        let name = core::str::from_utf8(&rest[..nul])
            .map_err(|_| LoadError::InvalidName(section))?
            .to_owned();
        rest = &rest[nul + 1..];
        if rest.len() < 8 {
            return Err(LoadError::Truncated(section));
        }
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&rest[..8]);
        rest = &rest[8..];
        if entries.iter().any(|(n, _)| *n == name) {
            return Err(LoadError::DuplicateSymbol(name));
        }
        entries.push((name, u64::from_le_bytes(buf)));
    }
    Ok(entries)
}

/// Parse a bytecode image.
pub fn load(bytes: &[u8]) -> Result<Image, LoadError> {
    if bytes.len() < MAGIC.len() + 1 || &bytes[..MAGIC.len()] != MAGIC {
        return Err(LoadError::BadMagic);
    }
    let kind = match bytes[MAGIC.len()] {
        0 => ImageKind::Linkable,
        1 => ImageKind::Executable,
        other => return Err(LoadError::BadKind(other)),
    };

    let mut reader = Reader {
        bytes,
        pos: MAGIC.len() + 1,
    };

    let meta_len = reader.u64(Section::Meta)? as usize;
    let meta_block = reader.take(meta_len, Section::Meta)?;
    let meta_names = split_names(meta_block, Section::Meta)?;
    if meta_names.len() % 2 != 0 {
        return Err(LoadError::Truncated(Section::Meta));
    }
    let meta = meta_names
        .chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect();

    let jump_table = if kind == ImageKind::Linkable {
        let count = reader.u64(Section::JumpTable)? as usize;
        let mut table = Vec::with_capacity(count);
        for _ in 0..count {
            table.push(reader.u64(Section::JumpTable)?);
        }
        table
    } else {
        Vec::new()
    };

    let ext_fn_len = reader.u64(Section::ExternalFunctions)? as usize;
    let external_functions = split_names(
        reader.take(ext_fn_len, Section::ExternalFunctions)?,
        Section::ExternalFunctions,
    )?;

    let ext_block_len = reader.u64(Section::ExternalBlocks)? as usize;
    let external_blocks = split_names(
        reader.take(ext_block_len, Section::ExternalBlocks)?,
        Section::ExternalBlocks,
    )?;

    let blocks_len = reader.u64(Section::Blocks)? as usize;
    let blocks = split_address_table(reader.take(blocks_len, Section::Blocks)?, Section::Blocks)?;

    let functions_len = reader.u64(Section::Functions)? as usize;
    let functions = split_address_table(
        reader.take(functions_len, Section::Functions)?,
        Section::Functions,
    )?;

    let code_len = reader.u64(Section::Code)? as usize;
    let code = reader.take(code_len, Section::Code)?.to_vec();

    for (name, offset) in blocks.iter().chain(functions.iter()) {
        if *offset as usize >= code.len() {
            return Err(LoadError::AddressOutOfCode {
                name: name.clone(),
                offset: *offset,
            });
        }
    }

    Ok(Image {
        kind,
        meta,
        jump_table,
        external_functions,
        external_blocks,
        blocks,
        functions,
        code,
    })
}
