//! Byte source abstraction for the parser.
//!
//! Provides the [ByteSource] trait and [InMemoryByteSource], which holds the
//! full input (a Newick string or the content of a tree file) in memory.

use std::fs::File;
use std::io::Read;
use std::path::Path;

// =#========================================================================#=
// BYTE SOURCE (Trait)
// =#========================================================================T=
/// Interface of a source of bytes consumed by [ByteParser](crate::parser::ByteParser).
pub trait ByteSource {
    /// Peek at the current byte without consuming it;
    /// `None` at end of data.
    fn peek(&self) -> Option<u8>;

    /// Get the current byte and advance the position;
    /// `None` at end of data.
    fn next_byte(&mut self) -> Option<u8>;

    /// Returns the current byte offset.
    fn position(&self) -> usize;

    /// Returns a slice of up to `k` bytes from the current position without allocating.
    fn peek_slice(&self, k: usize) -> &[u8];

    /// Returns up to `k` bytes from the current position, e.g. for error context.
    fn get_context(&self, k: usize) -> Vec<u8>;

    /// Returns `true` if at or beyond the end of data.
    fn is_eof(&self) -> bool;
}

// =#========================================================================#=
// IN MEMORY BYTE SOURCE
// =#========================================================================$=
/// An in-memory byte source that owns its data.
pub struct InMemoryByteSource {
    /// The owned byte data being parsed
    input: Vec<u8>,
    /// Current position in the byte slice
    pos: usize,
}

impl InMemoryByteSource {
    /// Creates a new in-memory byte source from a Vec of bytes.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self {
            input: bytes,
            pos: 0,
        }
    }

    /// Reads the entire file into memory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut contents = Vec::new();
        let mut file = File::open(path)?;
        file.read_to_end(&mut contents)?;
        Ok(Self::from_vec(contents))
    }
}

impl ByteSource for InMemoryByteSource {
    #[inline(always)]
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    #[inline(always)]
    fn next_byte(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    #[inline]
    fn position(&self) -> usize {
        self.pos
    }

    #[inline(always)]
    fn peek_slice(&self, k: usize) -> &[u8] {
        let start = self.pos.min(self.input.len());
        let end = (self.pos + k).min(self.input.len());
        &self.input[start..end]
    }

    fn get_context(&self, k: usize) -> Vec<u8> {
        self.peek_slice(k).to_vec()
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }
}
