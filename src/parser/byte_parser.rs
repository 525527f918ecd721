//! Low-level byte-by-byte parser for ASCII text.
//!
//! This module provides [ByteParser] for parsing Newick strings with support
//! for peeking, consuming, comment skipping, and quote-aware label parsing.

use crate::parser::byte_source::{ByteSource, InMemoryByteSource};
use crate::parser::parsing_error::ParsingError;
use std::path::Path;

// =#========================================================================#=
// BYTE PARSER
// =#========================================================================#=
/// A byte-by-byte parser for ASCII text with support for peeking,
/// consuming, and pattern matching.
///
/// # Example
/// ```
/// use lbtree::parser::ByteParser;
///
/// let mut parser = ByteParser::for_str("  [a comment] (A:1.0,B:2.0);");
/// parser.skip_comment_and_whitespace().unwrap();
/// assert!(parser.consume_if(b'('));
/// assert_eq!(parser.parse_label(b",:)").unwrap(), "A");
/// ```
pub struct ByteParser<S: ByteSource> {
    source: S,
}

impl ByteParser<InMemoryByteSource> {
    /// Creates a new `ByteParser` for the given string (copied into memory).
    pub fn for_str(input: &str) -> Self {
        Self::new(InMemoryByteSource::from_vec(input.as_bytes().to_vec()))
    }

    /// Creates a new `ByteParser` over the full content of the given file.
    ///
    /// # Errors
    /// Returns a [ParsingError] of type `IoError` if the file cannot be read.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ParsingError> {
        Ok(Self::new(InMemoryByteSource::from_file(path)?))
    }
}

impl<S: ByteSource> ByteParser<S> {
    /// Creates a new `ByteParser` from a byte source.
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Peeks at the current byte without consuming it (`None` at EOF).
    #[inline(always)]
    pub fn peek(&self) -> Option<u8> {
        self.source.peek()
    }

    /// Gets the current byte and advances the position (`None` at EOF).
    #[inline(always)]
    pub fn next_byte(&mut self) -> Option<u8> {
        self.source.next_byte()
    }

    /// Skips (consumes) all consecutive whitespace characters.
    pub fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() {
                self.next_byte();
            } else {
                break;
            }
        }
    }

    /// Skips (consumes) a comment `[...]` if present.
    ///
    /// # Returns
    /// * `Ok(true)` - A comment was found and consumed
    /// * `Ok(false)` - No comment at current position
    /// * `Err(ParsingError)` - Comment was opened but never closed
    pub fn skip_comment(&mut self) -> Result<bool, ParsingError> {
        if self.consume_if(b'[') {
            if !self.consume_until(b']', ConsumeMode::Inclusive) {
                return Err(ParsingError::unclosed_comment(self));
            }
            return Ok(true);
        }

        Ok(false)
    }

    /// Skips (consumes) all consecutive whitespace and comments.
    ///
    /// # Errors
    /// Returns an error if an unclosed comment is encountered.
    pub fn skip_comment_and_whitespace(&mut self) -> Result<(), ParsingError> {
        self.skip_whitespace();

        while self.skip_comment()? {
            self.skip_whitespace();
        }

        Ok(())
    }

    /// Checks if the current byte is `ch`.
    #[inline]
    pub fn peek_is(&self, ch: u8) -> bool {
        self.peek() == Some(ch)
    }

    /// Checks if the following bytes match the given byte sequence,
    /// without changing the position.
    pub fn peek_is_sequence(&self, sequence: &[u8]) -> bool {
        self.source.peek_slice(sequence.len()) == sequence
    }

    /// Consumes the current byte if it is `ch`.
    ///
    /// # Returns
    /// `true` if the byte was matched and consumed, `false` otherwise
    pub fn consume_if(&mut self, ch: u8) -> bool {
        if self.peek_is(ch) {
            self.next_byte();
            true
        } else {
            false
        }
    }

    /// Consumes the next bytes if they match the given byte sequence.
    ///
    /// # Returns
    /// `true` if the sequence was matched and consumed, `false` otherwise
    pub fn consume_if_sequence(&mut self, sequence: &[u8]) -> bool {
        if !self.peek_is_sequence(sequence) {
            return false;
        }

        for _ in 0..sequence.len() {
            self.next_byte();
        }

        true
    }

    /// Consumes bytes until the target byte is found.
    ///
    /// # Returns
    /// `true` if the target was found, `false` if EOF was reached first
    pub fn consume_until(&mut self, target: u8, mode: ConsumeMode) -> bool {
        while let Some(b) = self.peek() {
            if b == target {
                if mode == ConsumeMode::Inclusive {
                    self.next_byte();
                }
                return true;
            }
            self.next_byte();
        }
        false
    }

    /// Returns whether the end of data (EOF) has been reached.
    pub fn is_eof(&self) -> bool {
        self.source.is_eof()
    }

    /// Returns the current byte offset in the input.
    pub fn position(&self) -> usize {
        self.source.position()
    }

    /// Returns a string from up to `k` bytes from the current position for error context.
    ///
    /// Invalid UTF-8 sequences are replaced with the Unicode replacement character.
    pub fn get_context_as_string(&self, k: usize) -> String {
        String::from_utf8_lossy(&self.source.get_context(k)).into_owned()
    }

    /// Parses a label (quoted or unquoted) at the current position.
    ///
    /// Does not skip leading whitespace or comments; an unquoted label may
    /// be empty if the current byte already is a delimiter.
    ///
    /// # Arguments
    /// * `delimiters` - Bytes that end an unquoted label
    ///
    /// # Errors
    /// Returns an error if a quoted label is not closed.
    pub fn parse_label(&mut self, delimiters: &[u8]) -> Result<String, ParsingError> {
        if self.peek_is(b'\'') {
            self.parse_quoted_label()
        } else {
            Ok(self.parse_unquoted_label(delimiters))
        }
    }

    /// Parses a quoted label enclosed in single quotes.
    ///
    /// Single quotes within the label are escaped by doubling them
    /// (e.g. `'Wilson''s'` becomes `Wilson's`).
    ///
    /// # Errors
    /// Returns an error if EOF is reached before the closing quote.
    pub fn parse_quoted_label(&mut self) -> Result<String, ParsingError> {
        self.next_byte(); // opening '

        let mut bytes = Vec::new();
        loop {
            match self.next_byte() {
                Some(b'\'') => {
                    if self.peek_is(b'\'') {
                        bytes.push(b'\'');
                        self.next_byte();
                    } else {
                        break;
                    }
                }
                Some(b) => bytes.push(b),
                None => return Err(ParsingError::unexpected_eof(self)),
            }
        }

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Parses an unquoted label until any of the given delimiters
    /// (or whitespace, or EOF) is encountered.
    pub fn parse_unquoted_label(&mut self, delimiters: &[u8]) -> String {
        let mut bytes = Vec::new();

        while let Some(b) = self.peek() {
            if delimiters.contains(&b) || b.is_ascii_whitespace() {
                break;
            }
            bytes.push(b);
            self.next_byte();
        }

        String::from_utf8_lossy(&bytes).into_owned()
    }
}

/// Specifies whether to consume or leave the target when using `consume_until`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ConsumeMode {
    /// Consume the target byte along with everything before it.
    Inclusive,
    /// Stop before the target byte without consuming it.
    Exclusive,
}
