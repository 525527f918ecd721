//! Basic low-level byte parser functionality.
//!
//! Provides the [ByteParser] that the Newick parser is built on, the
//! in-memory byte source it reads from, label escaping helpers, and
//! [ParsingError] for reporting malformed input.

pub mod byte_parser;
pub(crate) mod byte_source;
pub mod parsing_error;
pub mod utils;

pub use byte_parser::ByteParser;
pub use parsing_error::{ParsingError, ParsingErrorType};
