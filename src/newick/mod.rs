//! Newick format parser and writer for phylogenetic trees.
//!
//! This module provides [NewickParser] to parse Newick format strings
//! into tree structures, using a [TreeBuilder](crate::model::TreeBuilder)
//! internally, and [to_newick] to write them again.
//!
//! # Quick API
//! For simple use cases with default settings:
//! * [`parse_file`] - parses all trees of a file
//! * [`parse_str`] - parses a single string
//!
//! # Full API
//! For more control, configure a [NewickParser] and
//! provide data via a [ByteParser]:
//! * [`NewickParser::parse_str`] - parse a single tree
//! * [`NewickParser::parse_all`] - parse all trees until EOF
//! * [`NewickParser::into_iter`] - obtain an iterator over trees
//!
//! # Format
//! The Newick format has the following grammar:
//! * `tree ::= subtree ';'`
//! * `subtree ::= leaf | internal`
//! * `internal ::= '(' subtree (',' subtree)* ')' [label] [branch_length]`
//! * `leaf ::= [label] [branch_length]`
//! * `branch_length ::= ':' number`
//!
//! Furthermore:
//! * Labels are unquoted or single-quoted (`''` escapes a quote);
//!   missing labels get generated by the builder
//! * Whitespace and comments (square brackets) can occur between elements,
//!   just not within an unquoted label or a branch length
//! * Branch lengths must be non-negative
//!
//! In the extended Newick format, there can be comment-like annotations
//! after a label or after a branch length:
//! * `A[&multiplicity=3]:2.1`
//! * `(A,B)AB[&rate=0.5,color=blue]:6.7`
//!
//! These are skipped as comments unless the parser is configured
//! [with annotations](NewickParser::with_annotations).

mod defs;
pub mod parser;
pub mod writer;

pub use parser::{NewickIterator, NewickParser};
pub use writer::{NewickStyle, to_newick, write_newick_file};

use crate::model::PhyloTree;
use crate::parser::ParsingError;
use crate::parser::byte_parser::ByteParser;
use std::path::Path;

// ============================================================================
// QUICK PARSING API (pub)
// ============================================================================
/// Parses a Newick file eagerly and returns all trees.
///
/// This is a convenience function to parse a file containing a
/// semicolon-separated list of Newick strings,
/// using default settings and thus not requiring configuration of a parser.
///
/// # Arguments
/// * `path` - Path to the file (accepting `&str`, `String`, `Path`, or `PathBuf`)
///
/// # Returns
/// * `Vec<PhyloTree>` - All parsed trees
/// * [ParsingError] - If file reading fails or Newick format is invalid
///
/// # Example
/// ```no_run
/// use lbtree::newick::parse_file;
///
/// let trees = parse_file("germinal-center.nwk")?;
/// println!("Parsed {} trees", trees.len());
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<PhyloTree>, ParsingError> {
    let byte_parser = ByteParser::from_file(path)?;
    NewickParser::new_defaults().parse_all(byte_parser)
}

/// Parses a single Newick string to obtain a [PhyloTree].
///
/// This is a convenience function for quick parsing of a single Newick string
/// using default settings and thus not requiring configuration of a parser.
///
/// # Example
/// ```
/// use lbtree::newick::parse_str;
///
/// let tree = parse_str("(Fratercula_cirrhata,(Fratercula_arctica,Fratercula_corniculata));")?;
/// assert_eq!(tree.num_leaves(), 3);
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn parse_str<S: AsRef<str>>(newick: S) -> Result<PhyloTree, ParsingError> {
    let mut byte_parser = ByteParser::for_str(newick.as_ref());
    NewickParser::new_defaults().parse_str(&mut byte_parser)
}
