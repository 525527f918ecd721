//! Constants for the Newick parser and writer.

/// Newick label delimiters: parentheses, brackets, comma, colon, semicolon
/// (whitespace always ends an unquoted label)
pub(crate) const NEWICK_LABEL_DELIMITERS: &[u8] = b"()[],:;";

/// Annotation key delimiters
pub(crate) const ANNOTATION_KEY_DELIMITERS: &[u8] = b"=,]";

/// Annotation value delimiters
pub(crate) const ANNOTATION_VALUE_DELIMITERS: &[u8] = b",]";

/// Opening sequence of an annotation block
pub(crate) const ANNOTATION_START: &[u8] = b"[&";

/// Default guess for number of vertices, when unknown
pub(crate) const DEFAULT_NUM_VERTICES_GUESS: usize = 20;

/// Estimated number of characters per written branch length, e.g. ":0.0095299613"
pub(crate) const BRANCH_LENGTH_CHARS: usize = 14;

/// Structural characters per vertex, i.e. parentheses and commas
pub(crate) const STRUCTURE_CHARS: usize = 2;
