//! Utility functions for label escaping in Newick strings.
//!
//! Labels are written verbatim when possible and wrapped in single quotes
//! (with internal single quotes doubled) when they contain whitespace or
//! characters with a meaning in Newick, so that parsing the written string
//! yields the original label again.

/// Characters that force a label to be quoted
const SPECIAL_CHARS: &[char] = &[',', ';', '(', ')', ':', '[', ']', '\''];

/// Checks if a label must be quoted to survive a Newick round trip.
///
/// # Examples
/// ```
/// # use lbtree::parser::utils::needs_quoting;
/// assert!(!needs_quoting("Pukeko"));
/// assert!(!needs_quoting("Australasian_Swamphen"));
/// assert!(needs_quoting("Australasian Swamphen"));
/// assert!(needs_quoting("Pu[ke]ko"));
/// assert!(needs_quoting(""));
/// ```
pub fn needs_quoting(label: &str) -> bool {
    label.is_empty()
        || label
            .chars()
            .any(|c| c.is_whitespace() || SPECIAL_CHARS.contains(&c))
}

/// Escapes a label for use in a Newick string.
///
/// # Examples
/// ```
/// # use lbtree::parser::utils::escape_label;
/// assert_eq!(escape_label("Pukeko"), "Pukeko");
/// assert_eq!(escape_label("Pu[ke]ko"), "'Pu[ke]ko'");
/// assert_eq!(escape_label("Australasian Swamphen"), "'Australasian Swamphen'");
/// assert_eq!(escape_label("Baillon's Crake"), "'Baillon''s Crake'");
/// ```
pub fn escape_label(label: &str) -> String {
    if needs_quoting(label) {
        format!("'{}'", label.replace('\'', "''"))
    } else {
        label.to_string()
    }
}
