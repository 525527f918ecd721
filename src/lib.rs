//! Lbtree computes the local branching index (LBI) and local branching
//! ratio (LBR) of the vertices of phylogenetic trees, as fitness
//! estimators of lineages in a population of sequences.
//!
//! Core functionality provided:
//! - Newick: Parse (and write) rooted trees of any arity, with labels on
//!   all vertices and extended Newick annotations such as multiplicities.
//! - Tree model: [PhyloTree] uses the arena pattern, so no direct vertex
//!   references are stored, only vertex indices. See [crate::model].
//! - LBI/LBR: Two-pass message passing over the tree, optionally on a copy
//!   augmented with dummy vertices, normalized, weighted by multiplicities,
//!   and on branch lengths rescaled to substitutions per site.
//!   See [crate::lb].
//! - Configurability: [LbConfig] in code or from TOML.
//!
//! # Usage patterns
//! 1. Quick parsing with default settings via [parse_newick_str] and
//!    [parse_newick_file]; configure a
//!    [NewickParser](crate::newick::NewickParser) for full control.
//! 2. [calculate_lb_values] for a complete calculation, or
//!    [set_lb_values](crate::lb::set_lb_values) for a single run with
//!    one decay constant.
//!
//! ## Example
//! ```
//! use lbtree::{LbConfig, calculate_lb_values, parse_newick_str};
//!
//! let tree = parse_newick_str("((A:0.002,B:0.001)AB:0.003,C:0.004)R;")?;
//! let result = calculate_lb_values(&tree, &LbConfig::default(), None)?;
//!
//! assert!(result.lbi["AB"] > result.lbi["C"]);
//! assert_eq!(result.lbr["R"], 0.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Example Configuration
//! ```
//! use lbtree::LbConfig;
//!
//! let config = LbConfig::from_toml_str(r#"
//!     lbi_tau = 0.001
//!     add_dummy_root = true
//!     normalize = true
//! "#)?;
//! assert_eq!(config.effective_lbr_tau(), 0.02);
//! # Ok::<(), lbtree::lb::ConfigError>(())
//! ```

pub mod lb;
pub mod model;
pub mod newick;
pub mod parser;

pub use crate::lb::{LbConfig, LbError, LbResult, SequenceAnnotation, calculate_lb_values};
pub use crate::model::PhyloTree;

use crate::parser::ParsingError;
use std::path::Path;

// ============================================================================
// Quick Newick API
// ============================================================================
/// Parse a Newick string using default settings,
/// returning a [PhyloTree].
///
/// See [`newick::parse_str`] for full documentation of this convenience function.
pub fn parse_newick_str<S: AsRef<str>>(newick: S) -> Result<PhyloTree, ParsingError> {
    newick::parse_str(newick)
}

/// Parse a file containing a semicolon-separated list of Newick strings
/// using default settings, returning all trees.
///
/// See [`newick::parse_file`] for full documentation of this convenience function.
pub fn parse_newick_file<P: AsRef<Path>>(path: P) -> Result<Vec<PhyloTree>, ParsingError> {
    newick::parse_file(path)
}
