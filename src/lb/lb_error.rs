//! Errors of the LBI/LBR computation.

use crate::model::MalformedTreeError;
use crate::parser::ParsingError;
use thiserror::Error;

/// Reasons why LBI/LBR values could not be computed.
///
/// All of them are fatal: no partial results are ever returned.
#[derive(Error, Debug)]
pub enum LbError {
    /// The tree is not a single connected rooted acyclic structure with
    /// unique labels and consistent branch lengths.
    #[error("malformed tree: {0}")]
    MalformedTree(#[from] MalformedTreeError),

    /// The requested parameters are inconsistent or out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Branch lengths look like raw counts, but no sequence lengths were
    /// given to rescale them to per-site units.
    #[error(
        "tree needs rescaling (mean leaf depth {mean_leaf_depth} exceeds {threshold}), \
         but no sequence lengths were provided"
    )]
    MissingRescaleInfo { mean_leaf_depth: f64, threshold: f64 },

    /// The tree could not be parsed.
    #[error("could not parse tree: {0}")]
    Parsing(#[from] ParsingError),
}

impl LbError {
    pub(crate) fn invalid_configuration<S: Into<String>>(msg: S) -> Self {
        LbError::InvalidConfiguration(msg.into())
    }
}
