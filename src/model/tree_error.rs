//! Structural defects of a [PhyloTree](crate::model::PhyloTree).

use crate::model::tree::VertexIndex;
use thiserror::Error;

/// Reason why a tree is not a single connected, rooted, acyclic structure
/// with unique labels and consistent branch lengths.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedTreeError {
    #[error("tree has no root")]
    NoRoot,
    #[error("tree has more than one root (vertices {first} and {second})")]
    MultipleRoots {
        first: VertexIndex,
        second: VertexIndex,
    },
    #[error("vertex stored at position {position} claims index {index}")]
    IndexMismatch {
        position: usize,
        index: VertexIndex,
    },
    #[error("vertex {vertex} references vertex {reference}, which does not exist")]
    DanglingReference {
        vertex: VertexIndex,
        reference: VertexIndex,
    },
    #[error("parent and child links of vertex {vertex} disagree")]
    InconsistentLinks { vertex: VertexIndex },
    #[error("tree contains a cycle through vertex {vertex}")]
    Cycle { vertex: VertexIndex },
    #[error("vertex {vertex} is not reachable from the root")]
    Unreachable { vertex: VertexIndex },
    #[error("vertex {vertex} has an empty label")]
    EmptyLabel { vertex: VertexIndex },
    #[error("label '{0}' is used by more than one vertex")]
    DuplicateLabel(String),
    #[error("vertex '{0}' has no branch length")]
    MissingBranchLength(String),
    #[error("vertex '{label}' is closer to the root than its parent (clock length {clock_length})")]
    NegativeClockLength { label: String, clock_length: f64 },
}
