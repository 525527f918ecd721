//! Vertex module for phylogenetic tree representation.

use crate::model::tree::VertexIndex;
use std::ops::Deref;

/// Default weight of a vertex, i.e. a single observation.
pub const DEFAULT_MULTIPLICITY: f64 = 1.0;

/// During construction, Internal and Leaf vertex might not have parent set yet.
const NO_PARENT_SET: VertexIndex = usize::MAX;

// =#========================================================================#=
// VERTEX
// =#========================================================================#=
/// Represents a vertex (node) in a phylogenetic tree.
///
/// A vertex can be either:
/// - **Root**: Has children, no parent; a branch length may be attached
///   (as allowed by Newick) but carries no meaning
/// - **Internal**: Has a parent and at least one child
/// - **Leaf**: Has a parent and no children
///
/// Every vertex has a label (taxon name or name of an inferred ancestor),
/// which is unique within a valid tree, and a multiplicity, i.e. the number
/// of times the sequence it represents was observed.
///
/// # Invariants
/// - `index` is the index in the arena
/// - `branch_length` is non-negative (enforced by [BranchLength])
/// - `parent` of Internal and Leaf is `NO_PARENT_SET` only during construction
/// - `multiplicity` is positive and finite
#[derive(PartialEq, Debug, Clone)]
pub enum Vertex {
    /// Root vertex of the tree (has no parent)
    Root {
        /// Index of this vertex in the tree arena
        index: VertexIndex,
        /// Label of this vertex
        label: String,
        /// Indices of the child vertices
        children: Vec<VertexIndex>,
        /// Length of a branch above the root, if given in the input
        branch_length: Option<BranchLength>,
        /// Observation count
        multiplicity: f64,
    },
    /// Internal vertex (has parent and children)
    Internal {
        /// Index of this vertex in the tree arena
        index: VertexIndex,
        /// Label of this vertex
        label: String,
        /// Index of the parent vertex
        parent: VertexIndex,
        /// Indices of the child vertices
        children: Vec<VertexIndex>,
        /// Distance to parent (optional, non-negative if present)
        branch_length: Option<BranchLength>,
        /// Observation count
        multiplicity: f64,
    },
    /// Leaf vertex (has parent, no children)
    Leaf {
        /// Index of this vertex in the tree arena
        index: VertexIndex,
        /// Label of this vertex
        label: String,
        /// Index of the parent vertex
        parent: VertexIndex,
        /// Distance to parent (optional, non-negative if present)
        branch_length: Option<BranchLength>,
        /// Observation count
        multiplicity: f64,
    },
}

impl Vertex {
    /// Creates a new root vertex.
    ///
    /// # Arguments
    /// * `index` - The unique index of this vertex in the tree (arena)
    /// * `children` - Child indices
    /// * `branch_length` - Optional length of a branch above the root
    /// * `label` - Label of the root
    pub fn new_root(
        index: VertexIndex,
        children: Vec<VertexIndex>,
        branch_length: Option<BranchLength>,
        label: String,
    ) -> Self {
        Vertex::Root {
            index,
            label,
            children,
            branch_length,
            multiplicity: DEFAULT_MULTIPLICITY,
        }
    }

    /// Creates a new internal (non-leaf, non-root) vertex.
    ///
    /// # Arguments
    /// * `index` - The unique index of this vertex in the tree (arena)
    /// * `children` - Child indices
    /// * `branch_length` - Distance to parent
    /// * `label` - Label of the vertex
    pub fn new_internal(
        index: VertexIndex,
        children: Vec<VertexIndex>,
        branch_length: Option<BranchLength>,
        label: String,
    ) -> Self {
        Vertex::Internal {
            index,
            label,
            parent: NO_PARENT_SET,
            children,
            branch_length,
            multiplicity: DEFAULT_MULTIPLICITY,
        }
    }

    /// Creates a new leaf vertex.
    ///
    /// # Arguments
    /// * `index` - The unique index of this vertex in the tree (arena)
    /// * `branch_length` - Distance to parent
    /// * `label` - Label of the leaf
    pub fn new_leaf(index: VertexIndex, branch_length: Option<BranchLength>, label: String) -> Self {
        Vertex::Leaf {
            index,
            label,
            parent: NO_PARENT_SET,
            branch_length,
            multiplicity: DEFAULT_MULTIPLICITY,
        }
    }

    /// Returns the index of this vertex.
    pub fn index(&self) -> VertexIndex {
        match self {
            Vertex::Root { index, .. }
            | Vertex::Internal { index, .. }
            | Vertex::Leaf { index, .. } => *index,
        }
    }

    /// Returns the label of this vertex.
    pub fn label(&self) -> &str {
        match self {
            Vertex::Root { label, .. }
            | Vertex::Internal { label, .. }
            | Vertex::Leaf { label, .. } => label,
        }
    }

    /// Replaces the label of this vertex.
    pub fn set_label(&mut self, new_label: String) {
        match self {
            Vertex::Root { label, .. }
            | Vertex::Internal { label, .. }
            | Vertex::Leaf { label, .. } => *label = new_label,
        }
    }

    /// Returns the multiplicity (observation count) of this vertex.
    pub fn multiplicity(&self) -> f64 {
        match self {
            Vertex::Root { multiplicity, .. }
            | Vertex::Internal { multiplicity, .. }
            | Vertex::Leaf { multiplicity, .. } => *multiplicity,
        }
    }

    /// Sets the multiplicity of this vertex.
    ///
    /// # Panics
    /// Panics if `value` is not positive and finite.
    pub fn set_multiplicity(&mut self, value: f64) {
        assert!(
            value > 0.0 && value.is_finite(),
            "Multiplicity must be positive and finite, got {}",
            value
        );
        match self {
            Vertex::Root { multiplicity, .. }
            | Vertex::Internal { multiplicity, .. }
            | Vertex::Leaf { multiplicity, .. } => *multiplicity = value,
        }
    }

    /// Returns whether this vertex has a [BranchLength] (always `true` for the root).
    pub fn has_branch_length(&self) -> bool {
        match self {
            Vertex::Root { .. } => true,
            Vertex::Internal { branch_length, .. } | Vertex::Leaf { branch_length, .. } => {
                branch_length.is_some()
            }
        }
    }

    /// Returns the branch length to the parent, if set.
    ///
    /// For the root this is the (meaningless) length of a branch above it,
    /// as it might be given in a Newick string.
    pub fn branch_length(&self) -> Option<BranchLength> {
        match self {
            Vertex::Root { branch_length, .. }
            | Vertex::Internal { branch_length, .. }
            | Vertex::Leaf { branch_length, .. } => *branch_length,
        }
    }

    /// Replaces the branch length to the parent.
    pub fn set_branch_length(&mut self, new_length: Option<BranchLength>) {
        match self {
            Vertex::Root { branch_length, .. }
            | Vertex::Internal { branch_length, .. }
            | Vertex::Leaf { branch_length, .. } => *branch_length = new_length,
        }
    }

    /// Returns the children of this vertex (empty for a leaf).
    pub fn children(&self) -> &[VertexIndex] {
        match self {
            Vertex::Root { children, .. } | Vertex::Internal { children, .. } => children.as_slice(),
            Vertex::Leaf { .. } => &[],
        }
    }

    /// Returns `true` if this vertex is a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Vertex::Leaf { .. })
    }

    /// Returns `true` if this vertex is an internal vertex.
    pub fn is_internal(&self) -> bool {
        matches!(self, Vertex::Internal { .. })
    }

    /// Returns `true` if this vertex is a root.
    pub fn is_root(&self) -> bool {
        matches!(self, Vertex::Root { .. })
    }

    /// Sets new parent for non-root vertex.
    ///
    /// # Panics
    /// Panics if called on root.
    pub fn set_parent(&mut self, parent: VertexIndex) {
        match self {
            Vertex::Root { .. } => panic!("Cannot set parent on root vertex"),
            Vertex::Internal { parent: p, .. } | Vertex::Leaf { parent: p, .. } => *p = parent,
        }
    }

    /// Returns the index of the parent if this a non-root vertex with parent set, else `None`.
    pub fn parent(&self) -> Option<VertexIndex> {
        match self {
            Vertex::Internal { parent, .. } | Vertex::Leaf { parent, .. } => {
                if *parent == NO_PARENT_SET {
                    None
                } else {
                    Some(*parent)
                }
            }
            Vertex::Root { .. } => None,
        }
    }

    /// Returns `true` if this vertex has a parent set.
    pub fn has_parent(&self) -> bool {
        self.parent().is_some()
    }
}

// =#========================================================================#=
// BRANCH LENGTH
// =#========================================================================#=
/// Branch length in a phylogenetic tree, enforced non-negative and finite.
///
/// Represents the evolutionary distance between a vertex and its parent.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct BranchLength(f64);

impl BranchLength {
    /// Creates a new branch length.
    ///
    /// # Panics
    /// Panics if `length` is negative or not finite.
    pub fn new(length: f64) -> Self {
        Self::try_new(length)
            .unwrap_or_else(|| panic!("Branch length must be non-negative and finite, got {}", length))
    }

    /// Creates a new branch length, or `None` if `length` is negative or not finite.
    pub fn try_new(length: f64) -> Option<Self> {
        if length >= 0.0 && length.is_finite() {
            Some(BranchLength(length))
        } else {
            None
        }
    }
}

impl Deref for BranchLength {
    type Target = f64;
    fn deref(&self) -> &f64 {
        &self.0
    }
}
