//! Trait for constructing phylogenetic trees during parsing.
//!
//! The [`TreeBuilder`] trait decouples parsers from concrete tree representations.
//! Parsers call builder methods as they read Newick syntax, and the
//! builder assembles whatever tree structure it wants.
//!
//! # Built-in implementation
//! * [`PhyloTreeBuilder`](crate::model::PhyloTreeBuilder) - Builds
//!   [`PhyloTree`](crate::model::PhyloTree)s, generating labels for unlabeled
//!   vertices and reading multiplicities from annotations
//!
//! # Builder lifecycle
//! A builder can construct multiple trees sequentially:
//!
//! ```text
//! Empty ──→ init_next() ──→ Building ──→ add_* ──→ finish_tree() ──→ Empty
//!   ↑                                                                  │
//!   └──────────────────────────────────────────────────────────────────┘
//! ```

use crate::model::annotation::AnnotationValue;
use crate::model::vertex::BranchLength;
use crate::parser::ParsingError;

// =#========================================================================#=
// TREE BUILDER (trait)
// =#========================================================================T=
/// Abstraction for constructing trees during parsing.
///
/// Parsers are generic over this trait, calling its methods as they encounter
/// leaves, internal vertices, and roots in the input. Vertices are reported
/// bottom-up: children are always added before their parent.
///
/// The parser drives the lifecycle:
/// 1. [`init_next`](Self::init_next) -> prepare for a new tree
/// 2. [`add_leaf`](Self::add_leaf), [`add_internal`](Self::add_internal),
///    [`add_root`](Self::add_root), [`add_annotation`](Self::add_annotation)
///    -> build structure
/// 3. [`finish_tree`](Self::finish_tree) -> finalize and return the tree
pub trait TreeBuilder {
    /// The type used to identify vertices during construction.
    ///
    /// Returned by the `add_*` methods, then passed to subsequent calls to
    /// connect parent-child relationships.
    type VertexIdx: Copy;

    /// The tree type produced by this builder.
    type Tree;

    /// Prepares the builder for constructing a new tree.
    ///
    /// # Arguments
    /// * `num_vertices`: Expected number of vertices (hint for allocation)
    fn init_next(&mut self, num_vertices: usize);

    /// Adds a leaf vertex to the tree under construction.
    ///
    /// # Arguments
    /// * `branch_len`: Branch length to parent, if specified in the Newick
    /// * `label`: Label, if specified in the Newick
    fn add_leaf(&mut self, branch_len: Option<BranchLength>, label: Option<String>) -> Self::VertexIdx;

    /// Adds an internal (non-root) vertex with the given children.
    ///
    /// # Arguments
    /// * `children`: Indices returned by previous `add_*` calls
    /// * `branch_len`: Branch length to parent, if specified
    /// * `label`: Label, if specified
    fn add_internal(
        &mut self,
        children: Vec<Self::VertexIdx>,
        branch_len: Option<BranchLength>,
        label: Option<String>,
    ) -> Self::VertexIdx;

    /// Adds the root vertex, completing the tree structure.
    ///
    /// # Arguments
    /// * `children`: Indices of the root's children
    /// * `branch_len`: Root branch length (rare, but allowed in Newick)
    /// * `label`: Label, if specified
    fn add_root(
        &mut self,
        children: Vec<Self::VertexIdx>,
        branch_len: Option<BranchLength>,
        label: Option<String>,
    ) -> Self::VertexIdx;

    /// Attaches an annotation `key=value` to a vertex.
    fn add_annotation(&mut self, key: String, vertex: Self::VertexIdx, value: AnnotationValue);

    /// Finalizes the building process and returns the resulting tree,
    /// leaving the builder empty.
    ///
    /// # Errors
    /// Returns a [ParsingError] if no complete tree is under construction or
    /// the collected data cannot be turned into a tree.
    fn finish_tree(&mut self) -> Result<Self::Tree, ParsingError>;
}
