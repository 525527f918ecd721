//! Data model for rooted phylogenetic trees.
//!
//! # Tree representation
//! Trees are represented by [PhyloTree], which uses the arena pattern to store
//! [Vertex] nodes. Each vertex is either a `Root`, `Internal`, or `Leaf`,
//! referenced by [VertexIndex]. Vertices may have any number of children,
//! and every vertex (not only leaves) carries a label and a multiplicity.
//!
//! # Building trees
//! Trees are typically constructed during parsing via the [TreeBuilder]
//! trait, which decouples parsers from concrete tree types; [PhyloTreeBuilder]
//! builds [PhyloTree]s. Trees can also be assembled by hand with
//! [PhyloTree::add_leaf], [PhyloTree::add_internal_vertex], and
//! [PhyloTree::add_root].
//!
//! # Validity
//! [PhyloTree::validate] checks that a tree is a single connected rooted
//! acyclic structure with unique labels and reports a [MalformedTreeError]
//! otherwise.

pub mod annotation;
pub mod phylo_tree_builder;
pub mod tree;
pub mod tree_builder;
pub mod tree_error;
pub mod vertex;

pub use annotation::{AnnotationValue, Annotations};
pub use phylo_tree_builder::PhyloTreeBuilder;
pub use tree::{PhyloTree, VertexIndex};
pub use tree_builder::TreeBuilder;
pub use tree_error::MalformedTreeError;
pub use vertex::{BranchLength, Vertex};
