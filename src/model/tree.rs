//! Provides the arena tree representation.
//!
//! Provides core data structures for representing phylogenetic trees:
//! * [PhyloTree] - Main tree structure using the arena pattern
//! * [VertexIndex] as type used to index vertices in tree
//! * [PostOrderIter] and [PreOrderIter] for stack-based traversals

use crate::model::annotation::Annotations;
use crate::model::tree_error::MalformedTreeError;
use crate::model::vertex::{BranchLength, Vertex};
use crate::newick;
use crate::newick::NewickStyle;
use std::collections::{HashMap, HashSet};

/// Index of a vertex in a tree (arena).
pub type VertexIndex = usize;

/// *During construction only*, index for unset root.
const NO_ROOT_SET_INDEX: VertexIndex = usize::MAX;

// =$========================================================================$=
// TREE
// =$========================================================================$=
/// A rooted phylogenetic tree of arbitrary arity represented using
/// the arena pattern on [Vertex].
///
/// Vertices are stored in a contiguous vector and referenced by
/// [VertexIndex]; parents and children are stored as indices,
/// so the tree owns all its vertices and no references between
/// vertices exist.
///
/// # Structure
/// - All vertices (root, internal, and leaves) are stored in the arena.
/// - Index of root is maintained.
/// - No assumption on order of indices is maintained.
/// - Every vertex carries a label; labels are unique in a valid tree.
/// - Branch lengths are optional, but if provided must be non-negative.
///
/// # Construction
/// Add vertices bottom-up: leaves first, then internal vertices referring
/// to already added children, and finally the root.
/// Test validity with [`PhyloTree::validate()`].
///
/// # Example
/// ```
/// use lbtree::model::PhyloTree;
/// use lbtree::model::vertex::BranchLength;
///
/// let mut tree = PhyloTree::new(4);
/// let a = tree.add_leaf(Some(BranchLength::new(1.0)), "A".to_string());
/// let b = tree.add_leaf(Some(BranchLength::new(2.0)), "B".to_string());
/// let c = tree.add_leaf(Some(BranchLength::new(0.5)), "C".to_string());
/// tree.add_root(vec![a, b, c], None, "root".to_string());
///
/// assert!(tree.validate().is_ok());
/// assert_eq!(tree.num_leaves(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct PhyloTree {
    /// Vertices of this tree (arena pattern)
    vertices: Vec<Vertex>,

    /// Index of the root of this tree
    root_index: VertexIndex,

    /// Parsed vertex annotations; optional
    annotations: Option<Annotations>,
}

// ============================================================================
// New, Getters / Accessors, etc. (pub)
// ============================================================================
impl PhyloTree {
    /// Creates a new empty tree with capacity for `num_vertices` vertices.
    pub fn new(num_vertices: usize) -> Self {
        PhyloTree {
            vertices: Vec::with_capacity(num_vertices),
            root_index: NO_ROOT_SET_INDEX,
            annotations: None,
        }
    }

    /// Adds the root to the tree and sets it as parent of its children.
    ///
    /// # Arguments
    /// * `children` - Indices of the (already added) children
    /// * `branch_length` - Optional length of a branch above the root
    /// * `label` - Label of the root
    ///
    /// # Returns
    /// The index of the newly created root vertex.
    pub fn add_root(
        &mut self,
        children: Vec<VertexIndex>,
        branch_length: Option<BranchLength>,
        label: String,
    ) -> VertexIndex {
        let index = self.vertices.len();
        for &child in &children {
            self[child].set_parent(index);
        }
        self.vertices
            .push(Vertex::new_root(index, children, branch_length, label));

        self.root_index = index;
        index
    }

    /// Adds an internal vertex to the tree and sets it as parent of its children.
    ///
    /// # Arguments
    /// * `children` - Indices of the (already added) children
    /// * `branch_length` - Length of incoming branch, i.e. distance to parent
    /// * `label` - Label of the vertex
    ///
    /// # Returns
    /// The index of the newly created internal vertex.
    pub fn add_internal_vertex(
        &mut self,
        children: Vec<VertexIndex>,
        branch_length: Option<BranchLength>,
        label: String,
    ) -> VertexIndex {
        let index = self.vertices.len();
        for &child in &children {
            self[child].set_parent(index);
        }
        self.vertices
            .push(Vertex::new_internal(index, children, branch_length, label));

        index
    }

    /// Adds a leaf to the tree.
    ///
    /// # Arguments
    /// * `branch_length` - Length of incoming branch, i.e. distance to parent
    /// * `label` - Label of the leaf
    ///
    /// # Returns
    /// The index of the newly created leaf vertex.
    pub fn add_leaf(&mut self, branch_length: Option<BranchLength>, label: String) -> VertexIndex {
        let index = self.vertices.len();
        self.vertices
            .push(Vertex::new_leaf(index, branch_length, label));
        index
    }

    /// Returns the parsed vertex annotations, if any.
    pub fn annotations(&self) -> Option<&Annotations> {
        self.annotations.as_ref()
    }

    /// Attaches vertex annotations to this tree.
    pub fn set_annotations(&mut self, annotations: Annotations) {
        self.annotations = Some(annotations);
    }

    /// Returns whether root of tree has been set.
    pub fn is_root_set(&self) -> bool {
        self.root_index != NO_ROOT_SET_INDEX
    }

    /// Returns a reference to the root vertex.
    ///
    /// # Panics
    /// Panics if the root hasn't been set and thus tree hasn't been fully constructed yet.
    pub fn root(&self) -> &Vertex {
        &self[self.root_index]
    }

    /// Returns the index of the root.
    pub fn root_index(&self) -> VertexIndex {
        self.root_index
    }

    /// Returns a reference to the vertex at the given index.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn vertex(&self, index: VertexIndex) -> &Vertex {
        &self[index]
    }

    /// Returns a mutable reference to the vertex at the given index.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn vertex_mut(&mut self, index: VertexIndex) -> &mut Vertex {
        &mut self.vertices[index]
    }

    /// Returns an iterator over all vertices in arena order.
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.iter()
    }

    /// Returns the number of leaves in this tree.
    pub fn num_leaves(&self) -> usize {
        self.vertices.iter().filter(|&v| v.is_leaf()).count()
    }

    /// Returns the number of internal vertices in this tree (root excluded).
    pub fn num_internal(&self) -> usize {
        self.vertices.iter().filter(|&v| v.is_internal()).count()
    }

    /// Returns the number of vertices in this tree.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the indices of all leaves in arena order.
    pub fn leaf_indices(&self) -> Vec<VertexIndex> {
        self.vertices
            .iter()
            .filter(|v| v.is_leaf())
            .map(|v| v.index())
            .collect()
    }

    /// Returns the labels of all vertices in arena order.
    pub fn labels(&self) -> Vec<&str> {
        self.vertices.iter().map(|v| v.label()).collect()
    }

    /// Returns the index of the vertex with the given label, if any.
    pub fn index_of_label(&self, label: &str) -> Option<VertexIndex> {
        self.vertices
            .iter()
            .find(|v| v.label() == label)
            .map(|v| v.index())
    }

    /// Returns a map from label to vertex index.
    ///
    /// If labels are not unique, the last vertex with a label wins;
    /// use [validate()](Self::validate) to rule that out.
    pub fn label_index_map(&self) -> HashMap<&str, VertexIndex> {
        self.vertices
            .iter()
            .map(|v| (v.label(), v.index()))
            .collect()
    }

    /// Returns for each vertex (by index) its distance from the root,
    /// that is, the sum of branch lengths on the path from the root.
    ///
    /// The root has distance 0 regardless of its own branch length, and
    /// missing branch lengths count as 0.
    pub fn distances_from_root(&self) -> Vec<f64> {
        let mut distances = vec![0.0; self.num_vertices()];
        for vertex in self.pre_order_iter() {
            if let Some(parent) = vertex.parent() {
                let branch_length = vertex.branch_length().map_or(0.0, |bl| *bl);
                distances[vertex.index()] = distances[parent] + branch_length;
            }
        }
        distances
    }

    /// Returns the distance from the root of every leaf, in pre-order.
    pub fn leaf_depths(&self) -> Vec<(VertexIndex, f64)> {
        let distances = self.distances_from_root();
        self.pre_order_iter()
            .filter(|v| v.is_leaf())
            .map(|v| (v.index(), distances[v.index()]))
            .collect()
    }

    /// Returns the mean distance from the root over all leaves
    /// (0 for a tree without leaves).
    pub fn mean_leaf_depth(&self) -> f64 {
        let depths = self.leaf_depths();
        if depths.is_empty() {
            return 0.0;
        }
        depths.iter().map(|(_, d)| d).sum::<f64>() / depths.len() as f64
    }

    /// Returns the sum of all branch lengths in the tree (root branch excluded).
    pub fn total_branch_length(&self) -> f64 {
        self.vertices
            .iter()
            .filter(|v| !v.is_root())
            .filter_map(|v| v.branch_length())
            .map(|bl| *bl)
            .sum::<f64>()
    }

    /// Checks if all non-root vertices have branch lengths set.
    pub fn vertices_have_branch_lengths(&self) -> bool {
        self.vertices
            .iter()
            .all(|v| v.is_root() || v.has_branch_length())
    }

    /// Multiplies every branch length by `factor`.
    ///
    /// # Panics
    /// Panics if `factor` is negative or not finite.
    pub fn scale_branch_lengths(&mut self, factor: f64) {
        for vertex in &mut self.vertices {
            if let Some(bl) = vertex.branch_length() {
                vertex.set_branch_length(Some(BranchLength::new(*bl * factor)));
            }
        }
    }

    /// Returns the Newick representation of this tree.
    pub fn to_newick(&self, style: NewickStyle) -> String {
        newick::to_newick(self, style)
    }
}

// ============================================================================
// Validation (pub)
// ============================================================================
impl PhyloTree {
    /// Validates the tree structure, all index references, and labels.
    ///
    /// Checks:
    /// - Root index is set and points to the only Root vertex
    /// - All vertex indices match their position in the arena
    /// - All child and parent indices are valid and agree with each other
    /// - Every vertex is reached exactly once from the root (no cycles,
    ///   nothing unreachable)
    /// - Labels are non-empty and unique
    ///
    /// # Errors
    /// Returns the first [MalformedTreeError] found.
    pub fn validate(&self) -> Result<(), MalformedTreeError> {
        let num_vertices = self.vertices.len();
        if self.root_index >= num_vertices || !self.vertices[self.root_index].is_root() {
            return Err(MalformedTreeError::NoRoot);
        }

        for (position, vertex) in self.vertices.iter().enumerate() {
            if vertex.index() != position {
                return Err(MalformedTreeError::IndexMismatch {
                    position,
                    index: vertex.index(),
                });
            }

            if vertex.is_root() && position != self.root_index {
                return Err(MalformedTreeError::MultipleRoots {
                    first: self.root_index,
                    second: position,
                });
            }

            if vertex.label().is_empty() {
                return Err(MalformedTreeError::EmptyLabel { vertex: position });
            }

            // Children must exist and point back to this vertex
            for &child in vertex.children() {
                if child >= num_vertices {
                    return Err(MalformedTreeError::DanglingReference {
                        vertex: position,
                        reference: child,
                    });
                }
                if self.vertices[child].parent() != Some(position) {
                    return Err(MalformedTreeError::InconsistentLinks { vertex: child });
                }
            }

            // Parent must exist and list this vertex as child
            if !vertex.is_root() {
                match vertex.parent() {
                    None => return Err(MalformedTreeError::InconsistentLinks { vertex: position }),
                    Some(parent) if parent >= num_vertices => {
                        return Err(MalformedTreeError::DanglingReference {
                            vertex: position,
                            reference: parent,
                        });
                    }
                    Some(parent) => {
                        if !self.vertices[parent].children().contains(&position) {
                            return Err(MalformedTreeError::InconsistentLinks {
                                vertex: position,
                            });
                        }
                    }
                }
            }
        }

        // Every vertex reached exactly once from the root
        let mut visited = vec![false; num_vertices];
        let mut stack = vec![self.root_index];
        while let Some(index) = stack.pop() {
            if visited[index] {
                return Err(MalformedTreeError::Cycle { vertex: index });
            }
            visited[index] = true;
            stack.extend_from_slice(self.vertices[index].children());
        }
        if let Some(vertex) = visited.iter().position(|&v| !v) {
            return Err(MalformedTreeError::Unreachable { vertex });
        }

        let mut seen = HashSet::with_capacity(num_vertices);
        for vertex in &self.vertices {
            if !seen.insert(vertex.label()) {
                return Err(MalformedTreeError::DuplicateLabel(vertex.label().to_string()));
            }
        }

        Ok(())
    }
}

impl std::ops::Index<VertexIndex> for PhyloTree {
    type Output = Vertex;

    fn index(&self, index: VertexIndex) -> &Self::Output {
        &self.vertices[index]
    }
}

impl std::ops::IndexMut<VertexIndex> for PhyloTree {
    fn index_mut(&mut self, index: VertexIndex) -> &mut Self::Output {
        &mut self.vertices[index]
    }
}

// =$========================================================================$=
// ITERATORS
// =$========================================================================$=
impl PhyloTree {
    /// Returns an iterator over the tree in post-order (children before parents).
    ///
    /// Children are visited in the order in which they are stored.
    /// The tree must be valid (see [validate()](Self::validate)),
    /// otherwise the traversal may not terminate.
    ///
    /// # Example
    /// ```
    /// use lbtree::parse_newick_str;
    ///
    /// let tree = parse_newick_str("((A:1,B:1)AB:1,C:2)R;").unwrap();
    /// let labels: Vec<_> = tree.post_order_iter().map(|v| v.label()).collect();
    /// assert_eq!(labels, vec!["A", "B", "AB", "C", "R"]);
    /// ```
    pub fn post_order_iter(&self) -> PostOrderIter<'_> {
        PostOrderIter::new(self)
    }

    /// Returns an iterator over the tree in pre-order (parents before children).
    ///
    /// # Example
    /// ```
    /// use lbtree::parse_newick_str;
    ///
    /// let tree = parse_newick_str("((A:1,B:1)AB:1,C:2)R;").unwrap();
    /// let labels: Vec<_> = tree.pre_order_iter().map(|v| v.label()).collect();
    /// assert_eq!(labels, vec!["R", "AB", "A", "B", "C"]);
    /// ```
    pub fn pre_order_iter(&self) -> PreOrderIter<'_> {
        PreOrderIter::new(self)
    }

    /// Returns the vertex indices in post-order.
    ///
    /// Reversed, this is a valid pre-order (parents before children).
    pub fn post_order_indices(&self) -> Vec<VertexIndex> {
        self.post_order_iter().map(|v| v.index()).collect()
    }
}

/// Iterator for post-order traversal (children before parents).
///
/// This iterator uses a stack-based approach to traverse the tree without recursion.
/// Each vertex is visited after all its descendants have been visited.
pub struct PostOrderIter<'a> {
    tree: &'a PhyloTree,
    stack: Vec<(VertexIndex, bool)>, // (index, children_visited)
}

impl<'a> PostOrderIter<'a> {
    fn new(tree: &'a PhyloTree) -> Self {
        let mut stack = Vec::new();
        if tree.is_root_set() {
            stack.push((tree.root_index, false));
        }
        PostOrderIter { tree, stack }
    }
}

impl<'a> Iterator for PostOrderIter<'a> {
    type Item = &'a Vertex;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((index, children_visited)) = self.stack.pop() {
            let vertex = &self.tree[index];

            if children_visited || vertex.children().is_empty() {
                return Some(vertex);
            }

            self.stack.push((index, true));
            // Push children in reverse, so first child is processed first
            for &child in vertex.children().iter().rev() {
                self.stack.push((child, false));
            }
        }
        None
    }
}

/// Iterator for pre-order traversal (parents before children).
///
/// This iterator uses a stack-based approach to traverse the tree without recursion.
/// Each vertex is visited before any of its descendants.
pub struct PreOrderIter<'a> {
    tree: &'a PhyloTree,
    stack: Vec<VertexIndex>,
}

impl<'a> PreOrderIter<'a> {
    fn new(tree: &'a PhyloTree) -> Self {
        let mut stack = Vec::new();
        if tree.is_root_set() {
            stack.push(tree.root_index);
        }
        PreOrderIter { tree, stack }
    }
}

impl<'a> Iterator for PreOrderIter<'a> {
    type Item = &'a Vertex;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.stack.pop()?;
        let vertex = &self.tree[index];

        for &child in vertex.children().iter().rev() {
            self.stack.push(child);
        }

        Some(vertex)
    }
}
