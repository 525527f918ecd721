//! Dummy augmentation of trees before computing LB values.
//!
//! Vertices close to the boundary of a tree (the root, and leaves) see
//! only part of the neighborhood an interior vertex sees, which biases
//! their LBI towards zero. Attaching dummy vertices with long branches
//! gives them a constant contribution from "outside" instead.

use crate::lb::lb_error::LbError;
use crate::model::tree::VertexIndex;
use crate::model::vertex::BranchLength;
use crate::model::PhyloTree;
use log::debug;
use std::collections::HashSet;

/// Label of the dummy root (made unique if the tree already uses it)
pub const DUMMY_ROOT_LABEL: &str = "dummy-root";

/// Prefix of dummy leaf labels, followed by the label of their parent
pub const DUMMY_LEAF_PREFIX: &str = "dummy-leaf-";

/// A copy of a tree with dummy vertices attached,
/// together with the position of every original vertex in the copy.
#[derive(Debug, Clone)]
pub struct AugmentedTree {
    tree: PhyloTree,
    index_map: Vec<VertexIndex>,
}

impl AugmentedTree {
    /// Returns the augmented tree.
    pub fn tree(&self) -> &PhyloTree {
        &self.tree
    }

    /// Returns for each original vertex index its index in the augmented tree.
    pub fn index_map(&self) -> &[VertexIndex] {
        &self.index_map
    }

    /// Returns the index in the augmented tree of the original vertex `original`.
    ///
    /// # Panics
    /// Panics if `original` is not an index of the original tree.
    pub fn augmented_index(&self, original: VertexIndex) -> VertexIndex {
        self.index_map[original]
    }
}

/// Returns a copy of `tree` with dummy vertices attached.
///
/// * With `add_dummy_root`, the copy of the root becomes an internal vertex
///   hanging below a new root labelled [DUMMY_ROOT_LABEL].
/// * With `add_dummy_leaves`, every leaf becomes an internal vertex with one
///   new leaf child labelled [DUMMY_LEAF_PREFIX] followed by its label.
///
/// All dummy branches have length `dummy_branch_length`, and every dummy
/// inherits the multiplicity of the vertex it is attached to. Dummy labels
/// get a numeric suffix if they collide with a label of the tree.
/// The original tree is not modified.
///
/// # Errors
/// * [LbError::InvalidConfiguration] if dummy leaves are requested without
///   a dummy root or `dummy_branch_length` is not positive and finite
/// * [LbError::MalformedTree] if `tree` is not valid
///
/// # Example
/// ```
/// use lbtree::lb::augment_tree;
/// use lbtree::newick::parse_str;
///
/// let tree = parse_str("((A:1,B:1)AB:1,C:2)R;")?;
/// let augmented = augment_tree(&tree, 5.0, true, true)?;
///
/// // One dummy root and three dummy leaves
/// assert_eq!(augmented.tree().num_vertices(), tree.num_vertices() + 4);
/// let r = augmented.augmented_index(tree.root_index());
/// assert_eq!(augmented.tree()[r].label(), "R");
/// assert!(augmented.tree()[r].is_internal());
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn augment_tree(
    tree: &PhyloTree,
    dummy_branch_length: f64,
    add_dummy_root: bool,
    add_dummy_leaves: bool,
) -> Result<AugmentedTree, LbError> {
    if add_dummy_leaves && !add_dummy_root {
        return Err(LbError::invalid_configuration(
            "dummy leaves can only be added together with a dummy root",
        ));
    }
    let dummy_branch = BranchLength::try_new(dummy_branch_length)
        .filter(|bl| **bl > 0.0)
        .ok_or_else(|| {
            LbError::invalid_configuration(format!(
                "dummy branch length must be positive, got {}",
                dummy_branch_length
            ))
        })?;
    tree.validate()?;

    let num_dummies = usize::from(add_dummy_root)
        + if add_dummy_leaves { tree.num_leaves() } else { 0 };
    let mut augmented = PhyloTree::new(tree.num_vertices() + num_dummies);
    let mut taken: HashSet<String> = tree.vertices().map(|v| v.label().to_string()).collect();
    let mut index_map = vec![0; tree.num_vertices()];

    // Post-order, so children always exist before their parent is added
    for vertex in tree.post_order_iter() {
        let label = vertex.label().to_string();
        let branch_length = vertex.branch_length();
        let children: Vec<VertexIndex> = vertex.children().iter().map(|&c| index_map[c]).collect();

        let new_index = if vertex.is_leaf() {
            if add_dummy_leaves {
                let dummy_label = unique_label(format!("{DUMMY_LEAF_PREFIX}{label}"), &mut taken);
                let dummy = augmented.add_leaf(Some(dummy_branch), dummy_label);
                augmented[dummy].set_multiplicity(vertex.multiplicity());
                augmented.add_internal_vertex(vec![dummy], branch_length, label)
            } else {
                augmented.add_leaf(branch_length, label)
            }
        } else if vertex.is_internal() {
            augmented.add_internal_vertex(children, branch_length, label)
        } else if add_dummy_root {
            let below_root = augmented.add_internal_vertex(children, Some(dummy_branch), label);
            let dummy_label = unique_label(DUMMY_ROOT_LABEL.to_string(), &mut taken);
            let dummy_root = augmented.add_root(vec![below_root], None, dummy_label);
            augmented[dummy_root].set_multiplicity(vertex.multiplicity());
            below_root
        } else {
            augmented.add_root(children, branch_length, label)
        };

        augmented[new_index].set_multiplicity(vertex.multiplicity());
        index_map[vertex.index()] = new_index;
    }

    debug!(
        "Augmented tree of {} vertices with {} dummies (branch length {})",
        tree.num_vertices(),
        num_dummies,
        dummy_branch_length
    );

    Ok(AugmentedTree {
        tree: augmented,
        index_map,
    })
}

/// Returns `base`, or `base` with the smallest numeric suffix making it
/// unique among `taken`, and marks the result as taken.
fn unique_label(base: String, taken: &mut HashSet<String>) -> String {
    let label = if taken.contains(&base) {
        (1..)
            .map(|i| format!("{base}-{i}"))
            .find(|candidate| !taken.contains(candidate))
            .unwrap_or(base)
    } else {
        base
    };
    taken.insert(label.clone());
    label
}
