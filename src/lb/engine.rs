//! Computation of local branching index (LBI) and ratio (LBR).
//!
//! Both are derived from two messages per vertex, computed in two passes:
//! * the up polarizer a vertex sends to its parent, collecting the
//!   exponentially decayed branch length of its subtree (post-order)
//! * the down polarizer a vertex receives from its parent, collecting
//!   everything outside of its subtree (pre-order)
//!
//! For a vertex `n` with children `c` and clock length `t` (distance to its
//! parent), with `f(t) = 1 - exp(-t/τ)`:
//! * `up(n) = exp(-t/τ) Σ up(c) + m(n) τ f(t)`
//! * `down(c_j) = (down(n) + Σ_{i≠j} up(c_i)) exp(-t_j/τ) + m(c_j) τ f(t_j)`
//! * `lbi(n) = down(n) + Σ up(c)`
//! * `lbr(n) = Σ up(c) / down(n)`, or 0 if `down(n)` is 0 (as for the root)

use crate::lb::augment::augment_tree;
use crate::lb::lb_error::LbError;
use crate::model::tree::VertexIndex;
use crate::model::{MalformedTreeError, PhyloTree};
use log::{debug, warn};
use std::collections::BTreeMap;

/// Default length of dummy branches, as multiple of τ
pub const DEFAULT_DUMMY_BRANCH_LENGTH_FACTOR: f64 = 10.0;

// =#========================================================================#=
// OPTIONS
// =#========================================================================$=
/// Options of a single run of [set_lb_values].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LbOptions {
    /// Weigh each vertex with its multiplicity instead of 1
    pub use_multiplicities: bool,
    /// Compute on a copy with a dummy root above the root
    pub add_dummy_root: bool,
    /// Compute on a copy with a dummy child below every leaf
    pub add_dummy_leaves: bool,
    /// Length of dummy branches; `DEFAULT_DUMMY_BRANCH_LENGTH_FACTOR * τ` if `None`
    pub dummy_branch_length: Option<f64>,
    /// Divide all LBI values by their maximum
    pub normalize: bool,
}

impl LbOptions {
    /// Checks that the flags are consistent and the dummy branch length,
    /// if given, is positive.
    pub fn validate(&self) -> Result<(), LbError> {
        if self.add_dummy_leaves && !self.add_dummy_root {
            return Err(LbError::invalid_configuration(
                "dummy leaves can only be added together with a dummy root",
            ));
        }
        if let Some(length) = self.dummy_branch_length {
            if !(length > 0.0 && length.is_finite()) {
                return Err(LbError::invalid_configuration(format!(
                    "dummy branch length must be positive, got {}",
                    length
                )));
            }
        }
        Ok(())
    }

    fn is_augmenting(&self) -> bool {
        self.add_dummy_root || self.add_dummy_leaves
    }
}

/// Checks that `tau` can serve as decay constant.
pub(crate) fn check_tau(tau: f64) -> Result<(), LbError> {
    if tau > 0.0 && tau.is_finite() {
        Ok(())
    } else {
        Err(LbError::invalid_configuration(format!(
            "tau must be positive and finite, got {}",
            tau
        )))
    }
}

// =#========================================================================#=
// LB VALUES
// =#========================================================================$=
/// Per-vertex results of [set_lb_values], indexed by [VertexIndex]
/// of the tree it was computed on.
#[derive(Debug, Clone, PartialEq)]
pub struct LbValues {
    tau: f64,
    clock_length: Vec<f64>,
    up_polarizer: Vec<f64>,
    down_polarizer: Vec<f64>,
    lbi: Vec<f64>,
    lbr: Vec<f64>,
}

impl LbValues {
    /// Returns the decay constant the values were computed with.
    pub fn tau(&self) -> f64 {
        self.tau
    }

    /// Returns the number of vertices.
    pub fn len(&self) -> usize {
        self.lbi.len()
    }

    /// Returns `true` if there are no values.
    pub fn is_empty(&self) -> bool {
        self.lbi.is_empty()
    }

    /// Returns the LBI of vertex `index`.
    pub fn lbi(&self, index: VertexIndex) -> f64 {
        self.lbi[index]
    }

    /// Returns the LBR of vertex `index`.
    pub fn lbr(&self, index: VertexIndex) -> f64 {
        self.lbr[index]
    }

    /// Returns the distance of vertex `index` to its parent
    /// as difference of root distances (0 for the root).
    pub fn clock_length(&self, index: VertexIndex) -> f64 {
        self.clock_length[index]
    }

    /// Returns the message vertex `index` sends to its parent.
    /// With dummy vertices, this is its value in the augmented tree.
    pub fn up_polarizer(&self, index: VertexIndex) -> f64 {
        self.up_polarizer[index]
    }

    /// Returns the message vertex `index` receives from its parent.
    /// With dummy vertices, this is its value in the augmented tree.
    pub fn down_polarizer(&self, index: VertexIndex) -> f64 {
        self.down_polarizer[index]
    }

    /// Returns all LBI values, indexed by vertex.
    pub fn lbi_values(&self) -> &[f64] {
        &self.lbi
    }

    /// Returns all LBR values, indexed by vertex.
    pub fn lbr_values(&self) -> &[f64] {
        &self.lbr
    }

    /// Returns the largest LBI (0 if there are no values).
    pub fn max_lbi(&self) -> f64 {
        self.lbi.iter().copied().fold(0.0, f64::max)
    }

    /// Returns the LBI of every vertex of `tree` by label.
    ///
    /// # Panics
    /// Panics if `tree` is not the tree the values were computed for.
    pub fn lbi_by_label(&self, tree: &PhyloTree) -> BTreeMap<String, f64> {
        by_label(tree, &self.lbi)
    }

    /// Returns the LBR of every vertex of `tree` by label.
    ///
    /// # Panics
    /// Panics if `tree` is not the tree the values were computed for.
    pub fn lbr_by_label(&self, tree: &PhyloTree) -> BTreeMap<String, f64> {
        by_label(tree, &self.lbr)
    }

    fn normalize_lbi(&mut self) {
        let max = self.max_lbi();
        if max > 0.0 {
            self.lbi.iter_mut().for_each(|lbi| *lbi /= max);
        } else {
            warn!("Maximum LBI is {}, skipping normalization", max);
        }
    }
}

fn by_label(tree: &PhyloTree, values: &[f64]) -> BTreeMap<String, f64> {
    assert_eq!(tree.num_vertices(), values.len(), "Values belong to another tree");
    tree.vertices()
        .map(|v| (v.label().to_string(), values[v.index()]))
        .collect()
}

// =#========================================================================#=
// COMPUTATION
// =#========================================================================$=
/// Computes LBI and LBR of every vertex of `tree` with decay constant `tau`.
///
/// With dummy augmentation the computation runs on an augmented copy (see
/// [augment_tree]) and the results of the original vertices are mapped back,
/// so the returned values are always indexed by the vertices of `tree`.
/// Normalization divides by the maximum LBI over these original vertices.
///
/// # Errors
/// * [LbError::InvalidConfiguration] if `tau` is not positive and finite,
///   or `options` are inconsistent
/// * [LbError::MalformedTree] if `tree` is not valid, a non-root vertex
///   lacks a branch length, or a clock length is negative
///
/// # Example
/// ```
/// use lbtree::lb::{LbOptions, set_lb_values};
/// use lbtree::newick::parse_str;
///
/// let tree = parse_str("(A:1,B:1,C:1)R;")?;
/// let values = set_lb_values(&tree, 1.0, &LbOptions::default())?;
///
/// let up = 1.0 - (-1.0f64).exp();
/// let root = tree.root_index();
/// assert!((values.lbi(root) - 3.0 * up).abs() < 1e-12);
/// assert_eq!(values.lbr(root), 0.0);
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn set_lb_values(tree: &PhyloTree, tau: f64, options: &LbOptions) -> Result<LbValues, LbError> {
    check_tau(tau)?;
    options.validate()?;
    tree.validate()?;
    if let Some(vertex) = tree.vertices().find(|v| !v.is_root() && !v.has_branch_length()) {
        return Err(MalformedTreeError::MissingBranchLength(vertex.label().to_string()).into());
    }

    debug!(
        "Computing LB values for {} vertices (tau {}, {:?})",
        tree.num_vertices(),
        tau,
        options
    );

    let mut values = if options.is_augmenting() {
        let dummy_branch_length = options
            .dummy_branch_length
            .unwrap_or(DEFAULT_DUMMY_BRANCH_LENGTH_FACTOR * tau);
        let augmented = augment_tree(
            tree,
            dummy_branch_length,
            options.add_dummy_root,
            options.add_dummy_leaves,
        )?;
        TraversalContext::compute(augmented.tree(), tau, options.use_multiplicities)?
            .into_values_for(augmented.index_map())
    } else {
        TraversalContext::compute(tree, tau, options.use_multiplicities)?.into_values()
    };

    if options.normalize {
        values.normalize_lbi();
    }
    Ok(values)
}

/// Scratch state of one computation, one entry per vertex.
struct TraversalContext {
    tau: f64,
    /// Post-order of all vertices; reversed it is a pre-order
    post_order: Vec<VertexIndex>,
    weight: Vec<f64>,
    clock_length: Vec<f64>,
    up_polarizer: Vec<f64>,
    /// Sum of the up polarizers of the children
    children_up: Vec<f64>,
    down_polarizer: Vec<f64>,
    lbi: Vec<f64>,
    lbr: Vec<f64>,
}

impl TraversalContext {
    /// Runs all passes on a valid tree with branch lengths.
    fn compute(tree: &PhyloTree, tau: f64, use_multiplicities: bool) -> Result<Self, LbError> {
        let n = tree.num_vertices();
        let weight = tree
            .vertices()
            .map(|v| if use_multiplicities { v.multiplicity() } else { 1.0 })
            .collect();

        let mut context = TraversalContext {
            tau,
            post_order: tree.post_order_indices(),
            weight,
            clock_length: vec![0.0; n],
            up_polarizer: vec![0.0; n],
            children_up: vec![0.0; n],
            down_polarizer: vec![0.0; n],
            lbi: vec![0.0; n],
            lbr: vec![0.0; n],
        };

        context.set_clock_lengths(tree)?;
        context.pass_up(tree);
        context.pass_down(tree);
        context.aggregate();
        Ok(context)
    }

    fn set_clock_lengths(&mut self, tree: &PhyloTree) -> Result<(), LbError> {
        let distances = tree.distances_from_root();
        for &index in &self.post_order {
            let Some(parent) = tree[index].parent() else {
                continue;
            };
            let clock_length = distances[index] - distances[parent];
            if clock_length < 0.0 {
                return Err(MalformedTreeError::NegativeClockLength {
                    label: tree[index].label().to_string(),
                    clock_length,
                }
                .into());
            }
            self.clock_length[index] = clock_length;
        }
        Ok(())
    }

    /// Returns `exp(-t/τ)` and `τ (1 - exp(-t/τ))` for the branch above `index`.
    fn decay(&self, index: VertexIndex) -> (f64, f64) {
        let scaled = self.clock_length[index] / self.tau;
        ((-scaled).exp(), -self.tau * (-scaled).exp_m1())
    }

    fn pass_up(&mut self, tree: &PhyloTree) {
        for i in 0..self.post_order.len() {
            let index = self.post_order[i];
            let children_up: f64 = tree[index]
                .children()
                .iter()
                .map(|&c| self.up_polarizer[c])
                .sum();
            let (decay, growth) = self.decay(index);
            self.children_up[index] = children_up;
            self.up_polarizer[index] = decay * children_up + self.weight[index] * growth;
        }
        debug!("Finished upward pass over {} vertices", self.post_order.len());
    }

    fn pass_down(&mut self, tree: &PhyloTree) {
        let mut suffix_up = Vec::new();
        for i in (0..self.post_order.len()).rev() {
            let index = self.post_order[i];
            let children = tree[index].children();

            // suffix_up[j] sums the up polarizers of children[j..]
            suffix_up.clear();
            suffix_up.resize(children.len() + 1, 0.0);
            for (j, &child) in children.iter().enumerate().rev() {
                suffix_up[j] = suffix_up[j + 1] + self.up_polarizer[child];
            }

            let mut prefix_up = 0.0;
            for (j, &child) in children.iter().enumerate() {
                let (decay, growth) = self.decay(child);
                let outside = self.down_polarizer[index] + prefix_up + suffix_up[j + 1];
                self.down_polarizer[child] = outside * decay + self.weight[child] * growth;
                prefix_up += self.up_polarizer[child];
            }
        }
        debug!("Finished downward pass over {} vertices", self.post_order.len());
    }

    fn aggregate(&mut self) {
        for index in 0..self.lbi.len() {
            let down = self.down_polarizer[index];
            let children_up = self.children_up[index];
            self.lbi[index] = down + children_up;
            self.lbr[index] = if down > 0.0 { children_up / down } else { 0.0 };
        }
    }

    fn into_values(self) -> LbValues {
        LbValues {
            tau: self.tau,
            clock_length: self.clock_length,
            up_polarizer: self.up_polarizer,
            down_polarizer: self.down_polarizer,
            lbi: self.lbi,
            lbr: self.lbr,
        }
    }

    /// Returns the values of the vertices given by `index_map`, re-indexed
    /// by their position in it.
    fn into_values_for(self, index_map: &[VertexIndex]) -> LbValues {
        let pick = |values: &[f64]| -> Vec<f64> { index_map.iter().map(|&i| values[i]).collect() };
        LbValues {
            tau: self.tau,
            clock_length: pick(&self.clock_length),
            up_polarizer: pick(&self.up_polarizer),
            down_polarizer: pick(&self.down_polarizer),
            lbi: pick(&self.lbi),
            lbr: pick(&self.lbr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::newick::parse_str;

    #[test]
    fn test_decay_of_zero_branch() {
        let tree = parse_str("(A:0,B:1)R;").unwrap();
        let context = TraversalContext::compute(&tree, 1.0, false).unwrap();
        let a = tree.index_of_label("A").unwrap();
        assert_eq!(context.decay(a), (1.0, 0.0));
        assert_eq!(context.up_polarizer[a], 0.0);
    }

    #[test]
    fn test_reversed_post_order_visits_parents_first() {
        let tree = parse_str("((A:1,B:1)AB:1,(C:1,D:1)CD:1)R;").unwrap();
        let context = TraversalContext::compute(&tree, 1.0, false).unwrap();
        let mut seen = vec![false; tree.num_vertices()];
        for &index in context.post_order.iter().rev() {
            if let Some(parent) = tree[index].parent() {
                assert!(seen[parent]);
            }
            seen[index] = true;
        }
    }

    #[test]
    fn test_options_validate() {
        let leaves_only = LbOptions {
            add_dummy_leaves: true,
            ..LbOptions::default()
        };
        assert!(matches!(
            leaves_only.validate(),
            Err(LbError::InvalidConfiguration(_))
        ));
        assert!(check_tau(0.0).is_err());
        assert!(check_tau(f64::NAN).is_err());
        assert!(check_tau(1e-6).is_ok());
    }
}
