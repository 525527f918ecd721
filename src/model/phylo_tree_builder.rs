//! [TreeBuilder] implementation producing [PhyloTree]s.

use crate::model::annotation::{AnnotationValue, Annotations, MULTIPLICITY_KEY};
use crate::model::tree_builder::TreeBuilder;
use crate::model::vertex::BranchLength;
use crate::model::{PhyloTree, VertexIndex};
use crate::parser::{ParsingError, ParsingErrorType};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

/// Default length of generated labels
pub const DEFAULT_GENERATED_LABEL_LENGTH: usize = 8;

/// Builds [PhyloTree]s for the Newick parser.
///
/// Vertices without a label in the input (typically inferred ancestors)
/// receive a random upper-case code, distinct from all other labels of
/// the tree, when the tree is finished. Values of the `multiplicity`
/// annotation become the multiplicities of their vertices.
///
/// # Example
/// ```
/// use lbtree::model::{PhyloTreeBuilder, TreeBuilder};
///
/// let mut builder = PhyloTreeBuilder::new().with_seed(7);
/// builder.init_next(3);
/// let a = builder.add_leaf(None, Some("A".to_string()));
/// let b = builder.add_leaf(None, Some("B".to_string()));
/// builder.add_root(vec![a, b], None, None);
///
/// let tree = builder.finish_tree().unwrap();
/// assert_eq!(tree.root().label().len(), 8);
/// ```
pub struct PhyloTreeBuilder {
    current_tree: Option<PhyloTree>,
    unlabeled: Vec<VertexIndex>,
    annotations: Annotations,
    rng: StdRng,
    label_length: usize,
}

impl PhyloTreeBuilder {
    /// Creates a new builder generating labels from an entropy-seeded RNG.
    pub fn new() -> Self {
        Self {
            current_tree: None,
            unlabeled: Vec::new(),
            annotations: Annotations::default(),
            rng: StdRng::from_entropy(),
            label_length: DEFAULT_GENERATED_LABEL_LENGTH,
        }
    }

    /// Seeds the label generator, making generated labels reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Sets the length of generated labels (at least 1).
    pub fn with_label_length(mut self, label_length: usize) -> Self {
        self.label_length = label_length.max(1);
        self
    }

    fn tree_mut(&mut self) -> &mut PhyloTree {
        self.current_tree.get_or_insert_with(|| PhyloTree::new(0))
    }

    fn resolve_label(&mut self, index: VertexIndex, label: Option<String>) -> String {
        match label {
            Some(label) if !label.is_empty() => label,
            _ => {
                self.unlabeled.push(index);
                String::new()
            }
        }
    }

    fn next_index(&mut self) -> VertexIndex {
        self.tree_mut().num_vertices()
    }

    /// Replaces the empty labels of all unlabeled vertices with fresh codes.
    fn generate_labels(&mut self, tree: &mut PhyloTree) {
        let mut taken: HashSet<String> = tree
            .vertices()
            .map(|v| v.label().to_string())
            .filter(|l| !l.is_empty())
            .collect();

        for index in self.unlabeled.drain(..) {
            let label = loop {
                let candidate: String = (0..self.label_length)
                    .map(|_| self.rng.gen_range(b'A'..=b'Z') as char)
                    .collect();
                if !taken.contains(&candidate) {
                    break candidate;
                }
            };
            taken.insert(label.clone());
            tree[index].set_label(label);
        }
    }

    /// Transfers `multiplicity` annotations to the vertices.
    fn apply_multiplicities(
        tree: &mut PhyloTree,
        annotations: &Annotations,
    ) -> Result<(), ParsingError> {
        let Some(column) = annotations.get_all_for_key(MULTIPLICITY_KEY) else {
            return Ok(());
        };

        for (index, value) in column.iter().enumerate() {
            let Some(value) = value else { continue };
            match value.as_f64() {
                Some(m) if m > 0.0 && m.is_finite() => tree[index].set_multiplicity(m),
                _ => {
                    return Err(ParsingError::without_context(
                        ParsingErrorType::InvalidTreeStructure(format!(
                            "invalid multiplicity {:?} for vertex '{}'",
                            value,
                            tree[index].label()
                        )),
                    ));
                }
            }
        }

        Ok(())
    }
}

impl Default for PhyloTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder for PhyloTreeBuilder {
    type VertexIdx = VertexIndex;
    type Tree = PhyloTree;

    fn init_next(&mut self, num_vertices: usize) {
        self.current_tree = Some(PhyloTree::new(num_vertices));
        self.unlabeled.clear();
        self.annotations = Annotations::new(num_vertices);
    }

    fn add_leaf(&mut self, branch_len: Option<BranchLength>, label: Option<String>) -> VertexIndex {
        let index = self.next_index();
        let label = self.resolve_label(index, label);
        self.tree_mut().add_leaf(branch_len, label)
    }

    fn add_internal(
        &mut self,
        children: Vec<VertexIndex>,
        branch_len: Option<BranchLength>,
        label: Option<String>,
    ) -> VertexIndex {
        let index = self.next_index();
        let label = self.resolve_label(index, label);
        self.tree_mut().add_internal_vertex(children, branch_len, label)
    }

    fn add_root(
        &mut self,
        children: Vec<VertexIndex>,
        branch_len: Option<BranchLength>,
        label: Option<String>,
    ) -> VertexIndex {
        let index = self.next_index();
        let label = self.resolve_label(index, label);
        self.tree_mut().add_root(children, branch_len, label)
    }

    fn add_annotation(&mut self, key: String, vertex: VertexIndex, value: AnnotationValue) {
        self.annotations.add(key, vertex, value);
    }

    fn finish_tree(&mut self) -> Result<PhyloTree, ParsingError> {
        let mut tree = self.current_tree.take().ok_or_else(|| {
            ParsingError::without_context(ParsingErrorType::InvalidTreeStructure(
                "no tree under construction".to_string(),
            ))
        })?;
        if !tree.is_root_set() {
            return Err(ParsingError::without_context(
                ParsingErrorType::InvalidTreeStructure("tree has no root".to_string()),
            ));
        }

        self.generate_labels(&mut tree);

        let annotations = std::mem::take(&mut self.annotations);
        Self::apply_multiplicities(&mut tree, &annotations)?;
        if !annotations.is_empty() {
            tree.set_annotations(annotations);
        }

        Ok(tree)
    }
}
