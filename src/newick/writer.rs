//! Newick format writing for [PhyloTree]s.

use crate::model::tree::VertexIndex;
use crate::model::PhyloTree;
use crate::newick::defs::{BRANCH_LENGTH_CHARS, STRUCTURE_CHARS};
use crate::parser::utils::escape_label;
use std::fs::File;
use std::io::{self, BufWriter, Write};

/// Magnitudes outside of `[SCIENTIFIC_BELOW, SCIENTIFIC_FROM)` are written
/// in scientific notation
const SCIENTIFIC_BELOW: f64 = 1e-4;
const SCIENTIFIC_FROM: f64 = 1e15;

/// Style for serializing a tree to Newick format,
/// controlling which vertices get their label written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NewickStyle {
    /// Write labels of all vertices, including internal vertices and root
    #[default]
    AllLabels,
    /// Write only leaf labels
    LeafLabels,
}

/// Writes given list of trees to a file in Newick format, one tree per line.
///
/// # Errors
/// Returns an I/O error if writing fails.
pub fn write_newick_file(file: File, trees: &[PhyloTree], style: NewickStyle) -> io::Result<()> {
    let mut writer = BufWriter::new(file);
    for tree in trees {
        writer.write_all(to_newick(tree, style).as_bytes())?;
        writer.write_all(b"\n")?;
    }

    writer.flush()
}

/// Returns the Newick representation of the tree with closing semicolon.
///
/// Labels are escaped where necessary, branch lengths are written with the
/// shortest representation that parses back to the same value, and a branch
/// length of the root is omitted.
///
/// # Example
/// ```
/// use lbtree::model::PhyloTree;
/// use lbtree::model::vertex::BranchLength;
/// use lbtree::newick::{NewickStyle, to_newick};
///
/// let mut tree = PhyloTree::new(3);
/// let a = tree.add_leaf(Some(BranchLength::new(1.0)), "A".to_string());
/// let b = tree.add_leaf(Some(BranchLength::new(2.5)), "Great Kiwi".to_string());
/// tree.add_root(vec![a, b], None, "root".to_string());
///
/// assert_eq!(to_newick(&tree, NewickStyle::AllLabels), "(A:1,'Great Kiwi':2.5)root;");
/// assert_eq!(to_newick(&tree, NewickStyle::LeafLabels), "(A:1,'Great Kiwi':2.5);");
/// ```
pub fn to_newick(tree: &PhyloTree, style: NewickStyle) -> String {
    let mut newick = String::with_capacity(estimate_newick_len(tree));
    build_newick(tree, &mut newick, tree.root_index(), style);
    newick.push(';');
    newick
}

// Recursive helper for building the Newick string
fn build_newick(tree: &PhyloTree, newick: &mut String, index: VertexIndex, style: NewickStyle) {
    let vertex = &tree[index];

    if !vertex.children().is_empty() {
        newick.push('(');
        for (i, &child) in vertex.children().iter().enumerate() {
            if i > 0 {
                newick.push(',');
            }
            build_newick(tree, newick, child, style);
        }
        newick.push(')');
    }

    if vertex.is_leaf() || style == NewickStyle::AllLabels || vertex.children().is_empty() {
        newick.push_str(&escape_label(vertex.label()));
    }

    if !vertex.is_root() {
        if let Some(branch_length) = vertex.branch_length() {
            newick.push(':');
            newick.push_str(&format_branch_length(*branch_length));
        }
    }
}

/// Formats a branch length such that parsing it yields the same value.
fn format_branch_length(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude != 0.0 && !(SCIENTIFIC_BELOW..SCIENTIFIC_FROM).contains(&magnitude) {
        format!("{:e}", value)
    } else {
        value.to_string()
    }
}

/// Estimates the length of the Newick string of a tree,
/// used to pre-allocate string capacity.
fn estimate_newick_len(tree: &PhyloTree) -> usize {
    let label_capacity: usize = tree.vertices().map(|v| v.label().len()).sum();
    label_capacity + tree.num_vertices() * (BRANCH_LENGTH_CHARS + STRUCTURE_CHARS) + 1
}
