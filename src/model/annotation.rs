//! Vertex annotations for phylogenetic trees.
//!
//! Provides the [Annotations] struct, which stores annotation values parsed
//! from extended Newick (`[&key=value,...]`) for vertices based on their
//! indices. Supported values captured by [AnnotationValue] are `f64`, `i64`,
//! and `String`.

use crate::model::VertexIndex;
use std::collections::HashMap;

/// Annotation key holding the observation count of a vertex.
pub const MULTIPLICITY_KEY: &str = "multiplicity";

// =#========================================================================#=
// ANNOTATION
// =#========================================================================$=
/// Vertex annotations for multiple keys
#[derive(Debug, Clone, Default)]
pub struct Annotations {
    annotations: HashMap<String, Vec<Option<AnnotationValue>>>,
    num_vertices: usize,
}

impl Annotations {
    /// Creates a new empty [Annotations] for a tree with (about) `num_vertices` vertices.
    pub fn new(num_vertices: usize) -> Self {
        Annotations {
            num_vertices,
            annotations: HashMap::new(),
        }
    }

    /// Returns whether no annotation has been added.
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Returns all annotation keys.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.annotations.keys()
    }

    /// Returns all values for a given annotation key, one slot per vertex.
    ///
    /// # Returns
    /// [None] if the key does not exist, otherwise a slice parallel to the
    /// tree's vertex arena (possibly shorter, if the last vertices have no
    /// value) where each entry is [Some] if that vertex has a value.
    pub fn get_all_for_key(&self, key: &str) -> Option<&[Option<AnnotationValue>]> {
        self.annotations.get(key).map(|column| column.as_slice())
    }

    /// Returns a single annotation value for a vertex.
    pub fn get(&self, key: &str, vertex_index: VertexIndex) -> Option<&AnnotationValue> {
        self.annotations
            .get(key)
            .and_then(|column| column.get(vertex_index))
            .and_then(|value| value.as_ref())
    }

    /// Adds an annotation value for a vertex, replacing any previous one.
    pub fn add(&mut self, key: String, vertex_index: VertexIndex, value: AnnotationValue) {
        let num_vertices = self.num_vertices.max(vertex_index + 1);
        self.num_vertices = num_vertices;
        let column = self
            .annotations
            .entry(key)
            .or_insert_with(|| vec![None; num_vertices]);
        if column.len() <= vertex_index {
            column.resize(vertex_index + 1, None);
        }
        column[vertex_index] = Some(value);
    }
}

// =#========================================================================#=
// ANNOTATION VALUE
// =#========================================================================€=
/// Enum to encapsulate a parsed annotation value.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    /// For floating point values
    Float(f64),
    /// For integer values
    Int(i64),
    /// For strings
    String(String),
}

impl AnnotationValue {
    /// Returns the value as `f64` if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AnnotationValue::Float(v) => Some(*v),
            AnnotationValue::Int(v) => Some(*v as f64),
            AnnotationValue::String(_) => None,
        }
    }

    /// Parses a raw annotation value, preferring integers over floats over strings.
    pub fn parse(raw: &str) -> Self {
        if let Ok(v) = raw.parse::<i64>() {
            AnnotationValue::Int(v)
        } else if let Ok(v) = raw.parse::<f64>() {
            AnnotationValue::Float(v)
        } else {
            AnnotationValue::String(raw.to_string())
        }
    }
}

impl From<f64> for AnnotationValue {
    fn from(v: f64) -> Self {
        AnnotationValue::Float(v)
    }
}

impl From<i64> for AnnotationValue {
    fn from(v: i64) -> Self {
        AnnotationValue::Int(v)
    }
}

impl From<&str> for AnnotationValue {
    fn from(v: &str) -> Self {
        AnnotationValue::String(v.to_string())
    }
}
