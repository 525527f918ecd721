//! Structs and logic to parse Newick strings.
//!
//! This module provides the [NewickParser] struct, which offers methods
//! to parse files or single strings, as well as lazy parsing via a
//! [NewickIterator].

use crate::model::annotation::AnnotationValue;
use crate::model::tree_builder::TreeBuilder;
use crate::model::vertex::BranchLength;
use crate::model::PhyloTreeBuilder;
use crate::newick::defs::{
    ANNOTATION_KEY_DELIMITERS, ANNOTATION_START, ANNOTATION_VALUE_DELIMITERS,
    DEFAULT_NUM_VERTICES_GUESS, NEWICK_LABEL_DELIMITERS,
};
use crate::parser::byte_parser::ByteParser;
use crate::parser::byte_source::ByteSource;
use crate::parser::parsing_error::ParsingError;

/// Annotations of a single vertex, in order of appearance
type VertexAnnotations = Vec<(String, AnnotationValue)>;

// =#========================================================================#=
// NEWICK PARSER
// =#========================================================================$=
/// Parser (configuration) for single/multiple Newick format
/// phylogenetic trees of arbitrary arity.
///
/// Generic over [TreeBuilder] (construction).
///
/// # Construction
/// * [`new(tree_builder)`](Self::new): generic constructor
/// * [`new_defaults()`](Self::new_defaults): uses a [PhyloTreeBuilder]
///
/// # Configuration
/// * [`with_num_vertices(num_vertices)`](Self::with_num_vertices)
///     - Hint for pre-allocation; otherwise learned from the previous tree
/// * [`with_annotations()`](Self::with_annotations)
///     - Configures the parser to parse vertex annotations
///       (e.g. `[&multiplicity=3,rate=0.5]`) instead of treating them as comments.
///
/// # Parsing
/// * [`parse_str`](Self::parse_str): Parse single tree
/// * [`parse_all`](Self::parse_all): Parse all trees eagerly
/// * [`into_iter`](Self::into_iter): Parse trees lazily
///
/// # Example
/// ```
/// use lbtree::newick::NewickParser;
/// use lbtree::parser::ByteParser;
///
/// let input = "((A:1.0,B:1.0)AB:0.5,C:1.5,D:0.2)root;";
/// let mut byte_parser = ByteParser::for_str(input);
/// let mut newick_parser = NewickParser::new_defaults();
///
/// let tree = newick_parser.parse_str(&mut byte_parser).unwrap();
/// assert_eq!(tree.root().children().len(), 3);
/// assert_eq!(tree.root().label(), "root");
/// ```
pub struct NewickParser<T: TreeBuilder> {
    num_vertices: usize,
    tree_builder: T,
    parse_annotations: bool,
}

// ============================================================================
// Construction & Configuration, Deconstruction (pub)
// ============================================================================
impl<T: TreeBuilder> NewickParser<T> {
    /// Creates a new [NewickParser] with the given tree builder.
    pub fn new(tree_builder: T) -> Self {
        Self {
            num_vertices: DEFAULT_NUM_VERTICES_GUESS,
            tree_builder,
            parse_annotations: false,
        }
    }

    /// Sets the expected number of vertices in each parsed tree.
    ///
    /// This allows pre-allocation of data structures. If not set,
    /// the number of vertices of the previously parsed tree is used.
    pub fn with_num_vertices(mut self, num_vertices: usize) -> Self {
        self.num_vertices = num_vertices;
        self
    }

    /// Configures the parser to parse vertex annotations.
    pub fn with_annotations(mut self) -> Self {
        self.parse_annotations = true;
        self
    }

    /// Consumes the parser and returns the tree builder.
    pub fn into_builder(self) -> T {
        self.tree_builder
    }
}

impl NewickParser<PhyloTreeBuilder> {
    /// Creates a new [NewickParser] for [PhyloTree](crate::model::PhyloTree)s
    /// with default settings:
    /// - Entropy-seeded generation of missing labels
    /// - Annotations treated as comments
    pub fn new_defaults() -> Self {
        Self::new(PhyloTreeBuilder::new())
    }
}

impl Default for NewickParser<PhyloTreeBuilder> {
    fn default() -> Self {
        Self::new_defaults()
    }
}

// ============================================================================
// API Parsing (pub)
// ============================================================================
impl<T: TreeBuilder> NewickParser<T> {
    /// Consumes the parser and returns an iterator over trees from the byte source.
    ///
    /// The parser can be retrieved again via [NewickIterator::into_parser].
    pub fn into_iter<B: ByteSource>(self, byte_parser: ByteParser<B>) -> NewickIterator<B, T> {
        NewickIterator {
            byte_parser,
            parser: self,
            done: false,
        }
    }

    /// Parses all Newick trees from the byte source until EOF.
    ///
    /// # Arguments
    /// * `byte_parser` - A byte parser with underlying source containing only
    ///   Newick strings, except for whitespace and `[...]` comments.
    ///
    /// # Returns
    /// * `Ok(Vec<T::Tree>)` - All parsed trees
    /// * `Err(ParsingError)` - If any tree fails to parse
    pub fn parse_all<B: ByteSource>(
        &mut self,
        mut byte_parser: ByteParser<B>,
    ) -> Result<Vec<T::Tree>, ParsingError> {
        let mut trees = Vec::new();
        loop {
            byte_parser.skip_comment_and_whitespace()?;
            if byte_parser.is_eof() {
                break;
            }
            trees.push(self.parse_str(&mut byte_parser)?);
        }
        Ok(trees)
    }

    /// Parses a single Newick tree from the given [ByteParser].
    ///
    /// # Arguments
    /// * `parser` - The byte parser positioned at the start of a Newick tree string
    ///
    /// # Returns
    /// * `Ok(T::Tree)` - The parsed phylogenetic tree
    /// * `Err(ParsingError)` - If the Newick format is invalid
    pub fn parse_str<B: ByteSource>(
        &mut self,
        parser: &mut ByteParser<B>,
    ) -> Result<T::Tree, ParsingError> {
        self.tree_builder.init_next(self.num_vertices);

        let mut vertex_count = 0;
        self.parse_root(parser, &mut vertex_count)?;
        self.num_vertices = vertex_count;

        self.tree_builder.finish_tree()
    }
}

// ============================================================================
// Parsing
// ============================================================================
impl<T: TreeBuilder> NewickParser<T> {
    /// Parses root of tree and adds it to tree:
    /// - `(children)[label][annotation][:branch_length];` or `label;`
    /// - Skips leading comments and whitespace
    fn parse_root<B: ByteSource>(
        &mut self,
        parser: &mut ByteParser<B>,
        vertex_count: &mut usize,
    ) -> Result<(), ParsingError> {
        parser.skip_comment_and_whitespace()?;
        if parser.is_eof() {
            return Err(ParsingError::unexpected_eof(parser));
        }

        let children = if parser.peek_is(b'(') {
            self.parse_children(parser, vertex_count)?
        } else {
            Vec::new()
        };

        parser.skip_whitespace();
        let label = Self::parse_optional_label(parser)?;
        let (annotations, branch_length) = self.parse_vertex_suffix(parser)?;

        // Consume the terminating semicolon
        parser.skip_comment_and_whitespace()?;
        if !parser.consume_if(b';') {
            let next_char = parser.peek().map(char::from);
            return Err(ParsingError::invalid_newick_string(
                parser,
                format!("Expected ';' at end of tree but found {:?}", next_char),
            ));
        }

        let root_index = self.tree_builder.add_root(children, branch_length, label);
        *vertex_count += 1;
        self.add_annotations(annotations, root_index);

        Ok(())
    }

    /// Parses a vertex (either internal vertex or leaf), adds it to the tree,
    /// and returns its index.
    fn parse_vertex<B: ByteSource>(
        &mut self,
        parser: &mut ByteParser<B>,
        vertex_count: &mut usize,
    ) -> Result<T::VertexIdx, ParsingError> {
        parser.skip_comment_and_whitespace()?;
        if parser.peek_is(b'(') {
            self.parse_internal_vertex(parser, vertex_count)
        } else {
            self.parse_leaf(parser, vertex_count)
        }
    }

    /// Parses internal vertex `(children)[label][annotation][:branch_length]`,
    /// adds it to tree, and returns its index.
    fn parse_internal_vertex<B: ByteSource>(
        &mut self,
        parser: &mut ByteParser<B>,
        vertex_count: &mut usize,
    ) -> Result<T::VertexIdx, ParsingError> {
        let children = self.parse_children(parser, vertex_count)?;
        parser.skip_whitespace();
        let label = Self::parse_optional_label(parser)?;
        let (annotations, branch_length) = self.parse_vertex_suffix(parser)?;

        let index = self
            .tree_builder
            .add_internal(children, branch_length, label);
        *vertex_count += 1;
        self.add_annotations(annotations, index);

        Ok(index)
    }

    /// Parses the children list `(child, child, ...)` and returns their indices.
    ///
    /// Expects parser at opening `(`.
    fn parse_children<B: ByteSource>(
        &mut self,
        parser: &mut ByteParser<B>,
        vertex_count: &mut usize,
    ) -> Result<Vec<T::VertexIdx>, ParsingError> {
        if !parser.consume_if(b'(') {
            let next_char = parser.peek().map(char::from);
            return Err(ParsingError::invalid_newick_string(
                parser,
                format!("Expected '(' before children but found {:?}", next_char),
            ));
        }

        let mut children = Vec::new();
        loop {
            children.push(self.parse_vertex(parser, vertex_count)?);

            parser.skip_comment_and_whitespace()?;
            if parser.consume_if(b',') {
                continue;
            }
            if parser.consume_if(b')') {
                break;
            }

            if parser.is_eof() {
                return Err(ParsingError::unexpected_eof(parser));
            }
            let next_char = parser.peek().map(char::from);
            return Err(ParsingError::invalid_newick_string(
                parser,
                format!("Expected ',' or ')' after child but found {:?}", next_char),
            ));
        }

        Ok(children)
    }

    /// Parses leaf vertex `[label][annotation][:branch_length]`, adds it to the
    /// tree, and returns its index.
    fn parse_leaf<B: ByteSource>(
        &mut self,
        parser: &mut ByteParser<B>,
        vertex_count: &mut usize,
    ) -> Result<T::VertexIdx, ParsingError> {
        let label = Self::parse_optional_label(parser)?;
        let (annotations, branch_length) = self.parse_vertex_suffix(parser)?;

        let index = self.tree_builder.add_leaf(branch_length, label);
        *vertex_count += 1;
        self.add_annotations(annotations, index);

        Ok(index)
    }

    /// Parses a label at the current position; `None` if there is none.
    fn parse_optional_label<B: ByteSource>(
        parser: &mut ByteParser<B>,
    ) -> Result<Option<String>, ParsingError> {
        let label = parser.parse_label(NEWICK_LABEL_DELIMITERS)?;
        Ok(if label.is_empty() { None } else { Some(label) })
    }

    /// Parses what may follow a label: annotations and branch length,
    /// in either order.
    fn parse_vertex_suffix<B: ByteSource>(
        &mut self,
        parser: &mut ByteParser<B>,
    ) -> Result<(VertexAnnotations, Option<BranchLength>), ParsingError> {
        let mut annotations = VertexAnnotations::new();
        if self.parse_annotations {
            parser.skip_whitespace();
            Self::parse_annotations(parser, &mut annotations)?;
        }

        let branch_length = Self::parse_branch_length(parser)?;

        if self.parse_annotations && branch_length.is_some() {
            parser.skip_whitespace();
            Self::parse_annotations(parser, &mut annotations)?;
        }

        Ok((annotations, branch_length))
    }

    /// Parses optional branch length `[:number]`:
    /// - Skips comments/whitespace before and after `:`
    /// - Supports scientific notation (e.g., `1.5e-10`)
    ///
    /// # Returns
    /// - `Ok(Some(branch_length))` if found a valid branch length
    /// - `Ok(None)` if no branch length found
    /// - [ParsingError] if the value is not a non-negative number
    fn parse_branch_length<B: ByteSource>(
        parser: &mut ByteParser<B>,
    ) -> Result<Option<BranchLength>, ParsingError> {
        parser.skip_comment_and_whitespace()?;
        if !parser.consume_if(b':') {
            return Ok(None);
        }
        parser.skip_comment_and_whitespace()?;

        let mut branch_length_str = String::new();
        while let Some(b) = parser.peek() {
            // Valid characters for a float: digits, '.', '-', '+', 'e', 'E'
            if b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E') {
                branch_length_str.push(b as char);
                parser.next_byte();
            } else {
                break;
            }
        }

        let value: f64 = branch_length_str.parse().map_err(|_| {
            ParsingError::invalid_newick_string(
                parser,
                format!("Invalid branch length: {}", branch_length_str),
            )
        })?;

        BranchLength::try_new(value).map(Some).ok_or_else(|| {
            ParsingError::invalid_newick_string(
                parser,
                format!("Negative branch length: {}", branch_length_str),
            )
        })
    }

    /// Parses an annotation block `[&key=value,...]` if present and appends
    /// its pairs to `annotations`.
    ///
    /// Note that `[` without `&` is a regular comment, not an annotation.
    fn parse_annotations<B: ByteSource>(
        parser: &mut ByteParser<B>,
        annotations: &mut VertexAnnotations,
    ) -> Result<(), ParsingError> {
        if !parser.consume_if_sequence(ANNOTATION_START) {
            return Ok(());
        }

        loop {
            parser.skip_whitespace();
            let key = parser.parse_unquoted_label(ANNOTATION_KEY_DELIMITERS);
            if key.is_empty() {
                return Err(ParsingError::invalid_newick_string(
                    parser,
                    "Empty annotation key".to_string(),
                ));
            }

            parser.skip_whitespace();
            if !parser.consume_if(b'=') {
                return Err(ParsingError::invalid_newick_string(
                    parser,
                    format!("Expected '=' after annotation key '{}'", key),
                ));
            }

            parser.skip_whitespace();
            let value = parser.parse_label(ANNOTATION_VALUE_DELIMITERS)?;
            if value.is_empty() {
                return Err(ParsingError::invalid_newick_string(
                    parser,
                    format!("Empty annotation value for key '{}'", key),
                ));
            }
            annotations.push((key, AnnotationValue::parse(&value)));

            // ',' means more pairs, ']' means end
            parser.skip_whitespace();
            if !parser.consume_if(b',') {
                break;
            }
        }

        if !parser.consume_if(b']') {
            return Err(ParsingError::invalid_newick_string(
                parser,
                "Expected ']' at end of annotation block".to_string(),
            ));
        }

        Ok(())
    }

    /// Passes parsed annotations on to the [TreeBuilder].
    fn add_annotations(&mut self, annotations: VertexAnnotations, vertex_index: T::VertexIdx) {
        for (key, value) in annotations {
            self.tree_builder.add_annotation(key, vertex_index, value);
        }
    }
}

// =#========================================================================#=
// NEWICK ITERATOR (lazy parser)
// =#========================================================================$=
/// Iterator to parse Newick trees.
///
/// Created by [NewickParser::into_iter()].
/// Yields `Result<T::Tree, ParsingError>` for each tree.
pub struct NewickIterator<B, T>
where
    B: ByteSource,
    T: TreeBuilder,
{
    parser: NewickParser<T>,
    byte_parser: ByteParser<B>,
    done: bool,
}

impl<B, T> NewickIterator<B, T>
where
    B: ByteSource,
    T: TreeBuilder,
{
    /// Consumes the iterator and returns the underlying [NewickParser].
    pub fn into_parser(self) -> NewickParser<T> {
        self.parser
    }
}

impl<B, T> Iterator for NewickIterator<B, T>
where
    B: ByteSource,
    T: TreeBuilder,
{
    type Item = Result<T::Tree, ParsingError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if let Err(e) = self.byte_parser.skip_comment_and_whitespace() {
            self.done = true;
            return Some(Err(e));
        }
        if self.byte_parser.is_eof() {
            self.done = true;
            return None;
        }

        let result = self.parser.parse_str(&mut self.byte_parser);
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}
