//! Full LBI/LBR calculation on a tree of observed sequences.

use crate::lb::config::{LbConfig, RescaleConfig};
use crate::lb::engine::set_lb_values;
use crate::lb::lb_error::LbError;
use crate::model::annotation::MULTIPLICITY_KEY;
use crate::model::vertex::DEFAULT_MULTIPLICITY;
use crate::model::PhyloTree;
use crate::newick::{NewickParser, NewickStyle};
use crate::parser::byte_parser::ByteParser;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Information about the sequences the tree was inferred from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceAnnotation {
    /// Lengths of the sequences, used to rescale raw branch lengths
    pub sequence_lengths: Vec<usize>,
    /// Observation count per label; absent labels count once
    pub multiplicities: Option<HashMap<String, f64>>,
}

impl SequenceAnnotation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sequence_lengths(mut self, sequence_lengths: Vec<usize>) -> Self {
        self.sequence_lengths = sequence_lengths;
        self
    }

    pub fn with_multiplicities(mut self, multiplicities: HashMap<String, f64>) -> Self {
        self.multiplicities = Some(multiplicities);
        self
    }

    /// Returns the mean sequence length, or `None` without (non-empty) sequences.
    pub fn mean_sequence_length(&self) -> Option<f64> {
        if self.sequence_lengths.is_empty() {
            return None;
        }
        let total: f64 = self.sequence_lengths.iter().map(|&l| l as f64).sum();
        Some(total / self.sequence_lengths.len() as f64)
    }
}

/// Result of [calculate_lb_values].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LbResult {
    /// LBI per vertex label
    pub lbi: BTreeMap<String, f64>,
    /// LBR per vertex label
    pub lbr: BTreeMap<String, f64>,
    /// The tree the values were computed on (rescaled if needed)
    pub newick: String,
}

/// Computes LBI and LBR for every vertex of `tree`.
///
/// Works on a copy of `tree`:
/// 1. If its mean leaf depth exceeds the configured threshold, branch lengths
///    are considered counts and divided by the mean sequence length.
/// 2. With `use_multiplicities`, multiplicities are taken from the
///    annotation's map or, without a map, from the tree's own annotations.
/// 3. LBI is computed with `lbi_tau` (and normalized if configured),
///    LBR with the LBR decay constant (never normalized).
///
/// # Errors
/// * [LbError::InvalidConfiguration] for invalid `config`, or multiplicities
///   requested without a source or with non-positive values
/// * [LbError::MissingRescaleInfo] if rescaling is needed without
///   sequence lengths
/// * [LbError::MalformedTree] if the tree is not valid
///
/// # Example
/// ```
/// use lbtree::lb::{LbConfig, calculate_lb_values};
/// use lbtree::newick::parse_str;
///
/// let tree = parse_str("((A:0.01,B:0.02)AB:0.005,C:0.03)R;")?;
/// let result = calculate_lb_values(&tree, &LbConfig::default(), None)?;
///
/// assert_eq!(result.lbi.len(), 5);
/// assert_eq!(result.lbr["R"], 0.0);
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn calculate_lb_values(
    tree: &PhyloTree,
    config: &LbConfig,
    annotation: Option<&SequenceAnnotation>,
) -> Result<LbResult, LbError> {
    config.validate()?;
    tree.validate()?;

    let mut working = tree.clone();
    rescale_to_per_site(&mut working, &config.rescale, annotation)?;
    if config.use_multiplicities {
        resolve_multiplicities(&mut working, annotation)?;
    }

    let lbi_tau = config.lbi_tau;
    let lbi_values = set_lb_values(&working, lbi_tau, &config.lb_options(lbi_tau, config.normalize))?;
    let lbr_tau = config.effective_lbr_tau();
    let lbr_values = set_lb_values(&working, lbr_tau, &config.lb_options(lbr_tau, false))?;
    debug!(
        "Computed LBI (tau {}) and LBR (tau {}) for {} vertices",
        lbi_tau,
        lbr_tau,
        working.num_vertices()
    );

    Ok(LbResult {
        lbi: lbi_values.lbi_by_label(&working),
        lbr: lbr_values.lbr_by_label(&working),
        newick: working.to_newick(NewickStyle::AllLabels),
    })
}

/// Parses `newick` (with annotations) and calls [calculate_lb_values].
///
/// # Errors
/// As [calculate_lb_values], plus [LbError::Parsing] for invalid Newick.
pub fn calculate_lb_values_from_newick(
    newick: &str,
    config: &LbConfig,
    annotation: Option<&SequenceAnnotation>,
) -> Result<LbResult, LbError> {
    let mut byte_parser = ByteParser::for_str(newick);
    let tree = NewickParser::new_defaults()
        .with_annotations()
        .parse_str(&mut byte_parser)?;
    calculate_lb_values(&tree, config, annotation)
}

/// Rescales branch lengths of `tree` to substitutions per site if they
/// appear to be raw counts, returning the applied factor.
///
/// # Errors
/// [LbError::MissingRescaleInfo] if rescaling is needed but `annotation`
/// has no sequence lengths.
pub fn rescale_to_per_site(
    tree: &mut PhyloTree,
    rescale: &RescaleConfig,
    annotation: Option<&SequenceAnnotation>,
) -> Result<Option<f64>, LbError> {
    if !rescale.enabled {
        return Ok(None);
    }
    let mean_leaf_depth = tree.mean_leaf_depth();
    if mean_leaf_depth <= rescale.mean_leaf_depth_threshold {
        return Ok(None);
    }

    let mean_length = annotation
        .and_then(SequenceAnnotation::mean_sequence_length)
        .filter(|&length| length > 0.0)
        .ok_or(LbError::MissingRescaleInfo {
            mean_leaf_depth,
            threshold: rescale.mean_leaf_depth_threshold,
        })?;

    let factor = 1.0 / mean_length;
    info!(
        "Mean leaf depth {} exceeds {}, rescaling branch lengths by 1/{}",
        mean_leaf_depth, rescale.mean_leaf_depth_threshold, mean_length
    );
    tree.scale_branch_lengths(factor);
    Ok(Some(factor))
}

/// Sets the multiplicity of every vertex of `tree` from `annotation`,
/// or checks that the tree carries multiplicities itself.
fn resolve_multiplicities(
    tree: &mut PhyloTree,
    annotation: Option<&SequenceAnnotation>,
) -> Result<(), LbError> {
    let Some(multiplicities) = annotation.and_then(|a| a.multiplicities.as_ref()) else {
        let annotated = tree
            .annotations()
            .is_some_and(|a| a.get_all_for_key(MULTIPLICITY_KEY).is_some());
        let non_default = tree.vertices().any(|v| v.multiplicity() != DEFAULT_MULTIPLICITY);
        if annotated || non_default {
            debug!("Using multiplicities of the tree");
            return Ok(());
        }
        return Err(LbError::invalid_configuration(
            "multiplicities requested, but neither given nor annotated in the tree",
        ));
    };

    let label_map = tree.label_index_map();
    let mut updates = Vec::with_capacity(multiplicities.len());
    for (label, &multiplicity) in multiplicities {
        if !(multiplicity > 0.0 && multiplicity.is_finite()) {
            return Err(LbError::invalid_configuration(format!(
                "multiplicity of '{}' must be positive, got {}",
                label, multiplicity
            )));
        }
        match label_map.get(label.as_str()) {
            Some(&index) => updates.push((index, multiplicity)),
            None => warn!("Ignoring multiplicity of '{}', which is not in the tree", label),
        }
    }

    for index in 0..tree.num_vertices() {
        tree[index].set_multiplicity(DEFAULT_MULTIPLICITY);
    }
    for (index, multiplicity) in updates {
        tree[index].set_multiplicity(multiplicity);
    }
    Ok(())
}
