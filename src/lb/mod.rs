//! Local branching index (LBI) and local branching ratio (LBR).
//!
//! LBI estimates the fitness of a lineage by the exponentially decayed
//! amount of branching in its neighborhood; LBR compares the branching
//! below a vertex with the branching above it.
//!
//! # Quick API
//! * [`calculate_lb_values`] - full calculation as configured by [LbConfig],
//!   including rescaling of raw branch lengths and both decay constants
//! * [`calculate_lb_values_from_newick`] - same, starting from a Newick string
//!
//! # Building blocks
//! * [`set_lb_values`] - one run with a single decay constant
//! * [`augment_tree`] - dummy root and leaves against boundary effects

pub mod augment;
pub mod calculate;
pub mod config;
pub mod engine;
pub mod lb_error;

pub use augment::{AugmentedTree, augment_tree};
pub use calculate::{
    LbResult, SequenceAnnotation, calculate_lb_values, calculate_lb_values_from_newick,
    rescale_to_per_site,
};
pub use config::{ConfigError, LbConfig, RescaleConfig};
pub use engine::{LbOptions, LbValues, set_lb_values};
pub use lb_error::LbError;
