//! Configuration of a full LBI/LBR calculation.
//!
//! [LbConfig] can be built in code or read from TOML:
//!
//! ```toml
//! lbi_tau = 0.0025
//! lbr_tau_factor = 20.0
//! use_multiplicities = true
//! add_dummy_root = true
//! normalize = true
//!
//! [rescale]
//! mean_leaf_depth_threshold = 1.0
//! ```

use crate::lb::engine::{DEFAULT_DUMMY_BRANCH_LENGTH_FACTOR, LbOptions, check_tau};
use crate::lb::lb_error::LbError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default decay constant of the LBI, in substitutions per site
pub const DEFAULT_LBI_TAU: f64 = 0.0025;

/// Default ratio between the decay constants of LBR and LBI
pub const DEFAULT_LBR_TAU_FACTOR: f64 = 20.0;

/// Default mean leaf depth above which branch lengths are taken to be
/// raw substitution counts
pub const DEFAULT_MEAN_LEAF_DEPTH_THRESHOLD: f64 = 1.0;

/// Errors while loading a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Invalid(#[from] LbError),
}

// =#========================================================================#=
// LB CONFIG
// =#========================================================================$=
/// Parameters of [calculate_lb_values](crate::lb::calculate_lb_values).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LbConfig {
    /// Decay constant for the LBI
    pub lbi_tau: f64,
    /// Decay constant for the LBR; `lbr_tau_factor * lbi_tau` if not set
    pub lbr_tau: Option<f64>,
    /// Factor deriving the LBR decay constant from the LBI one
    pub lbr_tau_factor: f64,
    /// Weigh vertices by their multiplicity (observation count)
    pub use_multiplicities: bool,
    /// Attach a dummy root above the root
    pub add_dummy_root: bool,
    /// Attach a dummy child to every leaf (requires `add_dummy_root`)
    pub add_dummy_leaves: bool,
    /// Dummy branch length as multiple of the decay constant
    pub dummy_branch_length_factor: f64,
    /// Absolute dummy branch length, overriding the factor
    pub dummy_branch_length: Option<f64>,
    /// Rescale LBI values such that their maximum is 1
    pub normalize: bool,
    /// Rescaling of branch lengths given in raw counts
    pub rescale: RescaleConfig,
}

impl Default for LbConfig {
    fn default() -> Self {
        Self {
            lbi_tau: DEFAULT_LBI_TAU,
            lbr_tau: None,
            lbr_tau_factor: DEFAULT_LBR_TAU_FACTOR,
            use_multiplicities: false,
            add_dummy_root: false,
            add_dummy_leaves: false,
            dummy_branch_length_factor: DEFAULT_DUMMY_BRANCH_LENGTH_FACTOR,
            dummy_branch_length: None,
            normalize: false,
            rescale: RescaleConfig::default(),
        }
    }
}

/// When and how to rescale branch lengths to per-site units.
///
/// Branch lengths are considered raw counts (and divided by the mean
/// sequence length) when the mean leaf depth exceeds the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RescaleConfig {
    pub enabled: bool,
    pub mean_leaf_depth_threshold: f64,
}

impl Default for RescaleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mean_leaf_depth_threshold: DEFAULT_MEAN_LEAF_DEPTH_THRESHOLD,
        }
    }
}

impl LbConfig {
    /// Creates a default configuration with the given LBI decay constant.
    pub fn with_tau(lbi_tau: f64) -> Self {
        Self {
            lbi_tau,
            ..Self::default()
        }
    }

    /// Parses a configuration from TOML and validates it.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config: LbConfig = toml::from_str(toml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a configuration from a TOML file and validates it.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Returns the decay constant used for the LBR.
    pub fn effective_lbr_tau(&self) -> f64 {
        self.lbr_tau.unwrap_or(self.lbr_tau_factor * self.lbi_tau)
    }

    /// Returns the dummy branch length used with decay constant `tau`.
    pub fn dummy_branch_length_for(&self, tau: f64) -> f64 {
        self.dummy_branch_length
            .unwrap_or(self.dummy_branch_length_factor * tau)
    }

    /// Returns the engine options for one run with decay constant `tau`.
    pub fn lb_options(&self, tau: f64, normalize: bool) -> LbOptions {
        LbOptions {
            use_multiplicities: self.use_multiplicities,
            add_dummy_root: self.add_dummy_root,
            add_dummy_leaves: self.add_dummy_leaves,
            dummy_branch_length: Some(self.dummy_branch_length_for(tau)),
            normalize,
        }
    }

    /// Checks that all values are in range and the flags are consistent.
    ///
    /// # Errors
    /// Returns [LbError::InvalidConfiguration] describing the first problem.
    pub fn validate(&self) -> Result<(), LbError> {
        check_tau(self.lbi_tau)?;
        if self.lbr_tau.is_none() && !(self.lbr_tau_factor > 0.0 && self.lbr_tau_factor.is_finite()) {
            return Err(LbError::invalid_configuration(format!(
                "lbr_tau_factor must be positive, got {}",
                self.lbr_tau_factor
            )));
        }
        check_tau(self.effective_lbr_tau())?;

        if self.dummy_branch_length.is_none()
            && !(self.dummy_branch_length_factor > 0.0 && self.dummy_branch_length_factor.is_finite())
        {
            return Err(LbError::invalid_configuration(format!(
                "dummy_branch_length_factor must be positive, got {}",
                self.dummy_branch_length_factor
            )));
        }
        if self.rescale.mean_leaf_depth_threshold.is_nan() {
            return Err(LbError::invalid_configuration(
                "rescale threshold must be a number",
            ));
        }

        self.lb_options(self.lbi_tau, self.normalize).validate()
    }
}
