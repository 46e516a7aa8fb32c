use ado_core::errors::ErrorInfo;
use ado_core::AdoError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// YAML-configurable settings governing an engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// Master seed and substream policy.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
    /// Staircase baseline behaviour.
    #[serde(default)]
    pub staircase: StaircaseConfig,
    /// Tolerances applied while building and updating the belief state.
    #[serde(default)]
    pub numerics: NumericsConfig,
}

impl EngineConfig {
    /// Parses a configuration document; absent fields take their defaults.
    pub fn from_yaml_str(contents: &str) -> Result<Self, AdoError> {
        serde_yaml::from_str(contents)
            .map_err(|err| AdoError::Config(ErrorInfo::new("config-parse", err.to_string())))
    }

    /// Renders the configuration as YAML.
    pub fn to_yaml_string(&self) -> Result<String, AdoError> {
        serde_yaml::to_string(self)
            .map_err(|err| AdoError::Serde(ErrorInfo::new("config-serialize", err.to_string())))
    }
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed used for every random choice the engine makes.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Optional label recorded alongside the seed.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    0x0AD0_5EED_0AD0_5EED_u64
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            label: None,
        }
    }
}

/// Staircase baseline settings.
///
/// A correct response moves `down_multiplier * step` grid positions down the
/// staircase axis, anything else moves `up_multiplier * step` positions up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaircaseConfig {
    /// Design variable the staircase walks along. Defaults to the first one.
    #[serde(default)]
    pub axis: Option<String>,
    /// Initial design row index. Drawn at random when absent.
    #[serde(default)]
    pub start_index: Option<usize>,
    /// Response treated as correct / detected.
    #[serde(default = "default_correct_response")]
    pub correct_response: i64,
    /// Multiplier applied to the step after a correct response.
    #[serde(default = "default_down_multiplier")]
    pub down_multiplier: usize,
    /// Multiplier applied to the step after any other response.
    #[serde(default = "default_up_multiplier")]
    pub up_multiplier: usize,
}

fn default_correct_response() -> i64 {
    1
}

fn default_down_multiplier() -> usize {
    1
}

fn default_up_multiplier() -> usize {
    2
}

impl Default for StaircaseConfig {
    fn default() -> Self {
        Self {
            axis: None,
            start_index: None,
            correct_response: default_correct_response(),
            down_multiplier: default_down_multiplier(),
            up_multiplier: default_up_multiplier(),
        }
    }
}

/// Numerical tolerances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericsConfig {
    /// Likelihood values are clipped to `[clip_epsilon, 1 - clip_epsilon]`.
    #[serde(default = "default_clip_epsilon")]
    pub clip_epsilon: f64,
    /// Largest tolerated deviation of raw likelihood values from `[0, 1]` and
    /// of their response-axis sums from 1.
    #[serde(default = "default_sum_tolerance")]
    pub sum_tolerance: f64,
    /// Deviations above this are reported as a renormalization warning.
    #[serde(default = "default_renormalize_tolerance")]
    pub renormalize_tolerance: f64,
    /// Effective sample size below which the posterior counts as collapsed.
    #[serde(default = "default_collapse_ess")]
    pub collapse_ess: f64,
}

fn default_clip_epsilon() -> f64 {
    1e-12
}

fn default_sum_tolerance() -> f64 {
    1e-3
}

fn default_renormalize_tolerance() -> f64 {
    1e-9
}

fn default_collapse_ess() -> f64 {
    1.5
}

impl Default for NumericsConfig {
    fn default() -> Self {
        Self {
            clip_epsilon: default_clip_epsilon(),
            sum_tolerance: default_sum_tolerance(),
            renormalize_tolerance: default_renormalize_tolerance(),
            collapse_ess: default_collapse_ess(),
        }
    }
}

/// Per-variable value lists from which the design and parameter grids are built.
///
/// Maps preserve insertion order, but grid columns always follow the order
/// declared by the task and the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GridSpec {
    /// Design variable name to candidate values.
    #[serde(default)]
    pub designs: IndexMap<String, Vec<f64>>,
    /// Parameter name to grid values.
    #[serde(default)]
    pub params: IndexMap<String, Vec<f64>>,
}

impl GridSpec {
    /// Creates an empty specification.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the values of a design variable.
    pub fn design(mut self, name: impl Into<String>, values: impl Into<Vec<f64>>) -> Self {
        self.designs.insert(name.into(), values.into());
        self
    }

    /// Adds or replaces the values of a parameter.
    pub fn param(mut self, name: impl Into<String>, values: impl Into<Vec<f64>>) -> Self {
        self.params.insert(name.into(), values.into());
        self
    }
}
