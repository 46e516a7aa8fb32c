use std::fs;
use std::path::Path;
use std::sync::Arc;

use ado_core::errors::ErrorInfo;
use ado_core::{AdoError, Model};
use ado_engine::{EngineConfig, EngineTables, GridSpec, Prior, SelectionKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Simulated experiment described by a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub task: String,
    pub model: String,
    pub grids: GridSpec,
    #[serde(default)]
    pub engine: EngineConfig,
    /// True parameter values by name; must lie on the parameter grid.
    #[serde(default)]
    pub truth: IndexMap<String, f64>,
    #[serde(default = "default_trials")]
    pub trials: usize,
    /// `optimal`, `random`, `staircase` or `staircase:<step>`.
    #[serde(default = "default_kind")]
    pub kind: String,
    /// Optional prior weights aligned with the admissible parameter rows.
    #[serde(default)]
    pub prior: Option<Vec<f64>>,
}

fn default_trials() -> usize {
    20
}

fn default_kind() -> String {
    "optimal".to_string()
}

impl ExperimentConfig {
    pub fn load(path: &Path) -> Result<Self, AdoError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            AdoError::Config(
                ErrorInfo::new("experiment-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        serde_yaml::from_str(&contents).map_err(|err| {
            AdoError::Config(
                ErrorInfo::new("experiment-parse", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }

    pub fn model(&self) -> Result<Box<dyn Model>, AdoError> {
        ado_tasks::model_by_name(&self.task, &self.model)
    }

    pub fn selection(&self) -> Result<SelectionKind, AdoError> {
        self.kind.parse()
    }

    pub fn prior(&self) -> Prior {
        match &self.prior {
            Some(weights) => Prior::Weights(weights.clone()),
            None => Prior::Uniform,
        }
    }

    pub fn tables(&self, model: &dyn Model) -> Result<Arc<EngineTables>, AdoError> {
        Ok(Arc::new(EngineTables::build(
            model,
            &self.grids,
            &self.engine.numerics,
        )?))
    }

    /// Truth values in the model's parameter order.
    pub fn truth_row(&self, model: &dyn Model) -> Result<Vec<f64>, AdoError> {
        let params = model.descriptor().params();
        if let Some(unknown) = self.truth.keys().find(|name| !params.contains(*name)) {
            return Err(AdoError::Config(
                ErrorInfo::new("truth-unknown-param", "truth names an undeclared parameter")
                    .with_context("variable", unknown.clone()),
            ));
        }
        params
            .iter()
            .map(|name| {
                self.truth.get(name).copied().ok_or_else(|| {
                    AdoError::Config(
                        ErrorInfo::new("truth-missing-param", "truth omits a model parameter")
                            .with_context("variable", name.clone()),
                    )
                })
            })
            .collect()
    }
}
