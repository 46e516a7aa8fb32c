use ado_core::{bernoulli_slice, broadcast, Admissibility, AdoError, GridFrame, Model, ModelDescriptor, Task};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::functions::inv_logit;

/// Design variables of the risky choice task.
pub const CRA_DESIGNS: [&str; 4] = ["p_var", "a_var", "r_var", "r_fix"];

/// Parameters of both risky choice models.
pub const CRA_PARAMS: [&str; 3] = ["alpha", "beta", "gamma"];

/// Choice between a variable (risky or ambiguous) option and a fixed one;
/// response 1 picks the variable option.
pub fn task() -> Result<Task, AdoError> {
    Task::new("CRA", CRA_DESIGNS, [0, 1])
}

/// How ambiguity enters the subjective value of the variable option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CraUtility {
    /// `U_var = (p_var − β a_var / 2) r_var^α`.
    Linear,
    /// `U_var = p_var^(1 + β a_var) r_var^α`.
    Exponential,
}

impl CraUtility {
    /// Model name.
    pub fn name(&self) -> &'static str {
        match self {
            CraUtility::Linear => "Linear",
            CraUtility::Exponential => "Exponential",
        }
    }
}

/// Risky choice model `p(1) = logistic(γ (U_var − U_fix))`, `U_fix = 0.5 r_fix^α`.
#[derive(Debug, Clone)]
pub struct CraModel {
    utility: CraUtility,
    descriptor: ModelDescriptor,
}

impl CraModel {
    /// Builds the model for `utility`.
    pub fn new(utility: CraUtility) -> Result<Self, AdoError> {
        let descriptor = ModelDescriptor::new(utility.name(), task()?, CRA_PARAMS)?
            .with_constraint("alpha", Admissibility::Positive)?
            .with_constraint("gamma", Admissibility::Positive)?;
        Ok(Self {
            utility,
            descriptor,
        })
    }

    /// Utility form of this model.
    pub fn utility(&self) -> CraUtility {
        self.utility
    }

    /// Probability of choosing the variable option.
    pub fn probability(&self, design: [f64; 4], alpha: f64, beta: f64, gamma: f64) -> f64 {
        let [p_var, a_var, r_var, r_fix] = design;
        let u_var = match self.utility {
            CraUtility::Linear => (p_var - beta * a_var / 2.0) * r_var.powf(alpha),
            CraUtility::Exponential => p_var.powf(1.0 + beta * a_var) * r_var.powf(alpha),
        };
        let u_fix = 0.5 * r_fix.powf(alpha);
        inv_logit(gamma * (u_var - u_fix))
    }
}

impl Model for CraModel {
    fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    fn likelihood(
        &self,
        designs: &GridFrame,
        params: &GridFrame,
        response: i64,
    ) -> Result<DMatrix<f64>, AdoError> {
        let p_var = designs.column("p_var")?;
        let a_var = designs.column("a_var")?;
        let r_var = designs.column("r_var")?;
        let r_fix = designs.column("r_fix")?;
        let alpha = params.column("alpha")?;
        let beta = params.column("beta")?;
        let gamma = params.column("gamma")?;
        let p_one = broadcast(designs, params, |d, t| {
            self.probability(
                [p_var[d], a_var[d], r_var[d], r_fix[d]],
                alpha[t],
                beta[t],
                gamma[t],
            )
        });
        bernoulli_slice(p_one, response)
    }
}
