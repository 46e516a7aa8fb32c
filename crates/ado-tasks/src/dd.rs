use ado_core::{bernoulli_slice, broadcast, Admissibility, AdoError, GridFrame, Model, ModelDescriptor, Task};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::functions::inv_logit;

/// Design variables of the delay discounting task.
pub const DD_DESIGNS: [&str; 4] = ["t_ss", "t_ll", "r_ss", "r_ll"];

/// Choice between a smaller-sooner and a larger-later reward; response 1
/// picks the larger-later option.
pub fn task() -> Result<Task, AdoError> {
    Task::new("DD", DD_DESIGNS, [0, 1])
}

/// Shape of the discount function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Discounting {
    /// `D(t) = exp(−r t)`.
    Exponential,
    /// `D(t) = 1 / (1 + k t)`.
    Hyperbolic,
}

impl Discounting {
    /// Model name.
    pub fn name(&self) -> &'static str {
        match self {
            Discounting::Exponential => "Exponential",
            Discounting::Hyperbolic => "Hyperbolic",
        }
    }

    /// Name of the discount-rate parameter.
    pub fn rate_param(&self) -> &'static str {
        match self {
            Discounting::Exponential => "r",
            Discounting::Hyperbolic => "k",
        }
    }

    fn factor(&self, rate: f64, delay: f64) -> f64 {
        match self {
            Discounting::Exponential => (-rate * delay).exp(),
            Discounting::Hyperbolic => 1.0 / (1.0 + rate * delay),
        }
    }
}

/// Delay discounting model `p(1) = logistic(τ (V_LL − V_SS))`.
#[derive(Debug, Clone)]
pub struct DdModel {
    discounting: Discounting,
    descriptor: ModelDescriptor,
}

impl DdModel {
    /// Builds the model for `discounting`.
    pub fn new(discounting: Discounting) -> Result<Self, AdoError> {
        let rate = discounting.rate_param();
        let descriptor = ModelDescriptor::new(discounting.name(), task()?, [rate, "tau"])?
            .with_constraint(rate, Admissibility::NonNegative)?
            .with_constraint("tau", Admissibility::Positive)?;
        Ok(Self {
            discounting,
            descriptor,
        })
    }

    /// Discount function of this model.
    pub fn discounting(&self) -> Discounting {
        self.discounting
    }

    /// Probability of choosing the larger-later reward.
    pub fn probability(&self, design: [f64; 4], rate: f64, tau: f64) -> f64 {
        let [t_ss, t_ll, r_ss, r_ll] = design;
        let v_ss = r_ss * self.discounting.factor(rate, t_ss);
        let v_ll = r_ll * self.discounting.factor(rate, t_ll);
        inv_logit(tau * (v_ll - v_ss))
    }
}

impl Model for DdModel {
    fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    fn likelihood(
        &self,
        designs: &GridFrame,
        params: &GridFrame,
        response: i64,
    ) -> Result<DMatrix<f64>, AdoError> {
        let t_ss = designs.column("t_ss")?;
        let t_ll = designs.column("t_ll")?;
        let r_ss = designs.column("r_ss")?;
        let r_ll = designs.column("r_ll")?;
        let rate = params.column(self.discounting.rate_param())?;
        let tau = params.column("tau")?;
        let p_one = broadcast(designs, params, |d, t| {
            self.probability([t_ss[d], t_ll[d], r_ss[d], r_ll[d]], rate[t], tau[t])
        });
        bernoulli_slice(p_one, response)
    }
}
