use ado_core::{bernoulli_slice, broadcast, Admissibility, AdoError, GridFrame, Model, ModelDescriptor, Task};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::functions::{gumbel_l_cdf, inv_logit, normal_cdf};

/// Parameters of every psychometric model, in declaration order.
pub const PSI_PARAMS: [&str; 4] = ["threshold", "slope", "guess_rate", "lapse_rate"];

/// Two-alternative detection task with a single `stimulus` intensity.
pub fn task() -> Result<Task, AdoError> {
    Task::new("Psi", ["stimulus"], [0, 1])
}

/// Sigmoid shaping the psychometric curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PsiLink {
    /// Logistic function.
    Logistic,
    /// Log-Weibull, i.e. the left Gumbel CDF.
    Weibull,
    /// Standard normal CDF.
    Normal,
}

impl PsiLink {
    /// Model name used in descriptors and configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            PsiLink::Logistic => "Logistic",
            PsiLink::Weibull => "Weibull",
            PsiLink::Normal => "Normal",
        }
    }

    fn apply(&self, z: f64) -> f64 {
        match self {
            PsiLink::Logistic => inv_logit(z),
            PsiLink::Weibull => gumbel_l_cdf(z),
            PsiLink::Normal => normal_cdf(z),
        }
    }
}

/// Psychometric function `p(1) = γ + (1 − γ − δ) F(β (x − α))`.
#[derive(Debug, Clone)]
pub struct PsiModel {
    link: PsiLink,
    descriptor: ModelDescriptor,
}

impl PsiModel {
    /// Builds the model for `link`.
    pub fn new(link: PsiLink) -> Result<Self, AdoError> {
        let descriptor = ModelDescriptor::new(link.name(), task()?, PSI_PARAMS)?
            .with_constraint("slope", Admissibility::Positive)?
            .with_constraint("guess_rate", Admissibility::ClosedUnit)?
            .with_constraint("lapse_rate", Admissibility::ClosedUnit)?;
        Ok(Self { link, descriptor })
    }

    /// Logistic psychometric model.
    pub fn logistic() -> Result<Self, AdoError> {
        Self::new(PsiLink::Logistic)
    }

    /// Log-Weibull psychometric model.
    pub fn weibull() -> Result<Self, AdoError> {
        Self::new(PsiLink::Weibull)
    }

    /// Normal-CDF psychometric model.
    pub fn normal() -> Result<Self, AdoError> {
        Self::new(PsiLink::Normal)
    }

    /// Link function of this model.
    pub fn link(&self) -> PsiLink {
        self.link
    }

    /// Probability of a detection response.
    pub fn probability(
        &self,
        stimulus: f64,
        threshold: f64,
        slope: f64,
        guess_rate: f64,
        lapse_rate: f64,
    ) -> f64 {
        guess_rate + (1.0 - guess_rate - lapse_rate) * self.link.apply(slope * (stimulus - threshold))
    }
}

impl Model for PsiModel {
    fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    fn likelihood(
        &self,
        designs: &GridFrame,
        params: &GridFrame,
        response: i64,
    ) -> Result<DMatrix<f64>, AdoError> {
        let stimulus = designs.column("stimulus")?;
        let threshold = params.column("threshold")?;
        let slope = params.column("slope")?;
        let guess = params.column("guess_rate")?;
        let lapse = params.column("lapse_rate")?;
        let p_one = broadcast(designs, params, |d, t| {
            self.probability(stimulus[d], threshold[t], slope[t], guess[t], lapse[t])
        });
        bernoulli_slice(p_one, response)
    }
}
