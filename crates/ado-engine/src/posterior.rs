use std::fmt;

use ado_core::errors::ErrorInfo;
use ado_core::{AdoError, GridFrame};
use nalgebra::{DMatrix, DVector};

use crate::grid::ParamGrid;
use crate::numerics;

type PriorFn = dyn Fn(&[f64]) -> f64 + Send + Sync;

/// Prior belief over the parameter grid.
#[derive(Default)]
pub enum Prior {
    /// Equal mass on every admissible parameter row.
    #[default]
    Uniform,
    /// Non-negative weights aligned with the parameter grid's row order.
    Weights(Vec<f64>),
    /// Weight computed from each parameter row (ordered like the model's parameters).
    Function(Box<PriorFn>),
}

impl Prior {
    /// Wraps a closure computing the weight of a parameter row.
    pub fn from_fn<F>(func: F) -> Self
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        Prior::Function(Box::new(func))
    }

    /// Resolves the prior into log weights over `params`.
    pub fn log_weights(&self, params: &ParamGrid) -> Result<DVector<f64>, AdoError> {
        let weights = match self {
            Prior::Uniform => return Ok(DVector::zeros(params.len())),
            Prior::Weights(weights) => {
                if weights.len() != params.len() {
                    return Err(AdoError::Config(
                        ErrorInfo::new("prior-length", "prior length does not match the parameter grid")
                            .with_context("expected", params.len().to_string())
                            .with_context("actual", weights.len().to_string()),
                    ));
                }
                weights.clone()
            }
            Prior::Function(func) => params.frame().rows().map(|row| func(&row)).collect(),
        };
        if let Some((idx, value)) = weights
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(AdoError::Config(
                ErrorInfo::new("prior-weight", "prior weight is negative or not finite")
                    .with_context("row", idx.to_string())
                    .with_context("value", value.to_string()),
            ));
        }
        if weights.iter().all(|&w| w == 0.0) {
            return Err(AdoError::Config(
                ErrorInfo::new("prior-zero", "prior assigns no mass to any parameter row")
                    .with_hint("at least one weight must be positive"),
            ));
        }
        Ok(DVector::from_iterator(
            weights.len(),
            weights.into_iter().map(f64::ln),
        ))
    }
}

impl fmt::Debug for Prior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prior::Uniform => f.write_str("Uniform"),
            Prior::Weights(weights) => f.debug_tuple("Weights").field(weights).finish(),
            Prior::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// Log-space posterior over the parameter grid.
///
/// Holds `ℓ = log p(θ | history)` up to an additive constant; normalization
/// happens only when probabilities are read. At least one entry of `ℓ` is
/// always finite.
#[derive(Debug, Clone, PartialEq)]
pub struct Posterior {
    log_prior: DVector<f64>,
    log_post: DVector<f64>,
    version: u64,
}

impl Posterior {
    /// Starts from the given log prior.
    pub fn new(log_prior: DVector<f64>) -> Result<Self, AdoError> {
        check_finite_mass(&log_prior)?;
        Ok(Self {
            log_post: log_prior.clone(),
            log_prior,
            version: 0,
        })
    }

    /// Adds a log-likelihood row: `ℓ ← ℓ + ln P[d, :, y]`.
    pub fn apply(&mut self, log_likelihood: &DVector<f64>) {
        self.log_post += log_likelihood;
        self.version += 1;
    }

    /// Replaces the log posterior wholesale (snapshot restore).
    pub fn replace(&mut self, log_post: DVector<f64>, version: u64) -> Result<(), AdoError> {
        if log_post.len() != self.log_post.len() {
            return Err(AdoError::Serde(
                ErrorInfo::new("posterior-length", "log posterior has the wrong length")
                    .with_context("expected", self.log_post.len().to_string())
                    .with_context("actual", log_post.len().to_string()),
            ));
        }
        check_finite_mass(&log_post)?;
        self.log_post = log_post;
        self.version = version;
        Ok(())
    }

    /// Restores the prior and bumps the version.
    pub fn reset(&mut self) {
        self.log_post = self.log_prior.clone();
        self.version += 1;
    }

    /// Number of updates (and resets) applied so far.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Log posterior shifted so that it log-sums to zero.
    pub fn log_normalized(&self) -> DVector<f64> {
        let norm = numerics::logsumexp(self.log_post.as_slice());
        self.log_post.map(|v| v - norm)
    }

    /// Normalized posterior `π`.
    pub fn probabilities(&self) -> DVector<f64> {
        match numerics::softmax(&self.log_post) {
            Some(probs) => probs,
            // Unreachable while the finite-mass invariant holds.
            None => DVector::from_element(self.log_post.len(), 1.0 / self.log_post.len() as f64),
        }
    }
}

fn check_finite_mass(log_weights: &DVector<f64>) -> Result<(), AdoError> {
    if log_weights.iter().any(|v| v.is_nan() || *v == f64::INFINITY) {
        return Err(AdoError::Numeric(ErrorInfo::new(
            "posterior-invalid",
            "log posterior contains NaN or +inf",
        )));
    }
    if !log_weights.iter().any(|v| v.is_finite()) {
        return Err(AdoError::Numeric(ErrorInfo::new(
            "posterior-no-mass",
            "log posterior carries no finite mass",
        )));
    }
    Ok(())
}

/// Posterior mean `Θᵀ π` over the parameter columns.
pub fn mean(params: &GridFrame, probs: &DVector<f64>) -> DVector<f64> {
    params.values().tr_mul(probs)
}

/// Posterior covariance `Σ π_i (θ_i − μ)(θ_i − μ)ᵀ`.
pub fn covariance(params: &GridFrame, probs: &DVector<f64>) -> DMatrix<f64> {
    let mu = mean(params, probs).transpose();
    let mut centered = params.values().clone();
    for mut row in centered.row_iter_mut() {
        row -= &mu;
    }
    let mut weighted = centered.clone();
    for (mut row, &p) in weighted.row_iter_mut().zip(probs.iter()) {
        row *= p;
    }
    centered.tr_mul(&weighted)
}

/// Marginal posterior of the column `label`: distinct values in first-seen
/// order paired with their total mass.
pub fn marginal(
    params: &GridFrame,
    probs: &DVector<f64>,
    label: &str,
) -> Result<Vec<(f64, f64)>, AdoError> {
    let column = params.column(label)?;
    let mut out: Vec<(f64, f64)> = Vec::new();
    for (&value, &p) in column.iter().zip(probs.iter()) {
        match out.iter_mut().find(|(v, _)| *v == value) {
            Some((_, mass)) => *mass += p,
            None => out.push((value, p)),
        }
    }
    Ok(out)
}
