use ado_core::errors::ErrorInfo;
use ado_core::{AdoError, Model};
use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::config::NumericsConfig;
use crate::diagnostics::NumericWarning;
use crate::grid::{DesignGrid, ParamGrid};
use crate::numerics::xlogx;

/// Precomputed `P[d, θ, y]` stored as one `N_D × N_Θ` slice per response,
/// together with `ln P` and the per-cell conditional entropy.
#[derive(Debug, Clone, PartialEq)]
pub struct LikelihoodTensor {
    slices: Vec<DMatrix<f64>>,
    log_slices: Vec<DMatrix<f64>>,
    h_cond_raw: DMatrix<f64>,
}

impl LikelihoodTensor {
    /// Evaluates `model` over the full grids, validates, clips and renormalizes.
    ///
    /// Returns the tensor and any warnings raised while repairing it.
    pub fn build(
        model: &dyn Model,
        designs: &DesignGrid,
        params: &ParamGrid,
        numerics: &NumericsConfig,
    ) -> Result<(Self, Vec<NumericWarning>), AdoError> {
        let n_d = designs.len();
        let n_t = params.len();
        let responses = model.task().responses();
        let tol = numerics.sum_tolerance;

        let mut slices = Vec::with_capacity(responses.len());
        for &response in responses {
            let slice = model.likelihood(designs.frame(), params.frame(), response)?;
            if slice.shape() != (n_d, n_t) {
                return Err(AdoError::Domain(
                    ErrorInfo::new("likelihood-shape", "likelihood slice has the wrong shape")
                        .with_context("model", model.descriptor().name())
                        .with_context("response", response.to_string())
                        .with_context("expected", format!("{n_d}x{n_t}"))
                        .with_context("actual", format!("{}x{}", slice.nrows(), slice.ncols())),
                ));
            }
            if let Some((idx, value)) = slice
                .iter()
                .enumerate()
                .find(|(_, v)| !v.is_finite() || **v < -tol || **v > 1.0 + tol)
            {
                // Column-major: idx = param * n_d + design.
                return Err(AdoError::Domain(
                    ErrorInfo::new("likelihood-range", "likelihood value outside [0, 1]")
                        .with_context("model", model.descriptor().name())
                        .with_context("response", response.to_string())
                        .with_context("design", (idx % n_d).to_string())
                        .with_context("param", (idx / n_d).to_string())
                        .with_context("value", value.to_string()),
                ));
            }
            slices.push(slice);
        }

        let sums = slices
            .iter()
            .fold(DMatrix::<f64>::zeros(n_d, n_t), |acc, slice| acc + slice);
        let mut renormalized = 0usize;
        let mut max_deviation = 0.0f64;
        for (idx, sum) in sums.iter().enumerate() {
            let deviation = (sum - 1.0).abs();
            if deviation > tol {
                return Err(AdoError::Domain(
                    ErrorInfo::new(
                        "likelihood-sum",
                        "likelihood does not sum to one across responses",
                    )
                    .with_context("model", model.descriptor().name())
                    .with_context("design", (idx % n_d).to_string())
                    .with_context("param", (idx / n_d).to_string())
                    .with_context("sum", sum.to_string()),
                ));
            }
            if deviation > numerics.renormalize_tolerance {
                renormalized += 1;
            }
            max_deviation = max_deviation.max(deviation);
        }

        let mut warnings = Vec::new();
        if slices.len() == 1 {
            // A single response is certain everywhere.
            slices[0].fill(1.0);
        } else {
            let eps = numerics.clip_epsilon;
            let mut clipped = 0usize;
            for slice in slices.iter_mut() {
                for value in slice.iter_mut() {
                    let bounded = value.clamp(eps, 1.0 - eps);
                    if bounded != *value {
                        clipped += 1;
                        *value = bounded;
                    }
                }
            }
            let clipped_sums = slices
                .iter()
                .fold(DMatrix::<f64>::zeros(n_d, n_t), |acc, slice| acc + slice);
            for slice in slices.iter_mut() {
                slice.component_div_assign(&clipped_sums);
            }
            if clipped > 0 {
                warnings.push(NumericWarning::LikelihoodClipped {
                    cells: clipped,
                    epsilon: eps,
                });
            }
        }
        if renormalized > 0 {
            warnings.push(NumericWarning::LikelihoodRenormalized {
                pairs: renormalized,
                max_deviation,
            });
        }

        let log_slices: Vec<DMatrix<f64>> = slices.iter().map(|s| s.map(f64::ln)).collect();
        let h_cond_raw = conditional_entropy(&slices, n_d, n_t);
        debug!(
            model = model.descriptor().name(),
            designs = n_d,
            params = n_t,
            responses = slices.len(),
            "likelihood tensor built"
        );

        Ok((
            Self {
                slices,
                log_slices,
                h_cond_raw,
            },
            warnings,
        ))
    }

    /// Builds a tensor from explicit slices, bypassing model evaluation.
    ///
    /// Slices must share one shape and be row-stochastic along the response
    /// axis; they are used as given apart from `ln` and entropy precomputation.
    pub fn from_slices(slices: Vec<DMatrix<f64>>) -> Result<Self, AdoError> {
        let Some(first) = slices.first() else {
            return Err(AdoError::Config(ErrorInfo::new(
                "likelihood-empty",
                "no response slices supplied",
            )));
        };
        let (n_d, n_t) = first.shape();
        if let Some(idx) = slices.iter().position(|s| s.shape() != (n_d, n_t)) {
            return Err(AdoError::Domain(
                ErrorInfo::new("likelihood-shape", "response slices differ in shape")
                    .with_context("response", idx.to_string()),
            ));
        }
        let log_slices: Vec<DMatrix<f64>> = slices.iter().map(|s| s.map(f64::ln)).collect();
        let h_cond_raw = conditional_entropy(&slices, n_d, n_t);
        Ok(Self {
            slices,
            log_slices,
            h_cond_raw,
        })
    }

    /// Number of designs `N_D`.
    pub fn n_designs(&self) -> usize {
        self.h_cond_raw.nrows()
    }

    /// Number of parameter rows `N_Θ`.
    pub fn n_params(&self) -> usize {
        self.h_cond_raw.ncols()
    }

    /// Number of responses `R`.
    pub fn n_responses(&self) -> usize {
        self.slices.len()
    }

    /// `P[:, :, response]`.
    pub fn slice(&self, response: usize) -> &DMatrix<f64> {
        &self.slices[response]
    }

    /// All response slices in alphabet order.
    pub fn slices(&self) -> &[DMatrix<f64>] {
        &self.slices
    }

    /// `P[design, param, response]`.
    pub fn probability(&self, design: usize, param: usize, response: usize) -> f64 {
        self.slices[response][(design, param)]
    }

    /// `ln P[design, :, response]` as a column vector over Θ.
    pub fn log_likelihood_row(&self, design: usize, response: usize) -> DVector<f64> {
        self.log_slices[response].row(design).transpose()
    }

    /// `H_cond_raw[d, θ] = −Σ_y P[d,θ,y] ln P[d,θ,y]`.
    pub fn conditional_entropy(&self) -> &DMatrix<f64> {
        &self.h_cond_raw
    }
}

fn conditional_entropy(slices: &[DMatrix<f64>], n_d: usize, n_t: usize) -> DMatrix<f64> {
    let mut h = DMatrix::<f64>::zeros(n_d, n_t);
    for slice in slices {
        h.zip_apply(slice, |acc, p| *acc -= xlogx(p));
    }
    h
}
