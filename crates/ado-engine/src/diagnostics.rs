use serde::{Deserialize, Serialize};
use tracing::warn;

/// Non-fatal numerical conditions observed while building or updating an engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NumericWarning {
    /// Likelihood cells were clipped into `[epsilon, 1 - epsilon]`.
    LikelihoodClipped {
        /// Number of `(design, parameter, response)` cells that were clipped.
        cells: usize,
        /// Clip bound used.
        epsilon: f64,
    },
    /// Raw likelihoods did not sum to one along the response axis.
    LikelihoodRenormalized {
        /// Number of `(design, parameter)` pairs that needed renormalization.
        pairs: usize,
        /// Largest absolute deviation of a raw sum from one.
        max_deviation: f64,
    },
    /// Posterior effective sample size fell below the configured threshold.
    PosteriorCollapse {
        /// Effective sample size `1 / Σ π²`.
        ess: f64,
        /// Configured threshold.
        threshold: f64,
        /// Posterior version at which the collapse was detected.
        version: u64,
    },
}

impl NumericWarning {
    /// Emits the warning as a `tracing` event.
    pub fn emit(&self) {
        match self {
            NumericWarning::LikelihoodClipped { cells, epsilon } => {
                warn!(cells, epsilon, "likelihood values clipped");
            }
            NumericWarning::LikelihoodRenormalized {
                pairs,
                max_deviation,
            } => {
                warn!(pairs, max_deviation, "likelihood renormalized along responses");
            }
            NumericWarning::PosteriorCollapse {
                ess,
                threshold,
                version,
            } => {
                warn!(ess, threshold, version, "posterior mass collapsed");
            }
        }
    }
}

/// Ledger of warnings raised by one engine, mirrored to `tracing`.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    warnings: Vec<NumericWarning>,
}

impl Diagnostics {
    /// Creates a ledger holding warnings that were already emitted elsewhere.
    pub fn with_history(warnings: &[NumericWarning]) -> Self {
        Self {
            warnings: warnings.to_vec(),
        }
    }

    /// Emits and records a warning.
    pub fn record(&mut self, warning: NumericWarning) {
        warning.emit();
        self.warnings.push(warning);
    }

    /// Warnings recorded so far, oldest first.
    pub fn warnings(&self) -> &[NumericWarning] {
        &self.warnings
    }
}
