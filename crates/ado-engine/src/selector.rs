use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ado_core::errors::ErrorInfo;
use ado_core::AdoError;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::likelihood::LikelihoodTensor;
use crate::numerics::xlogx;

/// Strategy used to pick the next design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SelectionKind {
    /// Design maximizing mutual information under the current posterior.
    #[default]
    Optimal,
    /// Step along the staircase axis by `step` grid positions (scaled by the
    /// configured multipliers).
    Staircase {
        /// Positive base step in grid positions.
        step: usize,
    },
    /// Uniformly random design row.
    Random,
}

impl SelectionKind {
    /// Short lowercase name of the strategy.
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionKind::Optimal => "optimal",
            SelectionKind::Staircase { .. } => "staircase",
            SelectionKind::Random => "random",
        }
    }
}

impl fmt::Display for SelectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionKind::Staircase { step } => write!(f, "staircase(step={step})"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl FromStr for SelectionKind {
    type Err = AdoError;

    /// Parses `optimal`, `random`, `staircase` (step 1) or `staircase:<step>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || {
            AdoError::Config(
                ErrorInfo::new("unknown-kind", "unknown design selection kind")
                    .with_context("kind", s)
                    .with_hint("expected optimal, random, staircase or staircase:<step>"),
            )
        };
        match s {
            "optimal" => Ok(SelectionKind::Optimal),
            "random" => Ok(SelectionKind::Random),
            "staircase" => Ok(SelectionKind::Staircase { step: 1 }),
            other => {
                let step = other
                    .strip_prefix("staircase:")
                    .ok_or_else(unknown)?
                    .parse::<usize>()
                    .map_err(|_| unknown())?;
                Ok(SelectionKind::Staircase { step })
            }
        }
    }
}

/// Per-design information quantities under one posterior.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoTable {
    /// `I(Y_d; Θ)` for every design.
    pub mutual_info: DVector<f64>,
    /// `H(Y_d)` under the posterior predictive.
    pub marginal_entropy: DVector<f64>,
    /// `E_θ[H(Y_d | θ)]`.
    pub conditional_entropy: DVector<f64>,
}

/// Cooperative interrupt flag for in-flight selections.
///
/// Setting the flag makes the next check inside an optimal selection abandon
/// the computation; belief state is never touched by selection.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle {
    flag: Arc<AtomicBool>,
}

impl InterruptHandle {
    /// Requests that the running (or next) computation stop.
    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns whether an interrupt is pending.
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Consumes a pending interrupt, returning whether one was set.
    pub(crate) fn take(&self) -> bool {
        self.flag.swap(false, Ordering::SeqCst)
    }
}

/// Computes mutual information for every design.
///
/// `Q[:, y] = P[:, :, y] · π`, `H_marginal = −Σ_y Q ln Q`,
/// `H_cond = H_cond_raw · π`, `MI = H_marginal − H_cond`.
pub fn compute_info(
    tensor: &LikelihoodTensor,
    probs: &DVector<f64>,
    interrupt: Option<&InterruptHandle>,
) -> Result<InfoTable, AdoError> {
    let mut marginal_entropy = DVector::<f64>::zeros(tensor.n_designs());
    for (response, slice) in tensor.slices().iter().enumerate() {
        if let Some(handle) = interrupt {
            if handle.take() {
                return Err(AdoError::Interrupted(
                    ErrorInfo::new("selection-interrupted", "mutual information computation dropped")
                        .with_context("response", response.to_string()),
                ));
            }
        }
        let predictive = slice * probs;
        marginal_entropy.zip_apply(&predictive, |acc, q| *acc -= xlogx(q));
    }
    let conditional_entropy = tensor.conditional_entropy() * probs;
    let mutual_info = &marginal_entropy - &conditional_entropy;
    Ok(InfoTable {
        mutual_info,
        marginal_entropy,
        conditional_entropy,
    })
}
