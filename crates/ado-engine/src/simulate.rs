use ado_core::errors::ErrorInfo;
use ado_core::rng::SUBSTREAM_RESPONDENT;
use ado_core::{AdoError, RngHandle};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::Engine;
use crate::selector::SelectionKind;
use crate::tables::EngineTables;

/// Respondent answering from the model's own likelihood at a fixed
/// parameter row.
#[derive(Debug, Clone)]
pub struct SimulatedRespondent {
    truth: usize,
    rng: RngHandle,
}

impl SimulatedRespondent {
    /// Places the respondent at the grid row equal to `truth`.
    pub fn new(tables: &EngineTables, truth: &[f64], master_seed: u64) -> Result<Self, AdoError> {
        let index = tables.params().position(truth).ok_or_else(|| {
            AdoError::Config(
                ErrorInfo::new("truth-off-grid", "true parameters are not a parameter grid row")
                    .with_context(
                        "truth",
                        truth.iter().map(f64::to_string).collect::<Vec<_>>().join(","),
                    )
                    .with_hint("pick values from the parameter grid"),
            )
        })?;
        Ok(Self::at_index(index, master_seed))
    }

    /// Places the respondent at parameter row `truth`.
    pub fn at_index(truth: usize, master_seed: u64) -> Self {
        Self {
            truth,
            rng: RngHandle::substream(master_seed, SUBSTREAM_RESPONDENT),
        }
    }

    /// Parameter row the respondent answers from.
    pub fn truth(&self) -> usize {
        self.truth
    }

    /// Draws a response to design row `design`.
    pub fn respond(&mut self, tables: &EngineTables, design: usize) -> i64 {
        let tensor = tables.tensor();
        let responses = tables.task().responses();
        let draw = self.rng.unit();
        let mut cumulative = 0.0;
        for (slot, &response) in responses.iter().enumerate() {
            cumulative += tensor.probability(design, self.truth, slot);
            if draw < cumulative {
                return response;
            }
        }
        responses[responses.len() - 1]
    }
}

/// One trial of a simulated session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// Trial number, starting at 1.
    pub trial: usize,
    /// Design row issued.
    pub design_index: usize,
    /// Design coordinates.
    pub design: Vec<f64>,
    /// Simulated response.
    pub response: i64,
    /// Posterior mode after the update.
    pub mode_index: usize,
    /// Posterior mass on the true parameter row after the update.
    pub truth_mass: f64,
    /// Effective sample size after the update.
    pub ess: f64,
}

/// Result of [`run_session`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTrace {
    /// Selection strategy used on every trial.
    pub kind: SelectionKind,
    /// Parameter row the respondent answered from.
    pub truth_index: usize,
    /// Per-trial records.
    pub trials: Vec<TrialRecord>,
    /// Posterior mean after the last trial, in model parameter order.
    pub final_mean: Vec<f64>,
    /// Posterior standard deviation after the last trial.
    pub final_sd: Vec<f64>,
}

impl SessionTrace {
    /// Posterior mass on the truth after the last trial, or `None` for an
    /// empty session.
    pub fn final_truth_mass(&self) -> Option<f64> {
        self.trials.last().map(|t| t.truth_mass)
    }
}

/// Runs `trials` rounds of select, respond and update.
pub fn run_session(
    engine: &mut Engine,
    respondent: &mut SimulatedRespondent,
    kind: SelectionKind,
    trials: usize,
) -> Result<SessionTrace, AdoError> {
    let tables = std::sync::Arc::clone(engine.tables());
    let mut records = Vec::with_capacity(trials);
    for trial in 1..=trials {
        let design = engine.get_design(kind)?;
        let response = respondent.respond(&tables, design.index);
        engine.update_index(design.index, response)?;
        let posterior = engine.posterior();
        records.push(TrialRecord {
            trial,
            design_index: design.index,
            design: design.values,
            response,
            mode_index: engine.posterior_mode(),
            truth_mass: posterior[respondent.truth()],
            ess: engine.effective_sample_size(),
        });
    }
    let trace = SessionTrace {
        kind,
        truth_index: respondent.truth(),
        trials: records,
        final_mean: engine.post_mean().iter().copied().collect(),
        final_sd: engine.post_sd().iter().copied().collect(),
    };
    info!(
        kind = kind.as_str(),
        trials,
        truth_mass = trace.final_truth_mass().unwrap_or(f64::NAN),
        "session finished"
    );
    Ok(trace)
}
