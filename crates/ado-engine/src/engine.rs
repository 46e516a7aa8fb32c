use std::sync::Arc;

use ado_core::errors::ErrorInfo;
use ado_core::rng::{SUBSTREAM_RANDOM_DESIGN, SUBSTREAM_STAIRCASE_START};
use ado_core::{AdoError, Model, RngHandle};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{EngineConfig, GridSpec, NumericsConfig};
use crate::diagnostics::{Diagnostics, NumericWarning};
use crate::grid::{DesignGrid, ParamGrid};
use crate::numerics;
use crate::posterior::{self, Posterior, Prior};
use crate::selector::{self, InfoTable, InterruptHandle, SelectionKind};
use crate::staircase::{self, StaircaseState};
use crate::tables::{self, EngineTables};

/// Lifecycle of an engine between selections and observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineState {
    /// Waiting for a selection or an observation.
    Ready,
    /// A design was issued and no observation has been folded in since.
    SelectionIssued,
}

/// Design chosen by [`Engine::get_design`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Design {
    /// Row index into the design grid.
    pub index: usize,
    /// Design coordinates in the task's declared order.
    pub values: Vec<f64>,
}

#[derive(Debug, Clone)]
struct CachedInfo {
    version: u64,
    table: InfoTable,
}

/// Adaptive design optimization engine over fixed grids.
///
/// Owns the belief state for one experimental session. Tables built from the
/// model and grids are shared through an [`Arc`] and never change after
/// construction.
#[derive(Debug)]
pub struct Engine {
    tables: Arc<EngineTables>,
    config: EngineConfig,
    posterior: Posterior,
    cache: Option<CachedInfo>,
    staircase: StaircaseState,
    staircase_start: usize,
    staircase_axis: usize,
    rng: RngHandle,
    random_draws: u64,
    responses: Vec<i64>,
    diagnostics: Diagnostics,
    state: EngineState,
    collapsed: bool,
    interrupt: InterruptHandle,
}

impl Engine {
    /// Builds tables for `model` over `grids` and starts a session.
    pub fn new(
        model: &dyn Model,
        grids: &GridSpec,
        prior: Prior,
        config: EngineConfig,
    ) -> Result<Self, AdoError> {
        let tables = EngineTables::build(model, grids, &config.numerics)?;
        Self::from_tables(Arc::new(tables), prior, config)
    }

    /// Starts a session on tables that may be shared with other engines.
    ///
    /// The tolerances in `config.numerics` that shape the tables must match
    /// the ones the tables were built with.
    pub fn from_tables(
        tables: Arc<EngineTables>,
        prior: Prior,
        config: EngineConfig,
    ) -> Result<Self, AdoError> {
        tables::validate_numerics(&config.numerics)?;
        check_table_numerics(tables.numerics(), &config.numerics)?;
        let designs = tables.designs();
        let staircase_axis = resolve_axis(designs, config.staircase.axis.as_deref())?;
        for (name, value) in [
            ("down_multiplier", config.staircase.down_multiplier),
            ("up_multiplier", config.staircase.up_multiplier),
        ] {
            if value == 0 {
                return Err(AdoError::Config(
                    ErrorInfo::new("staircase-multiplier", "staircase multiplier must be positive")
                        .with_context("variable", name),
                ));
            }
        }
        let seed = config.seed_policy.master_seed;
        let staircase_start = match config.staircase.start_index {
            Some(index) if index >= designs.len() => {
                return Err(AdoError::Config(
                    ErrorInfo::new("staircase-start", "staircase start index is outside the design grid")
                        .with_context("index", index.to_string())
                        .with_context("designs", designs.len().to_string()),
                ));
            }
            Some(index) => index,
            None => RngHandle::substream(seed, SUBSTREAM_STAIRCASE_START).index(designs.len()),
        };

        let posterior = Posterior::new(prior.log_weights(tables.params())?)?;
        let diagnostics = Diagnostics::with_history(tables.warnings());
        debug!(
            model = tables.descriptor().name(),
            designs = designs.len(),
            params = tables.params().len(),
            responses = tables.tensor().n_responses(),
            "engine ready"
        );
        let mut engine = Self {
            tables,
            config,
            posterior,
            cache: None,
            staircase: StaircaseState::new(staircase_start),
            staircase_start,
            staircase_axis,
            rng: RngHandle::substream(seed, SUBSTREAM_RANDOM_DESIGN),
            random_draws: 0,
            responses: Vec::new(),
            diagnostics,
            state: EngineState::Ready,
            collapsed: false,
            interrupt: InterruptHandle::default(),
        };
        engine.check_collapse();
        Ok(engine)
    }

    /// Chooses the next design according to `kind`.
    ///
    /// Never changes the posterior. Every selection, whatever its kind,
    /// becomes the staircase's previous design.
    pub fn get_design(&mut self, kind: SelectionKind) -> Result<Design, AdoError> {
        let index = match kind {
            SelectionKind::Optimal => {
                let mi = &self.information()?.mutual_info;
                numerics::argmax(mi.as_slice()).ok_or_else(|| {
                    AdoError::Numeric(ErrorInfo::new(
                        "mutual-info-undefined",
                        "mutual information is NaN for every design",
                    ))
                })?
            }
            SelectionKind::Random => {
                self.random_draws += 1;
                self.rng.index(self.tables.designs().len())
            }
            SelectionKind::Staircase { step } => {
                if step == 0 {
                    return Err(AdoError::Config(
                        ErrorInfo::new("staircase-step", "staircase step must be positive")
                            .with_hint("use SelectionKind::Staircase { step: 1 } or larger"),
                    ));
                }
                staircase::next_index(
                    &self.staircase,
                    &self.tables.designs().shape(),
                    self.staircase_axis,
                    step,
                    &self.config.staircase,
                )
            }
        };
        self.staircase.idx_prev = index;
        self.state = EngineState::SelectionIssued;
        debug!(kind = kind.as_str(), index, version = self.posterior.version(), "design selected");
        Ok(Design {
            index,
            values: self.tables.designs().row(index),
        })
    }

    /// Folds one observation into the posterior.
    ///
    /// `design` is snapped to the nearest grid row, whose index is returned.
    pub fn update(&mut self, design: &[f64], response: i64) -> Result<usize, AdoError> {
        let index = self.tables.designs().nearest(design)?;
        self.update_index(index, response)?;
        Ok(index)
    }

    /// Folds one observation for design row `index` into the posterior.
    pub fn update_index(&mut self, index: usize, response: i64) -> Result<(), AdoError> {
        let designs = self.tables.designs().len();
        if index >= designs {
            return Err(AdoError::Domain(
                ErrorInfo::new("design-index", "design index is outside the design grid")
                    .with_context("index", index.to_string())
                    .with_context("designs", designs.to_string()),
            ));
        }
        let slot = self.tables.task().response_index(response).ok_or_else(|| {
            let alphabet: Vec<String> = self
                .tables
                .task()
                .responses()
                .iter()
                .map(i64::to_string)
                .collect();
            AdoError::Domain(
                ErrorInfo::new("response-alphabet", "response is not in the task's alphabet")
                    .with_context("response", response.to_string())
                    .with_context("alphabet", alphabet.join(",")),
            )
        })?;
        let row = self.tables.tensor().log_likelihood_row(index, slot);
        self.posterior.apply(&row);
        self.responses.push(response);
        self.staircase.y_prev = Some(response);
        self.state = EngineState::Ready;
        debug!(index, response, version = self.posterior.version(), "posterior updated");
        self.check_collapse();
        Ok(())
    }

    /// Restores the prior, clears history and warnings, and rewinds the
    /// random and staircase state to their initial values.
    pub fn reset(&mut self) {
        self.posterior.reset();
        self.cache = None;
        self.responses.clear();
        self.staircase = StaircaseState::new(self.staircase_start);
        self.rng = RngHandle::substream(self.config.seed_policy.master_seed, SUBSTREAM_RANDOM_DESIGN);
        self.random_draws = 0;
        self.diagnostics = Diagnostics::with_history(self.tables.warnings());
        self.state = EngineState::Ready;
        self.collapsed = false;
        self.check_collapse();
    }

    /// Information table for the current posterior, recomputed only when the
    /// posterior changed since the last call.
    pub fn information(&mut self) -> Result<&InfoTable, AdoError> {
        let version = self.posterior.version();
        let stale = self.cache.as_ref().map_or(true, |c| c.version != version);
        if stale {
            let probs = self.posterior.probabilities();
            let table = selector::compute_info(self.tables.tensor(), &probs, Some(&self.interrupt))?;
            self.cache = Some(CachedInfo { version, table });
        }
        match &self.cache {
            Some(cached) => Ok(&cached.table),
            None => Err(AdoError::Numeric(ErrorInfo::new(
                "mutual-info-missing",
                "information table was not computed",
            ))),
        }
    }

    /// Mutual information of every design under the current posterior.
    pub fn mutual_info(&mut self) -> Result<&DVector<f64>, AdoError> {
        Ok(&self.information()?.mutual_info)
    }

    /// Posterior mean of each parameter, in model order.
    pub fn post_mean(&self) -> DVector<f64> {
        posterior::mean(self.tables.params().frame(), &self.posterior.probabilities())
    }

    /// Posterior covariance matrix.
    pub fn post_cov(&self) -> DMatrix<f64> {
        posterior::covariance(self.tables.params().frame(), &self.posterior.probabilities())
    }

    /// Posterior standard deviation of each parameter.
    pub fn post_sd(&self) -> DVector<f64> {
        self.post_cov().diagonal().map(|v| v.max(0.0).sqrt())
    }

    /// Marginal posterior of one parameter as `(value, mass)` pairs.
    pub fn marg_post(&self, param: &str) -> Result<Vec<(f64, f64)>, AdoError> {
        posterior::marginal(
            self.tables.params().frame(),
            &self.posterior.probabilities(),
            param,
        )
    }

    /// Normalized posterior `π`.
    pub fn posterior(&self) -> DVector<f64> {
        self.posterior.probabilities()
    }

    /// Normalized log posterior.
    pub fn log_posterior(&self) -> DVector<f64> {
        self.posterior.log_normalized()
    }

    /// Parameter row holding the most posterior mass.
    pub fn posterior_mode(&self) -> usize {
        numerics::argmax(self.posterior.probabilities().as_slice()).unwrap_or(0)
    }

    /// Effective sample size `1 / Σ π²`.
    pub fn effective_sample_size(&self) -> f64 {
        numerics::effective_sample_size(&self.posterior.probabilities())
    }

    /// Shannon entropy of the posterior in nats.
    pub fn posterior_entropy(&self) -> f64 {
        numerics::entropy(self.posterior.probabilities().as_slice())
    }

    /// Design grid.
    pub fn grid_design(&self) -> &DesignGrid {
        self.tables.designs()
    }

    /// Parameter grid.
    pub fn grid_param(&self) -> &ParamGrid {
        self.tables.params()
    }

    /// Shared tables.
    pub fn tables(&self) -> &Arc<EngineTables> {
        &self.tables
    }

    /// Configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Observed responses, oldest first.
    pub fn responses(&self) -> &[i64] {
        &self.responses
    }

    /// Numerical warnings raised so far.
    pub fn warnings(&self) -> &[NumericWarning] {
        self.diagnostics.warnings()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Posterior version; bumped by every update and reset.
    pub fn version(&self) -> u64 {
        self.posterior.version()
    }

    /// Staircase bookkeeping.
    pub fn staircase_state(&self) -> &StaircaseState {
        &self.staircase
    }

    /// Handle that can interrupt an in-flight optimal selection from another thread.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    pub(crate) fn posterior_state(&self) -> &Posterior {
        &self.posterior
    }

    pub(crate) fn random_draws(&self) -> u64 {
        self.random_draws
    }

    pub(crate) fn restore_parts(
        &mut self,
        log_post: DVector<f64>,
        version: u64,
        responses: Vec<i64>,
        staircase: StaircaseState,
        random_draws: u64,
    ) -> Result<(), AdoError> {
        let designs = self.tables.designs().len();
        if staircase.idx_prev >= designs {
            return Err(AdoError::Serde(
                ErrorInfo::new("snapshot-staircase", "staircase index is outside the design grid")
                    .with_context("index", staircase.idx_prev.to_string()),
            ));
        }
        self.posterior.replace(log_post, version)?;
        let mut rng = RngHandle::substream(self.config.seed_policy.master_seed, SUBSTREAM_RANDOM_DESIGN);
        for _ in 0..random_draws {
            rng.index(designs);
        }
        self.rng = rng;
        self.random_draws = random_draws;
        self.responses = responses;
        self.staircase = staircase;
        self.cache = None;
        self.state = EngineState::Ready;
        self.collapsed = self.effective_sample_size() < self.config.numerics.collapse_ess;
        Ok(())
    }

    fn check_collapse(&mut self) {
        let ess = self.effective_sample_size();
        let threshold = self.config.numerics.collapse_ess;
        if ess < threshold {
            if !self.collapsed {
                self.collapsed = true;
                self.diagnostics.record(NumericWarning::PosteriorCollapse {
                    ess,
                    threshold,
                    version: self.posterior.version(),
                });
            }
        } else {
            self.collapsed = false;
        }
    }
}

fn check_table_numerics(built: &NumericsConfig, requested: &NumericsConfig) -> Result<(), AdoError> {
    let pairs = [
        ("clip_epsilon", built.clip_epsilon, requested.clip_epsilon),
        ("sum_tolerance", built.sum_tolerance, requested.sum_tolerance),
        (
            "renormalize_tolerance",
            built.renormalize_tolerance,
            requested.renormalize_tolerance,
        ),
    ];
    match pairs.iter().find(|(_, built, requested)| built != requested) {
        Some((name, built, requested)) => Err(AdoError::Config(
            ErrorInfo::new("numerics-mismatch", "engine tolerances differ from the shared tables")
                .with_context("variable", *name)
                .with_context("tables", built.to_string())
                .with_context("engine", requested.to_string())
                .with_hint("build the tables with the engine's numerics section"),
        )),
        None => Ok(()),
    }
}

fn resolve_axis(designs: &DesignGrid, axis: Option<&str>) -> Result<usize, AdoError> {
    match axis {
        None => Ok(0),
        Some(name) => designs.frame().column_index(name).ok_or_else(|| {
            AdoError::Config(
                ErrorInfo::new("staircase-axis", "staircase axis is not a design variable")
                    .with_context("variable", name)
                    .with_context("declared", designs.frame().labels().join(",")),
            )
        }),
    }
}
