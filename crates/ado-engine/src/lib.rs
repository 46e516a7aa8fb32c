#![deny(missing_docs)]

//! Grid-based adaptive design optimization engine.
//!
//! An [`Engine`] holds a log-space posterior over a parameter grid, scores
//! every candidate design by mutual information and folds observed responses
//! back into its belief state. Staircase and random selection are available
//! as baselines.

/// YAML configuration schema and defaults.
pub mod config;
/// Warning ledger mirrored to `tracing`.
pub mod diagnostics;
/// Session state, selection and update entry points.
pub mod engine;
/// Design and parameter grid construction.
pub mod grid;
/// Likelihood tensor construction and validation.
pub mod likelihood;
/// Log-space helpers, entropy and index arithmetic.
pub mod numerics;
/// Priors, the log posterior and posterior summaries.
pub mod posterior;
/// Mutual-information scoring and selection kinds.
pub mod selector;
/// Simulated respondents and scripted sessions.
pub mod simulate;
/// Belief-state snapshots.
pub mod snapshot;
/// Staircase baseline bookkeeping.
pub mod staircase;
/// Shared immutable tables and their cache.
pub mod tables;

pub use config::{EngineConfig, GridSpec, NumericsConfig, SeedPolicy, StaircaseConfig};
pub use diagnostics::NumericWarning;
pub use engine::{Design, Engine, EngineState};
pub use grid::{DesignGrid, ParamGrid};
pub use likelihood::LikelihoodTensor;
pub use posterior::Prior;
pub use selector::{InfoTable, InterruptHandle, SelectionKind};
pub use simulate::{run_session, SessionTrace, SimulatedRespondent, TrialRecord};
pub use snapshot::{EngineSnapshot, SNAPSHOT_SCHEMA};
pub use staircase::StaircaseState;
pub use tables::{EngineTables, TableCache};
