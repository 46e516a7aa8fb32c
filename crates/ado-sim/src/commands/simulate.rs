use std::error::Error;
use std::path::PathBuf;

use ado_core::{AdoError, ErrorInfo};
use ado_engine::{
    run_session, Engine, NumericWarning, SelectionKind, SessionTrace, SimulatedRespondent,
};
use clap::Args;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::info;

use crate::experiment::ExperimentConfig;

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// YAML experiment description.
    #[arg(long)]
    pub config: PathBuf,
    /// Overrides the number of trials.
    #[arg(long)]
    pub trials: Option<usize>,
    /// Overrides the selection kind (optimal, random, staircase).
    #[arg(long)]
    pub kind: Option<String>,
    /// Staircase step; implies `--kind staircase` and conflicts with any other `--kind`.
    #[arg(long)]
    pub step: Option<usize>,
    /// Overrides the master seed.
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    task: String,
    model: String,
    kind: SelectionKind,
    master_seed: u64,
    truth: IndexMap<String, f64>,
    trace: SessionTrace,
    summary: PosteriorSummary,
    warnings: Vec<NumericWarning>,
}

#[derive(Debug, Serialize)]
struct PosteriorSummary {
    mean: IndexMap<String, f64>,
    sd: IndexMap<String, f64>,
    mode: IndexMap<String, f64>,
    entropy: f64,
    effective_sample_size: f64,
    truth_recovered: bool,
}

fn selection(args: &SimulateArgs, experiment: &ExperimentConfig) -> Result<SelectionKind, Box<dyn Error>> {
    let kind = match &args.kind {
        Some(kind) => kind.parse::<SelectionKind>()?,
        None => experiment.selection()?,
    };
    match (args.kind.is_some(), kind, args.step) {
        (true, SelectionKind::Staircase { .. }, Some(step)) | (false, _, Some(step)) => {
            Ok(SelectionKind::Staircase { step })
        }
        (true, other, Some(_)) => Err(AdoError::Config(
            ErrorInfo::new("step-without-staircase", "--step applies only to staircase selection")
                .with_context("kind", other.as_str()),
        )
        .into()),
        (_, kind, None) => Ok(kind),
    }
}

pub fn run(args: &SimulateArgs) -> Result<(), Box<dyn Error>> {
    let mut experiment = ExperimentConfig::load(&args.config)?;
    if let Some(seed) = args.seed {
        experiment.engine.seed_policy.master_seed = seed;
    }
    let trials = args.trials.unwrap_or(experiment.trials);
    let kind = selection(args, &experiment)?;
    let seed = experiment.engine.seed_policy.master_seed;

    let model = experiment.model()?;
    let truth = experiment.truth_row(model.as_ref())?;
    let tables = experiment.tables(model.as_ref())?;
    let mut respondent = SimulatedRespondent::new(&tables, &truth, seed)?;
    let mut engine = Engine::from_tables(tables, experiment.prior(), experiment.engine.clone())?;
    info!(task = %experiment.task, model = %experiment.model, %kind, trials, seed, "simulating");

    let trace = run_session(&mut engine, &mut respondent, kind, trials)?;
    let labels = engine.grid_param().frame().labels().to_vec();
    let named = |values: &[f64]| -> IndexMap<String, f64> {
        labels.iter().cloned().zip(values.iter().copied()).collect()
    };
    let mode = engine.posterior_mode();
    let summary = PosteriorSummary {
        mean: named(engine.post_mean().as_slice()),
        sd: named(engine.post_sd().as_slice()),
        mode: named(&engine.grid_param().row(mode)),
        entropy: engine.posterior_entropy(),
        effective_sample_size: engine.effective_sample_size(),
        truth_recovered: mode == respondent.truth(),
    };
    let report = SimulationReport {
        task: engine.tables().task().name().to_string(),
        model: engine.tables().descriptor().name().to_string(),
        kind,
        master_seed: seed,
        truth: named(&truth),
        trace,
        summary,
        warnings: engine.warnings().to_vec(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
