use std::error::Error;
use std::path::PathBuf;

use ado_engine::NumericWarning;
use clap::Args;
use serde::Serialize;

use crate::experiment::ExperimentConfig;

#[derive(Args, Debug)]
pub struct GridArgs {
    /// YAML experiment description.
    #[arg(long)]
    pub config: PathBuf,
}

#[derive(Debug, Serialize)]
struct GridReport {
    task: String,
    model: String,
    design_variables: Vec<String>,
    parameters: Vec<String>,
    responses: Vec<i64>,
    designs: usize,
    params: usize,
    dropped_params: usize,
    fingerprint: String,
    warnings: Vec<NumericWarning>,
}

pub fn run(args: &GridArgs) -> Result<(), Box<dyn Error>> {
    let experiment = ExperimentConfig::load(&args.config)?;
    let model = experiment.model()?;
    let tables = experiment.tables(model.as_ref())?;
    let report = GridReport {
        task: tables.task().name().to_string(),
        model: tables.descriptor().name().to_string(),
        design_variables: tables.task().designs().to_vec(),
        parameters: tables.descriptor().params().to_vec(),
        responses: tables.task().responses().to_vec(),
        designs: tables.designs().len(),
        params: tables.params().len(),
        dropped_params: tables.params().dropped(),
        fingerprint: tables.fingerprint().to_string(),
        warnings: tables.warnings().to_vec(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
