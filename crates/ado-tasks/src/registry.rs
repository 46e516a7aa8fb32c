use ado_core::errors::ErrorInfo;
use ado_core::{AdoError, Model, Task};

use crate::cra::{self, CraModel, CraUtility};
use crate::dd::{self, DdModel, Discounting};
use crate::psi::{self, PsiLink, PsiModel};

/// Every `(task, model)` pair the registry can resolve.
pub const MODEL_NAMES: [(&str, &str); 7] = [
    ("Psi", "Logistic"),
    ("Psi", "Weibull"),
    ("Psi", "Normal"),
    ("DD", "Exponential"),
    ("DD", "Hyperbolic"),
    ("CRA", "Linear"),
    ("CRA", "Exponential"),
];

/// Resolves a task by name (case-insensitive).
pub fn task_by_name(name: &str) -> Result<Task, AdoError> {
    match name.to_ascii_lowercase().as_str() {
        "psi" => psi::task(),
        "dd" => dd::task(),
        "cra" => cra::task(),
        _ => Err(AdoError::Config(
            ErrorInfo::new("unknown-task", "no task registered under this name")
                .with_context("task", name)
                .with_hint("known tasks: Psi, DD, CRA"),
        )),
    }
}

/// Resolves a model of `task` by name (both case-insensitive).
pub fn model_by_name(task: &str, model: &str) -> Result<Box<dyn Model>, AdoError> {
    let task_key = task.to_ascii_lowercase();
    let model_key = model.to_ascii_lowercase();
    let resolved: Box<dyn Model> = match (task_key.as_str(), model_key.as_str()) {
        ("psi", "logistic") => Box::new(PsiModel::new(PsiLink::Logistic)?),
        ("psi", "weibull") => Box::new(PsiModel::new(PsiLink::Weibull)?),
        ("psi", "normal") => Box::new(PsiModel::new(PsiLink::Normal)?),
        ("dd", "exponential") => Box::new(DdModel::new(Discounting::Exponential)?),
        ("dd", "hyperbolic") => Box::new(DdModel::new(Discounting::Hyperbolic)?),
        ("cra", "linear") => Box::new(CraModel::new(CraUtility::Linear)?),
        ("cra", "exponential") => Box::new(CraModel::new(CraUtility::Exponential)?),
        _ => {
            // Distinguish an unknown task from an unknown model of a known task.
            task_by_name(task)?;
            let known: Vec<&str> = MODEL_NAMES
                .iter()
                .filter(|(t, _)| t.eq_ignore_ascii_case(task))
                .map(|(_, m)| *m)
                .collect();
            return Err(AdoError::Config(
                ErrorInfo::new("unknown-model", "no model registered under this name")
                    .with_context("task", task)
                    .with_context("model", model)
                    .with_hint(format!("known models: {}", known.join(", "))),
            ));
        }
    };
    Ok(resolved)
}
