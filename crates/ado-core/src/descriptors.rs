use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{AdoError, ErrorInfo};

/// Experimental task: the design variables an experimenter controls and the
/// finite set of responses a trial can produce.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Task {
    name: String,
    designs: Vec<String>,
    responses: Vec<i64>,
}

impl Task {
    /// Creates a task descriptor, rejecting empty or duplicated labels.
    pub fn new<I, S, R>(name: impl Into<String>, designs: I, responses: R) -> Result<Self, AdoError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        R: IntoIterator<Item = i64>,
    {
        let name = name.into();
        let designs: Vec<String> = designs.into_iter().map(Into::into).collect();
        let responses: Vec<i64> = responses.into_iter().collect();
        if designs.is_empty() {
            return Err(AdoError::Config(
                ErrorInfo::new("task-no-designs", "task declares no design variables")
                    .with_context("task", name),
            ));
        }
        check_unique_labels(&name, "design", &designs)?;
        if responses.is_empty() {
            return Err(AdoError::Config(
                ErrorInfo::new("task-no-responses", "task declares an empty response alphabet")
                    .with_context("task", name),
            ));
        }
        for (idx, response) in responses.iter().enumerate() {
            if responses[..idx].contains(response) {
                return Err(AdoError::Config(
                    ErrorInfo::new("task-duplicate-response", "response listed twice")
                        .with_context("task", name)
                        .with_context("response", response.to_string()),
                ));
            }
        }
        Ok(Self {
            name,
            designs,
            responses,
        })
    }

    /// Human readable task name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordered design variable labels.
    pub fn designs(&self) -> &[String] {
        &self.designs
    }

    /// Ordered response alphabet.
    pub fn responses(&self) -> &[i64] {
        &self.responses
    }

    /// Position of `response` within the alphabet.
    pub fn response_index(&self, response: i64) -> Option<usize> {
        self.responses.iter().position(|&y| y == response)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task({:?}, design={:?})", self.name, self.designs)
    }
}

/// Admissibility predicate applied to a single model parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Admissibility {
    /// Any finite value.
    #[default]
    Any,
    /// Strictly positive.
    Positive,
    /// Zero or positive.
    NonNegative,
    /// Strictly inside `(0, 1)`.
    OpenUnit,
    /// Inside `[0, 1]`.
    ClosedUnit,
}

impl Admissibility {
    /// Returns whether `value` satisfies the predicate.
    pub fn admits(&self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self {
            Admissibility::Any => true,
            Admissibility::Positive => value > 0.0,
            Admissibility::NonNegative => value >= 0.0,
            Admissibility::OpenUnit => value > 0.0 && value < 1.0,
            Admissibility::ClosedUnit => (0.0..=1.0).contains(&value),
        }
    }
}

/// Static description of a model: which task it explains, the ordered
/// parameter labels and the admissibility predicate of each parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelDescriptor {
    name: String,
    task: Task,
    params: Vec<String>,
    constraints: BTreeMap<String, Admissibility>,
}

impl ModelDescriptor {
    /// Creates a descriptor whose parameters are all unconstrained.
    pub fn new<I, S>(name: impl Into<String>, task: Task, params: I) -> Result<Self, AdoError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let params: Vec<String> = params.into_iter().map(Into::into).collect();
        if params.is_empty() {
            return Err(AdoError::Config(
                ErrorInfo::new("model-no-params", "model declares no parameters")
                    .with_context("model", name),
            ));
        }
        check_unique_labels(&name, "parameter", &params)?;
        Ok(Self {
            name,
            task,
            params,
            constraints: BTreeMap::new(),
        })
    }

    /// Attaches an admissibility predicate to a declared parameter.
    pub fn with_constraint(
        mut self,
        param: &str,
        admissibility: Admissibility,
    ) -> Result<Self, AdoError> {
        if !self.params.iter().any(|p| p == param) {
            return Err(AdoError::Config(
                ErrorInfo::new("model-unknown-param", "constraint names an undeclared parameter")
                    .with_context("model", self.name.clone())
                    .with_context("param", param),
            ));
        }
        self.constraints.insert(param.to_string(), admissibility);
        Ok(self)
    }

    /// Human readable model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Task explained by the model.
    pub fn task(&self) -> &Task {
        &self.task
    }

    /// Ordered parameter labels.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Predicate attached to `param`; unconstrained when none was declared.
    pub fn constraint(&self, param: &str) -> Admissibility {
        self.constraints.get(param).copied().unwrap_or_default()
    }

    /// Returns the first parameter whose value in `row` is inadmissible.
    ///
    /// `row` is ordered like [`ModelDescriptor::params`].
    pub fn first_violation(&self, row: &[f64]) -> Option<&str> {
        self.params
            .iter()
            .zip(row.iter())
            .find(|(name, value)| !self.constraint(name).admits(**value))
            .map(|(name, _)| name.as_str())
    }
}

impl fmt::Display for ModelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Model({:?}, param={:?})", self.name, self.params)
    }
}

fn check_unique_labels(owner: &str, kind: &str, labels: &[String]) -> Result<(), AdoError> {
    for (idx, label) in labels.iter().enumerate() {
        if label.is_empty() {
            return Err(AdoError::Config(
                ErrorInfo::new("empty-label", format!("{kind} label is empty"))
                    .with_context("owner", owner)
                    .with_context("position", idx.to_string()),
            ));
        }
        if labels[..idx].contains(label) {
            return Err(AdoError::Config(
                ErrorInfo::new("duplicate-label", format!("{kind} label listed twice"))
                    .with_context("owner", owner)
                    .with_context("label", label.clone()),
            ));
        }
    }
    Ok(())
}
