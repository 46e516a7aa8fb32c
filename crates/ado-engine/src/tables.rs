use std::collections::HashMap;
use std::sync::Arc;

use ado_core::errors::ErrorInfo;
use ado_core::{AdoError, Model, ModelDescriptor, Task};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::{GridSpec, NumericsConfig};
use crate::diagnostics::NumericWarning;
use crate::grid::{DesignGrid, ParamGrid};
use crate::likelihood::LikelihoodTensor;

/// Immutable tables shared by every engine built from the same task, model,
/// grids and tolerances.
#[derive(Debug)]
pub struct EngineTables {
    descriptor: ModelDescriptor,
    designs: DesignGrid,
    params: ParamGrid,
    tensor: LikelihoodTensor,
    numerics: NumericsConfig,
    fingerprint: String,
    warnings: Vec<NumericWarning>,
}

impl EngineTables {
    /// Builds grids and the likelihood tensor for `model`.
    pub fn build(
        model: &dyn Model,
        grids: &GridSpec,
        numerics: &NumericsConfig,
    ) -> Result<Self, AdoError> {
        validate_numerics(numerics)?;
        let descriptor = model.descriptor().clone();
        let designs = DesignGrid::build(descriptor.task(), &grids.designs)?;
        let params = ParamGrid::build(&descriptor, &grids.params)?;
        let (tensor, warnings) = LikelihoodTensor::build(model, &designs, &params, numerics)?;
        for warning in &warnings {
            warning.emit();
        }
        let fingerprint = fingerprint(&descriptor, grids, numerics)?;
        Ok(Self {
            descriptor,
            designs,
            params,
            tensor,
            numerics: numerics.clone(),
            fingerprint,
            warnings,
        })
    }

    /// Descriptor of the model the tables were built from.
    pub fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    /// Task of the model.
    pub fn task(&self) -> &Task {
        self.descriptor.task()
    }

    /// Design grid `D`.
    pub fn designs(&self) -> &DesignGrid {
        &self.designs
    }

    /// Parameter grid `Θ`.
    pub fn params(&self) -> &ParamGrid {
        &self.params
    }

    /// Likelihood tensor `P`.
    pub fn tensor(&self) -> &LikelihoodTensor {
        &self.tensor
    }

    /// Tolerances the likelihood tensor was validated and clipped with.
    pub fn numerics(&self) -> &NumericsConfig {
        &self.numerics
    }

    /// Hex SHA-256 identifying the inputs the tables were built from.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Warnings raised while building the likelihood tensor.
    pub fn warnings(&self) -> &[NumericWarning] {
        &self.warnings
    }
}

/// Deduplicates [`EngineTables`] across engines by input fingerprint.
///
/// The fingerprint covers the model descriptor, not the likelihood code, so
/// two models sharing a descriptor are treated as the same model. Give every
/// distinct likelihood its own descriptor name.
#[derive(Debug, Default)]
pub struct TableCache {
    tables: HashMap<String, Arc<EngineTables>>,
}

impl TableCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns cached tables for these inputs, building them on first use.
    pub fn get_or_build(
        &mut self,
        model: &dyn Model,
        grids: &GridSpec,
        numerics: &NumericsConfig,
    ) -> Result<Arc<EngineTables>, AdoError> {
        let key = fingerprint(model.descriptor(), grids, numerics)?;
        if let Some(existing) = self.tables.get(&key) {
            return Ok(Arc::clone(existing));
        }
        let tables = Arc::new(EngineTables::build(model, grids, numerics)?);
        self.tables.insert(key, Arc::clone(&tables));
        Ok(tables)
    }

    /// Number of distinct table sets held.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns true when nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[derive(Serialize)]
struct FingerprintInput<'a> {
    descriptor: &'a ModelDescriptor,
    designs: Vec<(&'a str, Option<&'a Vec<f64>>)>,
    params: Vec<(&'a str, Option<&'a Vec<f64>>)>,
    clip_epsilon: f64,
    sum_tolerance: f64,
    renormalize_tolerance: f64,
}

/// Stable hash of the inputs that determine a table set.
///
/// The model enters only through its descriptor.
///
/// Grid values are taken in the order declared by the task and the model, so
/// map insertion order does not matter.
pub fn fingerprint(
    descriptor: &ModelDescriptor,
    grids: &GridSpec,
    numerics: &NumericsConfig,
) -> Result<String, AdoError> {
    let input = FingerprintInput {
        descriptor,
        designs: descriptor
            .task()
            .designs()
            .iter()
            .map(|name| (name.as_str(), grids.designs.get(name)))
            .collect(),
        params: descriptor
            .params()
            .iter()
            .map(|name| (name.as_str(), grids.params.get(name)))
            .collect(),
        clip_epsilon: numerics.clip_epsilon,
        sum_tolerance: numerics.sum_tolerance,
        renormalize_tolerance: numerics.renormalize_tolerance,
    };
    let bytes = serde_json::to_vec(&input)
        .map_err(|err| AdoError::Serde(ErrorInfo::new("fingerprint-encode", err.to_string())))?;
    Ok(format!("{:x}", Sha256::digest(bytes)))
}

pub(crate) fn validate_numerics(numerics: &NumericsConfig) -> Result<(), AdoError> {
    let checks = [
        (
            "clip_epsilon",
            numerics.clip_epsilon,
            numerics.clip_epsilon > 0.0 && numerics.clip_epsilon < 0.5,
        ),
        (
            "sum_tolerance",
            numerics.sum_tolerance,
            numerics.sum_tolerance >= 0.0 && numerics.sum_tolerance.is_finite(),
        ),
        (
            "renormalize_tolerance",
            numerics.renormalize_tolerance,
            numerics.renormalize_tolerance >= 0.0 && numerics.renormalize_tolerance.is_finite(),
        ),
        (
            "collapse_ess",
            numerics.collapse_ess,
            numerics.collapse_ess >= 0.0 && numerics.collapse_ess.is_finite(),
        ),
    ];
    for (name, value, ok) in checks {
        if !ok {
            return Err(AdoError::Config(
                ErrorInfo::new("numerics-invalid", "numerical tolerance out of range")
                    .with_context("variable", name)
                    .with_context("value", value.to_string()),
            ));
        }
    }
    Ok(())
}
