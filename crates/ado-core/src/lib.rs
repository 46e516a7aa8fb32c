#![deny(missing_docs)]
#![doc = "Core descriptors, traits and shared types for adaptive design optimization."]

use std::fmt;

use nalgebra::DMatrix;

mod descriptors;
pub mod errors;
pub mod frame;
pub mod provenance;
pub mod rng;

pub use descriptors::{Admissibility, ModelDescriptor, Task};
pub use errors::{AdoError, ErrorInfo};
pub use frame::{broadcast, GridFrame};
pub use provenance::SchemaVersion;
pub use rng::{derive_substream_seed, RngHandle};

/// Capability implemented by every response model the engine can use.
///
/// The engine depends only on the descriptor (names, admissibility) and the
/// vectorised likelihood; concrete psychometric, discounting or risky-choice
/// models are separate values implementing this trait.
pub trait Model: Send + Sync {
    /// Static description of the model.
    fn descriptor(&self) -> &ModelDescriptor;

    /// Returns the `N_D × N_Θ` matrix of `p(response | design, θ)` for every
    /// row of `designs` against every row of `params`.
    ///
    /// Implementations read columns by label through [`GridFrame::column`].
    fn likelihood(
        &self,
        designs: &GridFrame,
        params: &GridFrame,
        response: i64,
    ) -> Result<DMatrix<f64>, AdoError>;

    /// Task the model explains.
    fn task(&self) -> &Task {
        self.descriptor().task()
    }
}

type LikelihoodFn =
    dyn Fn(&GridFrame, &GridFrame, i64) -> Result<DMatrix<f64>, AdoError> + Send + Sync;

/// Model backed by a closure, for ad-hoc likelihoods that do not warrant a
/// dedicated type.
///
/// Table fingerprints see only the descriptor, so the descriptor name must
/// identify the closure: two `FnModel`s with different likelihoods need
/// different names.
pub struct FnModel {
    descriptor: ModelDescriptor,
    func: Box<LikelihoodFn>,
}

impl FnModel {
    /// Wraps `func` as a model described by `descriptor`.
    pub fn new<F>(descriptor: ModelDescriptor, func: F) -> Self
    where
        F: Fn(&GridFrame, &GridFrame, i64) -> Result<DMatrix<f64>, AdoError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            descriptor,
            func: Box::new(func),
        }
    }
}

impl fmt::Debug for FnModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnModel")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

impl Model for FnModel {
    fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    fn likelihood(
        &self,
        designs: &GridFrame,
        params: &GridFrame,
        response: i64,
    ) -> Result<DMatrix<f64>, AdoError> {
        (self.func)(designs, params, response)
    }
}

/// Converts `p(y = 1)` into the likelihood slice for a binary `response`.
pub fn bernoulli_slice(p_one: DMatrix<f64>, response: i64) -> Result<DMatrix<f64>, AdoError> {
    match response {
        1 => Ok(p_one),
        0 => Ok(p_one.map(|p| 1.0 - p)),
        other => Err(AdoError::Domain(
            ErrorInfo::new("binary-response", "binary model asked for a non-binary response")
                .with_context("response", other.to_string()),
        )),
    }
}
