use ado_core::errors::ErrorInfo;
use ado_core::{AdoError, SchemaVersion};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::staircase::StaircaseState;

/// Schema version written into every snapshot.
pub const SNAPSHOT_SCHEMA: SchemaVersion = SchemaVersion::new(1, 0, 0);

/// Serializable belief state of one engine.
///
/// Tables are not stored; a snapshot can only be restored into an engine
/// whose tables carry the same fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// Snapshot format version.
    pub schema_version: SchemaVersion,
    /// Fingerprint of the tables the belief state refers to.
    pub fingerprint: String,
    /// Posterior version at capture time.
    pub version: u64,
    /// Normalized log posterior; `None` marks zero mass.
    pub log_posterior: Vec<Option<f64>>,
    /// Observed responses, oldest first.
    pub responses: Vec<i64>,
    /// Staircase bookkeeping.
    pub staircase: StaircaseState,
    /// Number of random designs drawn so far.
    pub random_draws: u64,
}

impl EngineSnapshot {
    /// Serializes the snapshot to JSON.
    pub fn to_json(&self) -> Result<String, AdoError> {
        serde_json::to_string_pretty(self)
            .map_err(|err| AdoError::Serde(ErrorInfo::new("snapshot-serialize", err.to_string())))
    }

    /// Parses a snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self, AdoError> {
        serde_json::from_str(json)
            .map_err(|err| AdoError::Serde(ErrorInfo::new("snapshot-parse", err.to_string())))
    }
}

impl Engine {
    /// Captures the current belief state.
    pub fn snapshot(&self) -> EngineSnapshot {
        let log_posterior = self
            .posterior_state()
            .log_normalized()
            .iter()
            .map(|&v| v.is_finite().then_some(v))
            .collect();
        EngineSnapshot {
            schema_version: SNAPSHOT_SCHEMA,
            fingerprint: self.tables().fingerprint().to_string(),
            version: self.version(),
            log_posterior,
            responses: self.responses().to_vec(),
            staircase: self.staircase_state().clone(),
            random_draws: self.random_draws(),
        }
    }

    /// Replaces the belief state with `snapshot`.
    ///
    /// Fails without touching the engine when the schema or the table
    /// fingerprint does not match.
    pub fn restore(&mut self, snapshot: &EngineSnapshot) -> Result<(), AdoError> {
        if !SNAPSHOT_SCHEMA.accepts(&snapshot.schema_version) {
            return Err(AdoError::Serde(
                ErrorInfo::new("snapshot-schema", "unsupported snapshot schema version")
                    .with_context("found", format!("{:?}", snapshot.schema_version))
                    .with_context("supported", format!("{:?}", SNAPSHOT_SCHEMA)),
            ));
        }
        if snapshot.fingerprint != self.tables().fingerprint() {
            return Err(AdoError::Serde(
                ErrorInfo::new("snapshot-fingerprint", "snapshot was taken on different tables")
                    .with_context("expected", self.tables().fingerprint())
                    .with_context("found", snapshot.fingerprint.clone())
                    .with_hint("rebuild the engine with the same model, grids and numerics"),
            ));
        }
        let log_post = DVector::from_iterator(
            snapshot.log_posterior.len(),
            snapshot
                .log_posterior
                .iter()
                .map(|v| v.unwrap_or(f64::NEG_INFINITY)),
        );
        self.restore_parts(
            log_post,
            snapshot.version,
            snapshot.responses.clone(),
            snapshot.staircase.clone(),
            snapshot.random_draws,
        )
    }
}
