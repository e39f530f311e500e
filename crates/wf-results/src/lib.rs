//! wf-results: per-timestep results, run manifests and on-disk run storage.

pub mod hash;
pub mod results;
pub mod store;
pub mod types;

pub use hash::{compute_fingerprint, compute_run_id};
pub use results::HydraulicResults;
pub use store::RunStore;
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("Unknown {kind} '{name}' in results")]
    UnknownElement { kind: &'static str, name: String },
}
