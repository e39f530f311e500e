//! Error types for model assembly.

use thiserror::Error;
use wf_aml::AmlError;
use wf_network::NetworkError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HydraulicsError {
    #[error("Model error: {0}")]
    Model(#[from] AmlError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("State does not match network: {what}")]
    StateMismatch { what: String },
}

pub type HydraulicsResult<T> = Result<T, HydraulicsError>;
