//! Network construction and validation errors.

use thiserror::Error;
use wf_core::WfError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("Invalid {element}: {what}")]
    Validation { element: String, what: String },

    #[error("Duplicate {kind} name: {name}")]
    DuplicateName { kind: &'static str, name: String },

    #[error("Unknown {kind}: {name}")]
    Unknown { kind: &'static str, name: String },

    #[error("{element} is not a {expected}")]
    WrongKind {
        element: String,
        expected: &'static str,
    },

    #[error("Options parse error: {message}")]
    OptionsParse { message: String },

    #[error(transparent)]
    Core(#[from] WfError),
}

impl NetworkError {
    pub(crate) fn invalid(element: impl Into<String>, what: impl Into<String>) -> Self {
        NetworkError::Validation {
            element: element.into(),
            what: what.into(),
        }
    }
}

pub type NetworkResult<T> = Result<T, NetworkError>;
