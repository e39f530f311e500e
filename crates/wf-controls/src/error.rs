//! Error types for control evaluation.

use thiserror::Error;
use wf_core::{LinkId, NodeId};

/// Result type for control operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors raised while validating or evaluating controls.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Invalid argument provided to a control constructor.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// Condition names a node the network does not have.
    #[error("Control '{control}' references unknown node {node}")]
    UnknownNode { control: String, node: NodeId },

    /// Condition or action names a link the network does not have.
    #[error("Control '{control}' references unknown link {link}")]
    UnknownLink { control: String, link: LinkId },

    /// Reference resolves, but to the wrong kind of element.
    #[error("Invalid reference in control '{control}': {what}")]
    InvalidReference { control: String, what: String },

    /// A state view could not supply an observed value.
    #[error("Observable not available: {what}")]
    Unobservable { what: String },

    /// Two controls share a name.
    #[error("Duplicate control name '{name}'")]
    DuplicateName { name: String },
}
