//! Error types for the algebraic model.

use thiserror::Error;

/// Structural errors: misuse of the model contract. These are programming
/// errors and are never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AmlError {
    #[error("Structure not set: call set_structure() before evaluating")]
    StructureNotSet,

    #[error("Stale structure: model changed after set_structure()")]
    StaleStructure,

    #[error("System is not square: {constraints} constraints, {variables} variables")]
    NotSquare { constraints: usize, variables: usize },

    #[error("Variable {name} does not appear in any constraint")]
    UnusedVariable { name: String },

    #[error("Constraint {constraint} references unregistered variable #{index}")]
    UnknownVariable { constraint: String, index: usize },

    #[error("Constraint {constraint} references unregistered parameter #{index}")]
    UnknownParameter { constraint: String, index: usize },

    #[error("Unknown parameter #{index}")]
    UnknownParameterId { index: usize },

    #[error("Unknown constraint: {name}")]
    UnknownConstraint { name: String },

    #[error("Duplicate {kind} name: {name}")]
    DuplicateName { kind: &'static str, name: String },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

pub type AmlResult<T> = Result<T, AmlError>;
