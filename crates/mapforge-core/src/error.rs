//! Error types for MapForge core operations.
//!
//! Everything except [`EvalError`] is raised while a graph is being built.
//! A graph that was built successfully never fails later because of a shape
//! mismatch; `EvalError` only covers faults caused by data values.

use thiserror::Error;

/// A member path could not be resolved against a shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("member `{member}` does not exist on `{shape}`")]
    UnknownMember { member: String, shape: String },

    #[error("member `{member}` of type `{value_type}` has no members to navigate into")]
    NotNavigable { member: String, value_type: String },

    #[error("member path is empty or contains an empty segment: `{path}`")]
    EmptyPath { path: String },
}

/// A value of one type cannot be converted to another.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert `{found}` to `{expected}`")]
pub struct TypeMismatch {
    pub expected: String,
    pub found: String,
}

impl TypeMismatch {
    pub fn new(expected: impl ToString, found: impl ToString) -> Self {
        Self {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

/// Errors raised while defining a record type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("member `{member}` is declared more than once on `{shape}`")]
    DuplicateMember { shape: String, member: String },

    #[error("constructor parameter `{parameter}` of `{shape}` does not bind any member")]
    InvalidConstructorBinding { shape: String, parameter: String },
}

/// Errors raised while rewriting an expression graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("more than one root matches {criterion}: {candidates:?}")]
    AmbiguousRoot {
        criterion: String,
        candidates: Vec<String>,
    },

    #[error("member `{member}` does not exist on `{shape}`")]
    IncompatibleShape { member: String, shape: String },

    #[error("member `{member}` of `{shape}` has type `{found}`, expected `{expected}`")]
    MemberTypeChanged {
        member: String,
        shape: String,
        expected: String,
        found: String,
    },

    #[error("graph body has type `{found}`, expected `{expected}`")]
    OutputMismatch { expected: String, found: String },
}

/// Data-dependent faults raised by the in-memory evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("parameter `{0}` is not bound")]
    UnboundParameter(String),

    #[error("member `{member}` was read from an absent value")]
    NullReference { member: String },

    #[error("record `{record}` has no member `{member}`")]
    MissingMember { record: String, member: String },

    #[error("integer division by zero")]
    DivisionByZero,

    #[error("arithmetic overflow")]
    Overflow,

    #[error("expected {expected} argument(s), got {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("invalid operand: {0}")]
    InvalidOperand(String),
}
