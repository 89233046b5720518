//! Compile-time errors of the projection and predicate compilers.

use mapforge_core::{GraphError, PathError, TypeMismatch};
use mapforge_dynamic::SynthError;
use thiserror::Error;

use crate::predicate::Operator;

/// Everything that can go wrong while compiling a projection or predicate.
///
/// All variants are raised before a graph is returned; a compiled graph
/// never fails later because of a shape mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    TypeMismatch(#[from] TypeMismatch),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("operator `{operator}` does not apply to `{path}` of type `{value_type}`")]
    OperatorTypeMismatch {
        operator: Operator,
        path: String,
        value_type: String,
    },

    #[error("auto member `{member}` has no counterpart on `{shape}`")]
    UnmatchedAutoMember { member: String, shape: String },

    #[error("condition group has no conditions")]
    EmptyGroup,

    #[error("member `{member}` is declared more than once on `{shape}`")]
    DuplicateMember { shape: String, member: String },

    #[error("constructor parameter `{parameter}` of `{shape}` is not bound by any rule")]
    InvalidConstructorBinding { shape: String, parameter: String },

    #[error("`{shape}` has no member `{member}`")]
    UnknownTargetMember { member: String, shape: String },

    #[error("no record type named `{name}` is registered")]
    UnknownRecordType { name: String },

    #[error("constant for `{member}` is absent and has no declared type")]
    UntypedConstant { member: String },

    #[error("projection has no target type")]
    MissingTarget,

    #[error("mapping graph for `{member}` takes {found} parameters, expected 1")]
    MappingArity { member: String, found: usize },
}

impl From<SynthError> for MapError {
    fn from(err: SynthError) -> Self {
        match err {
            SynthError::DuplicateMember { shape, member } => {
                MapError::DuplicateMember { shape, member }
            }
            SynthError::InvalidConstructorBinding { shape, parameter } => {
                MapError::InvalidConstructorBinding { shape, parameter }
            }
            SynthError::UnknownRecordType { name } => MapError::UnknownRecordType { name },
        }
    }
}

pub type Result<T> = std::result::Result<T, MapError>;
