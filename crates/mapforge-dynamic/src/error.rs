//! Type synthesis errors.

use mapforge_core::ShapeError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthError {
    #[error("member `{member}` is declared more than once on `{shape}`")]
    DuplicateMember { shape: String, member: String },

    #[error("constructor parameter `{parameter}` of `{shape}` does not bind any member")]
    InvalidConstructorBinding { shape: String, parameter: String },

    #[error("no record type named `{name}` is registered")]
    UnknownRecordType { name: String },
}

impl From<ShapeError> for SynthError {
    fn from(err: ShapeError) -> Self {
        match err {
            ShapeError::DuplicateMember { shape, member } => {
                SynthError::DuplicateMember { shape, member }
            }
            ShapeError::InvalidConstructorBinding { shape, parameter } => {
                SynthError::InvalidConstructorBinding { shape, parameter }
            }
        }
    }
}
