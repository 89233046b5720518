//! Runtime record-type synthesis for MapForge.
//!
//! Shapes that only become known at configuration time are described by a
//! serializable [`TypeDescriptor`] and turned into a [`RecordType`] by a
//! [`TypeSynthesizer`]. Structurally equal descriptors always yield the same
//! type, so graphs compiled against a synthesized type stay reusable.
//!
//! [`RecordType`]: mapforge_core::RecordType

mod descriptor;
mod error;
mod synth;

pub use descriptor::{CtorParamDef, FieldDef, FieldType, TypeDescriptor};
pub use error::SynthError;
pub use synth::TypeSynthesizer;
