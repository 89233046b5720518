//! MapForge - declarative projections and predicates compiled to expression graphs
//!
//! Describe how a record of one runtime shape maps onto another, and which
//! records to keep, as plain data. A [`Compiler`] turns each description into
//! one inspectable, reusable graph, once.
//!
//! # Example
//!
//! ```rust
//! use mapforge::prelude::*;
//!
//! let source = RecordType::builder("Source")
//!     .member("Prop1", ValueType::I32)
//!     .member("Prop2", ValueType::String)
//!     .build()
//!     .unwrap();
//! let compiler = Compiler::new();
//!
//! let projection = ProjectionBuilder::new(&source)
//!     .member("Id", Mapping::from_expression("Prop1"))
//!     .member("Name", Mapping::from_expression("Prop2"))
//!     .build_with_dynamic_type("Dto", &compiler)
//!     .unwrap();
//! let past_first = PredicateBuilder::new(&source)
//!     .has("Prop1", Operator::GreaterThan, 1)
//!     .build();
//!
//! let rows = vec![
//!     Record::new(source.clone()).with("Prop1", 1).with("Prop2", "a"),
//!     Record::new(source.clone()).with("Prop1", 2).with("Prop2", "b"),
//! ];
//! let out: Vec<_> = projection
//!     .build_query(&compiler, rows, None, Some(&past_first))
//!     .unwrap()
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//!
//! assert_eq!(out.len(), 1);
//! assert_eq!(out[0].get("Name"), Some(&Value::from("b")));
//! ```

pub mod compiler;
pub mod error;
pub mod predicate;
pub mod projection;
pub mod query;

#[cfg(feature = "console")]
pub mod console;

pub use compiler::Compiler;
pub use error::{MapError, Result};
pub use predicate::{Combinator, Operator, PredicateBuilder, PredicateTree};
pub use projection::{Mapping, Projection, ProjectionBuilder, ProjectionDescriptor};
pub use query::{Query, QueryRun};

// Shared building blocks
pub use mapforge_config::CompilerConfig;
pub use mapforge_core::{BooleanGraph, ProjectionGraph, Record, RecordType, Value, ValueType};
pub use mapforge_dynamic::{FieldType, TypeDescriptor, TypeSynthesizer};

pub mod prelude {
    pub use super::{Compiler, CompilerConfig, MapError};
    pub use super::{Mapping, Operator, PredicateBuilder, ProjectionBuilder};
    pub use super::{Record, RecordType, Value, ValueType};
}
