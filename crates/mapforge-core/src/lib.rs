//! MapForge Core - expression graphs over runtime-shaped records
//!
//! This crate provides the building blocks the MapForge compilers share:
//! - Value and record types whose shapes are known only at runtime
//! - A typed, inspectable expression graph IR
//! - Member-path resolution with explicit null propagation
//! - Graph rewriting (root substitution and retyping)
//! - An in-memory evaluator for compiled graphs
//! - A lazily populated, never-evicting cache for compiled artifacts

pub mod cache;
pub mod coerce;
pub mod error;
pub mod eval;
pub mod expr;
pub mod path;
pub mod toolkit;
pub mod types;
pub mod value;

pub use cache::GraphCache;
pub use coerce::{coerce, coerce_value};
pub use error::{EvalError, GraphError, PathError, ShapeError, TypeMismatch};
pub use eval::{eval, Env};
pub use expr::{
    BinaryOp, BooleanGraph, Expr, GraphOutput, Lambda, Method, Param, ProjectionGraph,
    TypedLambda, UnaryOp,
};
pub use path::{resolve, resolve_expr, MemberPath, PathStep, PATH_SEPARATOR};
pub use toolkit::{Rerootable, RootMatch};
pub use types::{Attribute, CtorParam, MemberDef, RecordType, RecordTypeBuilder, ValueType};
pub use value::{Record, Value};
