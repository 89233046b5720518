//! Shared test fixtures for MapForge crates.
//!
//! This crate provides record types and sample records for testing.
//! It depends only on `mapforge-core` so every other crate can use it.
//!
//! - [`source`] - the three-column source shape and its projection targets
//! - [`person`] - a person shape with dates, durations and a nullable text member
//!
//! # Usage
//!
//! Add as a dev-dependency in your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! mapforge-test = { workspace = true }
//! ```

pub mod person;
pub mod source;

pub use person::{person_type, sample_people};
pub use source::{source_records, source_type, target_ctor_type, target_type};
