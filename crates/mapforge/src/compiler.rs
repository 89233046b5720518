//! The compiler registry: configuration, type synthesis, and compiled graph caches.

use std::fmt;
use std::sync::Arc;

use mapforge_config::{CompilerConfig, ConfigError};
use mapforge_core::{BooleanGraph, GraphCache, Param, RecordType, ValueType};
use mapforge_dynamic::{TypeDescriptor, TypeSynthesizer};

use crate::error::{MapError, Result};
use crate::predicate::{self, PredicateTree};
use crate::projection::{self, Projection, ProjectionDescriptor};

/// Compiles predicate trees and projection descriptors, caching the results.
///
/// Each compiler owns its caches. They are populated on first use and never
/// evicted; compiling an equal tree or descriptor again returns the shared
/// result. A compiler is `Sync` and meant to be shared across threads.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use mapforge::predicate::{Operator, PredicateBuilder};
/// use mapforge::Compiler;
/// use mapforge_config::CompilerConfig;
/// use mapforge_core::{RecordType, ValueType};
///
/// let item = RecordType::builder("Item")
///     .member("Qty", ValueType::I32)
///     .build()
///     .unwrap();
/// let compiler = Compiler::with_config(CompilerConfig::new().with_root_name("item"));
///
/// let tree = PredicateBuilder::new(&item)
///     .has("Qty", Operator::GreaterThan, 0)
///     .build();
/// let first = compiler.compile_predicate(&tree).unwrap();
/// let again = compiler.compile_predicate(&tree.clone()).unwrap();
///
/// assert_eq!(first.to_string(), "item => (item.Qty > 0)");
/// assert!(Arc::ptr_eq(&first, &again));
/// ```
pub struct Compiler {
    config: CompilerConfig,
    synthesizer: Arc<TypeSynthesizer>,
    predicates: GraphCache<PredicateTree, BooleanGraph>,
    projections: GraphCache<ProjectionDescriptor, Projection>,
}

impl Compiler {
    pub fn new() -> Self {
        Self::with_config(CompilerConfig::default())
    }

    pub fn with_config(config: CompilerConfig) -> Self {
        Self {
            config,
            synthesizer: Arc::new(TypeSynthesizer::new()),
            predicates: GraphCache::new(),
            projections: GraphCache::new(),
        }
    }

    /// Validates `config` before using it.
    pub fn from_config(config: CompilerConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    /// Shares `synthesizer` with this compiler, so synthesized targets and
    /// registered types are visible to both.
    pub fn with_synthesizer(mut self, synthesizer: Arc<TypeSynthesizer>) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn synthesizer(&self) -> &Arc<TypeSynthesizer> {
        &self.synthesizer
    }

    /// The root parameter emitted graphs over `source` are bound to.
    pub fn root_param(&self, source: &Arc<RecordType>) -> Param {
        Param::new(self.config.root_name.as_str(), ValueType::record(source))
    }

    /// Compiles `tree`, or returns the graph compiled earlier for an equal tree.
    pub fn compile_predicate(&self, tree: &PredicateTree) -> Result<Arc<BooleanGraph>> {
        self.predicates.get_or_try_insert_with(tree.clone(), || {
            predicate::compile(tree, &self.config.root_name)
        })
    }

    /// Compiles `descriptor`, or returns the projection compiled earlier for
    /// an equal descriptor.
    pub fn compile_projection(&self, descriptor: &ProjectionDescriptor) -> Result<Arc<Projection>> {
        self.projections.get_or_try_insert_with(descriptor.clone(), || {
            projection::compile(descriptor, &self.config.root_name, &self.synthesizer)
        })
    }

    /// Synthesizes a record type through this compiler's synthesizer.
    pub fn synthesize(&self, descriptor: &TypeDescriptor) -> Result<Arc<RecordType>> {
        self.synthesizer.synthesize(descriptor).map_err(MapError::from)
    }

    /// Number of cached predicate graphs and projections.
    pub fn cached(&self) -> (usize, usize) {
        (self.predicates.len(), self.projections.len())
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("root_name", &self.config.root_name)
            .field("predicates", &self.predicates.len())
            .field("projections", &self.projections.len())
            .field("synthesizer", &self.synthesizer)
            .finish()
    }
}
