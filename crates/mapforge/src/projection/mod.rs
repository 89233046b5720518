//! Declarative projections from one record shape into another.
//!
//! A [`ProjectionDescriptor`] lists, per target member, where the value comes
//! from ([`MemberRule`]) and how it reaches the target ([`Binding`]): assigned
//! after construction, or passed to the constructor. The compiled
//! [`Projection`] holds one graph `x => new Target(..) { .. }` that can be
//! evaluated in memory or translated further.

mod builder;
mod compile;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use mapforge_core::{
    BooleanGraph, Expr, Lambda, Param, ProjectionGraph, Record, RecordType, Value, ValueType,
};

pub use builder::{Mapping, ProjectionBuilder};
pub use compile::compile;

use crate::compiler::Compiler;
use crate::error::{MapError, Result};
use crate::predicate::PredicateTree;
use crate::query::{Query, QueryRun};

/// A value-producing expression over the source shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExprSource {
    /// A dotted member path such as `"Address.City"`.
    Path(String),
    /// A pre-built single-parameter graph over the source type.
    Graph(Lambda),
}

/// Where a target member's value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemberRule {
    /// The identically-named source member.
    Auto,
    Expression(ExprSource),
    /// A fixed value. Without a declared type the value's own type is used.
    Constant {
        value: Value,
        value_type: Option<ValueType>,
    },
}

/// How a target member's value reaches the target record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Binding {
    /// Assigned after construction.
    Assign,
    /// Passed to the named constructor parameter.
    CtorParameter(Arc<str>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberMapping {
    pub member: Arc<str>,
    pub rule: MemberRule,
    pub binding: Binding,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetShape {
    Existing(Arc<RecordType>),
    /// Synthesized from the mapped members under the given name.
    Synthesized(String),
}

/// Source shape, target shape, and the ordered member mappings.
///
/// Descriptors compare structurally and are the projection cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectionDescriptor {
    pub source: Arc<RecordType>,
    pub target: TargetShape,
    pub members: Vec<MemberMapping>,
}

/// Where a compiled member value lands in the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Slot {
    /// Constructor argument at this position.
    Ctor(usize),
    Assign,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MemberPlan {
    pub(crate) member: Arc<str>,
    pub(crate) value: Expr,
    pub(crate) slot: Slot,
}

/// A compiled projection.
#[derive(Debug, Clone)]
pub struct Projection {
    descriptor: ProjectionDescriptor,
    target: Arc<RecordType>,
    root: Param,
    plans: Vec<MemberPlan>,
    graph: Arc<ProjectionGraph>,
}

impl Projection {
    pub fn descriptor(&self) -> &ProjectionDescriptor {
        &self.descriptor
    }

    pub fn source(&self) -> &Arc<RecordType> {
        &self.descriptor.source
    }

    /// The target type; synthesized for [`TargetShape::Synthesized`].
    pub fn target(&self) -> &Arc<RecordType> {
        &self.target
    }

    pub fn graph(&self) -> &Arc<ProjectionGraph> {
        &self.graph
    }

    /// Projects a single record.
    pub fn apply(&self, record: Record) -> std::result::Result<Record, mapforge_core::EvalError> {
        self.graph.apply(&Value::Record(record))
    }

    /// Builds a graph producing only the `selected` members.
    ///
    /// Unselected members keep their default values; unselected constructor
    /// arguments are passed the parameter type's default.
    ///
    /// # Errors
    ///
    /// [`MapError::UnknownTargetMember`] if a selected name is not mapped.
    pub fn select(&self, selected: &[&str]) -> Result<ProjectionGraph> {
        if let Some(unknown) = selected
            .iter()
            .find(|name| !self.plans.iter().any(|p| p.member.as_ref() == **name))
        {
            return Err(MapError::UnknownTargetMember {
                member: unknown.to_string(),
                shape: self.target.name().to_string(),
            });
        }
        let plans: Vec<&MemberPlan> = self
            .plans
            .iter()
            .filter(|p| selected.contains(&p.member.as_ref()))
            .collect();
        compile::assemble(&self.target, &self.root, &plans)
    }

    /// Composes an optional pre-filter with this projection, optionally
    /// restricted to `selected` members.
    ///
    /// A filter over a different source type is retargeted onto this
    /// projection's source, which fails if it reads members the source lacks.
    pub fn query(
        &self,
        compiler: &Compiler,
        selected: Option<&[&str]>,
        filter: Option<&PredicateTree>,
    ) -> Result<Query> {
        let projection = match selected {
            Some(selected) => Arc::new(self.select(selected)?),
            None => Arc::clone(&self.graph),
        };
        let filter = filter
            .map(|tree| self.filter_graph(compiler, tree))
            .transpose()?;
        Ok(Query::new(filter, projection))
    }

    /// Runs [`query`](Self::query) over `source`, lazily and in source order.
    pub fn build_query<I>(
        &self,
        compiler: &Compiler,
        source: I,
        selected: Option<&[&str]>,
        filter: Option<&PredicateTree>,
    ) -> Result<QueryRun<I::IntoIter>>
    where
        I: IntoIterator<Item = Record>,
    {
        Ok(self.query(compiler, selected, filter)?.run(source))
    }

    fn filter_graph(&self, compiler: &Compiler, tree: &PredicateTree) -> Result<Arc<BooleanGraph>> {
        use mapforge_core::{Rerootable, RootMatch};

        let graph = compiler.compile_predicate(tree)?;
        if graph.params() == std::slice::from_ref(&self.root) {
            return Ok(graph);
        }
        let own = graph.params().first().cloned().ok_or_else(|| {
            MapError::Graph(mapforge_core::GraphError::OutputMismatch {
                expected: "a single-parameter predicate".to_string(),
                found: graph.to_string(),
            })
        })?;
        let moved = graph
            .as_ref()
            .clone()
            .substitute_root(&RootMatch::Exact(own), &self.root)?;
        Ok(Arc::new(moved))
    }
}
