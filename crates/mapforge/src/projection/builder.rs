//! Fluent construction of projection descriptors.

use std::sync::Arc;

use mapforge_core::{Lambda, RecordType, Value, ValueType};

use super::{
    Binding, ExprSource, MemberMapping, MemberRule, Projection, ProjectionDescriptor, TargetShape,
};
use crate::compiler::Compiler;
use crate::error::{MapError, Result};

/// The rule for one target member, optionally redirected into a
/// constructor parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    rule: MemberRule,
    ctor_parameter: Option<Arc<str>>,
}

impl Mapping {
    fn with_rule(rule: MemberRule) -> Self {
        Self {
            rule,
            ctor_parameter: None,
        }
    }

    /// Takes the identically-named source member.
    pub fn auto() -> Self {
        Self::with_rule(MemberRule::Auto)
    }

    /// Takes the value at a dotted source path.
    pub fn from_expression(path: impl Into<String>) -> Self {
        Self::with_rule(MemberRule::Expression(ExprSource::Path(path.into())))
    }

    /// Takes the value computed by a single-parameter graph over the source.
    pub fn from_graph(graph: Lambda) -> Self {
        Self::with_rule(MemberRule::Expression(ExprSource::Graph(graph)))
    }

    pub fn from_value(value: impl Into<Value>) -> Self {
        Self::with_rule(MemberRule::Constant {
            value: value.into(),
            value_type: None,
        })
    }

    /// A constant with an explicit type, e.g. an absent value of a known type.
    pub fn from_typed_value(value: impl Into<Value>, value_type: ValueType) -> Self {
        Self::with_rule(MemberRule::Constant {
            value: value.into(),
            value_type: Some(value_type),
        })
    }

    /// Passes the value to constructor parameter `name` instead of assigning it.
    pub fn using_ctor_parameter(mut self, name: impl Into<Arc<str>>) -> Self {
        self.ctor_parameter = Some(name.into());
        self
    }

    pub fn rule(&self) -> &MemberRule {
        &self.rule
    }
}

/// Builds a [`ProjectionDescriptor`] member by member and compiles it.
///
/// # Example
///
/// ```
/// use mapforge::projection::{Mapping, ProjectionBuilder};
/// use mapforge::Compiler;
/// use mapforge_core::{RecordType, ValueType};
///
/// let source = RecordType::builder("Source")
///     .member("Prop1", ValueType::I32)
///     .member("Active", ValueType::Bool)
///     .build()
///     .unwrap();
///
/// let compiler = Compiler::new();
/// let projection = ProjectionBuilder::new(&source)
///     .member("Id", Mapping::from_expression("Prop1"))
///     .auto("Active")
///     .build_with_dynamic_type("Dto", &compiler)
///     .unwrap();
///
/// assert_eq!(
///     projection.graph().to_string(),
///     "x => new Dto() { Id = x.Prop1, Active = x.Active }"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct ProjectionBuilder {
    source: Arc<RecordType>,
    target: Option<Arc<RecordType>>,
    members: Vec<MemberMapping>,
}

impl ProjectionBuilder {
    pub fn new(source: &Arc<RecordType>) -> Self {
        Self {
            source: Arc::clone(source),
            target: None,
            members: Vec::new(),
        }
    }

    /// Sets an existing target type. Required by [`build`](Self::build).
    pub fn target(mut self, target: &Arc<RecordType>) -> Self {
        self.target = Some(Arc::clone(target));
        self
    }

    /// Maps `name` from the identically-named source member.
    pub fn auto(self, name: impl Into<Arc<str>>) -> Self {
        self.member(name, Mapping::auto())
    }

    /// Maps target member `name` by `mapping`.
    pub fn member(mut self, name: impl Into<Arc<str>>, mapping: Mapping) -> Self {
        let binding = match mapping.ctor_parameter {
            Some(parameter) => Binding::CtorParameter(parameter),
            None => Binding::Assign,
        };
        self.members.push(MemberMapping {
            member: name.into(),
            rule: mapping.rule,
            binding,
        });
        self
    }

    /// Passes `mapping`'s value to the constructor parameter `name`.
    ///
    /// On an existing target `name` is either the parameter's name or the
    /// member it assigns. A synthesized target gets a member and a
    /// parameter of that name.
    pub fn ctor_parameter(mut self, name: impl Into<Arc<str>>, mapping: Mapping) -> Self {
        let name = name.into();
        let parameter = mapping.ctor_parameter.unwrap_or_else(|| Arc::clone(&name));
        self.members.push(MemberMapping {
            member: name,
            rule: mapping.rule,
            binding: Binding::CtorParameter(parameter),
        });
        self
    }

    /// The descriptor accumulated so far, targeting `target`.
    pub fn descriptor(&self, target: TargetShape) -> ProjectionDescriptor {
        ProjectionDescriptor {
            source: Arc::clone(&self.source),
            target,
            members: self.members.clone(),
        }
    }

    /// Compiles against the type set with [`target`](Self::target).
    ///
    /// Without a target type this fails with [`MapError::MissingTarget`].
    pub fn build(self, compiler: &Compiler) -> Result<Arc<Projection>> {
        let target = self.target.clone().ok_or(MapError::MissingTarget)?;
        compiler.compile_projection(&self.descriptor(TargetShape::Existing(target)))
    }

    /// Synthesizes a target type named `type_name` from the mapped members
    /// and compiles against it.
    pub fn build_with_dynamic_type(
        self,
        type_name: impl Into<String>,
        compiler: &Compiler,
    ) -> Result<Arc<Projection>> {
        compiler.compile_projection(&self.descriptor(TargetShape::Synthesized(type_name.into())))
    }
}
