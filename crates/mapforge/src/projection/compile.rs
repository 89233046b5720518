//! Lowering of projection descriptors to construction graphs.

use std::collections::HashSet;
use std::sync::Arc;

use mapforge_core::{
    coerce, coerce_value, resolve_expr, Expr, Lambda, Param, PathError, ProjectionGraph,
    RecordType, Rerootable, RootMatch, ValueType,
};
use mapforge_dynamic::{CtorParamDef, FieldDef, FieldType, TypeDescriptor, TypeSynthesizer};
use tracing::debug;

use super::{
    Binding, ExprSource, MemberMapping, MemberPlan, MemberRule, Projection, ProjectionDescriptor,
    Slot, TargetShape,
};
use crate::error::{MapError, Result};

/// Compiles `descriptor` into a graph `root => new Target(..) { .. }`.
///
/// A synthesized target is built through `synthesizer`, so equal member
/// lists yield the same target type across compilations.
///
/// # Errors
///
/// - [`MapError::DuplicateMember`] if a target member is mapped twice
/// - [`MapError::UnmatchedAutoMember`] if an auto member has no source counterpart
/// - [`MapError::Path`] if a path rule does not resolve on the source
/// - [`MapError::Graph`] if a graph rule reads members the source lacks
/// - [`MapError::TypeMismatch`] if a value cannot be converted to its target slot
/// - [`MapError::UnknownTargetMember`] if an existing target lacks a mapped member
/// - [`MapError::InvalidConstructorBinding`] if a constructor parameter is
///   unknown, bound twice, or left without a value
pub fn compile(
    descriptor: &ProjectionDescriptor,
    root_name: &str,
    synthesizer: &TypeSynthesizer,
) -> Result<Projection> {
    let shape = match &descriptor.target {
        TargetShape::Existing(target) => target.name().to_string(),
        TargetShape::Synthesized(name) => name.clone(),
    };
    let mut seen = HashSet::new();
    if let Some(dup) = descriptor.members.iter().find(|m| !seen.insert(&m.member)) {
        return Err(MapError::DuplicateMember {
            shape,
            member: dup.member.to_string(),
        });
    }

    let root = Param::new(root_name, ValueType::record(&descriptor.source));
    let (target, plans) = match &descriptor.target {
        TargetShape::Existing(target) => {
            let plans = plan_existing(descriptor, target, &root)?;
            (Arc::clone(target), plans)
        }
        TargetShape::Synthesized(name) => plan_synthesized(descriptor, name, &root, synthesizer)?,
    };

    let graph = assemble(&target, &root, &plans.iter().collect::<Vec<_>>())?;
    debug!(
        event = "projection_compiled",
        source = %descriptor.source.name(),
        target = %target.name(),
        members = plans.len(),
        ctor_args = plans.iter().filter(|p| matches!(p.slot, Slot::Ctor(_))).count(),
        graph = %graph,
    );

    Ok(Projection {
        descriptor: descriptor.clone(),
        target,
        root,
        plans,
        graph: Arc::new(graph),
    })
}

fn plan_existing(
    descriptor: &ProjectionDescriptor,
    target: &Arc<RecordType>,
    root: &Param,
) -> Result<Vec<MemberPlan>> {
    let params = target.constructor().unwrap_or(&[]);
    let invalid_binding = |parameter: &str| MapError::InvalidConstructorBinding {
        shape: target.name().to_string(),
        parameter: parameter.to_string(),
    };

    let mut filled = vec![false; params.len()];
    let mut ruled = HashSet::new();
    let mut plans: Vec<MemberPlan> = Vec::with_capacity(descriptor.members.len());
    for mapping in &descriptor.members {
        let plan = match &mapping.binding {
            Binding::Assign => {
                let member_type = target.member(&mapping.member).map(|m| m.value_type.clone());
                let member_type = member_type.ok_or_else(|| MapError::UnknownTargetMember {
                    member: mapping.member.to_string(),
                    shape: target.name().to_string(),
                })?;
                MemberPlan {
                    member: Arc::clone(&mapping.member),
                    value: member_value(mapping, root, Some(&member_type))?,
                    slot: Slot::Assign,
                }
            }
            Binding::CtorParameter(name) => {
                let idx = params
                    .iter()
                    .position(|p| p.name == *name)
                    .or_else(|| {
                        params
                            .iter()
                            .position(|p| target.members()[p.member].name == *name)
                    })
                    .ok_or_else(|| invalid_binding(&**name))?;
                if std::mem::replace(&mut filled[idx], true) {
                    return Err(invalid_binding(&*params[idx].name));
                }
                let param = &params[idx];
                MemberPlan {
                    member: Arc::clone(&target.members()[param.member].name),
                    value: member_value(mapping, root, Some(&param.value_type))?,
                    slot: Slot::Ctor(idx),
                }
            }
        };
        // A constructor parameter and an assignment may name the same member.
        if !ruled.insert(Arc::clone(&plan.member)) {
            return Err(MapError::DuplicateMember {
                shape: target.name().to_string(),
                member: plan.member.to_string(),
            });
        }
        plans.push(plan);
    }

    // A parameter without its own rule takes the assignment to the member it binds.
    for (idx, param) in params.iter().enumerate() {
        if filled[idx] {
            continue;
        }
        let bound = &target.members()[param.member].name;
        let plan = plans
            .iter_mut()
            .find(|p| p.slot == Slot::Assign && p.member == *bound)
            .ok_or_else(|| invalid_binding(&*param.name))?;
        plan.value = coerce(plan.value.clone(), &param.value_type)?;
        plan.slot = Slot::Ctor(idx);
    }
    Ok(plans)
}

fn plan_synthesized(
    descriptor: &ProjectionDescriptor,
    name: &str,
    root: &Param,
    synthesizer: &TypeSynthesizer,
) -> Result<(Arc<RecordType>, Vec<MemberPlan>)> {
    let mut type_descriptor = TypeDescriptor::new(name);
    let mut plans = Vec::with_capacity(descriptor.members.len());
    let mut ctor_args = 0;

    for mapping in &descriptor.members {
        let value = member_value(mapping, root, None)?;
        let value_type = value.value_type();
        register_records(&value_type, synthesizer);

        type_descriptor = type_descriptor.with_field(FieldDef::new(
            mapping.member.as_ref(),
            FieldType::from(&value_type),
        ));
        let slot = match &mapping.binding {
            Binding::Assign => Slot::Assign,
            Binding::CtorParameter(parameter) => {
                type_descriptor = type_descriptor.with_constructor_param(CtorParamDef {
                    name: parameter.to_string(),
                    field_type: None,
                    member: Some(mapping.member.to_string()),
                });
                ctor_args += 1;
                Slot::Ctor(ctor_args - 1)
            }
        };
        plans.push(MemberPlan {
            member: Arc::clone(&mapping.member),
            value,
            slot,
        });
    }

    let target = synthesizer.synthesize(&type_descriptor)?;
    Ok((target, plans))
}

/// Makes record types a synthesized member refers to resolvable by name.
fn register_records(value_type: &ValueType, synthesizer: &TypeSynthesizer) {
    match value_type {
        ValueType::Record(record_type) => {
            let known = synthesizer
                .find_type(record_type.name())
                .is_some_and(|t| Arc::ptr_eq(&t, record_type));
            if !known {
                synthesizer.register(Arc::clone(record_type));
            }
        }
        ValueType::Nullable(inner) | ValueType::List(inner) => register_records(inner, synthesizer),
        _ => {}
    }
}

/// The value-producing graph for one mapping, converted to `expected` if given.
fn member_value(mapping: &MemberMapping, root: &Param, expected: Option<&ValueType>) -> Result<Expr> {
    let value = match &mapping.rule {
        MemberRule::Auto => resolve_expr(root, &mapping.member).map_err(|err| match err {
            PathError::UnknownMember { shape, .. } => MapError::UnmatchedAutoMember {
                member: mapping.member.to_string(),
                shape,
            },
            other => other.into(),
        })?,
        MemberRule::Expression(ExprSource::Path(path)) => resolve_expr(root, path)?,
        MemberRule::Expression(ExprSource::Graph(graph)) => graph_value(mapping, graph, root)?,
        MemberRule::Constant { value, value_type } => {
            let value_type = value_type
                .clone()
                .or_else(|| expected.cloned())
                .or_else(|| value.value_type())
                .ok_or_else(|| MapError::UntypedConstant {
                    member: mapping.member.to_string(),
                })?;
            Expr::literal(coerce_value(value.clone(), &value_type)?, value_type)
        }
    };

    match expected {
        Some(expected) => Ok(coerce(value, expected)?),
        None => Ok(value),
    }
}

/// Moves a single-parameter graph onto `root` and returns its body.
fn graph_value(mapping: &MemberMapping, graph: &Lambda, root: &Param) -> Result<Expr> {
    let [param] = graph.params() else {
        return Err(MapError::MappingArity {
            member: mapping.member.to_string(),
            found: graph.params().len(),
        });
    };
    let moved = graph
        .clone()
        .substitute_root(&RootMatch::Exact(param.clone()), root)?;
    Ok(moved.body().clone())
}

/// Builds the construction graph from `plans`.
///
/// Constructor parameters without a plan receive their type's default value.
pub(crate) fn assemble(
    target: &Arc<RecordType>,
    root: &Param,
    plans: &[&MemberPlan],
) -> Result<ProjectionGraph> {
    let mut args: Vec<Expr> = target
        .constructor()
        .unwrap_or(&[])
        .iter()
        .map(|p| Expr::literal(p.value_type.default_value(), p.value_type.clone()))
        .collect();
    let mut assignments = Vec::new();
    for plan in plans {
        match plan.slot {
            Slot::Ctor(idx) => {
                if let Some(arg) = args.get_mut(idx) {
                    *arg = plan.value.clone();
                }
            }
            Slot::Assign => assignments.push((Arc::clone(&plan.member), plan.value.clone())),
        }
    }

    let new = Expr::new_record(target, args);
    let body = if assignments.is_empty() {
        new
    } else {
        Expr::member_init(new, assignments)
    };
    Ok(ProjectionGraph::new(Lambda::single(root.clone(), body))?)
}
