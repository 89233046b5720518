//! Lowering of predicate trees to boolean graphs.

use mapforge_core::{
    coerce_value, resolve_expr, BooleanGraph, Expr, Lambda, Method, Param, TypeMismatch, ValueType,
};
use tracing::debug;

use super::{Combinator, Condition, ConditionNode, Group, Operator, PredicateTree};
use crate::error::{MapError, Result};

/// Compiles `tree` into a graph `root => condition` over the tree's source type.
///
/// `root_name` only names the lambda parameter.
///
/// # Errors
///
/// - [`MapError::Path`] if a condition path does not resolve
/// - [`MapError::OperatorTypeMismatch`] if an operator does not apply to its path
/// - [`MapError::TypeMismatch`] if an operand cannot be converted to the path type
/// - [`MapError::EmptyGroup`] if a group has no conditions
pub fn compile(tree: &PredicateTree, root_name: &str) -> Result<BooleanGraph> {
    let root = Param::new(root_name, ValueType::record(tree.source()));
    let body = compile_node(tree.root(), &root)?;
    let graph = BooleanGraph::new(Lambda::single(root, body))?;

    debug!(
        event = "predicate_compiled",
        source = %tree.source().name(),
        conditions = tree.len(),
        graph = %graph,
    );
    Ok(graph)
}

fn compile_node(node: &ConditionNode, root: &Param) -> Result<Expr> {
    match node {
        ConditionNode::Leaf(condition) => compile_condition(condition, root),
        ConditionNode::Group(group) => compile_group(group, root),
    }
}

fn compile_group(group: &Group, root: &Param) -> Result<Expr> {
    let mut children = group.children.iter();
    let first = children.next().ok_or(MapError::EmptyGroup)?;

    let mut acc = compile_node(first, root)?;
    for child in children {
        let next = compile_node(child, root)?;
        acc = match group.combinator {
            Combinator::And => Expr::and(acc, next),
            Combinator::Or => Expr::or(acc, next),
        };
    }

    Ok(if group.negated { Expr::not(acc) } else { acc })
}

fn compile_condition(condition: &Condition, root: &Param) -> Result<Expr> {
    let path = resolve_expr(root, &condition.path)?;
    let path_type = path.value_type();
    let operator = condition.operator;

    if !operator.accepts(&path_type) {
        return Err(MapError::OperatorTypeMismatch {
            operator,
            path: condition.path.clone(),
            value_type: path_type.to_string(),
        });
    }

    let operand = |target: ValueType| -> Result<Expr> {
        let value = coerce_value(condition.operand.clone(), &target)?;
        Ok(Expr::literal(value, target))
    };

    Ok(match operator {
        Operator::Equals => Expr::eq(path, operand(path_type)?),
        Operator::DoesNotEqual => Expr::ne(path, operand(path_type)?),
        Operator::GreaterThan => Expr::gt(path, operand(path_type)?),
        Operator::GreaterThanOrEqual => Expr::ge(path, operand(path_type)?),
        Operator::LessThan => Expr::lt(path, operand(path_type)?),
        Operator::LessThanOrEqual => Expr::le(path, operand(path_type)?),

        Operator::IsNull => Expr::eq(path, Expr::null(path_type)),
        Operator::IsNotNull => Expr::ne(path, Expr::null(path_type)),
        Operator::IsNullOrEmpty => Expr::call(Method::IsNullOrEmpty, path, Vec::new()),
        Operator::IsNotNullOrEmpty => {
            Expr::not(Expr::call(Method::IsNullOrEmpty, path, Vec::new()))
        }

        Operator::Contains | Operator::StartsWith | Operator::EndsWith => {
            let (method, needle_type) = match (operator, path_type.underlying()) {
                (Operator::Contains, ValueType::List(element)) => {
                    (Method::Contains, element.as_ref().clone())
                }
                (Operator::Contains, _) => (Method::Contains, ValueType::String),
                (Operator::StartsWith, _) => (Method::StartsWith, ValueType::String),
                _ => (Method::EndsWith, ValueType::String),
            };
            let needle = operand(needle_type)?;
            null_checked(path, path_type, |target| {
                Expr::call(method, target, vec![needle])
            })
        }

        Operator::In => {
            let list_type = ValueType::list(path_type);
            if condition.operand.is_null() {
                return Err(TypeMismatch::new(&list_type, "null").into());
            }
            Expr::call(Method::In, path, vec![operand(list_type)?])
        }
    })
}

/// Wraps a method call on a possibly absent target as `(target != null && call)`.
fn null_checked(target: Expr, target_type: ValueType, call: impl FnOnce(Expr) -> Expr) -> Expr {
    if !target_type.may_be_absent() {
        return call(target);
    }
    let present = Expr::ne(target.clone(), Expr::null(target_type));
    Expr::and(present, call(target))
}
