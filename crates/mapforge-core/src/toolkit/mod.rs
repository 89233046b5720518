//! Graph rewriting: root substitution and retyping.
//!
//! A compiled graph is bound to its root references. These operations move
//! a graph onto a different root, either by swapping the reference itself
//! ([`Rerootable::substitute_root`]) or by changing its type
//! ([`Rerootable::retype_root`]). Every member access hanging off the
//! replaced root is re-resolved against the new root's type. A member whose
//! type changed is converted back to the old type where that is implicit,
//! so a rewrite either yields a well-typed graph or fails up front.

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::coerce::is_implicit;
use crate::error::GraphError;
use crate::expr::{Expr, GraphOutput, Lambda, Param, TypedLambda};
use crate::types::ValueType;

/// Selects which root reference of a graph to replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootMatch {
    /// The parameter with exactly this name and type.
    Exact(Param),
    /// Any parameter with this name.
    ByName(Arc<str>),
    /// Any parameter of this type, optionally narrowed by name.
    ByType {
        value_type: ValueType,
        name: Option<Arc<str>>,
    },
}

impl RootMatch {
    pub fn by_name(name: impl Into<Arc<str>>) -> Self {
        RootMatch::ByName(name.into())
    }

    pub fn by_type(value_type: ValueType) -> Self {
        RootMatch::ByType {
            value_type,
            name: None,
        }
    }

    pub fn by_type_named(value_type: ValueType, name: impl Into<Arc<str>>) -> Self {
        RootMatch::ByType {
            value_type,
            name: Some(name.into()),
        }
    }

    pub fn matches(&self, param: &Param) -> bool {
        match self {
            RootMatch::Exact(p) => p == param,
            RootMatch::ByName(name) => param.name == *name,
            RootMatch::ByType { value_type, name } => {
                param.value_type == *value_type
                    && name.as_ref().map_or(true, |n| param.name == *n)
            }
        }
    }
}

impl fmt::Display for RootMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RootMatch::Exact(p) => write!(f, "parameter `{}: {}`", p.name, p.value_type),
            RootMatch::ByName(name) => write!(f, "name `{}`", name),
            RootMatch::ByType {
                value_type,
                name: None,
            } => write!(f, "type `{}`", value_type),
            RootMatch::ByType {
                value_type,
                name: Some(name),
            } => write!(f, "type `{}` named `{}`", value_type, name),
        }
    }
}

/// Graphs whose root references can be relocated.
///
/// Implemented for bare sub-graphs ([`Expr`]), untyped lambdas ([`Lambda`])
/// and typed lambdas ([`TypedLambda`]).
pub trait Rerootable: Sized {
    /// Distinct root references of the graph in order of first appearance.
    /// For lambdas the declared parameters come first.
    fn roots(&self) -> Vec<Param>;

    /// Replaces every occurrence of `old` with `replacement`, re-resolving
    /// dependent member accesses.
    fn replace_root(self, old: &Param, replacement: &Param) -> Result<Self, GraphError>;

    /// Replaces the root selected by `criterion` with `replacement`.
    ///
    /// A graph without a matching root is returned unchanged.
    ///
    /// # Errors
    ///
    /// - [`GraphError::AmbiguousRoot`] if several distinct roots match
    /// - [`GraphError::IncompatibleShape`] if a member used downstream does not
    ///   exist on the replacement's type
    /// - [`GraphError::MemberTypeChanged`] if such a member has a type that
    ///   does not convert implicitly to the one the graph was built with
    fn substitute_root(self, criterion: &RootMatch, replacement: &Param) -> Result<Self, GraphError> {
        match select_root(&self.roots(), criterion)? {
            Some(old) => self.replace_root(&old, replacement),
            None => Ok(self),
        }
    }

    /// Changes the type of the root of type `old_type` to `new_type`,
    /// keeping its name.
    fn retype_root(self, old_type: &ValueType, new_type: &ValueType) -> Result<Self, GraphError> {
        let criterion = RootMatch::by_type(old_type.clone());
        match select_root(&self.roots(), &criterion)? {
            Some(old) => {
                let replacement = Param::new(old.name.clone(), new_type.clone());
                self.replace_root(&old, &replacement)
            }
            None => Ok(self),
        }
    }
}

impl Rerootable for Expr {
    fn roots(&self) -> Vec<Param> {
        match self {
            Expr::Lambda(lambda) => lambda.roots(),
            body => {
                let mut roots = Vec::new();
                collect_free(body, &mut Vec::new(), &mut roots);
                roots
            }
        }
    }

    fn replace_root(self, old: &Param, replacement: &Param) -> Result<Self, GraphError> {
        match self {
            Expr::Lambda(lambda) => lambda.replace_root(old, replacement).map(Expr::Lambda),
            body => {
                trace!(
                    event = "root_replaced",
                    from = %old.name,
                    to = %replacement.name,
                    to_type = %replacement.value_type,
                );
                rebind(body, old, replacement)
            }
        }
    }
}

impl Rerootable for Lambda {
    fn roots(&self) -> Vec<Param> {
        let mut roots = self.params.clone();
        collect_free(&self.body, &mut self.params.iter().collect(), &mut roots);
        roots
    }

    fn replace_root(self, old: &Param, replacement: &Param) -> Result<Self, GraphError> {
        trace!(
            event = "root_replaced",
            from = %old.name,
            to = %replacement.name,
            to_type = %replacement.value_type,
        );
        let params = self
            .params
            .into_iter()
            .map(|p| if p == *old { replacement.clone() } else { p })
            .collect();
        let body = rebind(*self.body, old, replacement)?;
        Ok(Lambda::new(params, body))
    }
}

impl<R: GraphOutput> Rerootable for TypedLambda<R> {
    fn roots(&self) -> Vec<Param> {
        self.lambda().roots()
    }

    fn replace_root(self, old: &Param, replacement: &Param) -> Result<Self, GraphError> {
        TypedLambda::new(self.into_lambda().replace_root(old, replacement)?)
    }
}

fn select_root(roots: &[Param], criterion: &RootMatch) -> Result<Option<Param>, GraphError> {
    let matching: Vec<&Param> = roots.iter().filter(|p| criterion.matches(p)).collect();
    match matching.as_slice() {
        [] => Ok(None),
        [single] => Ok(Some((*single).clone())),
        candidates => Err(GraphError::AmbiguousRoot {
            criterion: criterion.to_string(),
            candidates: candidates
                .iter()
                .map(|p| format!("{}: {}", p.name, p.value_type))
                .collect(),
        }),
    }
}

/// Collects parameters referenced in `expr` that no enclosing lambda binds.
fn collect_free<'a>(expr: &'a Expr, bound: &mut Vec<&'a Param>, out: &mut Vec<Param>) {
    match expr {
        Expr::Param(p) => {
            if !bound.contains(&p) && !out.contains(p) {
                out.push(p.clone());
            }
        }
        Expr::Lambda(lambda) => {
            let depth = bound.len();
            bound.extend(lambda.params.iter());
            collect_free(&lambda.body, bound, out);
            bound.truncate(depth);
        }
        other => {
            for child in other.children() {
                collect_free(child, bound, out);
            }
        }
    }
}

fn member_type(target: &Expr, member: &str) -> Result<ValueType, GraphError> {
    let shape = target.value_type();
    shape
        .member_type(member)
        .ok_or_else(|| GraphError::IncompatibleShape {
            member: member.to_string(),
            shape: shape.to_string(),
        })
}

fn rebind_all(exprs: Vec<Expr>, old: &Param, replacement: &Param) -> Result<Vec<Expr>, GraphError> {
    exprs
        .into_iter()
        .map(|e| rebind(e, old, replacement))
        .collect()
}

fn rebind_boxed(expr: Box<Expr>, old: &Param, replacement: &Param) -> Result<Box<Expr>, GraphError> {
    rebind(*expr, old, replacement).map(Box::new)
}

/// Re-resolves a member access chain against the rebound root.
///
/// Intermediate steps may change type; only the final value is checked by
/// the caller.
fn rebind_access(expr: Expr, old: &Param, replacement: &Param) -> Result<Expr, GraphError> {
    match expr {
        Expr::Member { target, member, .. } => {
            let target = rebind_access(*target, old, replacement)?;
            let value_type = member_type(&target, &member)?;
            Ok(Expr::Member {
                target: Box::new(target),
                member,
                value_type,
            })
        }
        Expr::Guarded { target, member, .. } => {
            let target = rebind_access(*target, old, replacement)?;
            let value_type = ValueType::nullable(member_type(&target, &member)?);
            Ok(Expr::Guarded {
                target: Box::new(target),
                member,
                value_type,
            })
        }
        other => rebind(other, old, replacement),
    }
}

/// Converts a rebuilt member access back to the type its consumers expect.
fn keep_type(access: Expr, expected: &ValueType) -> Result<Expr, GraphError> {
    let found = access.value_type();
    if found == *expected {
        return Ok(access);
    }
    if !is_implicit(&found, expected) {
        let (member, shape) = match &access {
            Expr::Member { target, member, .. } | Expr::Guarded { target, member, .. } => {
                (member.to_string(), target.value_type().to_string())
            }
            other => (other.to_string(), String::new()),
        };
        return Err(GraphError::MemberTypeChanged {
            member,
            shape,
            expected: expected.to_string(),
            found: found.to_string(),
        });
    }
    Ok(Expr::convert(access, expected.clone()))
}

/// Rebuilds `expr` bottom-up with `old` swapped for `replacement`.
fn rebind(expr: Expr, old: &Param, replacement: &Param) -> Result<Expr, GraphError> {
    Ok(match expr {
        Expr::Param(p) if p == *old => Expr::Param(replacement.clone()),
        Expr::Param(_) | Expr::Literal { .. } => expr,
        access @ (Expr::Member { .. } | Expr::Guarded { .. }) => {
            let expected = access.value_type();
            keep_type(rebind_access(access, old, replacement)?, &expected)?
        }
        Expr::Unary(op, inner) => Expr::Unary(op, rebind_boxed(inner, old, replacement)?),
        Expr::Binary(op, left, right) => Expr::Binary(
            op,
            rebind_boxed(left, old, replacement)?,
            rebind_boxed(right, old, replacement)?,
        ),
        Expr::And(left, right) => Expr::And(
            rebind_boxed(left, old, replacement)?,
            rebind_boxed(right, old, replacement)?,
        ),
        Expr::Or(left, right) => Expr::Or(
            rebind_boxed(left, old, replacement)?,
            rebind_boxed(right, old, replacement)?,
        ),
        Expr::Call {
            method,
            target,
            args,
        } => Expr::Call {
            method,
            target: rebind_boxed(target, old, replacement)?,
            args: rebind_all(args, old, replacement)?,
        },
        Expr::Convert { expr, value_type } => Expr::Convert {
            expr: rebind_boxed(expr, old, replacement)?,
            value_type,
        },
        Expr::If {
            cond,
            then_expr,
            else_expr,
        } => Expr::If {
            cond: rebind_boxed(cond, old, replacement)?,
            then_expr: rebind_boxed(then_expr, old, replacement)?,
            else_expr: rebind_boxed(else_expr, old, replacement)?,
        },
        Expr::New { record_type, args } => Expr::New {
            record_type,
            args: rebind_all(args, old, replacement)?,
        },
        Expr::MemberInit { new, bindings } => Expr::MemberInit {
            new: rebind_boxed(new, old, replacement)?,
            bindings: bindings
                .into_iter()
                .map(|(member, value)| Ok((member, rebind(value, old, replacement)?)))
                .collect::<Result<_, GraphError>>()?,
        },
        // A nested lambda that declares `old` itself shadows it.
        Expr::Lambda(lambda) if lambda.params.contains(old) => Expr::Lambda(lambda),
        Expr::Lambda(lambda) => Expr::Lambda(Lambda {
            params: lambda.params,
            body: rebind_boxed(lambda.body, old, replacement)?,
        }),
    })
}
