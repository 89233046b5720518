//! Member-path resolution.
//!
//! A dotted path such as `"Manager.Address.City"` is resolved segment by
//! segment against a root type. The resolved [`MemberPath`] then lowers to an
//! expression graph in which every access whose target may be absent is a
//! null-propagating [`Expr::Guarded`] node. Accesses on value-semantics
//! targets (`Birthdate.Year` on a non-nullable date) stay plain.

use std::fmt;
use std::sync::Arc;

use crate::error::PathError;
use crate::expr::{Expr, Param};
use crate::types::ValueType;

pub const PATH_SEPARATOR: char = '.';

/// One resolved step of a member path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    /// Type the member was resolved on.
    pub declaring_type: ValueType,
    pub name: Arc<str>,
    /// Declared type of the member itself, before any null lifting.
    pub value_type: ValueType,
    /// True if the member's value may be absent at runtime.
    pub may_be_absent: bool,
}

/// An ordered chain of member accesses rooted at a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberPath {
    root: ValueType,
    steps: Vec<PathStep>,
}

/// Resolves `path` against `root`.
///
/// # Errors
///
/// - [`PathError::EmptyPath`] if the path or any segment is empty
/// - [`PathError::UnknownMember`] if a segment does not exist on its type
/// - [`PathError::NotNavigable`] if a non-terminal segment has no members
pub fn resolve(root: &ValueType, path: &str) -> Result<MemberPath, PathError> {
    let mut steps: Vec<PathStep> = Vec::new();
    let mut current = root.clone();

    for segment in path.split(PATH_SEPARATOR) {
        if segment.is_empty() {
            return Err(PathError::EmptyPath {
                path: path.to_string(),
            });
        }
        if !current.has_members() {
            let member = steps
                .last()
                .map(|s| s.name.to_string())
                .unwrap_or_else(|| segment.to_string());
            return Err(PathError::NotNavigable {
                member,
                value_type: current.to_string(),
            });
        }
        let value_type = current
            .member_type(segment)
            .ok_or_else(|| PathError::UnknownMember {
                member: segment.to_string(),
                shape: current.to_string(),
            })?;
        steps.push(PathStep {
            declaring_type: current,
            name: segment.into(),
            may_be_absent: value_type.may_be_absent(),
            value_type: value_type.clone(),
        });
        current = value_type;
    }

    Ok(MemberPath {
        root: root.clone(),
        steps,
    })
}

impl MemberPath {
    pub fn root(&self) -> &ValueType {
        &self.root
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Returns true if lowering this path inserts at least one guard.
    pub fn is_guarded(&self) -> bool {
        let non_terminal = self.steps.len().saturating_sub(1);
        self.steps[..non_terminal].iter().any(|s| s.may_be_absent)
    }

    /// Type produced by the lowered graph: the terminal member type, lifted
    /// to nullable when any guard is inserted.
    pub fn value_type(&self) -> ValueType {
        let terminal = self
            .steps
            .last()
            .map(|s| s.value_type.clone())
            .unwrap_or_else(|| self.root.clone());
        if self.is_guarded() {
            ValueType::nullable(terminal)
        } else {
            terminal
        }
    }

    /// Lowers the path to an expression graph rooted at `root`.
    pub fn to_expr(&self, root: Expr) -> Expr {
        let mut acc = root;
        let mut absent = false;
        for step in &self.steps {
            acc = if absent {
                Expr::Guarded {
                    target: Box::new(acc),
                    member: step.name.clone(),
                    value_type: ValueType::nullable(step.value_type.clone()),
                }
            } else {
                Expr::Member {
                    target: Box::new(acc),
                    member: step.name.clone(),
                    value_type: step.value_type.clone(),
                }
            };
            absent = absent || step.may_be_absent;
        }
        acc
    }

    /// Lowers the path against a parameter reference.
    pub fn to_expr_on(&self, root: &Param) -> Expr {
        self.to_expr(Expr::Param(root.clone()))
    }
}

impl fmt::Display for MemberPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", PATH_SEPARATOR)?;
            }
            f.write_str(&step.name)?;
        }
        Ok(())
    }
}

/// Resolves `path` against `root`'s type and lowers it in one step.
pub fn resolve_expr(root: &Param, path: &str) -> Result<Expr, PathError> {
    Ok(resolve(&root.value_type, path)?.to_expr_on(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordType;

    fn person_type() -> ValueType {
        let address = RecordType::builder("Address")
            .member("City", ValueType::String)
            .member("Zip", ValueType::I32)
            .build()
            .unwrap();
        let person = RecordType::builder("Person")
            .member("Id", ValueType::I64)
            .member("Descr", ValueType::String)
            .member("Birthdate", ValueType::Date)
            .member("LastSeen", ValueType::nullable(ValueType::DateTime))
            .member("Address", ValueType::record(&address))
            .build()
            .unwrap();
        ValueType::record(&person)
    }

    #[test]
    fn test_resolve_steps() {
        let path = resolve(&person_type(), "Address.City").unwrap();
        assert_eq!(path.steps().len(), 2);
        assert_eq!(path.steps()[0].declaring_type.to_string(), "Person");
        assert_eq!(path.steps()[1].declaring_type.to_string(), "Address");
        assert_eq!(path.steps()[1].value_type, ValueType::String);
        assert_eq!(path.to_string(), "Address.City");
    }

    #[test]
    fn test_reference_step_is_guarded() {
        let x = Param::new("x", person_type());
        let path = resolve(&x.value_type, "Descr.Length").unwrap();
        assert!(path.is_guarded());
        assert_eq!(path.value_type(), ValueType::nullable(ValueType::I32));
        assert_eq!(path.to_expr_on(&x).to_string(), "x.Descr?.Length");
    }

    #[test]
    fn test_value_step_is_not_guarded() {
        let x = Param::new("x", person_type());
        let path = resolve(&x.value_type, "Birthdate.Year").unwrap();
        assert!(!path.is_guarded());
        assert_eq!(path.value_type(), ValueType::I32);
        let expr = path.to_expr_on(&x);
        assert!(!expr.contains_guard());
        assert_eq!(expr.to_string(), "x.Birthdate.Year");
    }

    #[test]
    fn test_guard_propagates() {
        let x = Param::new("x", person_type());
        let expr = resolve_expr(&x, "Address.City.Length").unwrap();
        assert_eq!(expr.to_string(), "x.Address?.City?.Length");
        assert_eq!(expr.value_type(), ValueType::nullable(ValueType::I32));

        let expr = resolve_expr(&x, "LastSeen.Date.Year").unwrap();
        assert_eq!(expr.to_string(), "x.LastSeen?.Date?.Year");
    }

    #[test]
    fn test_terminal_reference_is_not_guarded() {
        let x = Param::new("x", person_type());
        let expr = resolve_expr(&x, "Address").unwrap();
        assert!(!expr.contains_guard());
    }

    #[test]
    fn test_unknown_member() {
        let err = resolve(&person_type(), "Address.Street").unwrap_err();
        assert_eq!(
            err,
            PathError::UnknownMember {
                member: "Street".to_string(),
                shape: "Address".to_string()
            }
        );
    }

    #[test]
    fn test_not_navigable() {
        let err = resolve(&person_type(), "Id.Value").unwrap_err();
        assert_eq!(
            err,
            PathError::NotNavigable {
                member: "Id".to_string(),
                value_type: "Int64".to_string()
            }
        );
    }

    #[test]
    fn test_empty_segments() {
        assert!(matches!(
            resolve(&person_type(), ""),
            Err(PathError::EmptyPath { .. })
        ));
        assert!(matches!(
            resolve(&person_type(), "Address..City"),
            Err(PathError::EmptyPath { .. })
        ));
    }
}
