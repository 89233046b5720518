//! Tests for root substitution and retyping.

use std::sync::Arc;

use super::*;
use crate::expr::{BooleanGraph, Method};
use crate::path::resolve_expr;
use crate::types::RecordType;

fn person() -> Arc<RecordType> {
    RecordType::builder("Person")
        .member("Id", ValueType::I64)
        .member("Name", ValueType::String)
        .build()
        .unwrap()
}

fn employee() -> Arc<RecordType> {
    RecordType::builder("Employee")
        .member("Id", ValueType::I32)
        .member("Name", ValueType::String)
        .member("Salary", ValueType::F64)
        .build()
        .unwrap()
}

fn name_check(param: &Param) -> Expr {
    Expr::ne(
        resolve_expr(param, "Name.Length").unwrap(),
        Expr::null(ValueType::I32),
    )
}

#[test]
fn test_substitute_in_typed_lambda() {
    let x = Param::new("x", ValueType::record(&person()));
    let graph = BooleanGraph::new(Lambda::single(x.clone(), name_check(&x))).unwrap();

    let p = Param::new("p", ValueType::record(&person()));
    let moved = graph.substitute_root(&RootMatch::Exact(x), &p).unwrap();
    assert_eq!(moved.to_string(), "p => (p.Name?.Length != null)");
    assert_eq!(moved.params(), &[p]);
}

#[test]
fn test_substitute_in_untyped_lambda() {
    let x = Param::new("x", ValueType::record(&person()));
    let lambda = Lambda::single(x.clone(), name_check(&x));

    let p = Param::new("p", ValueType::record(&person()));
    let moved = lambda.substitute_root(&RootMatch::by_name("x"), &p).unwrap();
    assert_eq!(moved.to_string(), "p => (p.Name?.Length != null)");
}

#[test]
fn test_substitute_in_bare_body() {
    let x = Param::new("x", ValueType::record(&person()));
    let body = name_check(&x);
    assert_eq!(body.roots(), vec![x.clone()]);

    let p = Param::new("p", ValueType::record(&person()));
    let moved = body
        .substitute_root(&RootMatch::by_type(ValueType::record(&person())), &p)
        .unwrap();
    // `person()` builds a fresh type, so nothing matched by type.
    assert_eq!(moved.to_string(), "(x.Name?.Length != null)");

    let moved = moved
        .substitute_root(&RootMatch::by_type(x.value_type.clone()), &p)
        .unwrap();
    assert_eq!(moved.to_string(), "(p.Name?.Length != null)");
}

#[test]
fn test_retype_rebuilds_member_accesses() {
    let person = person();
    let employee = employee();
    let x = Param::new("x", ValueType::record(&person));
    let body = Expr::gt(resolve_expr(&x, "Id").unwrap(), Expr::long(10));
    let lambda = Lambda::single(x, body);

    let retyped = lambda
        .retype_root(&ValueType::record(&person), &ValueType::record(&employee))
        .unwrap();
    assert_eq!(retyped.params[0].value_type, ValueType::record(&employee));

    // `Employee.Id` is narrower, so the comparison still sees an Int64.
    let Expr::Binary(_, left, _) = retyped.body() else {
        panic!("expected a comparison");
    };
    let Expr::Convert { expr, value_type } = &**left else {
        panic!("expected a widening conversion, got {}", left);
    };
    assert_eq!(expr.value_type(), ValueType::I32);
    assert_eq!(*value_type, ValueType::I64);
    assert_eq!(retyped.to_string(), "x => (Convert(x.Id, Int64) > 10)");
}

#[test]
fn test_retype_keeps_unchanged_member_types() {
    let person = person();
    let employee = employee();
    let x = Param::new("x", ValueType::record(&person));
    let lambda = Lambda::single(x.clone(), name_check(&x));

    let retyped = lambda
        .retype_root(&ValueType::record(&person), &ValueType::record(&employee))
        .unwrap();
    assert_eq!(retyped.to_string(), "x => (x.Name?.Length != null)");
}

#[test]
fn test_retype_member_of_unrelated_type_fails() {
    let flagged = RecordType::builder("Flagged")
        .member("Name", ValueType::Bool)
        .build()
        .unwrap();
    let person = person();
    let x = Param::new("x", ValueType::record(&person));
    let starts = Expr::call(
        Method::StartsWith,
        resolve_expr(&x, "Name").unwrap(),
        vec![Expr::string("t")],
    );
    let lambda = Lambda::single(x, starts);

    let err = lambda
        .retype_root(&ValueType::record(&person), &ValueType::record(&flagged))
        .unwrap_err();
    assert_eq!(
        err,
        GraphError::MemberTypeChanged {
            member: "Name".to_string(),
            shape: "Flagged".to_string(),
            expected: "String".to_string(),
            found: "Boolean".to_string(),
        }
    );
}

#[test]
fn test_narrowing_member_type_fails() {
    let wide = RecordType::builder("Wide")
        .member("Id", ValueType::I64)
        .build()
        .unwrap();
    let employee = employee();
    let x = Param::new("x", ValueType::record(&employee));
    let body = Expr::gt(resolve_expr(&x, "Id").unwrap(), Expr::int(10));
    let lambda = Lambda::single(x, body);

    let err = lambda
        .retype_root(&ValueType::record(&employee), &ValueType::record(&wide))
        .unwrap_err();
    assert!(matches!(err, GraphError::MemberTypeChanged { ref found, .. } if found == "Int64"));
}

#[test]
fn test_retype_incompatible_shape() {
    let employee = employee();
    let x = Param::new("x", ValueType::record(&employee));
    let body = Expr::gt(resolve_expr(&x, "Salary").unwrap(), Expr::literal(1.0.into(), ValueType::F64));
    let lambda = Lambda::single(x, body);

    let err = lambda
        .retype_root(&ValueType::record(&employee), &ValueType::record(&person()))
        .unwrap_err();
    assert_eq!(
        err,
        GraphError::IncompatibleShape {
            member: "Salary".to_string(),
            shape: "Person".to_string()
        }
    );
}

#[test]
fn test_ambiguous_root_by_type() {
    let person = person();
    let a = Param::new("a", ValueType::record(&person));
    let b = Param::new("b", ValueType::record(&person));
    let body = Expr::eq(
        resolve_expr(&a, "Id").unwrap(),
        resolve_expr(&b, "Id").unwrap(),
    );
    let lambda = Lambda::new(vec![a, b], body);

    let replacement = Param::new("c", ValueType::record(&person));
    let err = lambda
        .clone()
        .substitute_root(&RootMatch::by_type(ValueType::record(&person)), &replacement)
        .unwrap_err();
    assert!(matches!(err, GraphError::AmbiguousRoot { ref candidates, .. } if candidates.len() == 2));

    let moved = lambda
        .substitute_root(
            &RootMatch::by_type_named(ValueType::record(&person), "b"),
            &replacement,
        )
        .unwrap();
    assert_eq!(moved.to_string(), "(a, c) => (a.Id == c.Id)");

    let err = Expr::Lambda(moved)
        .retype_root(&ValueType::record(&person), &ValueType::record(&employee()))
        .unwrap_err();
    assert!(matches!(err, GraphError::AmbiguousRoot { .. }));
}

#[test]
fn test_nested_lambda_shadowing() {
    let person = person();
    let x = Param::new("x", ValueType::record(&person));
    let inner = Lambda::single(x.clone(), resolve_expr(&x, "Name").unwrap());
    let body = Expr::and(
        Expr::eq(resolve_expr(&x, "Name").unwrap(), Expr::string("a")),
        Expr::Lambda(inner),
    );
    assert_eq!(body.roots(), vec![x.clone()]);

    let y = Param::new("y", ValueType::record(&person));
    let moved = body.replace_root(&x, &y).unwrap();
    assert_eq!(moved.to_string(), r#"((y.Name == "a") && x => x.Name)"#);
}
