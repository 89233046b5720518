use std::sync::Arc;

use mapforge_core::{Expr, GraphError, Lambda, Param, PathError, Record, RecordType, Value, ValueType};
use mapforge_dynamic::TypeSynthesizer;
use mapforge_test::{person_type, source_records, source_type, target_ctor_type, target_type};

use super::*;
use crate::compiler::Compiler;
use crate::error::MapError;
use crate::predicate::{Operator, PredicateBuilder};

fn run(projection: &Projection, compiler: &Compiler) -> Vec<Record> {
    let source = source_records(projection.source());
    projection
        .build_query(compiler, source, None, None)
        .unwrap()
        .collect::<std::result::Result<_, _>>()
        .unwrap()
}

fn fields(records: &[Record]) -> Vec<Vec<Value>> {
    records.iter().map(|r| r.fields().to_vec()).collect()
}

fn expected_rows() -> Vec<Vec<Value>> {
    vec![
        vec![Value::I32(1), Value::from("1"), Value::Bool(true)],
        vec![Value::I32(2), Value::from("2"), Value::Bool(false)],
        vec![Value::I32(3), Value::from("3"), Value::Bool(true)],
    ]
}

#[test]
fn test_assignments_into_existing_type() {
    let compiler = Compiler::new();
    let projection = ProjectionBuilder::new(&source_type())
        .target(&target_type())
        .member("Id", Mapping::from_expression("Prop1"))
        .member("Name", Mapping::from_expression("Prop2"))
        .auto("Active")
        .build(&compiler)
        .unwrap();

    assert_eq!(
        projection.graph().to_string(),
        "x => new Target() { Id = x.Prop1, Name = x.Prop2, Active = x.Active }"
    );
    let out = run(&projection, &compiler);
    assert!(out.iter().all(|r| r.record_type().name() == "Target"));
    assert_eq!(fields(&out), expected_rows());
}

#[test]
fn test_constructor_bindings_match_assignments() {
    let compiler = Compiler::new();
    let projection = ProjectionBuilder::new(&source_type())
        .target(&target_ctor_type())
        .member("Id", Mapping::from_expression("Prop1").using_ctor_parameter("id"))
        .ctor_parameter("name", Mapping::from_expression("Prop2"))
        .ctor_parameter("Active", Mapping::auto())
        .build(&compiler)
        .unwrap();

    assert_eq!(
        projection.graph().to_string(),
        "x => new TargetCtor(x.Prop1, x.Prop2, x.Active)"
    );
    assert_eq!(fields(&run(&projection, &compiler)), expected_rows());
}

#[test]
fn test_assignment_to_a_bound_member_feeds_the_constructor() {
    let compiler = Compiler::new();
    let projection = ProjectionBuilder::new(&source_type())
        .target(&target_ctor_type())
        .member("Name", Mapping::from_expression("Prop2"))
        .member("Id", Mapping::from_expression("Prop1"))
        .auto("Active")
        .build(&compiler)
        .unwrap();

    assert_eq!(
        projection.graph().to_string(),
        "x => new TargetCtor(x.Prop1, x.Prop2, x.Active)"
    );
    assert_eq!(fields(&run(&projection, &compiler)), expected_rows());
}

#[test]
fn test_unbound_constructor_parameter_fails() {
    let err = ProjectionBuilder::new(&source_type())
        .target(&target_ctor_type())
        .member("Id", Mapping::from_expression("Prop1"))
        .member("Name", Mapping::from_expression("Prop2"))
        .build(&Compiler::new())
        .unwrap_err();

    assert_eq!(
        err,
        MapError::InvalidConstructorBinding {
            shape: "TargetCtor".to_string(),
            parameter: "active".to_string(),
        }
    );
}

#[test]
fn test_constructor_binding_on_type_without_one_fails() {
    let err = ProjectionBuilder::new(&source_type())
        .target(&target_type())
        .ctor_parameter("Id", Mapping::from_expression("Prop1"))
        .build(&Compiler::new())
        .unwrap_err();

    assert!(matches!(err, MapError::InvalidConstructorBinding { ref parameter, .. } if parameter == "Id"));
}

#[test]
fn test_constructor_parameter_bound_twice_fails() {
    let err = ProjectionBuilder::new(&source_type())
        .target(&target_ctor_type())
        .ctor_parameter("id", Mapping::from_expression("Prop1"))
        .member("Name", Mapping::from_expression("Prop1").using_ctor_parameter("id"))
        .auto("Active")
        .build(&Compiler::new())
        .unwrap_err();

    assert!(matches!(err, MapError::InvalidConstructorBinding { ref parameter, .. } if parameter == "id"));
}

#[test]
fn test_dynamic_type_is_synthesized_from_members() {
    let compiler = Compiler::new();
    let projection = ProjectionBuilder::new(&source_type())
        .member("Id", Mapping::from_expression("Prop1"))
        .member("Name", Mapping::from_expression("Prop2"))
        .auto("Active")
        .build_with_dynamic_type("SourceDto", &compiler)
        .unwrap();

    let target = projection.target();
    assert_eq!(target.name(), "SourceDto");
    let members: Vec<_> = target
        .members()
        .iter()
        .map(|m| (m.name.to_string(), m.value_type.clone()))
        .collect();
    assert_eq!(
        members,
        vec![
            ("Id".to_string(), ValueType::I32),
            ("Name".to_string(), ValueType::String),
            ("Active".to_string(), ValueType::Bool),
        ]
    );
    assert!(Arc::ptr_eq(
        target,
        &compiler.synthesizer().find_type("SourceDto").unwrap()
    ));
    assert_eq!(fields(&run(&projection, &compiler)), expected_rows());
}

#[test]
fn test_dynamic_type_with_constructor() {
    let compiler = Compiler::new();
    let projection = ProjectionBuilder::new(&source_type())
        .ctor_parameter("Id", Mapping::from_expression("Prop1"))
        .member("Name", Mapping::from_expression("Prop2").using_ctor_parameter("name"))
        .auto("Active")
        .build_with_dynamic_type("SourceCtorDto", &compiler)
        .unwrap();

    assert_eq!(
        projection.graph().to_string(),
        "x => new SourceCtorDto(x.Prop1, x.Prop2) { Active = x.Active }"
    );
    let params: Vec<_> = projection
        .target()
        .constructor()
        .unwrap()
        .iter()
        .map(|p| p.name.to_string())
        .collect();
    assert_eq!(params, vec!["Id", "name"]);
    assert_eq!(fields(&run(&projection, &compiler)), expected_rows());
}

#[test]
fn test_equal_projections_are_compiled_once() {
    let compiler = Compiler::new();
    let slim = |source: &Arc<RecordType>| {
        ProjectionBuilder::new(source)
            .member("Id", Mapping::from_expression("Prop1"))
            .auto("Active")
            .build_with_dynamic_type("Slim", &compiler)
            .unwrap()
    };
    let source = source_type();

    let first = slim(&source);
    let second = slim(&source);
    assert!(Arc::ptr_eq(&first, &second));

    // Another source type with the same members reuses the synthesized target.
    let other = slim(&source_type());
    assert!(!Arc::ptr_eq(&first, &other));
    assert!(Arc::ptr_eq(first.target(), other.target()));
    assert_eq!(compiler.cached(), (0, 2));
    assert_eq!(compiler.synthesizer().len(), 1);
}

#[test]
fn test_shared_synthesizer_sees_targets() {
    let synthesizer = Arc::new(TypeSynthesizer::new());
    let compiler = Compiler::new().with_synthesizer(Arc::clone(&synthesizer));

    ProjectionBuilder::new(&source_type())
        .auto("Prop1")
        .build_with_dynamic_type("Shared", &compiler)
        .unwrap();

    assert!(synthesizer.find_type("Shared").is_some());
}

#[test]
fn test_record_valued_members_resolve_in_synthesized_types() {
    let address = RecordType::builder("Address")
        .member("City", ValueType::String)
        .build()
        .unwrap();
    let customer = RecordType::builder("Customer")
        .member("Name", ValueType::String)
        .member("Address", ValueType::record(&address))
        .build()
        .unwrap();
    let compiler = Compiler::new();

    let projection = ProjectionBuilder::new(&customer)
        .auto("Address")
        .member("City", Mapping::from_expression("Address.City"))
        .build_with_dynamic_type("CustomerView", &compiler)
        .unwrap();

    assert_eq!(
        projection.target().member("Address").unwrap().value_type,
        ValueType::record(&address)
    );
    assert_eq!(
        projection.graph().to_string(),
        "x => new CustomerView() { Address = x.Address, City = x.Address?.City }"
    );

    let lives_nowhere = Record::new(Arc::clone(&customer)).with("Name", "Ada");
    let out = projection.apply(lives_nowhere).unwrap();
    assert_eq!(out.get("City"), Some(&Value::Null));
}

#[test]
fn test_select_prunes_members() {
    let compiler = Compiler::new();
    let assigned = ProjectionBuilder::new(&source_type())
        .target(&target_type())
        .member("Id", Mapping::from_expression("Prop1"))
        .member("Name", Mapping::from_expression("Prop2"))
        .auto("Active")
        .build(&compiler)
        .unwrap();
    assert_eq!(
        assigned.select(&["Name"]).unwrap().to_string(),
        "x => new Target() { Name = x.Prop2 }"
    );

    let constructed = ProjectionBuilder::new(&source_type())
        .target(&target_ctor_type())
        .ctor_parameter("id", Mapping::from_expression("Prop1"))
        .ctor_parameter("name", Mapping::from_expression("Prop2"))
        .ctor_parameter("active", Mapping::auto().using_ctor_parameter("active"))
        .build(&compiler);
    // `active` is not a source member; auto matching uses the given name.
    assert!(matches!(constructed, Err(MapError::UnmatchedAutoMember { .. })));

    let constructed = ProjectionBuilder::new(&source_type())
        .target(&target_ctor_type())
        .ctor_parameter("id", Mapping::from_expression("Prop1"))
        .ctor_parameter("name", Mapping::from_expression("Prop2"))
        .ctor_parameter("Active", Mapping::auto())
        .build(&compiler)
        .unwrap();
    assert_eq!(
        constructed.select(&["Name"]).unwrap().to_string(),
        "x => new TargetCtor(0, x.Prop2, false)"
    );
}

#[test]
fn test_select_unknown_member_fails() {
    let compiler = Compiler::new();
    let projection = ProjectionBuilder::new(&source_type())
        .target(&target_type())
        .member("Id", Mapping::from_expression("Prop1"))
        .build(&compiler)
        .unwrap();

    let err = projection.select(&["Name"]).unwrap_err();
    assert_eq!(
        err,
        MapError::UnknownTargetMember {
            member: "Name".to_string(),
            shape: "Target".to_string(),
        }
    );
}

#[test]
fn test_query_filters_before_projecting() {
    let compiler = Compiler::new();
    let source = source_type();
    let projection = ProjectionBuilder::new(&source)
        .target(&target_type())
        .member("Id", Mapping::from_expression("Prop1"))
        .member("Name", Mapping::from_expression("Prop2"))
        .auto("Active")
        .build(&compiler)
        .unwrap();
    let filter = PredicateBuilder::new(&source)
        .has("Prop1", Operator::GreaterThan, 1)
        .build();

    let query = projection
        .query(&compiler, Some(&["Id", "Active"]), Some(&filter))
        .unwrap();
    assert_eq!(
        query.to_string(),
        "source.Where(x => (x.Prop1 > 1)).Select(x => new Target() { Id = x.Prop1, Active = x.Active })"
    );

    let out: Vec<Record> = query
        .run(source_records(&source))
        .collect::<std::result::Result<_, _>>()
        .unwrap();
    assert_eq!(
        fields(&out),
        vec![
            vec![Value::I32(2), Value::Null, Value::Bool(false)],
            vec![Value::I32(3), Value::Null, Value::Bool(true)],
        ]
    );
}

#[test]
fn test_filter_over_a_compatible_type_is_retargeted() {
    let compiler = Compiler::new();
    let source = source_type();
    let lookalike = RecordType::builder("Lookalike")
        .member("Active", ValueType::Bool)
        .build()
        .unwrap();
    let projection = ProjectionBuilder::new(&source)
        .target(&target_type())
        .member("Id", Mapping::from_expression("Prop1"))
        .build(&compiler)
        .unwrap();
    let active = PredicateBuilder::new(&lookalike)
        .has("Active", Operator::Equals, true)
        .build();

    let ids: Vec<Value> = projection
        .build_query(&compiler, source_records(&source), None, Some(&active))
        .unwrap()
        .map(|r| r.unwrap().get("Id").cloned().unwrap())
        .collect();

    assert_eq!(ids, vec![Value::I32(1), Value::I32(3)]);
}

#[test]
fn test_filter_over_an_incompatible_type_fails() {
    let compiler = Compiler::new();
    let person = person_type();
    let projection = ProjectionBuilder::new(&source_type())
        .target(&target_type())
        .member("Id", Mapping::from_expression("Prop1"))
        .build(&compiler)
        .unwrap();
    let by_name = PredicateBuilder::new(&person)
        .has("Name", Operator::IsNotNull, Value::Null)
        .build();

    let err = projection.query(&compiler, None, Some(&by_name)).unwrap_err();
    assert!(matches!(err, MapError::Graph(GraphError::IncompatibleShape { .. })));
}

#[test]
fn test_filter_member_of_another_type_fails() {
    let compiler = Compiler::new();
    let lookalike = RecordType::builder("Lookalike")
        .member("Active", ValueType::String)
        .build()
        .unwrap();
    let projection = ProjectionBuilder::new(&source_type())
        .target(&target_type())
        .member("Id", Mapping::from_expression("Prop1"))
        .build(&compiler)
        .unwrap();
    let starts_with_t = PredicateBuilder::new(&lookalike)
        .has("Active", Operator::StartsWith, "t")
        .build();

    let err = projection
        .query(&compiler, None, Some(&starts_with_t))
        .unwrap_err();
    assert_eq!(
        err,
        MapError::Graph(GraphError::MemberTypeChanged {
            member: "Active".to_string(),
            shape: "Source".to_string(),
            expected: "String".to_string(),
            found: "Boolean".to_string(),
        })
    );
}

#[test]
fn test_filter_member_of_narrower_type_is_widened() {
    let compiler = Compiler::new();
    let source = source_type();
    let wide = RecordType::builder("Wide")
        .member("Prop1", ValueType::I64)
        .build()
        .unwrap();
    let projection = ProjectionBuilder::new(&source)
        .target(&target_type())
        .member("Id", Mapping::from_expression("Prop1"))
        .build(&compiler)
        .unwrap();
    let past_first = PredicateBuilder::new(&wide)
        .has("Prop1", Operator::GreaterThan, 1)
        .build();

    let query = projection.query(&compiler, None, Some(&past_first)).unwrap();
    assert_eq!(
        query.filter().unwrap().to_string(),
        "x => (Convert(x.Prop1, Int64) > 1)"
    );
    let ids: Vec<Value> = query
        .run(source_records(&source))
        .map(|r| r.unwrap().get("Id").cloned().unwrap())
        .collect();
    assert_eq!(ids, vec![Value::I32(2), Value::I32(3)]);
}

#[test]
fn test_path_on_wrong_shape_fails() {
    let err = ProjectionBuilder::new(&person_type())
        .target(&target_type())
        .member("Id", Mapping::from_expression("Prop1"))
        .build(&Compiler::new())
        .unwrap_err();
    assert!(matches!(
        err,
        MapError::Path(PathError::UnknownMember { ref member, .. }) if member == "Prop1"
    ));

    let err = ProjectionBuilder::new(&source_type())
        .target(&target_type())
        .member("Id", Mapping::from_expression("Active.Value"))
        .build(&Compiler::new())
        .unwrap_err();
    assert!(matches!(err, MapError::Path(PathError::NotNavigable { .. })));
}

#[test]
fn test_auto_member_without_counterpart_fails() {
    let err = ProjectionBuilder::new(&source_type())
        .auto("Prop1")
        .auto("Missing")
        .build_with_dynamic_type("Partial", &Compiler::new())
        .unwrap_err();

    assert!(matches!(err, MapError::UnmatchedAutoMember { ref member, .. } if member == "Missing"));
}

#[test]
fn test_unknown_target_member_fails() {
    let err = ProjectionBuilder::new(&source_type())
        .target(&target_type())
        .auto("Prop1")
        .build(&Compiler::new())
        .unwrap_err();

    assert!(matches!(err, MapError::UnknownTargetMember { ref member, .. } if member == "Prop1"));
}

#[test]
fn test_incompatible_member_type_fails() {
    let err = ProjectionBuilder::new(&source_type())
        .target(&target_type())
        .member("Name", Mapping::from_expression("Active"))
        .build(&Compiler::new())
        .unwrap_err();

    assert!(matches!(err, MapError::TypeMismatch(_)));
}

#[test]
fn test_numeric_widening() {
    let wide = RecordType::builder("Wide")
        .member("Id", ValueType::I64)
        .member("Score", ValueType::F64)
        .build()
        .unwrap();
    let compiler = Compiler::new();
    let projection = ProjectionBuilder::new(&source_type())
        .target(&wide)
        .member("Id", Mapping::from_expression("Prop1"))
        .member("Score", Mapping::from_expression("Prop1"))
        .build(&compiler)
        .unwrap();

    let first = run(&projection, &compiler).remove(0);
    assert_eq!(first.get("Id"), Some(&Value::I64(1)));
    assert_eq!(first.get("Score"), Some(&Value::F64(1.0)));
}

#[test]
fn test_nullable_source_unwraps_to_default() {
    let sparse = RecordType::builder("Sparse")
        .member("Count", ValueType::nullable(ValueType::I32))
        .build()
        .unwrap();
    let compiler = Compiler::new();
    let projection = ProjectionBuilder::new(&sparse)
        .target(&target_type())
        .member("Id", Mapping::from_expression("Count"))
        .build(&compiler)
        .unwrap();

    let out = projection.apply(Record::new(Arc::clone(&sparse))).unwrap();
    assert_eq!(out.get("Id"), Some(&Value::I32(0)));
    let out = projection
        .apply(Record::new(Arc::clone(&sparse)).with("Count", 7))
        .unwrap();
    assert_eq!(out.get("Id"), Some(&Value::I32(7)));
}

#[test]
fn test_constants() {
    let compiler = Compiler::new();
    let projection = ProjectionBuilder::new(&source_type())
        .target(&target_type())
        .member("Id", Mapping::from_value(42))
        .member("Name", Mapping::from_value(Value::Null))
        .member("Active", Mapping::from_value(true))
        .build(&compiler)
        .unwrap();

    assert_eq!(
        projection.graph().to_string(),
        "x => new Target() { Id = 42, Name = null, Active = true }"
    );
    let out = run(&projection, &compiler);
    assert!(out
        .iter()
        .all(|r| r.fields() == [Value::I32(42), Value::Null, Value::Bool(true)]));
}

#[test]
fn test_absent_constant_needs_a_type_on_dynamic_targets() {
    let compiler = Compiler::new();
    let err = ProjectionBuilder::new(&source_type())
        .member("Note", Mapping::from_value(Value::Null))
        .build_with_dynamic_type("Noted", &compiler)
        .unwrap_err();
    assert_eq!(
        err,
        MapError::UntypedConstant {
            member: "Note".to_string()
        }
    );

    let projection = ProjectionBuilder::new(&source_type())
        .member("Note", Mapping::from_typed_value(Value::Null, ValueType::String))
        .build_with_dynamic_type("Noted", &compiler)
        .unwrap();
    assert_eq!(
        projection.target().member("Note").unwrap().value_type,
        ValueType::String
    );
}

#[test]
fn test_prebuilt_graph_is_moved_onto_the_source() {
    let lookalike = RecordType::builder("Lookalike")
        .member("Prop1", ValueType::I32)
        .build()
        .unwrap();
    let s = Param::new("s", ValueType::record(&lookalike));
    let plus_ten = Lambda::single(
        s.clone(),
        Expr::member(Expr::Param(s), "Prop1").unwrap() + Expr::int(10),
    );
    let compiler = Compiler::new();

    let projection = ProjectionBuilder::new(&source_type())
        .target(&target_type())
        .member("Id", Mapping::from_graph(plus_ten))
        .build(&compiler)
        .unwrap();

    assert_eq!(
        projection.graph().to_string(),
        "x => new Target() { Id = (x.Prop1 + 10) }"
    );
    let ids: Vec<_> = run(&projection, &compiler)
        .iter()
        .map(|r| r.get("Id").cloned())
        .collect();
    assert_eq!(
        ids,
        vec![Some(Value::I32(11)), Some(Value::I32(12)), Some(Value::I32(13))]
    );
}

#[test]
fn test_prebuilt_graph_reading_missing_members_fails() {
    let person = person_type();
    let p = Param::new("p", ValueType::record(&person));
    let name = Lambda::single(p.clone(), Expr::member(Expr::Param(p), "Name").unwrap());

    let err = ProjectionBuilder::new(&source_type())
        .target(&target_type())
        .member("Name", Mapping::from_graph(name))
        .build(&Compiler::new())
        .unwrap_err();

    assert!(matches!(err, MapError::Graph(GraphError::IncompatibleShape { .. })));
}

#[test]
fn test_prebuilt_graph_must_take_one_parameter() {
    let source = source_type();
    let a = Param::new("a", ValueType::record(&source));
    let b = Param::new("b", ValueType::record(&source));
    let sum = Lambda::new(
        vec![a.clone(), b.clone()],
        Expr::member(Expr::Param(a), "Prop1").unwrap()
            + Expr::member(Expr::Param(b), "Prop1").unwrap(),
    );

    let err = ProjectionBuilder::new(&source)
        .target(&target_type())
        .member("Id", Mapping::from_graph(sum))
        .build(&Compiler::new())
        .unwrap_err();

    assert_eq!(
        err,
        MapError::MappingArity {
            member: "Id".to_string(),
            found: 2,
        }
    );
}

#[test]
fn test_duplicate_member_fails() {
    let err = ProjectionBuilder::new(&source_type())
        .auto("Active")
        .member("Active", Mapping::from_value(false))
        .build_with_dynamic_type("Twice", &Compiler::new())
        .unwrap_err();

    assert_eq!(
        err,
        MapError::DuplicateMember {
            shape: "Twice".to_string(),
            member: "Active".to_string(),
        }
    );
}

#[test]
fn test_member_set_by_constructor_and_assignment_fails() {
    let err = ProjectionBuilder::new(&source_type())
        .target(&target_ctor_type())
        .ctor_parameter("id", Mapping::from_expression("Prop1"))
        .ctor_parameter("name", Mapping::from_value("from-ctor"))
        .ctor_parameter("Active", Mapping::auto())
        .member("Name", Mapping::from_expression("Prop2"))
        .build(&Compiler::new())
        .unwrap_err();

    assert_eq!(
        err,
        MapError::DuplicateMember {
            shape: "TargetCtor".to_string(),
            member: "Name".to_string(),
        }
    );
}

#[test]
fn test_build_without_target_fails() {
    let err = ProjectionBuilder::new(&source_type())
        .auto("Active")
        .build(&Compiler::new())
        .unwrap_err();

    assert_eq!(err, MapError::MissingTarget);
}
