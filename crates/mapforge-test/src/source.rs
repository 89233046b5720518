//! A source shape `{ Prop1, Prop2, Active }` and targets to project it into.

use std::sync::Arc;

use mapforge_core::{Record, RecordType, ValueType};

/// `Source { Prop1: Int32, Prop2: String, Active: Boolean }`
pub fn source_type() -> Arc<RecordType> {
    RecordType::builder("Source")
        .member("Prop1", ValueType::I32)
        .member("Prop2", ValueType::String)
        .member("Active", ValueType::Bool)
        .build()
        .expect("fixture shape is valid")
}

/// `Target { Id: Int32, Name: String, Active: Boolean }`, parameterless constructor.
pub fn target_type() -> Arc<RecordType> {
    RecordType::builder("Target")
        .member("Id", ValueType::I32)
        .member("Name", ValueType::String)
        .member("Active", ValueType::Bool)
        .build()
        .expect("fixture shape is valid")
}

/// Like [`target_type`], but constructed through `new TargetCtor(id, name, active)`.
pub fn target_ctor_type() -> Arc<RecordType> {
    RecordType::builder("TargetCtor")
        .member("Id", ValueType::I32)
        .member("Name", ValueType::String)
        .member("Active", ValueType::Bool)
        .constructor_param_with("id", None, Some("Id".into()))
        .constructor_param_with("name", None, Some("Name".into()))
        .constructor_param_with("active", None, Some("Active".into()))
        .build()
        .expect("fixture shape is valid")
}

/// `{1, "1", true}`, `{2, "2", false}`, `{3, "3", true}`.
pub fn source_records(source: &Arc<RecordType>) -> Vec<Record> {
    (1..=3)
        .map(|i| {
            Record::new(Arc::clone(source))
                .with("Prop1", i)
                .with("Prop2", i.to_string())
                .with("Active", i != 2)
        })
        .collect()
}
