//! A person shape exercising value-type and reference-type members.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use mapforge_core::{Record, RecordType, ValueType};

/// `Person { Id, Name, Descr, Birthdate, TimeSince, Active }`
pub fn person_type() -> Arc<RecordType> {
    RecordType::builder("Person")
        .member("Id", ValueType::I64)
        .member("Name", ValueType::String)
        .member("Descr", ValueType::String)
        .member("Birthdate", ValueType::Date)
        .member("TimeSince", ValueType::Duration)
        .member("Active", ValueType::Bool)
        .build()
        .expect("fixture shape is valid")
}

fn person(
    person: &Arc<RecordType>,
    id: i64,
    name: Option<&str>,
    birth_year: i32,
    hours: i64,
    active: bool,
) -> Record {
    Record::new(Arc::clone(person))
        .with("Id", id)
        .with("Name", name)
        .with(
            "Birthdate",
            NaiveDate::from_ymd_opt(birth_year, 6, 1).expect("valid date"),
        )
        .with("TimeSince", Duration::hours(hours))
        .with("Active", active)
}

/// Four people; `Descr` is absent on all but the last.
///
/// | Id | Name    | Birthdate  | TimeSince | Active |
/// |----|---------|------------|-----------|--------|
/// | 1  | "Ada"   | 1990-06-01 | 0h        | true   |
/// | 2  | absent  | 1985-06-01 | 5h        | false  |
/// | 3  | "Grace" | 2010-06-01 | 0h        | true   |
/// | 4  | "Linus" | 2005-06-01 | 3h        | false  |
pub fn sample_people(person_type: &Arc<RecordType>) -> Vec<Record> {
    vec![
        person(person_type, 1, Some("Ada"), 1990, 0, true),
        person(person_type, 2, None, 1985, 5, false),
        person(person_type, 3, Some("Grace"), 2010, 0, true),
        person(person_type, 4, Some("Linus"), 2005, 3, false).with("Descr", "kernel"),
    ]
}
