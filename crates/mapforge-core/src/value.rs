//! Runtime values and record instances.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::types::{RecordType, ValueType};

/// A runtime value. Absence is represented explicitly by [`Value::Null`].
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent value.
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F64(f64),
    String(Arc<str>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Duration(Duration),
    List(Vec<Value>),
    Record(Record),
}

// Structural equality; `F64` compares by bit pattern so that `Eq` and `Hash`
// agree. Evaluation-time equality lives in `eval::compare`.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(v) => v.hash(state),
            Value::I32(v) => v.hash(state),
            Value::I64(v) => v.hash(state),
            Value::F64(v) => v.to_bits().hash(state),
            Value::String(v) => v.hash(state),
            Value::Date(v) => v.hash(state),
            Value::DateTime(v) => v.hash(state),
            Value::Duration(v) => v.hash(state),
            Value::List(v) => v.hash(state),
            Value::Record(v) => v.hash(state),
        }
    }
}

impl Value {
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// Extracts an integer, widening `I32`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I32(v) => Some(i64::from(*v)),
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Extracts a float, widening integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::I32(v) => Some(f64::from(*v)),
            Value::I64(v) => Some(*v as f64),
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Value::Duration(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_record(self) -> Option<Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Infers the type of a value.
    ///
    /// Returns `None` for `Null` and for lists without a non-null element,
    /// whose types cannot be inferred.
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(ValueType::Bool),
            Value::I32(_) => Some(ValueType::I32),
            Value::I64(_) => Some(ValueType::I64),
            Value::F64(_) => Some(ValueType::F64),
            Value::String(_) => Some(ValueType::String),
            Value::Date(_) => Some(ValueType::Date),
            Value::DateTime(_) => Some(ValueType::DateTime),
            Value::Duration(_) => Some(ValueType::Duration),
            Value::List(items) => {
                let element = items.iter().find_map(Value::value_type)?;
                if items.iter().any(Value::is_null) {
                    Some(ValueType::list(ValueType::nullable(element)))
                } else {
                    Some(ValueType::list(element))
                }
            }
            Value::Record(r) => Some(ValueType::record(r.record_type())),
        }
    }

    /// Name of the value's type for diagnostics.
    pub fn type_name(&self) -> String {
        self.value_type()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "null".to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::I32(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{:?}", v),
            Value::String(v) => write!(f, "{:?}", v),
            Value::Date(v) => write!(f, "#{}#", v),
            Value::DateTime(v) => write!(f, "#{}#", v.format("%Y-%m-%dT%H:%M:%S")),
            Value::Duration(v) => write!(f, "{}", v),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Record(r) => write!(f, "{}", r),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.into())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v.into())
    }
}

impl From<Arc<str>> for Value {
    fn from(v: Arc<str>) -> Self {
        Value::String(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<Duration> for Value {
    fn from(v: Duration) -> Self {
        Value::Duration(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Record(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// An instance of a runtime [`RecordType`].
///
/// Fields are stored in member order and accessed by name or index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    record_type: Arc<RecordType>,
    fields: Vec<Value>,
}

impl Record {
    /// Creates a record with every member set to its type's default value.
    pub fn new(record_type: Arc<RecordType>) -> Self {
        let fields = record_type
            .members()
            .iter()
            .map(|m| m.value_type.default_value())
            .collect();
        Self {
            record_type,
            fields,
        }
    }

    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.record_type
    }

    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(self.record_type.member_index(name)?)
    }

    pub fn get_index(&self, idx: usize) -> Option<&Value> {
        self.fields.get(idx)
    }

    /// Sets a member by name. Returns false if the member does not exist.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        match self.record_type.member_index(name) {
            Some(idx) => {
                self.fields[idx] = value;
                true
            }
            None => false,
        }
    }

    /// Sets a member by index; out-of-range indices are ignored.
    pub fn set_index(&mut self, idx: usize, value: Value) {
        if let Some(slot) = self.fields.get_mut(idx) {
            *slot = value;
        }
    }

    /// Builder-style [`Record::set`]; unknown members are ignored.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value.into());
        self
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{ ", self.record_type.name())?;
        for (i, (member, value)) in self
            .record_type
            .members()
            .iter()
            .zip(&self.fields)
            .enumerate()
        {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", member.name, value)?;
        }
        f.write_str(" }")
    }
}
