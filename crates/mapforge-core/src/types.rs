//! Value types and runtime-defined record types.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::error::{EvalError, ShapeError};
use crate::value::{Record, Value};

static NEXT_TYPE_ID: AtomicU64 = AtomicU64::new(1);

/// The static type of a value flowing through an expression graph.
///
/// `String`, `List`, `Record` and `Nullable` values may be absent at runtime.
/// The remaining types have value semantics and are always present.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    I32,
    I64,
    F64,
    String,
    /// Calendar date.
    Date,
    /// Date and time without a time zone.
    DateTime,
    /// Signed time span.
    Duration,
    /// A value type that may also be absent.
    Nullable(Box<ValueType>),
    List(Box<ValueType>),
    Record(Arc<RecordType>),
}

impl ValueType {
    /// Returns the type that can also represent an absent value.
    ///
    /// Types that may already be absent are returned unchanged, so this never
    /// produces `Nullable(Nullable(_))` or `Nullable(String)`.
    pub fn nullable(inner: ValueType) -> ValueType {
        if inner.may_be_absent() {
            inner
        } else {
            ValueType::Nullable(Box::new(inner))
        }
    }

    pub fn list(element: ValueType) -> ValueType {
        ValueType::List(Box::new(element))
    }

    pub fn record(record_type: &Arc<RecordType>) -> ValueType {
        ValueType::Record(Arc::clone(record_type))
    }

    /// Returns true if a value of this type may be absent at runtime.
    pub fn may_be_absent(&self) -> bool {
        matches!(
            self,
            ValueType::String | ValueType::List(_) | ValueType::Record(_) | ValueType::Nullable(_)
        )
    }

    /// Strips one level of `Nullable`.
    pub fn underlying(&self) -> &ValueType {
        match self {
            ValueType::Nullable(inner) => inner,
            other => other,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.numeric_rank().is_some()
    }

    /// Widening order of numeric types: `I32 < I64 < F64`.
    pub fn numeric_rank(&self) -> Option<u8> {
        match self.underlying() {
            ValueType::I32 => Some(0),
            ValueType::I64 => Some(1),
            ValueType::F64 => Some(2),
            _ => None,
        }
    }

    /// Returns true if values of this type support `<`, `<=`, `>` and `>=`.
    pub fn is_ordered(&self) -> bool {
        matches!(
            self.underlying(),
            ValueType::I32
                | ValueType::I64
                | ValueType::F64
                | ValueType::Date
                | ValueType::DateTime
                | ValueType::Duration
        )
    }

    pub fn as_record(&self) -> Option<&Arc<RecordType>> {
        match self {
            ValueType::Record(record_type) => Some(record_type),
            _ => None,
        }
    }

    /// Returns true if the type exposes members that a path can navigate into.
    pub fn has_members(&self) -> bool {
        !matches!(
            self.underlying(),
            ValueType::Bool | ValueType::I32 | ValueType::I64 | ValueType::F64
        )
    }

    /// Looks up the type of a member. `Nullable(T)` exposes the members of `T`.
    pub fn member_type(&self, name: &str) -> Option<ValueType> {
        match self {
            ValueType::Bool | ValueType::I32 | ValueType::I64 | ValueType::F64 => None,
            ValueType::String => match name {
                "Length" => Some(ValueType::I32),
                _ => None,
            },
            ValueType::Date => match name {
                "Year" | "Month" | "Day" | "DayOfYear" => Some(ValueType::I32),
                _ => None,
            },
            ValueType::DateTime => match name {
                "Year" | "Month" | "Day" | "Hour" | "Minute" | "Second" => Some(ValueType::I32),
                "Date" => Some(ValueType::Date),
                _ => None,
            },
            ValueType::Duration => match name {
                "Days" => Some(ValueType::I64),
                "Hours" | "Minutes" | "Seconds" => Some(ValueType::I32),
                "TotalHours" | "TotalMinutes" | "TotalSeconds" => Some(ValueType::F64),
                _ => None,
            },
            ValueType::List(_) => match name {
                "Count" => Some(ValueType::I32),
                _ => None,
            },
            ValueType::Record(record_type) => {
                record_type.member(name).map(|m| m.value_type.clone())
            }
            ValueType::Nullable(inner) => inner.member_type(name),
        }
    }

    /// The value a freshly constructed record holds for a member of this type.
    pub fn default_value(&self) -> Value {
        match self {
            ValueType::Bool => Value::Bool(false),
            ValueType::I32 => Value::I32(0),
            ValueType::I64 => Value::I64(0),
            ValueType::F64 => Value::F64(0.0),
            ValueType::Date => Value::Date(NaiveDate::default()),
            ValueType::DateTime => Value::DateTime(NaiveDateTime::default()),
            ValueType::Duration => Value::Duration(Duration::zero()),
            ValueType::String
            | ValueType::Nullable(_)
            | ValueType::List(_)
            | ValueType::Record(_) => Value::Null,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Bool => f.write_str("Boolean"),
            ValueType::I32 => f.write_str("Int32"),
            ValueType::I64 => f.write_str("Int64"),
            ValueType::F64 => f.write_str("Double"),
            ValueType::String => f.write_str("String"),
            ValueType::Date => f.write_str("Date"),
            ValueType::DateTime => f.write_str("DateTime"),
            ValueType::Duration => f.write_str("Duration"),
            ValueType::Nullable(inner) => write!(f, "Nullable<{}>", inner),
            ValueType::List(element) => write!(f, "List<{}>", element),
            ValueType::Record(record_type) => f.write_str(record_type.name()),
        }
    }
}

/// Metadata attached to a record member for downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attribute {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub arguments: BTreeMap<String, String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: BTreeMap::new(),
        }
    }

    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    pub fn argument(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct MemberDef {
    pub name: Arc<str>,
    pub value_type: ValueType,
    pub attributes: Vec<Attribute>,
}

impl MemberDef {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// A constructor parameter and the member index it assigns.
#[derive(Debug, Clone)]
pub struct CtorParam {
    pub name: Arc<str>,
    pub value_type: ValueType,
    pub member: usize,
}

/// A record type defined at runtime.
///
/// Each `RecordType` has a unique identity: two types built from the same
/// member list are still distinct types. Equality and hashing use that identity.
#[derive(Debug)]
pub struct RecordType {
    id: u64,
    name: Arc<str>,
    members: Vec<MemberDef>,
    member_indices: HashMap<Arc<str>, usize>,
    constructor: Option<Vec<CtorParam>>,
}

impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RecordType {}

impl Hash for RecordType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl RecordType {
    pub fn builder(name: impl Into<Arc<str>>) -> RecordTypeBuilder {
        RecordTypeBuilder::new(name)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[MemberDef] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&MemberDef> {
        self.member_index(name).map(|idx| &self.members[idx])
    }

    pub fn member_index(&self, name: &str) -> Option<usize> {
        self.member_indices.get(name).copied()
    }

    /// Parameters of the constructor, or `None` for a parameterless constructor.
    pub fn constructor(&self) -> Option<&[CtorParam]> {
        self.constructor.as_deref()
    }

    pub fn constructor_param(&self, name: &str) -> Option<&CtorParam> {
        self.constructor()?.iter().find(|p| p.name.as_ref() == name)
    }

    /// Constructs an instance: every member starts at its default value, then
    /// each constructor argument is stored into the member its parameter binds.
    pub fn instantiate(self: &Arc<Self>, args: Vec<Value>) -> Result<Record, EvalError> {
        let params = self.constructor().unwrap_or(&[]);
        if params.len() != args.len() {
            return Err(EvalError::ArityMismatch {
                expected: params.len(),
                found: args.len(),
            });
        }

        let mut record = Record::new(Arc::clone(self));
        for (param, arg) in params.iter().zip(args) {
            record.set_index(param.member, arg);
        }
        Ok(record)
    }
}

#[derive(Debug, Clone)]
struct PendingParam {
    name: Arc<str>,
    value_type: Option<ValueType>,
    member: Option<Arc<str>>,
}

/// Builder for [`RecordType`].
///
/// # Example
///
/// ```
/// use mapforge_core::{RecordType, ValueType};
///
/// let person = RecordType::builder("Person")
///     .member("Id", ValueType::I64)
///     .member("Name", ValueType::String)
///     .constructor_param("Id")
///     .build()
///     .unwrap();
///
/// assert_eq!(person.members().len(), 2);
/// assert_eq!(person.constructor().map(|c| c.len()), Some(1));
/// ```
#[derive(Debug, Clone)]
pub struct RecordTypeBuilder {
    name: Arc<str>,
    members: Vec<MemberDef>,
    params: Option<Vec<PendingParam>>,
}

impl RecordTypeBuilder {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            params: None,
        }
    }

    pub fn member(self, name: impl Into<Arc<str>>, value_type: ValueType) -> Self {
        self.member_with_attributes(name, value_type, Vec::new())
    }

    pub fn member_with_attributes(
        mut self,
        name: impl Into<Arc<str>>,
        value_type: ValueType,
        attributes: Vec<Attribute>,
    ) -> Self {
        self.members.push(MemberDef {
            name: name.into(),
            value_type,
            attributes,
        });
        self
    }

    /// Adds a constructor parameter assigning the identically-named member.
    pub fn constructor_param(self, name: impl Into<Arc<str>>) -> Self {
        self.constructor_param_with(name, None, None)
    }

    /// Adds a constructor parameter with an explicit type and bound member.
    ///
    /// When `member` is `None` the parameter binds the identically-named member.
    /// When `value_type` is `None` the parameter takes the bound member's type.
    pub fn constructor_param_with(
        mut self,
        name: impl Into<Arc<str>>,
        value_type: Option<ValueType>,
        member: Option<Arc<str>>,
    ) -> Self {
        self.params.get_or_insert_with(Vec::new).push(PendingParam {
            name: name.into(),
            value_type,
            member,
        });
        self
    }

    pub fn build(self) -> Result<Arc<RecordType>, ShapeError> {
        let mut member_indices = HashMap::with_capacity(self.members.len());
        for (idx, member) in self.members.iter().enumerate() {
            if member_indices.insert(member.name.clone(), idx).is_some() {
                return Err(ShapeError::DuplicateMember {
                    shape: self.name.to_string(),
                    member: member.name.to_string(),
                });
            }
        }

        let constructor = match self.params {
            None => None,
            Some(pending) => {
                let mut params: Vec<CtorParam> = Vec::with_capacity(pending.len());
                for param in pending {
                    let invalid = || ShapeError::InvalidConstructorBinding {
                        shape: self.name.to_string(),
                        parameter: param.name.to_string(),
                    };
                    let bound = param.member.as_ref().unwrap_or(&param.name);
                    let member = member_indices.get(bound).copied().ok_or_else(invalid)?;
                    let duplicate = params
                        .iter()
                        .any(|p| p.name == param.name || p.member == member);
                    if duplicate {
                        return Err(invalid());
                    }
                    let value_type = param
                        .value_type
                        .clone()
                        .unwrap_or_else(|| self.members[member].value_type.clone());
                    params.push(CtorParam {
                        name: param.name.clone(),
                        value_type,
                        member,
                    });
                }
                Some(params)
            }
        };

        Ok(Arc::new(RecordType {
            id: NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed),
            name: self.name,
            members: self.members,
            member_indices,
            constructor,
        }))
    }
}
