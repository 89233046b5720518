//! Serializable shape definitions.

use std::sync::Arc;

use mapforge_core::{Attribute, RecordType, ValueType};
use serde::{Deserialize, Serialize};

use crate::error::SynthError;

/// Declared type of a descriptor field.
///
/// Record-typed fields name a record type registered with the synthesizer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Bool,
    I32,
    I64,
    F64,
    String,
    Date,
    DateTime,
    Duration,
    Nullable(Box<FieldType>),
    List(Box<FieldType>),
    Record(String),
}

impl FieldType {
    /// Resolves the field type, looking record types up by name.
    pub fn resolve(
        &self,
        lookup: &impl Fn(&str) -> Option<Arc<RecordType>>,
    ) -> Result<ValueType, SynthError> {
        Ok(match self {
            FieldType::Bool => ValueType::Bool,
            FieldType::I32 => ValueType::I32,
            FieldType::I64 => ValueType::I64,
            FieldType::F64 => ValueType::F64,
            FieldType::String => ValueType::String,
            FieldType::Date => ValueType::Date,
            FieldType::DateTime => ValueType::DateTime,
            FieldType::Duration => ValueType::Duration,
            FieldType::Nullable(inner) => ValueType::nullable(inner.resolve(lookup)?),
            FieldType::List(element) => ValueType::list(element.resolve(lookup)?),
            FieldType::Record(name) => {
                let record_type = lookup(name).ok_or_else(|| SynthError::UnknownRecordType {
                    name: name.clone(),
                })?;
                ValueType::Record(record_type)
            }
        })
    }

    /// Record type names this field refers to, outermost first.
    pub(crate) fn record_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            FieldType::Nullable(inner) | FieldType::List(inner) => inner.record_names(out),
            FieldType::Record(name) => out.push(name),
            _ => {}
        }
    }
}

impl From<&ValueType> for FieldType {
    fn from(value_type: &ValueType) -> Self {
        match value_type {
            ValueType::Bool => FieldType::Bool,
            ValueType::I32 => FieldType::I32,
            ValueType::I64 => FieldType::I64,
            ValueType::F64 => FieldType::F64,
            ValueType::String => FieldType::String,
            ValueType::Date => FieldType::Date,
            ValueType::DateTime => FieldType::DateTime,
            ValueType::Duration => FieldType::Duration,
            ValueType::Nullable(inner) => FieldType::Nullable(Box::new(inner.as_ref().into())),
            ValueType::List(element) => FieldType::List(Box::new(element.as_ref().into())),
            ValueType::Record(record_type) => FieldType::Record(record_type.name().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
    /// Carried onto the synthesized member unchanged.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }
}

/// A constructor parameter.
///
/// Without `member` the parameter assigns the identically-named field; without
/// `field_type` it takes that field's type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CtorParamDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<String>,
}

impl CtorParamDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: None,
            member: None,
        }
    }
}

/// A named shape to synthesize.
///
/// Two descriptors are the same shape when they are equal field by field,
/// in order, including attributes and the constructor signature.
///
/// # Example
///
/// ```
/// use mapforge_dynamic::{FieldType, TypeDescriptor};
///
/// let dto = TypeDescriptor::new("PersonDto")
///     .field("Id", FieldType::I64)
///     .field("Name", FieldType::String)
///     .constructor_param("Id");
///
/// assert_eq!(dto.fields.len(), 2);
/// assert_eq!(dto.constructor.as_ref().map(Vec::len), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constructor: Option<Vec<CtorParamDef>>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            constructor: None,
        }
    }

    pub fn field(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.with_field(FieldDef::new(name, field_type))
    }

    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn constructor_param(self, name: impl Into<String>) -> Self {
        self.with_constructor_param(CtorParamDef::new(name))
    }

    pub fn with_constructor_param(mut self, param: CtorParamDef) -> Self {
        self.constructor.get_or_insert_with(Vec::new).push(param);
        self
    }

    /// Every record type name the descriptor refers to.
    pub(crate) fn record_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for field in &self.fields {
            field.field_type.record_names(&mut names);
        }
        for param in self.constructor.iter().flatten() {
            if let Some(field_type) = &param.field_type {
                field_type.record_names(&mut names);
            }
        }
        names
    }
}
