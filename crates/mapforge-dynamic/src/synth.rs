//! Descriptor-to-record-type synthesis with a structural cache.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use mapforge_core::{GraphCache, RecordType};
use tracing::debug;

use crate::descriptor::TypeDescriptor;
use crate::error::SynthError;


/// Cache key: the descriptor plus the identities of the record types its
/// fields named when it was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SynthKey {
    descriptor: TypeDescriptor,
    references: Vec<u64>,
}

/// Builds record types from descriptors and doubles as the registry that
/// resolves record types by name.
///
/// Synthesis is idempotent: structurally equal descriptors return the same
/// `Arc<RecordType>`, also when first requested concurrently.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use mapforge_dynamic::{FieldType, TypeDescriptor, TypeSynthesizer};
///
/// let synth = TypeSynthesizer::new();
/// let dto = TypeDescriptor::new("Dto").field("Id", FieldType::I32);
///
/// let a = synth.synthesize(&dto).unwrap();
/// let b = synth.synthesize(&dto.clone()).unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// assert!(synth.find_type("Dto").is_some());
/// ```
#[derive(Default)]
pub struct TypeSynthesizer {
    cache: GraphCache<SynthKey, RecordType>,
    registry: RwLock<HashMap<String, Arc<RecordType>>>,
}

impl TypeSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record type for `descriptor`, building it on first use.
    ///
    /// # Errors
    ///
    /// - [`SynthError::DuplicateMember`] if two fields share a name
    /// - [`SynthError::InvalidConstructorBinding`] if a constructor parameter
    ///   binds no field, or two parameters bind the same field
    /// - [`SynthError::UnknownRecordType`] if a field names an unregistered type
    pub fn synthesize(&self, descriptor: &TypeDescriptor) -> Result<Arc<RecordType>, SynthError> {
        let lookup = |name: &str| self.find_type(name);

        let references = descriptor
            .record_names()
            .into_iter()
            .map(|name| {
                lookup(name)
                    .map(|t| t.id())
                    .ok_or_else(|| SynthError::UnknownRecordType {
                        name: name.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let key = SynthKey {
            descriptor: descriptor.clone(),
            references,
        };

        let mut built = None;
        let record_type = self.cache.get_or_try_insert_with(key, || {
            let mut builder = RecordType::builder(descriptor.name.as_str());
            for field in &descriptor.fields {
                builder = builder.member_with_attributes(
                    field.name.as_str(),
                    field.field_type.resolve(&lookup)?,
                    field.attributes.clone(),
                );
            }
            for param in descriptor.constructor.iter().flatten() {
                let value_type = param
                    .field_type
                    .as_ref()
                    .map(|t| t.resolve(&lookup))
                    .transpose()?;
                builder = builder.constructor_param_with(
                    param.name.as_str(),
                    value_type,
                    param.member.as_deref().map(Arc::from),
                );
            }
            let record_type = builder.build()?;
            built = Some(Arc::clone(&record_type));
            Ok::<_, SynthError>(record_type)
        })?;

        // A racing caller may have published its type first.
        if built.is_some_and(|b| Arc::ptr_eq(&b, &record_type)) {
            debug!(
                event = "type_synthesized",
                name = %record_type.name(),
                members = record_type.members().len(),
                ctor_params = record_type.constructor().map_or(0, <[_]>::len),
            );
        }
        self.register(Arc::clone(&record_type));
        Ok(record_type)
    }

    /// Makes `record_type` resolvable by name, replacing any type previously
    /// registered under that name. Returns the replaced type.
    pub fn register(&self, record_type: Arc<RecordType>) -> Option<Arc<RecordType>> {
        let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
        let previous = registry.insert(record_type.name().to_string(), Arc::clone(&record_type));
        previous.filter(|p| !Arc::ptr_eq(p, &record_type))
    }

    pub fn find_type(&self, name: &str) -> Option<Arc<RecordType>> {
        let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
        registry.get(name).cloned()
    }

    /// Registered types accepted by `predicate`, ordered by name.
    pub fn find_types_matching(
        &self,
        predicate: impl Fn(&RecordType) -> bool,
    ) -> Vec<Arc<RecordType>> {
        let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
        let mut found: Vec<_> = registry
            .values()
            .filter(|t| predicate(t))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name().cmp(b.name()));
        found
    }

    /// Number of distinct synthesized types.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl fmt::Debug for TypeSynthesizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeSynthesizer")
            .field("synthesized", &self.len())
            .finish()
    }
}
