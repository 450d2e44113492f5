use serde_json::Value;

use crate::{Fields, MpxError, Namespace, Page, Result, validators};

/// Service and endpoint a reference URL addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTarget {
    pub service: String,
    pub endpoint: String,
}

/// Maps a reference URL back onto the service catalog.
///
/// Implemented by `mpx_registry::ServiceCatalog`; kept as a trait so the
/// entity model does not depend on how the catalog is loaded.
pub trait ReferenceResolver {
    fn resolve_reference(&self, reference: &str) -> Result<ReferenceTarget>;
}

/// One record of a data service.
///
/// The identity (`id`, `service`, `endpoint`) is either fully unset or fully
/// derived from a reference through [`Entry::set_id`]. The `id` is also kept
/// as the `id` field so it travels with the record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entry {
    fields: Fields,
    id: Option<String>,
    service: Option<String>,
    endpoint: Option<String>,
}

impl Entry {
    pub fn new() -> Self {
        Self::default()
    }

    /// An unsaved record destined for `endpoint` of `service`.
    pub fn for_endpoint(service: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            service: Some(service.into()),
            endpoint: Some(endpoint.into()),
            ..Self::default()
        }
    }

    /// Wraps parsed fields, deriving the identity from an `id` field when present.
    pub fn from_fields(fields: Fields, resolver: &dyn ReferenceResolver) -> Result<Self> {
        let id = fields.get_str("id")?.map(str::to_string);
        let mut entry = Self {
            fields,
            ..Self::default()
        };
        if let Some(id) = id {
            entry.set_id(Some(&id), resolver)?;
        }
        Ok(entry)
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn service(&self) -> Option<&str> {
        self.service.as_deref()
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn is_identified(&self) -> bool {
        self.id.is_some()
    }

    /// Sets or clears the identity.
    ///
    /// A reference must be a platform reference that the resolver can map to
    /// a service; on failure the entry is left untouched. `None` clears the
    /// identity and drops the `id` field.
    pub fn set_id(&mut self, id: Option<&str>, resolver: &dyn ReferenceResolver) -> Result<()> {
        let Some(id) = id else {
            self.fields.remove("id");
            self.id = None;
            self.service = None;
            self.endpoint = None;
            return Ok(());
        };

        validators::require_reference(id)?;
        let target = resolver.resolve_reference(id)?;
        self.fields.set("id", Value::String(id.to_string()))?;
        self.id = Some(id.to_string());
        self.service = Some(target.service);
        self.endpoint = Some(target.endpoint);
        Ok(())
    }

    /// Sets a field other than `id`.
    pub fn set_field(&mut self, name: impl Into<String>, value: Value) -> Result<()> {
        self.set_field_with_namespace(name, value, None)
    }

    pub fn set_field_with_namespace(&mut self, name: impl Into<String>, value: Value, namespace: Option<Namespace>) -> Result<()> {
        let name = name.into();
        if name == "id" {
            return Err(MpxError::validation("field name", name, "the id is changed through set_id"));
        }
        self.fields.set_with_namespace(name, value, namespace)
    }

    pub fn remove_field(&mut self, name: &str) -> Result<()> {
        if name == "id" {
            return Err(MpxError::validation("field name", name, "the id is cleared through set_id(None)"));
        }
        self.fields.remove(name);
        Ok(())
    }

    /// Whether both entries carry the same reference. Unidentified entries
    /// are new records and never share an identity.
    pub fn same_identity(&self, other: &Entry) -> bool {
        matches!((self.id(), other.id()), (Some(left), Some(right)) if left == right)
    }

    /// Single-entry write payload.
    pub fn to_page(&self) -> Page {
        Page::new(self.fields.namespace(), vec![self.fields.to_map()])
    }
}
