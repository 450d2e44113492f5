use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::{MpxError, Result};

/// Namespace declarations: prefix → namespace URI.
pub type Namespace = IndexMap<String, String>;

/// Character that separates a namespace prefix from a custom field name.
pub const CUSTOM_FIELD_MARKER: char = '$';

/// Custom fields are platform extensions and are the only fields that may
/// carry a namespace.
pub fn is_custom_field_name(name: &str) -> bool {
    name.contains(CUSTOM_FIELD_MARKER)
}

/// A single wire attribute of an entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    value: Value,
    namespace: Option<Namespace>,
}

impl Field {
    /// Creates a field, dropping `namespace` when `name` is a platform field.
    pub fn new(name: impl Into<String>, value: Value, namespace: Option<Namespace>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(MpxError::validation("field name", name, "must not be empty"));
        }
        let mut field = Self {
            name,
            value,
            namespace: None,
        };
        field.set_namespace(namespace);
        Ok(field)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn set_value(&mut self, value: Value) {
        self.value = value;
    }

    pub fn namespace(&self) -> Option<&Namespace> {
        self.namespace.as_ref()
    }

    /// Ignored for platform fields.
    pub fn set_namespace(&mut self, namespace: Option<Namespace>) {
        if self.is_custom() {
            self.namespace = namespace;
        }
    }

    pub fn is_custom(&self) -> bool {
        is_custom_field_name(&self.name)
    }

    /// `{name: value}`.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(self.name.clone(), self.value.clone());
        map
    }
}
