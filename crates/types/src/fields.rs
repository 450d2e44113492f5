use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::{Field, MpxError, Namespace, Result};

/// Keys higher layers attach to raw entry maps. They address the record and
/// are never sent back as fields.
pub const RESERVED_KEYS: [&str; 2] = ["service", "endpoint"];

/// Ordered collection of [`Field`]s, unique by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    collection: IndexMap<String, Field>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection from a raw entry map.
    pub fn from_data(data: &Map<String, Value>, namespace: Option<&Namespace>) -> Result<Self> {
        let mut fields = Self::new();
        fields.parse(data, namespace)?;
        Ok(fields)
    }

    /// Replaces the whole collection with one field per key of `data`.
    ///
    /// Reserved keys are skipped. `namespace` is offered to every field and
    /// kept only by the custom ones. On error the collection is left empty.
    pub fn parse(&mut self, data: &Map<String, Value>, namespace: Option<&Namespace>) -> Result<()> {
        self.reset();
        let mut parsed = IndexMap::with_capacity(data.len());
        for (name, value) in data {
            if RESERVED_KEYS.contains(&name.as_str()) {
                continue;
            }
            let field = Field::new(name.as_str(), value.clone(), namespace.cloned())?;
            parsed.insert(name.clone(), field);
        }
        self.collection = parsed;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.collection.get(name).map(Field::value)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.collection.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.collection.contains_key(name)
    }

    /// Updates the value in place, or appends a new platform-namespaced field.
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Result<()> {
        self.set_with_namespace(name, value, None)
    }

    /// Like [`Fields::set`]; `namespace` is only used when a new field is appended.
    pub fn set_with_namespace(&mut self, name: impl Into<String>, value: Value, namespace: Option<Namespace>) -> Result<()> {
        let name = name.into();
        if let Some(existing) = self.collection.get_mut(&name) {
            existing.set_value(value);
            return Ok(());
        }
        let field = Field::new(name.as_str(), value, namespace)?;
        self.collection.insert(name, field);
        Ok(())
    }

    /// Appends `field` unless one with the same name is already present.
    pub fn add(&mut self, field: Field) -> &mut Self {
        if !self.collection.contains_key(field.name()) {
            self.collection.insert(field.name().to_string(), field);
        }
        self
    }

    /// Removes a field, keeping the order of the rest.
    pub fn remove(&mut self, name: &str) -> Option<Field> {
        self.collection.shift_remove(name)
    }

    pub fn reset(&mut self) {
        self.collection.clear();
    }

    pub fn len(&self) -> usize {
        self.collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.collection.values()
    }

    /// Union of every field's namespace; a later field wins on prefix collision.
    pub fn namespace(&self) -> Namespace {
        let mut merged = Namespace::new();
        for namespace in self.iter().filter_map(Field::namespace) {
            for (prefix, uri) in namespace {
                merged.insert(prefix.clone(), uri.clone());
            }
        }
        merged
    }

    /// Name/value pairs in collection order.
    pub fn to_map(&self) -> Map<String, Value> {
        self.iter()
            .map(|field| (field.name().to_string(), field.value().clone()))
            .collect()
    }

    /// String value of `name`, failing when present but not a string.
    pub fn get_str(&self, name: &str) -> Result<Option<&str>> {
        match self.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(text)) => Ok(Some(text.as_str())),
            Some(other) => Err(MpxError::validation(name, other.to_string(), "expected a string value")),
        }
    }
}

impl<'a> IntoIterator for &'a Fields {
    type Item = &'a Field;
    type IntoIter = indexmap::map::Values<'a, String, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.collection.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn namespace(prefix: &str, uri: &str) -> Namespace {
        Namespace::from([(prefix.to_string(), uri.to_string())])
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("fixture must be an object"),
        }
    }

    #[test]
    fn parse_then_to_map_round_trips_without_reserved_keys() {
        let data = object(json!({
            "id": "http://data.media.theplatform.com/media/data/Media/1",
            "guid": "123",
            "custom$rating": 4,
            "service": "Media Data Service",
            "endpoint": "Media"
        }));
        let fields = Fields::from_data(&data, Some(&namespace("custom", "http://example.com/custom"))).unwrap();

        let mut expected = data.clone();
        expected.remove("service");
        expected.remove("endpoint");
        assert_eq!(fields.to_map(), expected);
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn parse_resets_previous_state() {
        let mut fields = Fields::new();
        fields.set("title", json!("old")).unwrap();
        fields.parse(&object(json!({"guid": "g1"})), None).unwrap();
        assert!(fields.get("title").is_none());
        assert_eq!(fields.get("guid"), Some(&json!("g1")));
    }

    #[test]
    fn namespace_is_the_union_of_field_namespaces() {
        let mut fields = Fields::new();
        fields.add(Field::new("a$one", json!(1), Some(namespace("a", "1"))).unwrap());
        fields.add(Field::new("b$two", json!(2), Some(namespace("b", "2"))).unwrap());
        fields.add(Field::new("guid", json!("g"), None).unwrap());

        assert_eq!(fields.namespace(), Namespace::from([("a".into(), "1".into()), ("b".into(), "2".into())]));
    }

    #[test]
    fn later_namespace_wins_on_prefix_collision() {
        let mut fields = Fields::new();
        fields.add(Field::new("a$one", json!(1), Some(namespace("a", "first"))).unwrap());
        fields.add(Field::new("a$two", json!(2), Some(namespace("a", "second"))).unwrap());
        assert_eq!(fields.namespace().get("a").map(String::as_str), Some("second"));
    }

    #[test]
    fn set_updates_in_place_and_add_keeps_the_first_value() {
        let mut fields = Fields::new();
        fields.set("guid", json!("first")).unwrap();
        fields.set("title", json!("t")).unwrap();
        fields.set("guid", json!("second")).unwrap();
        assert_eq!(fields.get("guid"), Some(&json!("second")));
        assert_eq!(fields.iter().map(Field::name).collect::<Vec<_>>(), vec!["guid", "title"]);

        fields.add(Field::new("guid", json!("third"), None).unwrap());
        assert_eq!(fields.get("guid"), Some(&json!("second")));
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn set_rejects_empty_names() {
        let mut fields = Fields::new();
        assert!(fields.set("", json!(1)).is_err());
        assert!(fields.is_empty());
    }

    #[test]
    fn remove_preserves_order() {
        let mut fields = Fields::from_data(&object(json!({"a": 1, "b": 2, "c": 3})), None).unwrap();
        assert!(fields.remove("b").is_some());
        assert!(fields.remove("missing").is_none());
        assert_eq!(fields.iter().map(Field::name).collect::<Vec<_>>(), vec!["a", "c"]);
    }

    #[test]
    fn get_str_distinguishes_missing_from_mistyped() {
        let fields = Fields::from_data(&object(json!({"id": 7, "guid": "g"})), None).unwrap();
        assert_eq!(fields.get_str("guid").unwrap(), Some("g"));
        assert_eq!(fields.get_str("missing").unwrap(), None);
        assert!(fields.get_str("id").is_err());
    }
}
