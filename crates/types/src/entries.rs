use crate::{Entry, Fields, Namespace, Page, ReferenceResolver, Result};

/// Ordered collection of [`Entry`] values.
///
/// Identified entries are unique by reference; unidentified ones are new
/// records and are always kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entries {
    collection: Vec<Entry>,
}

impl Entries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts every raw entry of `page` into an [`Entry`].
    ///
    /// Entries carrying an `id` are identified through `resolver`; a
    /// reference the catalog does not know fails the whole conversion.
    pub fn from_page(page: &Page, resolver: &dyn ReferenceResolver) -> Result<Self> {
        let mut entries = Self::new();
        for data in &page.entries {
            let fields = Fields::from_data(data, Some(&page.namespace))?;
            entries.collection.push(Entry::from_fields(fields, resolver)?);
        }
        Ok(entries)
    }

    /// Appends `entry` unless an entry with the same reference is present.
    pub fn add(&mut self, entry: Entry) -> &mut Self {
        if !self.contains(&entry) {
            self.collection.push(entry);
        }
        self
    }

    pub fn contains(&self, entry: &Entry) -> bool {
        self.collection.iter().any(|existing| existing.same_identity(entry))
    }

    /// Entry whose reference equals `id`.
    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.collection.iter().find(|entry| entry.id() == Some(id))
    }

    /// Removes the entries sharing `entry`'s reference, or for an
    /// unidentified entry the first one equal to it; returns how many went.
    pub fn remove(&mut self, entry: &Entry) -> usize {
        if entry.is_identified() {
            let before = self.collection.len();
            self.collection.retain(|existing| !existing.same_identity(entry));
            return before - self.collection.len();
        }
        match self.collection.iter().position(|existing| existing == entry) {
            Some(index) => {
                self.collection.remove(index);
                1
            }
            None => 0,
        }
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

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.collection.iter()
    }

    /// Union of every entry's field namespaces, later entries winning.
    pub fn namespace(&self) -> Namespace {
        let mut merged = Namespace::new();
        for entry in &self.collection {
            merged.extend(entry.fields().namespace());
        }
        merged
    }

    /// Write payload holding every entry.
    pub fn to_page(&self) -> Page {
        let entries = self.collection.iter().map(|entry| entry.fields().to_map()).collect();
        Page::new(self.namespace(), entries)
    }

    /// Entries present in either collection, `self` first.
    pub fn union(&self, other: &Entries) -> Entries {
        let mut merged = self.clone();
        for entry in &other.collection {
            merged.add(entry.clone());
        }
        merged
    }

    /// Entries of `self` whose reference is not in `other`. Unidentified
    /// entries never match, so they are all kept.
    pub fn difference(&self, other: &Entries) -> Entries {
        self.collection
            .iter()
            .filter(|entry| !other.contains(entry))
            .cloned()
            .collect()
    }
}

impl FromIterator<Entry> for Entries {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        let mut entries = Entries::new();
        for entry in iter {
            entries.add(entry);
        }
        entries
    }
}

impl IntoIterator for Entries {
    type Item = Entry;
    type IntoIter = std::vec::IntoIter<Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.collection.into_iter()
    }
}

impl<'a> IntoIterator for &'a Entries {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.collection.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::tests::{MEDIA_ID, MediaOnly};
    use crate::{MpxError, Namespace};
    use serde_json::{Map, Value, json};

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("fixture must be an object"),
        }
    }

    fn media(number: u32) -> Entry {
        let mut entry = Entry::new();
        let id = format!("http://data.media.theplatform.com/media/data/Media/{number}");
        entry.set_id(Some(&id), &MediaOnly).unwrap();
        entry
    }

    #[test]
    fn adding_the_same_entry_twice_is_idempotent() {
        let mut entries = Entries::new();
        let entry = media(1);
        entries.add(entry.clone()).add(entry);
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn unidentified_entries_are_never_merged() {
        let mut draft = Entry::for_endpoint("Media Data Service", "Media");
        draft.set_field("guid", json!("a")).unwrap();

        let mut entries = Entries::new();
        entries.add(draft.clone()).add(draft.clone());
        assert_eq!(entries.len(), 2);

        let others: Entries = [draft.clone()].into_iter().collect();
        assert_eq!(entries.union(&others).len(), 3);
        assert_eq!(entries.difference(&others).len(), 2);

        assert_eq!(entries.remove(&draft), 1);
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn from_page_keeps_identical_new_rows() {
        let page = Page::new(
            Namespace::new(),
            vec![object(json!({"title": "x"})), object(json!({"title": "x"}))],
        );
        let entries = Entries::from_page(&page, &MediaOnly).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries.to_page().entries.len(), 2);
    }

    #[test]
    fn from_page_builds_identified_entries() {
        let page = Page::new(
            Namespace::from([("pl1".into(), "urn:pl1".into())]),
            vec![
                object(json!({"id": MEDIA_ID, "guid": "g1", "pl1$rating": 3})),
                object(json!({"guid": "new"})),
            ],
        );
        let entries = Entries::from_page(&page, &MediaOnly).unwrap();

        assert_eq!(entries.len(), 2);
        let identified = entries.get(MEDIA_ID).unwrap();
        assert_eq!(identified.service(), Some("Media Data Service"));
        assert_eq!(identified.fields().get("guid"), Some(&json!("g1")));
        assert_eq!(entries.namespace().get("pl1").map(String::as_str), Some("urn:pl1"));
        assert!(!entries.iter().nth(1).unwrap().is_identified());
    }

    #[test]
    fn from_page_fails_on_unknown_references() {
        let page = Page::new(
            Namespace::new(),
            vec![object(json!({"id": "http://data.player.theplatform.com/player/data/Player/1"}))],
        );
        assert!(matches!(Entries::from_page(&page, &MediaOnly), Err(MpxError::Address { .. })));
    }

    #[test]
    fn to_page_inverts_from_page() {
        let page = Page::new(
            Namespace::from([("pl1".into(), "urn:pl1".into())]),
            vec![object(json!({"id": MEDIA_ID, "pl1$rating": 3}))],
        );
        let entries = Entries::from_page(&page, &MediaOnly).unwrap();
        assert_eq!(entries.to_page(), page);
    }

    #[test]
    fn union_and_difference_follow_identity() {
        let left: Entries = [media(1), media(2)].into_iter().collect();
        let right: Entries = [media(2), media(3)].into_iter().collect();

        let union = left.union(&right);
        assert_eq!(union.len(), 3);

        let difference = left.difference(&right);
        assert_eq!(difference.len(), 1);
        assert!(difference.get("http://data.media.theplatform.com/media/data/Media/1").is_some());
    }

    #[test]
    fn remove_drops_matching_identity() {
        let mut entries: Entries = [media(1), media(2)].into_iter().collect();
        assert_eq!(entries.remove(&media(1)), 1);
        assert_eq!(entries.remove(&media(1)), 0);
        assert_eq!(entries.len(), 1);
    }
}
